//! GFX6-style register addresses and field encodings.
//!
//! Addresses are dword register indices as written into PM4 `SET_*_REG` packets. Only the
//! registers the pipeline builder emits are listed.

use gfxpipe_types::build_info::{
    ExportFormat, GsOutputPrimitive, TessPrimitiveMode, TessSpacing, VertexOrder,
};
use gfxpipe_types::limits::MAX_GS_STREAMS;

use crate::shape::HardwareStage;

// SH registers: per-role user data windows.
pub const SPI_SHADER_USER_DATA_PS_0: u32 = 0x2C0C;
pub const SPI_SHADER_USER_DATA_VS_0: u32 = 0x2C4C;
pub const SPI_SHADER_USER_DATA_GS_0: u32 = 0x2C8C;
pub const SPI_SHADER_USER_DATA_ES_0: u32 = 0x2CCC;
pub const SPI_SHADER_USER_DATA_HS_0: u32 = 0x2D0C;
pub const SPI_SHADER_USER_DATA_LS_0: u32 = 0x2D4C;
pub const COMPUTE_USER_DATA_0: u32 = 0x2E40;

// SH registers: resource descriptors carrying the user SGPR count.
pub const SPI_SHADER_PGM_RSRC2_PS: u32 = 0x2C0B;
pub const SPI_SHADER_PGM_RSRC2_VS: u32 = 0x2C4B;
pub const SPI_SHADER_PGM_RSRC2_GS: u32 = 0x2C8B;
pub const SPI_SHADER_PGM_RSRC2_ES: u32 = 0x2CCB;
pub const SPI_SHADER_PGM_RSRC2_HS: u32 = 0x2D0B;
pub const SPI_SHADER_PGM_RSRC2_LS: u32 = 0x2D4B;
pub const COMPUTE_PGM_RSRC2: u32 = 0x2E13;

pub const COMPUTE_NUM_THREAD_X: u32 = 0x2E07;
pub const COMPUTE_NUM_THREAD_Y: u32 = 0x2E08;
pub const COMPUTE_NUM_THREAD_Z: u32 = 0x2E09;

// Context registers: tessellation.
pub const VGT_HOS_MAX_TESS_LEVEL: u32 = 0xA286;
pub const VGT_HOS_MIN_TESS_LEVEL: u32 = 0xA287;
pub const VGT_LS_HS_CONFIG: u32 = 0xA2D6;
pub const VGT_TF_PARAM: u32 = 0xA2DB;

// Context registers: ES/GS.
pub const VGT_GS_MODE: u32 = 0xA290;
pub const VGT_GSVS_RING_OFFSET_1: u32 = 0xA298;
pub const VGT_GSVS_RING_OFFSET_2: u32 = 0xA299;
pub const VGT_GSVS_RING_OFFSET_3: u32 = 0xA29A;
pub const VGT_GS_OUT_PRIM_TYPE: u32 = 0xA29B;
pub const VGT_ESGS_RING_ITEMSIZE: u32 = 0xA2AB;
pub const VGT_GSVS_RING_ITEMSIZE: u32 = 0xA2AC;
pub const VGT_GS_MAX_VERT_OUT: u32 = 0xA2CE;
pub const VGT_GS_VERT_ITEMSIZE: u32 = 0xA2D7;
pub const VGT_GS_INSTANCE_CNT: u32 = 0xA2E4;

pub const fn vgt_gs_vert_itemsize(stream: usize) -> u32 {
    VGT_GS_VERT_ITEMSIZE + stream as u32
}

pub const fn vgt_gsvs_ring_offset(stream: usize) -> u32 {
    // Stream 0 always starts at the ring base and has no register.
    VGT_GSVS_RING_OFFSET_1 + stream as u32 - 1
}

// Context registers: VS outputs and stream-out.
pub const SPI_VS_OUT_CONFIG: u32 = 0xA1B1;
pub const PA_CL_VS_OUT_CNTL: u32 = 0xA207;
pub const VGT_STRMOUT_VTX_STRIDE_0: u32 = 0xA2B5;
pub const VGT_STRMOUT_CONFIG: u32 = 0xA2E5;
pub const VGT_STRMOUT_BUFFER_CONFIG: u32 = 0xA2E6;

/// Stride registers are interleaved with the buffer size/offset registers, four apart.
pub const fn vgt_strmout_vtx_stride(buffer: usize) -> u32 {
    VGT_STRMOUT_VTX_STRIDE_0 + buffer as u32 * 4
}

// Context registers: PS inputs and exports.
pub const CB_SHADER_MASK: u32 = 0xA08F;
pub const SPI_PS_INPUT_CNTL_0: u32 = 0xA191;
pub const SPI_PS_INPUT_ENA: u32 = 0xA1B3;
pub const SPI_PS_INPUT_ADDR: u32 = 0xA1B4;
pub const SPI_PS_IN_CONTROL: u32 = 0xA1B6;
pub const SPI_SHADER_Z_FORMAT: u32 = 0xA1C4;
pub const SPI_SHADER_COL_FORMAT: u32 = 0xA1C5;
pub const DB_SHADER_CONTROL: u32 = 0xA203;

pub const fn spi_ps_input_cntl(index: usize) -> u32 {
    SPI_PS_INPUT_CNTL_0 + index as u32
}

/// First user-data register of `role`.
pub const fn user_data_base(role: HardwareStage) -> u32 {
    match role {
        HardwareStage::Ls => SPI_SHADER_USER_DATA_LS_0,
        HardwareStage::Hs => SPI_SHADER_USER_DATA_HS_0,
        HardwareStage::Es => SPI_SHADER_USER_DATA_ES_0,
        HardwareStage::Gs => SPI_SHADER_USER_DATA_GS_0,
        HardwareStage::Vs => SPI_SHADER_USER_DATA_VS_0,
        HardwareStage::Ps => SPI_SHADER_USER_DATA_PS_0,
        HardwareStage::Cs => COMPUTE_USER_DATA_0,
    }
}

pub const fn pgm_rsrc2(role: HardwareStage) -> u32 {
    match role {
        HardwareStage::Ls => SPI_SHADER_PGM_RSRC2_LS,
        HardwareStage::Hs => SPI_SHADER_PGM_RSRC2_HS,
        HardwareStage::Es => SPI_SHADER_PGM_RSRC2_ES,
        HardwareStage::Gs => SPI_SHADER_PGM_RSRC2_GS,
        HardwareStage::Vs => SPI_SHADER_PGM_RSRC2_VS,
        HardwareStage::Ps => SPI_SHADER_PGM_RSRC2_PS,
        HardwareStage::Cs => COMPUTE_PGM_RSRC2,
    }
}

// PGM_RSRC2 fields.
pub const PGM_RSRC2_USER_SGPR_SHIFT: u32 = 1;
pub const PGM_RSRC2_USER_SGPR_MASK: u32 = 0x1F << PGM_RSRC2_USER_SGPR_SHIFT;

pub const fn pgm_rsrc2_user_sgpr(count: u32) -> u32 {
    (count << PGM_RSRC2_USER_SGPR_SHIFT) & PGM_RSRC2_USER_SGPR_MASK
}

// VGT_LS_HS_CONFIG fields.
pub const LS_HS_NUM_PATCHES_MASK: u32 = 0xFF;
pub const LS_HS_NUM_INPUT_CP_SHIFT: u32 = 8;
pub const LS_HS_NUM_OUTPUT_CP_SHIFT: u32 = 14;
pub const LS_HS_CP_MASK: u32 = 0x3F;

pub const fn vgt_ls_hs_config(num_patches: u32, input_cp: u32, output_cp: u32) -> u32 {
    (num_patches & LS_HS_NUM_PATCHES_MASK)
        | ((input_cp & LS_HS_CP_MASK) << LS_HS_NUM_INPUT_CP_SHIFT)
        | ((output_cp & LS_HS_CP_MASK) << LS_HS_NUM_OUTPUT_CP_SHIFT)
}

// VGT_TF_PARAM fields.
pub const TF_PARAM_TYPE_ISOLINE: u32 = 0;
pub const TF_PARAM_TYPE_TRI: u32 = 1;
pub const TF_PARAM_TYPE_QUAD: u32 = 2;
pub const TF_PARAM_PARTITIONING_SHIFT: u32 = 2;
pub const TF_PARAM_PART_INTEGER: u32 = 0;
pub const TF_PARAM_PART_FRAC_ODD: u32 = 2;
pub const TF_PARAM_PART_FRAC_EVEN: u32 = 3;
pub const TF_PARAM_TOPOLOGY_SHIFT: u32 = 5;
pub const TF_PARAM_OUTPUT_POINT: u32 = 0;
pub const TF_PARAM_OUTPUT_LINE: u32 = 1;
pub const TF_PARAM_OUTPUT_TRIANGLE_CW: u32 = 2;
pub const TF_PARAM_OUTPUT_TRIANGLE_CCW: u32 = 3;

/// Encode `VGT_TF_PARAM`.
///
/// The tessellator's winding is defined in a Y-down space, so an API counter-clockwise order is
/// programmed as clockwise.
pub fn vgt_tf_param(
    mode: TessPrimitiveMode,
    spacing: TessSpacing,
    order: VertexOrder,
    point_mode: bool,
) -> u32 {
    let ty = match mode {
        TessPrimitiveMode::Isolines => TF_PARAM_TYPE_ISOLINE,
        TessPrimitiveMode::Triangles => TF_PARAM_TYPE_TRI,
        TessPrimitiveMode::Quads => TF_PARAM_TYPE_QUAD,
    };
    let partitioning = match spacing {
        TessSpacing::Equal => TF_PARAM_PART_INTEGER,
        TessSpacing::FractionalOdd => TF_PARAM_PART_FRAC_ODD,
        TessSpacing::FractionalEven => TF_PARAM_PART_FRAC_EVEN,
    };
    let topology = if point_mode {
        TF_PARAM_OUTPUT_POINT
    } else if mode == TessPrimitiveMode::Isolines {
        TF_PARAM_OUTPUT_LINE
    } else {
        match order {
            VertexOrder::Ccw => TF_PARAM_OUTPUT_TRIANGLE_CW,
            VertexOrder::Cw => TF_PARAM_OUTPUT_TRIANGLE_CCW,
        }
    };
    ty | (partitioning << TF_PARAM_PARTITIONING_SHIFT) | (topology << TF_PARAM_TOPOLOGY_SHIFT)
}

// VGT_GS_MODE fields.
pub const GS_MODE_SCENARIO_G: u32 = 3;
pub const GS_MODE_CUT_MODE_SHIFT: u32 = 4;
pub const GS_MODE_ONCHIP_SHIFT: u32 = 21;
pub const GS_MODE_ONCHIP_ON: u32 = 3;

/// Encode `VGT_GS_MODE`. The cut mode is the smallest strip-cut granularity covering
/// `max_output_vertices`.
pub fn vgt_gs_mode(max_output_vertices: u32, on_chip: bool) -> u32 {
    let cut_mode = match max_output_vertices {
        0..=128 => 3,
        129..=256 => 2,
        257..=512 => 1,
        _ => 0,
    };
    let onchip = if on_chip { GS_MODE_ONCHIP_ON } else { 0 };
    GS_MODE_SCENARIO_G | (cut_mode << GS_MODE_CUT_MODE_SHIFT) | (onchip << GS_MODE_ONCHIP_SHIFT)
}

pub fn vgt_gs_out_prim_type(prim: GsOutputPrimitive) -> u32 {
    match prim {
        GsOutputPrimitive::Points => 0,
        GsOutputPrimitive::LineStrip => 1,
        GsOutputPrimitive::TriangleStrip => 2,
    }
}

// VGT_GS_INSTANCE_CNT fields.
pub const GS_INSTANCE_ENABLE: u32 = 1 << 0;
pub const GS_INSTANCE_CNT_SHIFT: u32 = 2;
pub const GS_INSTANCE_CNT_MASK: u32 = 0x7F << GS_INSTANCE_CNT_SHIFT;

/// One invocation means instancing is off.
pub const fn vgt_gs_instance_cnt(invocations: u32) -> u32 {
    if invocations > 1 {
        GS_INSTANCE_ENABLE | ((invocations << GS_INSTANCE_CNT_SHIFT) & GS_INSTANCE_CNT_MASK)
    } else {
        0
    }
}

// VGT_STRMOUT_CONFIG fields.
pub const STRMOUT_RAST_STREAM_SHIFT: u32 = 4;

pub fn vgt_strmout_config(stream_buffers: &[u8; MAX_GS_STREAMS], rasterized_stream: u32) -> u32 {
    let enables = stream_buffers
        .iter()
        .enumerate()
        .filter(|(_, &buffers)| buffers != 0)
        .fold(0, |acc, (stream, _)| acc | (1 << stream));
    enables | ((rasterized_stream & 0x7) << STRMOUT_RAST_STREAM_SHIFT)
}

/// Four buffer-enable bits per stream.
pub fn vgt_strmout_buffer_config(stream_buffers: &[u8; MAX_GS_STREAMS]) -> u32 {
    stream_buffers
        .iter()
        .enumerate()
        .fold(0, |acc, (stream, &buffers)| {
            acc | ((u32::from(buffers) & 0xF) << (stream * 4))
        })
}

pub const STRMOUT_VTX_STRIDE_MASK: u32 = 0x3FF;

// SPI_VS_OUT_CONFIG fields.
pub const VS_EXPORT_COUNT_SHIFT: u32 = 1;

/// The field holds the parameter count minus one; at least one parameter is always exported.
pub const fn spi_vs_out_config(param_count: u32) -> u32 {
    let count = if param_count == 0 { 1 } else { param_count };
    ((count - 1) & 0x1F) << VS_EXPORT_COUNT_SHIFT
}

// PA_CL_VS_OUT_CNTL fields.
pub const CLIP_DIST_ENA_SHIFT: u32 = 0;
pub const CULL_DIST_ENA_SHIFT: u32 = 8;
pub const USE_VTX_POINT_SIZE: u32 = 1 << 16;
pub const USE_VTX_RENDER_TARGET_INDX: u32 = 1 << 18;
pub const USE_VTX_VIEWPORT_INDX: u32 = 1 << 19;
pub const VS_OUT_MISC_VEC_ENA: u32 = 1 << 21;
pub const VS_OUT_CCDIST0_VEC_ENA: u32 = 1 << 22;
pub const VS_OUT_CCDIST1_VEC_ENA: u32 = 1 << 23;
pub const VS_OUT_MISC_SIDE_BUS_ENA: u32 = 1 << 24;

// SPI_PS_INPUT_CNTL fields.
pub const PS_INPUT_OFFSET_MASK: u32 = 0x3F;
pub const PS_INPUT_FLAT_SHADE: u32 = 1 << 10;

// SPI_PS_INPUT_ENA / SPI_PS_INPUT_ADDR fields.
pub const PERSP_SAMPLE_ENA: u32 = 1 << 0;
pub const PERSP_CENTER_ENA: u32 = 1 << 1;
pub const PERSP_CENTROID_ENA: u32 = 1 << 2;
pub const LINEAR_CENTER_ENA: u32 = 1 << 5;
pub const POS_X_FLOAT_ENA: u32 = 1 << 8;
pub const POS_Y_FLOAT_ENA: u32 = 1 << 9;
pub const POS_Z_FLOAT_ENA: u32 = 1 << 10;
pub const POS_W_FLOAT_ENA: u32 = 1 << 11;
pub const FRONT_FACE_ENA: u32 = 1 << 12;
/// Interpolation enables; the hardware hangs if none of them is set.
pub const PS_INTERP_ENA_MASK: u32 = 0x7F;

// SPI_SHADER_Z_FORMAT values.
pub const SPI_SHADER_ZERO: u32 = 0;
pub const SPI_SHADER_32_R: u32 = 1;
pub const SPI_SHADER_32_GR: u32 = 2;

pub fn spi_shader_col_format(formats: &[ExportFormat]) -> u32 {
    formats
        .iter()
        .enumerate()
        .fold(0, |acc, (target, &format)| acc | ((format as u32) << (target * 4)))
}

/// All four channels of every target with a non-zero export format.
pub fn cb_shader_mask(formats: &[ExportFormat]) -> u32 {
    formats
        .iter()
        .enumerate()
        .filter(|(_, &format)| format != ExportFormat::Zero)
        .fold(0, |acc, (target, _)| acc | (0xF << (target * 4)))
}

// DB_SHADER_CONTROL fields.
pub const Z_EXPORT_ENABLE: u32 = 1 << 0;
pub const STENCIL_TEST_VAL_EXPORT_ENABLE: u32 = 1 << 1;
pub const Z_ORDER_SHIFT: u32 = 4;
pub const Z_ORDER_LATE_Z: u32 = 0;
pub const Z_ORDER_EARLY_Z_THEN_LATE_Z: u32 = 1;
pub const KILL_ENABLE: u32 = 1 << 6;
pub const DEPTH_BEFORE_SHADER: u32 = 1 << 12;
