//! Fixed-function register state of each hardware role.

use gfxpipe_types::build_info::{
    ComputePipelineBuildInfo, FragmentState, GeometryState, InputAssemblyState, InterpolationMode,
    StreamOutState, TessellationState, VertexOutputState,
};
use gfxpipe_types::limits::{
    MAX_GS_INVOCATIONS, MAX_GS_OUTPUT_VERTICES, MAX_GS_STREAMS, MAX_INTERPOLANTS,
    MAX_PATCH_CONTROL_POINTS, MAX_TESS_FACTOR, MAX_TRANSFORM_FEEDBACK_BUFFERS, MAX_WORKGROUP_DIM,
};
use gfxpipe_types::ShaderStage;
use serde::Serialize;

use super::registers::*;
use super::user_data::UserDataConfig;
use crate::error::{ConfigError, Result};
use crate::shape::HardwareStage;

/// Control points one LS/HS threadgroup can hold, summed over its patches.
const LS_HS_THREADGROUP_CONTROL_POINTS: u32 = 256;
/// Upper bound of `VGT_LS_HS_CONFIG.NUM_PATCHES` used by the builder.
const LS_HS_MAX_PATCHES: u32 = 64;

fn check_range(role: HardwareStage, field: &'static str, value: u32, max: u32) -> Result<u32> {
    if value == 0 || value > max {
        return Err(ConfigError::InvalidFixedFunctionState { role, field, value });
    }
    Ok(value)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LsRegConfig {
    pub vgt_ls_hs_config: u32,
}

impl LsRegConfig {
    pub fn build(ia: &InputAssemblyState, tess: &TessellationState) -> Result<Self> {
        let role = HardwareStage::Ls;
        let input_cp = check_range(
            role,
            "patch_control_points",
            ia.patch_control_points,
            MAX_PATCH_CONTROL_POINTS,
        )?;
        let output_cp = check_range(
            role,
            "output_control_points",
            tess.output_control_points,
            MAX_PATCH_CONTROL_POINTS,
        )?;
        let num_patches = (LS_HS_THREADGROUP_CONTROL_POINTS / input_cp.max(output_cp))
            .clamp(1, LS_HS_MAX_PATCHES);
        Ok(Self {
            vgt_ls_hs_config: vgt_ls_hs_config(num_patches, input_cp, output_cp),
        })
    }

    fn push_registers(&self, out: &mut Vec<(u32, u32)>) {
        out.push((VGT_LS_HS_CONFIG, self.vgt_ls_hs_config));
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct HsRegConfig {
    pub vgt_tf_param: u32,
    /// IEEE-754 bits of the clamped maximum tessellation factor.
    pub max_tess_level: u32,
    pub min_tess_level: u32,
}

impl HsRegConfig {
    pub fn build(tess: &TessellationState) -> Self {
        // `f32::max` drops NaN, so a NaN factor degrades to the bound.
        let max_level = tess.max_tess_factor.max(1.0).min(MAX_TESS_FACTOR);
        let min_level = tess.min_tess_factor.max(0.0).min(max_level);
        Self {
            vgt_tf_param: vgt_tf_param(
                tess.primitive_mode,
                tess.spacing,
                tess.vertex_order,
                tess.point_mode,
            ),
            max_tess_level: max_level.to_bits(),
            min_tess_level: min_level.to_bits(),
        }
    }

    fn push_registers(&self, out: &mut Vec<(u32, u32)>) {
        out.push((VGT_TF_PARAM, self.vgt_tf_param));
        out.push((VGT_HOS_MAX_TESS_LEVEL, self.max_tess_level));
        out.push((VGT_HOS_MIN_TESS_LEVEL, self.min_tess_level));
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct EsRegConfig {
    pub esgs_ring_itemsize: u32,
}

impl EsRegConfig {
    pub fn build(gs: &GeometryState) -> Self {
        Self {
            esgs_ring_itemsize: gs.es_output_dwords,
        }
    }

    fn push_registers(&self, out: &mut Vec<(u32, u32)>) {
        out.push((VGT_ESGS_RING_ITEMSIZE, self.esgs_ring_itemsize));
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GsRegConfig {
    pub gs_mode: u32,
    pub out_prim_type: u32,
    pub max_vert_out: u32,
    pub instance_cnt: u32,
    /// Dwords per emitted vertex, per stream.
    pub vert_itemsize: [u32; MAX_GS_STREAMS],
    /// Start of streams 1..=3 inside one GS→VS ring item.
    pub gsvs_ring_offset: [u32; MAX_GS_STREAMS - 1],
    pub gsvs_ring_itemsize: u32,
}

impl GsRegConfig {
    pub fn build(gs: &GeometryState, on_chip: bool) -> Result<Self> {
        let role = HardwareStage::Gs;
        let max_vert_out = check_range(
            role,
            "max_output_vertices",
            gs.max_output_vertices,
            MAX_GS_OUTPUT_VERTICES,
        )?;
        let invocations = check_range(role, "invocations", gs.invocations, MAX_GS_INVOCATIONS)?;
        if gs.rasterized_stream as usize >= MAX_GS_STREAMS {
            return Err(ConfigError::InvalidFixedFunctionState {
                role,
                field: "rasterized_stream",
                value: gs.rasterized_stream,
            });
        }

        let mut gsvs_ring_offset = [0; MAX_GS_STREAMS - 1];
        let mut ring_itemsize = 0u32;
        for (stream, &dwords) in gs.stream_output_dwords.iter().enumerate() {
            if stream > 0 {
                gsvs_ring_offset[stream - 1] = ring_itemsize;
            }
            ring_itemsize = ring_itemsize.saturating_add(dwords.saturating_mul(max_vert_out));
        }

        Ok(Self {
            gs_mode: vgt_gs_mode(max_vert_out, on_chip),
            out_prim_type: vgt_gs_out_prim_type(gs.output_primitive),
            max_vert_out,
            instance_cnt: vgt_gs_instance_cnt(invocations),
            vert_itemsize: gs.stream_output_dwords,
            gsvs_ring_offset,
            gsvs_ring_itemsize: ring_itemsize,
        })
    }

    fn push_registers(&self, out: &mut Vec<(u32, u32)>) {
        out.push((VGT_GS_MODE, self.gs_mode));
        out.push((VGT_GS_OUT_PRIM_TYPE, self.out_prim_type));
        out.push((VGT_GS_MAX_VERT_OUT, self.max_vert_out));
        out.push((VGT_GS_INSTANCE_CNT, self.instance_cnt));
        for (stream, &size) in self.vert_itemsize.iter().enumerate() {
            out.push((vgt_gs_vert_itemsize(stream), size));
        }
        for (i, &offset) in self.gsvs_ring_offset.iter().enumerate() {
            out.push((vgt_gsvs_ring_offset(i + 1), offset));
        }
        out.push((VGT_GSVS_RING_ITEMSIZE, self.gsvs_ring_itemsize));
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StreamOutRegs {
    pub config: u32,
    pub buffer_config: u32,
    pub vtx_stride: [u32; MAX_TRANSFORM_FEEDBACK_BUFFERS],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct VsRegConfig {
    pub spi_vs_out_config: u32,
    pub pa_cl_vs_out_cntl: u32,
    pub stream_out: Option<StreamOutRegs>,
}

impl VsRegConfig {
    /// `rasterized_stream` is only meaningful when a geometry stage feeds the VS role.
    pub fn build(out: &VertexOutputState, so: &StreamOutState, rasterized_stream: u32) -> Self {
        let clip = u32::from(out.clip_distance_mask);
        let cull = u32::from(out.cull_distance_mask);
        let dist = clip | cull;

        let mut cntl = (clip << CLIP_DIST_ENA_SHIFT) | (cull << CULL_DIST_ENA_SHIFT);
        if dist & 0x0F != 0 {
            cntl |= VS_OUT_CCDIST0_VEC_ENA;
        }
        if dist & 0xF0 != 0 {
            cntl |= VS_OUT_CCDIST1_VEC_ENA;
        }
        if out.uses_point_size {
            cntl |= USE_VTX_POINT_SIZE;
        }
        if out.uses_layer {
            cntl |= USE_VTX_RENDER_TARGET_INDX;
        }
        if out.uses_viewport_index {
            cntl |= USE_VTX_VIEWPORT_INDX;
        }
        if out.uses_point_size || out.uses_layer || out.uses_viewport_index {
            cntl |= VS_OUT_MISC_VEC_ENA | VS_OUT_MISC_SIDE_BUS_ENA;
        }

        let stream_out = so.is_enabled().then(|| StreamOutRegs {
            config: vgt_strmout_config(&so.stream_buffers, rasterized_stream),
            buffer_config: vgt_strmout_buffer_config(&so.stream_buffers),
            vtx_stride: so
                .buffer_strides
                .map(|stride| stride & STRMOUT_VTX_STRIDE_MASK),
        });

        Self {
            spi_vs_out_config: spi_vs_out_config(out.param_count),
            pa_cl_vs_out_cntl: cntl,
            stream_out,
        }
    }

    fn push_registers(&self, out: &mut Vec<(u32, u32)>) {
        out.push((SPI_VS_OUT_CONFIG, self.spi_vs_out_config));
        out.push((PA_CL_VS_OUT_CNTL, self.pa_cl_vs_out_cntl));
        if let Some(so) = &self.stream_out {
            out.push((VGT_STRMOUT_CONFIG, so.config));
            out.push((VGT_STRMOUT_BUFFER_CONFIG, so.buffer_config));
            for (buffer, &stride) in so.vtx_stride.iter().enumerate() {
                out.push((vgt_strmout_vtx_stride(buffer), stride));
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PsRegConfig {
    /// `SPI_PS_INPUT_CNTL_n`, one per interpolant.
    pub input_cntl: Vec<u32>,
    pub ps_in_control: u32,
    pub input_ena: u32,
    pub input_addr: u32,
    pub z_format: u32,
    pub col_format: u32,
    pub cb_shader_mask: u32,
    pub db_shader_control: u32,
}

impl PsRegConfig {
    pub fn build(fs: &FragmentState) -> Result<Self> {
        let count = fs.inputs.len();
        if count > MAX_INTERPOLANTS {
            return Err(ConfigError::InvalidFixedFunctionState {
                role: HardwareStage::Ps,
                field: "inputs",
                value: u32::try_from(count).unwrap_or(u32::MAX),
            });
        }

        let mut input_ena = 0;
        let input_cntl = fs
            .inputs
            .iter()
            .enumerate()
            .map(|(location, &mode)| {
                let mut cntl = location as u32 & PS_INPUT_OFFSET_MASK;
                match mode {
                    InterpolationMode::Flat => cntl |= PS_INPUT_FLAT_SHADE,
                    InterpolationMode::Smooth => input_ena |= PERSP_CENTER_ENA,
                    InterpolationMode::NoPerspective => input_ena |= LINEAR_CENTER_ENA,
                    InterpolationMode::Centroid => input_ena |= PERSP_CENTROID_ENA,
                    InterpolationMode::Sample => input_ena |= PERSP_SAMPLE_ENA,
                }
                cntl
            })
            .collect();

        if fs.uses_frag_coord {
            input_ena |= POS_X_FLOAT_ENA | POS_Y_FLOAT_ENA | POS_Z_FLOAT_ENA | POS_W_FLOAT_ENA;
        }
        if fs.uses_front_facing {
            input_ena |= FRONT_FACE_ENA;
        }
        if input_ena & PS_INTERP_ENA_MASK == 0 {
            input_ena |= PERSP_CENTER_ENA;
        }

        let z_format = if fs.exports_stencil {
            SPI_SHADER_32_GR
        } else if fs.exports_depth {
            SPI_SHADER_32_R
        } else {
            SPI_SHADER_ZERO
        };

        let mut db_shader_control = 0;
        if fs.exports_depth {
            db_shader_control |= Z_EXPORT_ENABLE;
        }
        if fs.exports_stencil {
            db_shader_control |= STENCIL_TEST_VAL_EXPORT_ENABLE;
        }
        if fs.uses_discard {
            db_shader_control |= KILL_ENABLE;
        }
        let late_z = !fs.early_fragment_tests && (fs.uses_discard || fs.exports_depth);
        let z_order = if late_z {
            Z_ORDER_LATE_Z
        } else {
            Z_ORDER_EARLY_Z_THEN_LATE_Z
        };
        db_shader_control |= z_order << Z_ORDER_SHIFT;
        if fs.early_fragment_tests {
            db_shader_control |= DEPTH_BEFORE_SHADER;
        }

        Ok(Self {
            input_cntl,
            ps_in_control: count as u32,
            input_ena,
            input_addr: input_ena,
            z_format,
            col_format: spi_shader_col_format(&fs.export_formats),
            cb_shader_mask: cb_shader_mask(&fs.export_formats),
            db_shader_control,
        })
    }

    /// PS state for a pipeline without a fragment shader: no inputs, no exports.
    pub fn null() -> Self {
        Self {
            input_cntl: Vec::new(),
            ps_in_control: 0,
            input_ena: PERSP_CENTER_ENA,
            input_addr: PERSP_CENTER_ENA,
            z_format: SPI_SHADER_ZERO,
            col_format: 0,
            cb_shader_mask: 0,
            db_shader_control: Z_ORDER_EARLY_Z_THEN_LATE_Z << Z_ORDER_SHIFT,
        }
    }

    fn push_registers(&self, out: &mut Vec<(u32, u32)>) {
        for (index, &cntl) in self.input_cntl.iter().enumerate() {
            out.push((spi_ps_input_cntl(index), cntl));
        }
        out.push((SPI_PS_IN_CONTROL, self.ps_in_control));
        out.push((SPI_PS_INPUT_ENA, self.input_ena));
        out.push((SPI_PS_INPUT_ADDR, self.input_addr));
        out.push((SPI_SHADER_Z_FORMAT, self.z_format));
        out.push((SPI_SHADER_COL_FORMAT, self.col_format));
        out.push((CB_SHADER_MASK, self.cb_shader_mask));
        out.push((DB_SHADER_CONTROL, self.db_shader_control));
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CsRegConfig {
    pub num_thread: [u32; 3],
}

impl CsRegConfig {
    pub fn build(info: &ComputePipelineBuildInfo) -> Result<Self> {
        let [x, y, z] = info.workgroup_size;
        let role = HardwareStage::Cs;
        Ok(Self {
            num_thread: [
                check_range(role, "workgroup_size_x", x, MAX_WORKGROUP_DIM)?,
                check_range(role, "workgroup_size_y", y, MAX_WORKGROUP_DIM)?,
                check_range(role, "workgroup_size_z", z, MAX_WORKGROUP_DIM)?,
            ],
        })
    }

    fn push_registers(&self, out: &mut Vec<(u32, u32)>) {
        out.push((COMPUTE_NUM_THREAD_X, self.num_thread[0]));
        out.push((COMPUTE_NUM_THREAD_Y, self.num_thread[1]));
        out.push((COMPUTE_NUM_THREAD_Z, self.num_thread[2]));
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "UPPERCASE")]
pub enum FixedFunctionConfig {
    Ls(LsRegConfig),
    Hs(HsRegConfig),
    Es(EsRegConfig),
    Gs(GsRegConfig),
    Vs(VsRegConfig),
    Ps(PsRegConfig),
    Cs(CsRegConfig),
}

impl FixedFunctionConfig {
    pub fn role(&self) -> HardwareStage {
        match self {
            FixedFunctionConfig::Ls(_) => HardwareStage::Ls,
            FixedFunctionConfig::Hs(_) => HardwareStage::Hs,
            FixedFunctionConfig::Es(_) => HardwareStage::Es,
            FixedFunctionConfig::Gs(_) => HardwareStage::Gs,
            FixedFunctionConfig::Vs(_) => HardwareStage::Vs,
            FixedFunctionConfig::Ps(_) => HardwareStage::Ps,
            FixedFunctionConfig::Cs(_) => HardwareStage::Cs,
        }
    }

    fn push_registers(&self, out: &mut Vec<(u32, u32)>) {
        match self {
            FixedFunctionConfig::Ls(c) => c.push_registers(out),
            FixedFunctionConfig::Hs(c) => c.push_registers(out),
            FixedFunctionConfig::Es(c) => c.push_registers(out),
            FixedFunctionConfig::Gs(c) => c.push_registers(out),
            FixedFunctionConfig::Vs(c) => c.push_registers(out),
            FixedFunctionConfig::Ps(c) => c.push_registers(out),
            FixedFunctionConfig::Cs(c) => c.push_registers(out),
        }
    }
}

/// Everything needed to launch one hardware role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoleConfig {
    pub role: HardwareStage,
    /// Logical stage running in this role; `None` for a null fragment role.
    pub stage: Option<ShaderStage>,
    pub user_data: UserDataConfig,
    pub pgm_rsrc2: u32,
    pub fixed_function: FixedFunctionConfig,
}

impl RoleConfig {
    pub fn new(
        role: HardwareStage,
        stage: Option<ShaderStage>,
        user_data: UserDataConfig,
        fixed_function: FixedFunctionConfig,
    ) -> Self {
        debug_assert_eq!(fixed_function.role(), role);
        Self {
            role,
            stage,
            pgm_rsrc2: pgm_rsrc2_user_sgpr(user_data.reg_count()),
            user_data,
            fixed_function,
        }
    }

    /// `(register, value)` writes for this role, user data first.
    pub fn registers(&self) -> Vec<(u32, u32)> {
        let mut out = self.user_data.entries.clone();
        out.push((pgm_rsrc2(self.role), self.pgm_rsrc2));
        self.fixed_function.push_registers(&mut out);
        out
    }
}
