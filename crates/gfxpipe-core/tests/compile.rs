use std::sync::Arc;

use gfxpipe_core::config::registers::*;
use gfxpipe_core::{
    compile_compute, compile_graphics, CompileOptions, ConfigError, HardwareStage, MergeError,
    PipelineShape,
};
use gfxpipe_types::build_info::{ExportFormat, InterpolationMode, TessPrimitiveMode, TessSpacing};
use gfxpipe_types::limits::INVALID_VALUE;
use gfxpipe_types::{
    ComputePipelineBuildInfo, DescriptorRangeValue, DescriptorType, GraphicsPipelineBuildInfo,
    PipelineShaderInfo, ResourceMappingNode, ShaderStage, ShaderStageMask,
};
use pretty_assertions::assert_eq;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn push_const(offset: u32, size: u32) -> ResourceMappingNode {
    ResourceMappingNode::push_const(offset, size, 0, 0)
}

fn set_table(offset: u32, bindings: &[u32]) -> ResourceMappingNode {
    ResourceMappingNode::table(
        offset,
        bindings
            .iter()
            .map(|&b| ResourceMappingNode::descriptor(DescriptorType::Resource, b * 8, 8, 0, b))
            .collect::<Vec<_>>(),
    )
}

fn full_pipeline() -> GraphicsPipelineBuildInfo {
    let mut info = GraphicsPipelineBuildInfo {
        vs: PipelineShaderInfo::with_nodes(vec![push_const(0, 4), set_table(4, &[0])]),
        tcs: PipelineShaderInfo::with_nodes(vec![push_const(0, 4)]),
        tes: PipelineShaderInfo::with_nodes(vec![set_table(4, &[1])]),
        gs: PipelineShaderInfo::with_nodes(vec![set_table(4, &[0, 2])]),
        fs: PipelineShaderInfo::with_nodes(vec![set_table(4, &[3]), push_const(0, 4)]),
        ..Default::default()
    };
    info.input_assembly.patch_control_points = 4;
    info.tessellation.primitive_mode = TessPrimitiveMode::Quads;
    info.tessellation.spacing = TessSpacing::FractionalOdd;
    info.tessellation.output_control_points = 4;
    info.tessellation.max_tess_factor = 16.0;
    info.geometry.max_output_vertices = 6;
    info.geometry.stream_output_dwords = [4, 0, 0, 0];
    info.vertex_output.param_count = 2;
    info.fragment.inputs = vec![InterpolationMode::Smooth, InterpolationMode::Flat];
    info.fragment.export_formats[0] = ExportFormat::Fp16Abgr;
    info
}

#[test]
fn full_graphics_pipeline() {
    init_tracing();
    let mut info = full_pipeline();
    let compiled = compile_graphics(&mut info, &CompileOptions::default()).unwrap();

    assert_eq!(compiled.shape, PipelineShape::VsTsGsFs);
    assert_eq!(compiled.stage_mask, ShaderStageMask::all() - ShaderStageMask::COMPUTE);

    let roles: Vec<_> = compiled.roles.iter().map(|r| (r.role, r.stage)).collect();
    assert_eq!(
        roles,
        vec![
            (HardwareStage::Ls, Some(ShaderStage::Vertex)),
            (HardwareStage::Hs, Some(ShaderStage::TessControl)),
            (HardwareStage::Es, Some(ShaderStage::TessEval)),
            (HardwareStage::Gs, Some(ShaderStage::Geometry)),
            (HardwareStage::Vs, Some(ShaderStage::CopyShader)),
            (HardwareStage::Ps, Some(ShaderStage::Fragment)),
        ]
    );

    let merged = compiled.merged.as_ref().unwrap();
    assert_eq!(merged.nodes().len(), 2);
    let bindings: Vec<u32> = merged.nodes()[1]
        .children()
        .unwrap()
        .iter()
        .filter_map(|n| n.binding().map(|b| b.binding))
        .collect();
    assert_eq!(bindings, vec![0, 1, 2, 3]);
    for stage in [&info.vs, &info.tcs, &info.tes, &info.gs, &info.fs] {
        assert!(Arc::ptr_eq(merged.nodes(), &stage.user_data_nodes));
    }

    let md = &compiled.metadata;
    // Every role maps the same five user-data dwords.
    for role in HardwareStage::ALL.into_iter().filter(|r| *r != HardwareStage::Cs) {
        let base = user_data_base(role);
        for entry in 0..5 {
            assert_eq!(md.register(base + entry), Some(entry), "{role} entry {entry}");
        }
        assert_eq!(md.register(pgm_rsrc2(role)), Some(5 << 1), "{role}");
    }
    assert_eq!(md.register(VGT_LS_HS_CONFIG), Some(vgt_ls_hs_config(64, 4, 4)));
    assert_eq!(md.register(VGT_TF_PARAM), Some(2 | (2 << 2) | (2 << 5)));
    assert_eq!(md.register(VGT_HOS_MAX_TESS_LEVEL), Some(16.0f32.to_bits()));
    assert_eq!(md.register(VGT_GS_MAX_VERT_OUT), Some(6));
    assert_eq!(md.register(VGT_GSVS_RING_ITEMSIZE), Some(24));
    assert_eq!(md.register(VGT_GS_MODE).map(|v| v & (3 << 21)), Some(0));
    assert_eq!(md.register(SPI_VS_OUT_CONFIG), Some(1 << 1));
    assert_eq!(md.register(VGT_STRMOUT_CONFIG), None);
    assert_eq!(md.register(spi_ps_input_cntl(1)), Some(1 | PS_INPUT_FLAT_SHADE));
    assert_eq!(md.register(SPI_SHADER_COL_FORMAT), Some(4));
    assert_eq!(md.register(CB_SHADER_MASK), Some(0xF));

    assert_eq!(md.hardware_stages.len(), 6);
    assert!(md
        .hardware_stages
        .iter()
        .all(|s| s.user_data_limit == 5 && s.spill_threshold == INVALID_VALUE));
}

#[test]
fn merge_conflict_aborts_the_compile() {
    init_tracing();
    let mut info = full_pipeline();
    info.fs = PipelineShaderInfo::with_nodes(vec![push_const(0, 8)]);
    let before = info.clone();

    let err = compile_graphics(&mut info, &CompileOptions::default()).unwrap_err();
    assert_eq!(
        err,
        ConfigError::Merge(MergeError::SizeMismatch {
            offset: 0,
            first: 4,
            other: 8
        })
    );
    assert_eq!(info, before);
}

#[test]
fn immutable_samplers_are_shared() {
    let sampler = DescriptorRangeValue::new(0, 5, DescriptorType::Sampler, vec![1, 2, 3, 4]);
    let mut info = GraphicsPipelineBuildInfo {
        vs: PipelineShaderInfo::with_nodes(vec![push_const(0, 2)]),
        fs: PipelineShaderInfo {
            descriptor_range_values: vec![sampler.clone()].into(),
            ..PipelineShaderInfo::with_nodes(vec![push_const(0, 2)])
        },
        ..Default::default()
    };
    let compiled = compile_graphics(&mut info, &CompileOptions::default()).unwrap();
    let merged = compiled.merged.unwrap();
    assert_eq!(&merged.range_values()[..], &[sampler]);
    assert!(Arc::ptr_eq(merged.range_values(), &info.vs.descriptor_range_values));
}

#[test]
fn small_user_data_window_spills() {
    let mut info = GraphicsPipelineBuildInfo {
        vs: PipelineShaderInfo::with_nodes(vec![push_const(0, 4), push_const(4, 8)]),
        fs: PipelineShaderInfo::with_nodes(vec![push_const(0, 4)]),
        ..Default::default()
    };
    let options = CompileOptions {
        max_user_data_regs: 8,
        ..CompileOptions::default()
    };
    let compiled = compile_graphics(&mut info, &options).unwrap();
    for stage in &compiled.metadata.hardware_stages {
        assert_eq!(stage.spill_threshold, 4);
        assert_eq!(stage.user_data_limit, 12);
        assert_eq!(stage.user_data_reg_count, 4);
    }
}

#[test]
fn compute_pipeline() {
    init_tracing();
    let mut info = ComputePipelineBuildInfo {
        cs: PipelineShaderInfo::with_nodes(vec![set_table(0, &[0, 1]), push_const(1, 2)]),
        workgroup_size: [64, 2, 1],
    };
    let before = info.cs.user_data_nodes.clone();
    let compiled = compile_compute(&mut info, &CompileOptions::default()).unwrap();

    assert_eq!(compiled.shape, PipelineShape::Cs);
    assert!(compiled.merged.is_none());
    assert!(Arc::ptr_eq(&before, &info.cs.user_data_nodes));

    let md = &compiled.metadata;
    assert_eq!(md.register(COMPUTE_NUM_THREAD_X), Some(64));
    assert_eq!(md.register(COMPUTE_NUM_THREAD_Y), Some(2));
    assert_eq!(md.register(COMPUTE_NUM_THREAD_Z), Some(1));
    assert_eq!(md.register(COMPUTE_USER_DATA_0 + 2), Some(2));
    assert_eq!(md.register(COMPUTE_PGM_RSRC2), Some(3 << 1));
    assert_eq!(md.register(VGT_GS_MODE), None);
    assert_eq!(md.register(SPI_PS_INPUT_ENA), None);
}

#[test]
fn missing_compute_shader_is_rejected() {
    let mut info = ComputePipelineBuildInfo::default();
    let err = compile_compute(&mut info, &CompileOptions::default()).unwrap_err();
    assert_eq!(err, ConfigError::UnsupportedStageMask(ShaderStageMask::empty()));
}

#[test]
fn merged_table_is_part_of_the_json_output() {
    let mut info = full_pipeline();
    let compiled = compile_graphics(&mut info, &CompileOptions::default()).unwrap();
    let rendered = serde_json::to_value(&compiled).unwrap();

    let nodes = rendered["merged"]["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0]["offset_in_dwords"], 0);
    assert_eq!(nodes[0]["kind"], "push_const");
    assert_eq!(nodes[1]["kind"], "descriptor_table");
    let bindings: Vec<_> = nodes[1]["children"]
        .as_array()
        .unwrap()
        .iter()
        .map(|child| child["binding"].as_u64().unwrap())
        .collect();
    assert_eq!(bindings, vec![0, 1, 2, 3]);
    assert_eq!(rendered["merged"]["stats"]["input_nodes"], 7);
}

#[test]
fn compute_json_output_has_no_merged_table() {
    let mut info = ComputePipelineBuildInfo {
        cs: PipelineShaderInfo::with_nodes(vec![push_const(0, 2)]),
        workgroup_size: [8, 8, 1],
    };
    let compiled = compile_compute(&mut info, &CompileOptions::default()).unwrap();
    let rendered = serde_json::to_value(&compiled).unwrap();
    assert!(rendered["merged"].is_null());
}

#[test]
fn compiles_run_in_parallel() {
    let handles: Vec<_> = (0..4u32)
        .map(|i| {
            std::thread::spawn(move || {
                let mut info = full_pipeline();
                info.geometry.max_output_vertices = 4 + i;
                compile_graphics(&mut info, &CompileOptions::default())
                    .map(|compiled| compiled.metadata.register(VGT_GS_MAX_VERT_OUT))
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap().unwrap(), Some(4 + i as u32));
    }
}
