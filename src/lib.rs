//! gfxpipe: user-data consolidation and hardware register configuration for shader pipelines.
//!
//! The data model lives in [`types`] (`gfxpipe-types`), the merge/shape/register machinery in
//! [`compiler`] (`gfxpipe-core`). The most common entry points are re-exported at the top level.
#![forbid(unsafe_code)]

pub use gfxpipe_core as compiler;
pub use gfxpipe_types as types;

pub use gfxpipe_core::{
    compile_compute, compile_graphics, CompileOptions, CompiledPipeline, ConfigError,
    HardwareStage, MergeError, PipelineShape,
};
pub use gfxpipe_types::{
    ComputePipelineBuildInfo, GraphicsPipelineBuildInfo, PipelineDescription, PipelineShaderInfo,
    ResourceMappingNode, ShaderStage, ShaderStageMask,
};
