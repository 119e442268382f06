//! Shared data model for the gfxpipe pipeline compiler stage.
//!
//! This crate only describes pipelines; it does not transform them. It contains:
//! - logical shader stages and the stage mask (see [`ShaderStage`], [`ShaderStageMask`]),
//! - resource-mapping nodes and immutable descriptor values (see [`ResourceMappingNode`],
//!   [`DescriptorRangeValue`]),
//! - the pipeline build-info records consumed by `gfxpipe-core` (see [`build_info`]),
//! - hardware limits shared by the merger and the register builder (see [`limits`]).
//!
//! Every type derives `serde` traits so pipeline descriptions can be loaded from JSON by tools.
#![forbid(unsafe_code)]

pub mod build_info;
pub mod limits;
mod resource;
mod stage;

pub use build_info::{
    ComputePipelineBuildInfo, GraphicsPipelineBuildInfo, PipelineDescription, PipelineShaderInfo,
};
pub use resource::{
    DescriptorBinding, DescriptorRangeValue, DescriptorType, NodeData, NodeTable, RangeValueTable,
    ResourceMappingNode, ResourceMappingNodeType,
};
pub use stage::{ShaderStage, ShaderStageMask};
