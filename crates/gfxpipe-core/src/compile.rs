use gfxpipe_types::{ComputePipelineBuildInfo, GraphicsPipelineBuildInfo, ShaderStageMask};
use serde::Serialize;
use tracing::debug;

use crate::config::{ConfigBuilder, PipelineMetadata, RoleConfig};
use crate::context::{ComputeContext, GraphicsContext, PipelineContext};
use crate::error::Result;
use crate::merge::MergedTable;
use crate::options::CompileOptions;
use crate::shape::{map_shape, MappedShape, PipelineShape};

/// Result of one successful pipeline compile.
#[derive(Clone, Debug, Serialize)]
pub struct CompiledPipeline {
    pub stage_mask: ShaderStageMask,
    pub shape: PipelineShape,
    /// Present when more than one stage was active.
    pub merged: Option<MergedTable>,
    pub roles: Vec<RoleConfig>,
    pub metadata: PipelineMetadata,
}

/// Merge user data, map the shape and build the register state of a graphics pipeline.
///
/// Unsupported stage combinations are rejected before anything is merged. Once the merge has
/// succeeded every active stage of `info` references the merged table; a failed merge leaves
/// `info` unchanged.
pub fn compile_graphics(
    info: &mut GraphicsPipelineBuildInfo,
    options: &CompileOptions,
) -> Result<CompiledPipeline> {
    let mut ctx = GraphicsContext::new(info, options);
    let mapped = map_shape(ctx.shader_stage_mask(), options)?;
    ctx.do_user_data_node_merge()?;
    let (roles, metadata) = build(&ctx, mapped)?;
    let stage_mask = ctx.shader_stage_mask();
    Ok(CompiledPipeline {
        stage_mask,
        shape: mapped.shape,
        merged: ctx.into_merged_table(),
        roles,
        metadata,
    })
}

pub fn compile_compute(
    info: &mut ComputePipelineBuildInfo,
    options: &CompileOptions,
) -> Result<CompiledPipeline> {
    let mut ctx = ComputeContext::new(info, options);
    let mapped = map_shape(ctx.shader_stage_mask(), options)?;
    ctx.do_user_data_node_merge()?;
    let (roles, metadata) = build(&ctx, mapped)?;
    Ok(CompiledPipeline {
        stage_mask: ctx.shader_stage_mask(),
        shape: mapped.shape,
        merged: None,
        roles,
        metadata,
    })
}

fn build(
    ctx: &dyn PipelineContext,
    mapped: MappedShape,
) -> Result<(Vec<RoleConfig>, PipelineMetadata)> {
    let roles = ConfigBuilder::new(ctx, mapped)?.build()?;
    let metadata = PipelineMetadata::from_roles(&roles)?;
    debug!(
        shape = ?mapped.shape,
        roles = roles.len(),
        registers = metadata.registers.len(),
        "pipeline register config complete"
    );
    Ok((roles, metadata))
}
