//! Per-compile pipeline contexts.
//!
//! A context borrows the caller's build info for the duration of one compile, knows which stages
//! are active and owns the merged user-data table once [`PipelineContext::do_user_data_node_merge`]
//! has run. Contexts are never shared between compiles.

use gfxpipe_types::{
    ComputePipelineBuildInfo, GraphicsPipelineBuildInfo, PipelineShaderInfo, ShaderStage,
    ShaderStageMask,
};
use tracing::{debug, trace};

use crate::activation::StageActivation;
use crate::merge::{MergeError, MergedTable, ResourceTableMerger};
use crate::options::CompileOptions;

/// Read-only view of the fixed-function state behind a context.
#[derive(Clone, Copy, Debug)]
pub enum PipelineState<'a> {
    Graphics(&'a GraphicsPipelineBuildInfo),
    Compute(&'a ComputePipelineBuildInfo),
}

pub trait PipelineContext {
    fn is_graphics(&self) -> bool;

    fn shader_stage_mask(&self) -> ShaderStageMask;

    /// Active stages, including the implied copy shader.
    fn active_stage_count(&self) -> u32;

    /// Build info of `stage`.
    ///
    /// # Panics
    ///
    /// When `stage` does not belong to this kind of pipeline.
    fn pipeline_shader_info(&self, stage: ShaderStage) -> &PipelineShaderInfo;

    /// Merge the user-data tables of all active stages and point every stage at the result.
    ///
    /// With a single active stage the stage's own table is kept unchanged. On error the build
    /// info is left untouched.
    fn do_user_data_node_merge(&mut self) -> Result<(), MergeError>;

    /// The merged table, once a merge has run.
    fn merged_table(&self) -> Option<&MergedTable>;

    fn pipeline_state(&self) -> PipelineState<'_>;

    fn options(&self) -> &CompileOptions;
}

pub struct GraphicsContext<'a> {
    info: &'a mut GraphicsPipelineBuildInfo,
    options: &'a CompileOptions,
    activation: StageActivation,
    merged: Option<MergedTable>,
}

impl<'a> GraphicsContext<'a> {
    pub fn new(info: &'a mut GraphicsPipelineBuildInfo, options: &'a CompileOptions) -> Self {
        let activation = StageActivation::from_presence(
            ShaderStage::GRAPHICS
                .into_iter()
                .map(|stage| (stage, info.shader_info(stage).is_some_and(|s| s.is_present()))),
        );
        debug!(
            mask = %activation.stage_mask,
            active = activation.active_stage_count,
            "graphics pipeline context"
        );
        Self {
            info,
            options,
            activation,
            merged: None,
        }
    }

    pub fn activation(&self) -> StageActivation {
        self.activation
    }

    /// Give back the merged table, ending the context.
    pub fn into_merged_table(self) -> Option<MergedTable> {
        self.merged
    }
}

impl PipelineContext for GraphicsContext<'_> {
    fn is_graphics(&self) -> bool {
        true
    }

    fn shader_stage_mask(&self) -> ShaderStageMask {
        self.activation.stage_mask
    }

    fn active_stage_count(&self) -> u32 {
        self.activation.active_stage_count
    }

    fn pipeline_shader_info(&self, stage: ShaderStage) -> &PipelineShaderInfo {
        match stage {
            // The copy shader reads what the geometry stage wrote, with the same resources.
            ShaderStage::CopyShader => &self.info.gs,
            ShaderStage::Vertex => &self.info.vs,
            ShaderStage::TessControl => &self.info.tcs,
            ShaderStage::TessEval => &self.info.tes,
            ShaderStage::Geometry => &self.info.gs,
            ShaderStage::Fragment => &self.info.fs,
            ShaderStage::Compute => unreachable!("compute stage queried on a graphics pipeline"),
        }
    }

    fn do_user_data_node_merge(&mut self) -> Result<(), MergeError> {
        let mask = self.activation.stage_mask;
        if mask.is_single_stage() {
            trace!(%mask, "single active stage, keeping its user data table");
            return Ok(());
        }

        let merger = ResourceTableMerger::new(self.options.max_table_nesting_depth);
        let merged = merger.merge(
            mask.native_stages()
                .map(|stage| self.pipeline_shader_info(stage)),
        )?;

        for stage in mask.native_stages() {
            if let Some(info) = self.info.shader_info_mut(stage) {
                info.user_data_nodes = merged.nodes().clone();
                if !merged.range_values().is_empty() {
                    info.descriptor_range_values = merged.range_values().clone();
                }
            }
        }
        self.merged = Some(merged);
        Ok(())
    }

    fn merged_table(&self) -> Option<&MergedTable> {
        self.merged.as_ref()
    }

    fn pipeline_state(&self) -> PipelineState<'_> {
        PipelineState::Graphics(&*self.info)
    }

    fn options(&self) -> &CompileOptions {
        self.options
    }
}

pub struct ComputeContext<'a> {
    info: &'a mut ComputePipelineBuildInfo,
    options: &'a CompileOptions,
    activation: StageActivation,
}

impl<'a> ComputeContext<'a> {
    pub fn new(info: &'a mut ComputePipelineBuildInfo, options: &'a CompileOptions) -> Self {
        let activation =
            StageActivation::from_presence([(ShaderStage::Compute, info.cs.is_present())]);
        debug!(
            mask = %activation.stage_mask,
            workgroup_size = ?info.workgroup_size,
            "compute pipeline context"
        );
        Self {
            info,
            options,
            activation,
        }
    }
}

impl PipelineContext for ComputeContext<'_> {
    fn is_graphics(&self) -> bool {
        false
    }

    fn shader_stage_mask(&self) -> ShaderStageMask {
        self.activation.stage_mask
    }

    fn active_stage_count(&self) -> u32 {
        self.activation.active_stage_count
    }

    fn pipeline_shader_info(&self, stage: ShaderStage) -> &PipelineShaderInfo {
        match stage {
            ShaderStage::Compute => &self.info.cs,
            other => unreachable!("{other} stage queried on a compute pipeline"),
        }
    }

    fn do_user_data_node_merge(&mut self) -> Result<(), MergeError> {
        // A compute pipeline has one stage; its table is used as declared.
        Ok(())
    }

    fn merged_table(&self) -> Option<&MergedTable> {
        None
    }

    fn pipeline_state(&self) -> PipelineState<'_> {
        PipelineState::Compute(&*self.info)
    }

    fn options(&self) -> &CompileOptions {
        self.options
    }
}
