//! Hardware register configuration.
//!
//! [`ConfigBuilder`] walks the roles of a [`MappedShape`] in execution order and produces one
//! [`RoleConfig`] per role: the role's user-data layout plus its fixed-function registers. Roles
//! only interact through the shared merged table, so each role is built independently.

mod metadata;
pub mod registers;
mod roles;
mod user_data;

pub use metadata::{HardwareStageMetadata, PipelineMetadata, METADATA_MAGIC, METADATA_VERSION};
pub use roles::{
    CsRegConfig, EsRegConfig, FixedFunctionConfig, GsRegConfig, HsRegConfig, LsRegConfig,
    PsRegConfig, RoleConfig, StreamOutRegs, VsRegConfig,
};
pub use user_data::UserDataConfig;

use gfxpipe_types::{ResourceMappingNode, ShaderStage};
use tracing::debug;

use crate::context::{PipelineContext, PipelineState};
use crate::error::{ConfigError, Result};
use crate::shape::{HardwareStage, MappedShape};

/// GFX IP majors whose register layout this builder emits.
const SUPPORTED_GFX_MAJOR: std::ops::RangeInclusive<u32> = 6..=8;

pub struct ConfigBuilder<'a> {
    ctx: &'a dyn PipelineContext,
    mapped: MappedShape,
    gs_on_chip: bool,
}

impl<'a> ConfigBuilder<'a> {
    pub fn new(ctx: &'a dyn PipelineContext, mapped: MappedShape) -> Result<Self> {
        let options = ctx.options();
        if !SUPPORTED_GFX_MAJOR.contains(&options.gfx_ip.major) {
            return Err(ConfigError::UnsupportedGfxIp(options.gfx_ip));
        }
        if ctx.is_graphics() != mapped.shape.is_graphics() {
            return Err(ConfigError::UnsupportedStageMask(ctx.shader_stage_mask()));
        }

        let mut gs_on_chip = options.gs_on_chip;
        if gs_on_chip && !options.gfx_ip.supports_on_chip_gs() {
            debug!(gfx_ip = %options.gfx_ip, "on-chip GS not supported, using off-chip rings");
            gs_on_chip = false;
        }

        Ok(Self {
            ctx,
            mapped,
            gs_on_chip,
        })
    }

    /// Build every role of the shape, in hardware execution order.
    pub fn build(&self) -> Result<Vec<RoleConfig>> {
        self.mapped
            .roles()
            .map(|(role, stage)| self.build_role(role, stage))
            .collect()
    }

    fn build_role(&self, role: HardwareStage, stage: Option<ShaderStage>) -> Result<RoleConfig> {
        let max_regs = self.ctx.options().max_user_data_regs;
        let user_data = UserDataConfig::build(role, self.user_data_nodes(stage), max_regs);
        let fixed_function = self.fixed_function(role, stage)?;

        debug!(
            %role,
            stage = stage.map(ShaderStage::name).unwrap_or("null"),
            user_data_regs = user_data.reg_count(),
            user_data_limit = user_data.user_data_limit,
            spills = user_data.spills(),
            "built hardware stage config"
        );
        Ok(RoleConfig::new(role, stage, user_data, fixed_function))
    }

    /// Table a role addresses: the merged one if a merge ran, the stage's own otherwise.
    fn user_data_nodes(&self, stage: Option<ShaderStage>) -> &[ResourceMappingNode] {
        let Some(stage) = stage else {
            return &[];
        };
        match self.ctx.merged_table() {
            Some(merged) => &merged.nodes()[..],
            None => &self.ctx.pipeline_shader_info(stage).user_data_nodes[..],
        }
    }

    fn fixed_function(
        &self,
        role: HardwareStage,
        stage: Option<ShaderStage>,
    ) -> Result<FixedFunctionConfig> {
        let shape = self.mapped.shape;
        let mismatch = || ConfigError::UnsupportedStageMask(self.ctx.shader_stage_mask());

        let config = match (self.ctx.pipeline_state(), role) {
            (PipelineState::Compute(info), HardwareStage::Cs) => {
                FixedFunctionConfig::Cs(CsRegConfig::build(info)?)
            }
            (PipelineState::Compute(_), _) | (PipelineState::Graphics(_), HardwareStage::Cs) => {
                return Err(mismatch());
            }
            (PipelineState::Graphics(info), HardwareStage::Ls) => FixedFunctionConfig::Ls(
                LsRegConfig::build(&info.input_assembly, &info.tessellation)?,
            ),
            (PipelineState::Graphics(info), HardwareStage::Hs) => {
                FixedFunctionConfig::Hs(HsRegConfig::build(&info.tessellation))
            }
            (PipelineState::Graphics(info), HardwareStage::Es) => {
                FixedFunctionConfig::Es(EsRegConfig::build(&info.geometry))
            }
            (PipelineState::Graphics(info), HardwareStage::Gs) => {
                FixedFunctionConfig::Gs(GsRegConfig::build(&info.geometry, self.gs_on_chip)?)
            }
            (PipelineState::Graphics(info), HardwareStage::Vs) => {
                let rasterized_stream = if shape.has_geometry() {
                    info.geometry.rasterized_stream
                } else {
                    0
                };
                FixedFunctionConfig::Vs(VsRegConfig::build(
                    &info.vertex_output,
                    &info.stream_out,
                    rasterized_stream,
                ))
            }
            (PipelineState::Graphics(info), HardwareStage::Ps) => match stage {
                Some(_) => FixedFunctionConfig::Ps(PsRegConfig::build(&info.fragment)?),
                None => FixedFunctionConfig::Ps(PsRegConfig::null()),
            },
        };
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ComputeContext, GraphicsContext};
    use crate::options::{CompileOptions, GfxIpVersion};
    use crate::shape::{map_shape, PipelineShape};
    use gfxpipe_types::limits::INVALID_VALUE;
    use gfxpipe_types::{
        ComputePipelineBuildInfo, DescriptorType, GraphicsPipelineBuildInfo, PipelineShaderInfo,
    };
    use pretty_assertions::assert_eq;

    fn push(offset: u32, size: u32) -> ResourceMappingNode {
        ResourceMappingNode::push_const(offset, size, 0, 0)
    }

    #[test]
    fn unmerged_roles_use_their_own_tables() {
        let mut info = GraphicsPipelineBuildInfo {
            vs: PipelineShaderInfo::with_nodes(vec![push(0, 2)]),
            ..Default::default()
        };
        let options = CompileOptions::default();
        let ctx = GraphicsContext::new(&mut info, &options);
        let mapped = map_shape(ctx.shader_stage_mask(), &options).unwrap();

        let roles = ConfigBuilder::new(&ctx, mapped).unwrap().build().unwrap();
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[0].role, HardwareStage::Vs);
        assert_eq!(roles[0].user_data.reg_count(), 2);
        assert_eq!(roles[1].stage, None);
        assert!(roles[1].user_data.entries.is_empty());
        assert_eq!(roles[1].user_data.user_data_limit, 0);
        assert_eq!(
            roles[1].fixed_function,
            FixedFunctionConfig::Ps(PsRegConfig::null())
        );
    }

    #[test]
    fn merged_roles_share_one_layout() {
        let mut info = GraphicsPipelineBuildInfo {
            vs: PipelineShaderInfo::with_nodes(vec![push(0, 4)]),
            tcs: PipelineShaderInfo::with_nodes(vec![push(0, 4)]),
            tes: PipelineShaderInfo::with_nodes(vec![ResourceMappingNode::descriptor(
                DescriptorType::Buffer,
                4,
                4,
                0,
                1,
            )]),
            fs: PipelineShaderInfo::with_nodes(vec![ResourceMappingNode::descriptor(
                DescriptorType::Resource,
                8,
                8,
                1,
                0,
            )]),
            ..Default::default()
        };
        let options = CompileOptions {
            max_user_data_regs: 12,
            ..CompileOptions::default()
        };
        let mut ctx = GraphicsContext::new(&mut info, &options);
        ctx.do_user_data_node_merge().unwrap();
        let mapped = map_shape(ctx.shader_stage_mask(), &options).unwrap();
        assert_eq!(mapped.shape, PipelineShape::VsTsFs);

        let roles = ConfigBuilder::new(&ctx, mapped).unwrap().build().unwrap();
        let order: Vec<HardwareStage> = roles.iter().map(|r| r.role).collect();
        assert_eq!(
            order,
            vec![
                HardwareStage::Ls,
                HardwareStage::Hs,
                HardwareStage::Vs,
                HardwareStage::Ps
            ]
        );
        for role in &roles {
            assert_eq!(role.user_data.user_data_limit, 16);
            assert_eq!(role.user_data.spill_threshold, 8);
            assert_eq!(role.user_data.reg_count(), 8);
        }
    }

    #[test]
    fn gfx_ip_gates_the_builder() {
        let mut info = ComputePipelineBuildInfo {
            cs: PipelineShaderInfo::with_nodes(vec![push(0, 1)]),
            ..Default::default()
        };
        let options = CompileOptions {
            gfx_ip: GfxIpVersion::new(10, 1, 0),
            ..CompileOptions::default()
        };
        let ctx = ComputeContext::new(&mut info, &options);
        let mapped = map_shape(ctx.shader_stage_mask(), &options).unwrap();
        assert_eq!(
            ConfigBuilder::new(&ctx, mapped).err(),
            Some(ConfigError::UnsupportedGfxIp(GfxIpVersion::new(10, 1, 0)))
        );
    }

    #[test]
    fn shape_must_match_pipeline_kind() {
        let mut info = ComputePipelineBuildInfo {
            cs: PipelineShaderInfo::with_nodes(vec![push(0, 1)]),
            ..Default::default()
        };
        let options = CompileOptions::default();
        let ctx = ComputeContext::new(&mut info, &options);
        let graphics = MappedShape {
            shape: PipelineShape::VsFs,
            null_fragment: false,
        };
        assert!(matches!(
            ConfigBuilder::new(&ctx, graphics),
            Err(ConfigError::UnsupportedStageMask(_))
        ));
    }

    #[test]
    fn on_chip_gs_needs_gfx7() {
        let mut info = GraphicsPipelineBuildInfo {
            vs: PipelineShaderInfo::with_nodes(vec![push(0, 1)]),
            gs: PipelineShaderInfo::with_nodes(vec![push(0, 1)]),
            fs: PipelineShaderInfo::with_nodes(vec![push(0, 1)]),
            ..Default::default()
        };
        for (gfx_ip, expect_on_chip) in [
            (GfxIpVersion::new(6, 0, 0), false),
            (GfxIpVersion::new(7, 0, 0), true),
        ] {
            let options = CompileOptions {
                gfx_ip,
                gs_on_chip: true,
                ..CompileOptions::default()
            };
            let ctx = GraphicsContext::new(&mut info, &options);
            let mapped = map_shape(ctx.shader_stage_mask(), &options).unwrap();
            let roles = ConfigBuilder::new(&ctx, mapped).unwrap().build().unwrap();
            let gs = roles
                .iter()
                .find_map(|r| match &r.fixed_function {
                    FixedFunctionConfig::Gs(gs) => Some(*gs),
                    _ => None,
                })
                .unwrap();
            assert_eq!(gs.gs_mode & (3 << 21) != 0, expect_on_chip, "{gfx_ip}");
            assert_eq!(roles[0].user_data.spill_threshold, INVALID_VALUE);
        }
    }
}
