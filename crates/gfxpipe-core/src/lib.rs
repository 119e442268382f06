//! Resource-binding consolidation and hardware register configuration for shader pipelines.
//!
//! A compile runs in three sequential steps over one [`PipelineContext`]:
//!
//! 1. **Shape.** The active stage mask is mapped onto hardware roles (LS/HS/ES/GS/VS/PS/CS) by
//!    [`map_shape`]. Unsupported combinations are rejected here, before any build info changes.
//! 2. **Merge.** When more than one logical stage is active, the per-stage user-data tables are
//!    merged into one [`MergedTable`] ([`ResourceTableMerger`]); every stage's build info is then
//!    pointed at it.
//! 3. **Registers.** [`ConfigBuilder`] produces one [`RoleConfig`] per role, flattened into
//!    [`PipelineMetadata`].
//!
//! [`compile_graphics`] and [`compile_compute`] run all three. Each compile owns its context, so
//! independent pipelines can be compiled on different threads without synchronization.
#![forbid(unsafe_code)]

mod activation;
mod compile;
pub mod config;
mod context;
mod error;
mod merge;
mod options;
mod shape;

pub use activation::StageActivation;
pub use compile::{compile_compute, compile_graphics, CompiledPipeline};
pub use config::{ConfigBuilder, PipelineMetadata, RoleConfig, UserDataConfig};
pub use context::{ComputeContext, GraphicsContext, PipelineContext, PipelineState};
pub use error::{ConfigError, Result};
pub use merge::{merge_range_values, MergeError, MergeStats, MergedTable, ResourceTableMerger};
pub use options::{
    CompileOptions, GfxIpVersion, OptionsError, ENV_ALLOW_NULL_FS, ENV_GFX_IP, ENV_GS_ON_CHIP,
    ENV_MAX_TABLE_DEPTH, ENV_MAX_USER_DATA_REGS,
};
pub use shape::{map_shape, HardwareStage, MappedShape, PipelineShape};
