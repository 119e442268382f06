use gfxpipe_types::ShaderStageMask;
use thiserror::Error;

use crate::merge::MergeError;
use crate::options::GfxIpVersion;
use crate::shape::HardwareStage;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Failure to compile one pipeline. Nothing from a failed compile is exposed to later stages.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("unsupported shader stage combination {0}")]
    UnsupportedStageMask(ShaderStageMask),

    #[error("unsupported GFX IP version {0} for register configuration")]
    UnsupportedGfxIp(GfxIpVersion),

    #[error("invalid fixed-function state for {role:?}: {field}={value}")]
    InvalidFixedFunctionState {
        role: HardwareStage,
        field: &'static str,
        value: u32,
    },

    #[error(
        "register {reg:#06x} written with conflicting values {first:#010x} and {second:#010x}"
    )]
    RegisterConflict { reg: u32, first: u32, second: u32 },
}
