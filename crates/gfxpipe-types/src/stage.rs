use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Logical shader stage, as authored.
///
/// `CopyShader` is synthetic: it never owns build info and only exists because geometry output is
/// written to memory and must be copied back into the rasterizer path by a separate hardware stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum ShaderStage {
    Vertex = 0,
    TessControl = 1,
    TessEval = 2,
    Geometry = 3,
    Fragment = 4,
    Compute = 5,
    CopyShader = 6,
}

impl ShaderStage {
    /// Graphics stages that carry their own build info, in pipeline order.
    pub const GRAPHICS: [ShaderStage; 5] = [
        ShaderStage::Vertex,
        ShaderStage::TessControl,
        ShaderStage::TessEval,
        ShaderStage::Geometry,
        ShaderStage::Fragment,
    ];

    /// Every stage that can carry build info (everything except the copy shader).
    pub const NATIVE: [ShaderStage; 6] = [
        ShaderStage::Vertex,
        ShaderStage::TessControl,
        ShaderStage::TessEval,
        ShaderStage::Geometry,
        ShaderStage::Fragment,
        ShaderStage::Compute,
    ];

    pub const ALL: [ShaderStage; 7] = [
        ShaderStage::Vertex,
        ShaderStage::TessControl,
        ShaderStage::TessEval,
        ShaderStage::Geometry,
        ShaderStage::Fragment,
        ShaderStage::Compute,
        ShaderStage::CopyShader,
    ];

    pub fn mask(self) -> ShaderStageMask {
        ShaderStageMask::from_bits_retain(1 << self as u32)
    }

    pub fn is_graphics(self) -> bool {
        !matches!(self, ShaderStage::Compute)
    }

    pub fn is_native(self) -> bool {
        !matches!(self, ShaderStage::CopyShader)
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::TessControl => "tess_control",
            ShaderStage::TessEval => "tess_eval",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
            ShaderStage::CopyShader => "copy_shader",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Set of active logical stages. Bit `n` corresponds to `ShaderStage as u32 == n`.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ShaderStageMask: u32 {
        const VERTEX = 1 << 0;
        const TESS_CONTROL = 1 << 1;
        const TESS_EVAL = 1 << 2;
        const GEOMETRY = 1 << 3;
        const FRAGMENT = 1 << 4;
        const COMPUTE = 1 << 5;
        const COPY_SHADER = 1 << 6;
    }
}

impl ShaderStageMask {
    pub fn contains_stage(self, stage: ShaderStage) -> bool {
        self.contains(stage.mask())
    }

    /// Active stages in pipeline order.
    pub fn stages(self) -> impl Iterator<Item = ShaderStage> {
        ShaderStage::ALL
            .into_iter()
            .filter(move |stage| self.contains_stage(*stage))
    }

    /// Active stages that own build info (the copy shader is skipped).
    pub fn native_stages(self) -> impl Iterator<Item = ShaderStage> {
        self.stages().filter(|stage| stage.is_native())
    }

    pub fn stage_count(self) -> u32 {
        self.bits().count_ones()
    }

    /// True when at most one stage is active, i.e. there is nothing to merge.
    pub fn is_single_stage(self) -> bool {
        self.bits().is_power_of_two() || self.is_empty()
    }
}

impl fmt::Display for ShaderStageMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("(none)");
        }
        let mut first = true;
        for stage in self.stages() {
            if !first {
                f.write_str("|")?;
            }
            first = false;
            f.write_str(stage.name())?;
        }
        Ok(())
    }
}
