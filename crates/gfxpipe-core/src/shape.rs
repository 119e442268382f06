//! Mapping of logical stage masks onto hardware stage roles.

use std::fmt;

use gfxpipe_types::{ShaderStage, ShaderStageMask};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::options::CompileOptions;

/// Fixed hardware shader slot, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HardwareStage {
    Ls,
    Hs,
    Es,
    Gs,
    Vs,
    Ps,
    Cs,
}

impl HardwareStage {
    pub const ALL: [HardwareStage; 7] = [
        HardwareStage::Ls,
        HardwareStage::Hs,
        HardwareStage::Es,
        HardwareStage::Gs,
        HardwareStage::Vs,
        HardwareStage::Ps,
        HardwareStage::Cs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HardwareStage::Ls => "LS",
            HardwareStage::Hs => "HS",
            HardwareStage::Es => "ES",
            HardwareStage::Gs => "GS",
            HardwareStage::Vs => "VS",
            HardwareStage::Ps => "PS",
            HardwareStage::Cs => "CS",
        }
    }
}

impl fmt::Display for HardwareStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Supported combinations of logical stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineShape {
    VsFs,
    VsTsFs,
    VsGsFs,
    VsTsGsFs,
    Cs,
}

impl PipelineShape {
    /// `(role, logical stage)` pairs in hardware execution order.
    pub fn role_map(self) -> &'static [(HardwareStage, ShaderStage)] {
        use HardwareStage as H;
        use ShaderStage as S;
        match self {
            PipelineShape::VsFs => &[(H::Vs, S::Vertex), (H::Ps, S::Fragment)],
            PipelineShape::VsTsFs => &[
                (H::Ls, S::Vertex),
                (H::Hs, S::TessControl),
                (H::Vs, S::TessEval),
                (H::Ps, S::Fragment),
            ],
            PipelineShape::VsGsFs => &[
                (H::Es, S::Vertex),
                (H::Gs, S::Geometry),
                (H::Vs, S::CopyShader),
                (H::Ps, S::Fragment),
            ],
            PipelineShape::VsTsGsFs => &[
                (H::Ls, S::Vertex),
                (H::Hs, S::TessControl),
                (H::Es, S::TessEval),
                (H::Gs, S::Geometry),
                (H::Vs, S::CopyShader),
                (H::Ps, S::Fragment),
            ],
            PipelineShape::Cs => &[(H::Cs, S::Compute)],
        }
    }

    pub fn is_graphics(self) -> bool {
        self != PipelineShape::Cs
    }

    pub fn has_tessellation(self) -> bool {
        matches!(self, PipelineShape::VsTsFs | PipelineShape::VsTsGsFs)
    }

    pub fn has_geometry(self) -> bool {
        matches!(self, PipelineShape::VsGsFs | PipelineShape::VsTsGsFs)
    }
}

/// A shape plus whether its PS role runs without a fragment shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MappedShape {
    pub shape: PipelineShape,
    pub null_fragment: bool,
}

impl MappedShape {
    /// Roles in execution order. The logical stage is `None` for a null PS role.
    pub fn roles(&self) -> impl Iterator<Item = (HardwareStage, Option<ShaderStage>)> + '_ {
        self.shape.role_map().iter().map(move |&(role, stage)| {
            if self.null_fragment && stage == ShaderStage::Fragment {
                (role, None)
            } else {
                (role, Some(stage))
            }
        })
    }

    /// Logical stage executed by `role`, if the shape uses that role with a real shader.
    pub fn stage_for(&self, role: HardwareStage) -> Option<ShaderStage> {
        self.roles()
            .find(|&(r, _)| r == role)
            .and_then(|(_, stage)| stage)
    }
}

/// Pick the shape for `mask`, rejecting combinations the hardware layout does not cover.
pub fn map_shape(mask: ShaderStageMask, options: &CompileOptions) -> Result<MappedShape> {
    let unsupported = || ConfigError::UnsupportedStageMask(mask);

    if mask == ShaderStageMask::COMPUTE {
        return Ok(MappedShape {
            shape: PipelineShape::Cs,
            null_fragment: false,
        });
    }
    if mask.is_empty()
        || mask.contains(ShaderStageMask::COMPUTE)
        || !mask.contains(ShaderStageMask::VERTEX)
    {
        return Err(unsupported());
    }

    let tcs = mask.contains(ShaderStageMask::TESS_CONTROL);
    let tes = mask.contains(ShaderStageMask::TESS_EVAL);
    let gs = mask.contains(ShaderStageMask::GEOMETRY);
    let fs = mask.contains(ShaderStageMask::FRAGMENT);
    if gs != mask.contains(ShaderStageMask::COPY_SHADER) {
        return Err(unsupported());
    }

    let shape = match (tcs, tes, gs) {
        (false, false, false) => PipelineShape::VsFs,
        (true, true, false) => PipelineShape::VsTsFs,
        (false, false, true) => PipelineShape::VsGsFs,
        (true, true, true) => PipelineShape::VsTsGsFs,
        (true, false, _) | (false, true, _) => return Err(unsupported()),
    };

    if !fs && !options.allow_null_fragment {
        return Err(unsupported());
    }

    debug!(%mask, ?shape, null_fragment = !fs, "mapped pipeline shape");
    Ok(MappedShape {
        shape,
        null_fragment: !fs,
    })
}
