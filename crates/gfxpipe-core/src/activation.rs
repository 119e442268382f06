use gfxpipe_types::{ShaderStage, ShaderStageMask};

/// Which logical stages a pipeline runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StageActivation {
    pub stage_mask: ShaderStageMask,
    /// Number of active stages, counting the implied copy shader.
    pub active_stage_count: u32,
}

impl StageActivation {
    /// A stage is active iff its module is present. An active geometry stage also activates the
    /// copy shader, since GS output only reaches the rasterizer through it.
    pub fn from_presence(presence: impl IntoIterator<Item = (ShaderStage, bool)>) -> Self {
        let mut activation = Self::default();
        for (stage, present) in presence {
            if !present {
                continue;
            }
            activation.activate(stage);
            if stage == ShaderStage::Geometry {
                activation.activate(ShaderStage::CopyShader);
            }
        }
        activation
    }

    fn activate(&mut self, stage: ShaderStage) {
        if !self.stage_mask.contains_stage(stage) {
            self.stage_mask |= stage.mask();
            self.active_stage_count += 1;
        }
    }

    pub fn is_active(&self, stage: ShaderStage) -> bool {
        self.stage_mask.contains_stage(stage)
    }
}
