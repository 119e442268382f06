use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use gfxpipe_types::ShaderStage;
use serde::Serialize;

use super::roles::RoleConfig;
use crate::error::{ConfigError, Result};
use crate::shape::HardwareStage;

/// `"GPMD"` in little-endian byte order.
pub const METADATA_MAGIC: u32 = u32::from_le_bytes(*b"GPMD");
pub const METADATA_VERSION: u32 = 1;

/// Summary of one hardware role inside [`PipelineMetadata`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct HardwareStageMetadata {
    pub role: HardwareStage,
    pub stage: Option<ShaderStage>,
    pub user_data_limit: u32,
    pub spill_threshold: u32,
    pub user_data_reg_count: u32,
}

/// Flattened register state of a pipeline, ready to be written into PM4 packets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PipelineMetadata {
    pub registers: BTreeMap<u32, u32>,
    pub hardware_stages: Vec<HardwareStageMetadata>,
}

impl PipelineMetadata {
    pub fn from_roles(roles: &[RoleConfig]) -> Result<Self> {
        let mut metadata = Self::default();
        for role in roles {
            for (reg, value) in role.registers() {
                metadata.set_register(reg, value)?;
            }
            metadata.hardware_stages.push(HardwareStageMetadata {
                role: role.role,
                stage: role.stage,
                user_data_limit: role.user_data.user_data_limit,
                spill_threshold: role.user_data.spill_threshold,
                user_data_reg_count: role.user_data.reg_count(),
            });
        }
        Ok(metadata)
    }

    /// Record a register write. Rewriting the same value is allowed.
    pub fn set_register(&mut self, reg: u32, value: u32) -> Result<()> {
        match self.registers.entry(reg) {
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
            Entry::Occupied(slot) if *slot.get() == value => Ok(()),
            Entry::Occupied(slot) => Err(ConfigError::RegisterConflict {
                reg,
                first: *slot.get(),
                second: value,
            }),
        }
    }

    pub fn register(&self, reg: u32) -> Option<u32> {
        self.registers.get(&reg).copied()
    }

    /// Serialize as `magic, version, count, (reg, value)*`, every field a little-endian `u32`.
    /// Registers are written in ascending address order.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(12 + self.registers.len() * 8);
        out.extend_from_slice(&METADATA_MAGIC.to_le_bytes());
        out.extend_from_slice(&METADATA_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.registers.len() as u32).to_le_bytes());
        for (&reg, &value) in &self.registers {
            out.extend_from_slice(&reg.to_le_bytes());
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn byte_layout() {
        let mut metadata = PipelineMetadata::default();
        metadata.set_register(0xA2DB, 0x49).unwrap();
        metadata.set_register(0x2C4C, 0).unwrap();

        assert_eq!(
            metadata.to_le_bytes(),
            vec![
                b'G', b'P', b'M', b'D', //
                1, 0, 0, 0, //
                2, 0, 0, 0, //
                0x4C, 0x2C, 0, 0, //
                0, 0, 0, 0, //
                0xDB, 0xA2, 0, 0, //
                0x49, 0, 0, 0,
            ]
        );
    }

    #[test]
    fn conflicting_writes_are_rejected() {
        let mut metadata = PipelineMetadata::default();
        metadata.set_register(0xA290, 3).unwrap();
        metadata.set_register(0xA290, 3).unwrap();
        assert_eq!(
            metadata.set_register(0xA290, 4).unwrap_err(),
            ConfigError::RegisterConflict {
                reg: 0xA290,
                first: 3,
                second: 4
            }
        );
        assert_eq!(metadata.register(0xA290), Some(3));
        assert_eq!(metadata.register(0xA291), None);
    }
}
