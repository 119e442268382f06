use gfxpipe_types::limits::INVALID_VALUE;
use gfxpipe_types::ResourceMappingNode;
use serde::Serialize;

use super::registers::user_data_base;
use crate::shape::HardwareStage;

/// Resource-addressing setup of one hardware role.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UserDataConfig {
    /// First user-data register of the role.
    pub start_reg: u32,
    /// Offset of the first node in the role's table, `0` for an empty table.
    pub base_offset: u32,
    /// `(register, user-data entry)` pairs preloaded by the command processor.
    pub entries: Vec<(u32, u32)>,
    /// One past the highest user-data dword any top-level node occupies.
    pub user_data_limit: u32,
    /// First node offset that does not fit the register window, or `INVALID_VALUE`.
    pub spill_threshold: u32,
}

impl UserDataConfig {
    /// Lay out `nodes` in the user-data window of `role`, which holds `max_regs` registers.
    pub fn build(role: HardwareStage, nodes: &[ResourceMappingNode], max_regs: u32) -> Self {
        let start_reg = user_data_base(role);
        let base_offset = nodes
            .iter()
            .map(|node| node.offset_in_dwords)
            .min()
            .unwrap_or(0);

        let mut entries = Vec::new();
        let mut user_data_limit = 0;
        let mut spill_threshold = INVALID_VALUE;
        for node in nodes {
            user_data_limit = user_data_limit.max(node.end_in_dwords());
            if node.end_in_dwords() <= max_regs {
                entries.extend(
                    (node.offset_in_dwords..node.end_in_dwords())
                        .map(|entry| (start_reg + entry, entry)),
                );
            } else {
                spill_threshold = spill_threshold.min(node.offset_in_dwords);
            }
        }
        // Overlapping nodes share registers.
        entries.sort_unstable();
        entries.dedup();

        Self {
            start_reg,
            base_offset,
            entries,
            user_data_limit,
            spill_threshold,
        }
    }

    pub fn reg_count(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn spills(&self) -> bool {
        self.spill_threshold != INVALID_VALUE
    }
}
