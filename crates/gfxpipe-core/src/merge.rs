//! Cross-stage consolidation of user-data tables.
//!
//! Every active stage of a pipeline declares its own resource-mapping table. Once stages share a
//! single addressing scheme, those tables must be folded into one:
//! - nodes are sorted by `offset_in_dwords` and each run of equal offsets ("duplicate block") is
//!   collapsed into one node after checking that the declarations agree,
//! - duplicate descriptor-table pointers have their nested tables merged recursively by the same
//!   rules,
//! - immutable descriptor values are sorted by `(set, binding)` and collapsed the same way.
//!
//! Any disagreement is a [`MergeError`]; a partially merged table is never returned.

use std::sync::Arc;

use gfxpipe_types::{
    DescriptorBinding, DescriptorRangeValue, DescriptorType, NodeData, NodeTable,
    PipelineShaderInfo, RangeValueTable, ResourceMappingNode, ResourceMappingNodeType,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("user data merge conflict at offset {offset}: node type {first:?} vs {other:?}")]
    TypeMismatch {
        offset: u32,
        first: ResourceMappingNodeType,
        other: ResourceMappingNodeType,
    },

    #[error("user data merge conflict at offset {offset}: size {first} vs {other} dwords")]
    SizeMismatch { offset: u32, first: u32, other: u32 },

    #[error("user data merge conflict at offset {offset}: binding {first} vs {other}")]
    BindingMismatch {
        offset: u32,
        first: DescriptorBinding,
        other: DescriptorBinding,
    },

    #[error(
        "user data merge conflict at offset {offset}: pointed table size {first} vs {other} dwords"
    )]
    TableSizeMismatch { offset: u32, first: u32, other: u32 },

    #[error("user data merge conflict at offset {offset}: multiple indirect user data producers")]
    MultipleIndirectTables { offset: u32 },

    #[error("user data merge conflict at offset {offset}: multiple stream-out producers")]
    MultipleStreamOutTables { offset: u32 },

    #[error("descriptor table at offset {offset} nests deeper than {max} levels")]
    NestingTooDeep { offset: u32, max: u32 },

    #[error(
        "descriptor range value merge conflict at set {set} binding {binding}: type {first:?} vs {other:?}"
    )]
    RangeTypeMismatch {
        set: u32,
        binding: u32,
        first: DescriptorType,
        other: DescriptorType,
    },

    #[error(
        "descriptor range value merge conflict at set {set} binding {binding}: array size {first} vs {other}"
    )]
    RangeArraySizeMismatch {
        set: u32,
        binding: u32,
        first: u32,
        other: u32,
    },

    #[error("descriptor range value merge conflict at set {set} binding {binding}: value")]
    RangeValueMismatch { set: u32, binding: u32 },
}

/// Counters describing one merge, mostly for logging and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub input_nodes: usize,
    /// Runs of more than one node sharing an offset, at any nesting level.
    pub duplicate_blocks: usize,
    /// Nested tables produced by recursive merges.
    pub nested_tables: usize,
    pub input_range_values: usize,
}

/// The consolidated table shared by every active stage of one compile.
#[derive(Clone, Debug, Serialize)]
pub struct MergedTable {
    nodes: NodeTable,
    range_values: RangeValueTable,
    stats: MergeStats,
}

impl MergedTable {
    /// Offset-sorted nodes with distinct offsets.
    pub fn nodes(&self) -> &NodeTable {
        &self.nodes
    }

    /// `(set, binding)`-sorted range values with distinct keys.
    pub fn range_values(&self) -> &RangeValueTable {
        &self.range_values
    }

    pub fn stats(&self) -> MergeStats {
        self.stats
    }
}

/// Merges the user-data tables of several stages.
///
/// A merger is single-use: it accumulates [`MergeStats`] while walking the tables.
#[derive(Debug)]
pub struct ResourceTableMerger {
    max_depth: u32,
    stats: MergeStats,
}

impl ResourceTableMerger {
    pub fn new(max_depth: u32) -> Self {
        Self {
            max_depth,
            stats: MergeStats::default(),
        }
    }

    /// Merge the node and range-value tables of `stages`.
    ///
    /// Callers pass only native stages; the copy shader shares the geometry stage's table and
    /// must not be counted twice.
    pub fn merge<'a>(
        mut self,
        stages: impl IntoIterator<Item = &'a PipelineShaderInfo>,
    ) -> Result<MergedTable, MergeError> {
        let mut all_nodes = Vec::new();
        let mut all_range_values = Vec::new();
        for info in stages {
            all_nodes.extend(info.user_data_nodes.iter().cloned());
            all_range_values.extend(info.descriptor_range_values.iter().cloned());
        }
        self.stats.input_nodes = all_nodes.len();
        self.stats.input_range_values = all_range_values.len();

        let nodes = self.merge_node_table(all_nodes, 0)?;
        let range_values: RangeValueTable = merge_range_values(all_range_values)?.into();

        debug!(
            input_nodes = self.stats.input_nodes,
            merged_nodes = nodes.len(),
            duplicate_blocks = self.stats.duplicate_blocks,
            nested_tables = self.stats.nested_tables,
            input_range_values = self.stats.input_range_values,
            merged_range_values = range_values.len(),
            "merged user data tables"
        );

        Ok(MergedTable {
            nodes,
            range_values,
            stats: self.stats,
        })
    }

    /// Sort and merge one (possibly nested) node table.
    pub fn merge_nodes(
        &mut self,
        nodes: Vec<ResourceMappingNode>,
    ) -> Result<NodeTable, MergeError> {
        self.merge_node_table(nodes, 0)
    }

    pub fn stats(&self) -> MergeStats {
        self.stats
    }

    fn merge_node_table(
        &mut self,
        mut nodes: Vec<ResourceMappingNode>,
        depth: u32,
    ) -> Result<NodeTable, MergeError> {
        // Stable, so "first occurrence" inside a duplicate block follows stage order.
        nodes.sort_by_key(|node| node.offset_in_dwords);

        let mut merged = Vec::with_capacity(nodes.len());
        for block in nodes.chunk_by(|a, b| a.offset_in_dwords == b.offset_in_dwords) {
            let first = &block[0];
            if block.len() == 1 {
                merged.push(first.clone());
                continue;
            }

            self.stats.duplicate_blocks += 1;
            check_duplicate_block(block)?;
            trace!(
                offset = first.offset_in_dwords,
                count = block.len(),
                ty = ?first.node_type(),
                depth,
                "merging duplicate user data block"
            );

            let NodeData::DescriptorTable { .. } = first.data else {
                merged.push(first.clone());
                continue;
            };

            if depth >= self.max_depth {
                return Err(MergeError::NestingTooDeep {
                    offset: first.offset_in_dwords,
                    max: self.max_depth,
                });
            }

            // Merge the inner tables of every duplicate, not just the first one.
            let inner: Vec<ResourceMappingNode> = block
                .iter()
                .filter_map(|node| node.children())
                .flat_map(|children| children.iter().cloned())
                .collect();
            let children = self.merge_node_table(inner, depth + 1)?;
            self.stats.nested_tables += 1;

            merged.push(ResourceMappingNode {
                data: NodeData::DescriptorTable { children },
                ..first.clone()
            });
        }

        Ok(Arc::from(merged))
    }
}

/// Validate that every node of a duplicate block agrees with the first one.
fn check_duplicate_block(block: &[ResourceMappingNode]) -> Result<(), MergeError> {
    let first = &block[0];
    let offset = first.offset_in_dwords;
    let first_ty = first.node_type();

    for other in &block[1..] {
        let other_ty = other.node_type();
        if other_ty != first_ty {
            return Err(MergeError::TypeMismatch {
                offset,
                first: first_ty,
                other: other_ty,
            });
        }
        if other.size_in_dwords != first.size_in_dwords {
            return Err(MergeError::SizeMismatch {
                offset,
                first: first.size_in_dwords,
                other: other.size_in_dwords,
            });
        }
    }

    // The hardware has a single producer slot for these tables.
    match first_ty {
        ResourceMappingNodeType::IndirectUserDataVaPtr => {
            return Err(MergeError::MultipleIndirectTables { offset });
        }
        ResourceMappingNodeType::StreamOutTableVaPtr => {
            return Err(MergeError::MultipleStreamOutTables { offset });
        }
        _ => {}
    }

    for other in &block[1..] {
        if let (Some(a), Some(b)) = (first.binding(), other.binding()) {
            if a != b {
                return Err(MergeError::BindingMismatch {
                    offset,
                    first: a,
                    other: b,
                });
            }
        }
        if let (Some(a), Some(b)) = (first.pointed_table_dwords(), other.pointed_table_dwords()) {
            if a != b {
                return Err(MergeError::TableSizeMismatch {
                    offset,
                    first: a,
                    other: b,
                });
            }
        }
    }

    Ok(())
}

/// Sort range values by `(set, binding)` and collapse duplicates.
pub fn merge_range_values(
    mut values: Vec<DescriptorRangeValue>,
) -> Result<Vec<DescriptorRangeValue>, MergeError> {
    values.sort_by_key(DescriptorRangeValue::key);

    let mut merged = Vec::with_capacity(values.len());
    for block in values.chunk_by(|a, b| a.key() == b.key()) {
        let first = &block[0];
        for other in &block[1..] {
            if other.ty != first.ty {
                return Err(MergeError::RangeTypeMismatch {
                    set: first.set,
                    binding: first.binding,
                    first: first.ty,
                    other: other.ty,
                });
            }
            if other.array_size != first.array_size {
                return Err(MergeError::RangeArraySizeMismatch {
                    set: first.set,
                    binding: first.binding,
                    first: first.array_size,
                    other: other.array_size,
                });
            }
            if other.payload() != first.payload() {
                return Err(MergeError::RangeValueMismatch {
                    set: first.set,
                    binding: first.binding,
                });
            }
        }
        merged.push(first.clone());
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gfxpipe_types::limits::MAX_TABLE_NESTING_DEPTH;
    use pretty_assertions::assert_eq;

    fn merger() -> ResourceTableMerger {
        ResourceTableMerger::new(MAX_TABLE_NESTING_DEPTH)
    }

    fn stage(nodes: Vec<ResourceMappingNode>) -> PipelineShaderInfo {
        PipelineShaderInfo::with_nodes(nodes)
    }

    fn resource(offset: u32, size: u32, set: u32, binding: u32) -> ResourceMappingNode {
        ResourceMappingNode::descriptor(DescriptorType::Resource, offset, size, set, binding)
    }

    fn sampler_value(set: u32, binding: u32, value: Vec<u32>) -> DescriptorRangeValue {
        DescriptorRangeValue::new(set, binding, DescriptorType::Sampler, value)
    }

    #[test]
    fn disjoint_tables_are_sorted_by_offset() {
        let vs = stage(vec![resource(4, 4, 0, 1), ResourceMappingNode::push_const(0, 4, 0, 0)]);
        let fs = stage(vec![resource(8, 8, 1, 0)]);

        let merged = merger().merge([&vs, &fs]).unwrap();
        let offsets: Vec<u32> = merged.nodes().iter().map(|n| n.offset_in_dwords).collect();
        assert_eq!(offsets, vec![0, 4, 8]);
        assert_eq!(merged.stats().duplicate_blocks, 0);
        assert_eq!(merged.stats().input_nodes, 3);
    }

    #[test]
    fn shared_push_constants_collapse_to_one_node() {
        let push = ResourceMappingNode::push_const(0, 4, 0, 0);
        let vs = stage(vec![push.clone(), resource(4, 8, 0, 1)]);
        let fs = stage(vec![push.clone()]);

        let merged = merger().merge([&vs, &fs]).unwrap();
        assert_eq!(&merged.nodes()[..], &[push, resource(4, 8, 0, 1)]);
        assert_eq!(merged.stats().duplicate_blocks, 1);
    }

    #[test]
    fn duplicate_tables_merge_children_of_every_duplicate() {
        let vs = stage(vec![ResourceMappingNode::table(0, vec![resource(0, 8, 0, 0)])]);
        let fs = stage(vec![ResourceMappingNode::table(0, vec![resource(8, 4, 0, 1)])]);

        let merged = merger().merge([&vs, &fs]).unwrap();
        assert_eq!(merged.nodes().len(), 1);
        let children = merged.nodes()[0].children().unwrap();
        assert_eq!(&children[..], &[resource(0, 8, 0, 0), resource(8, 4, 0, 1)]);
        assert_eq!(merged.stats().nested_tables, 1);
    }

    #[test]
    fn nested_tables_merge_recursively() {
        let inner_a = ResourceMappingNode::table(2, vec![resource(0, 4, 1, 0)]);
        let inner_b = ResourceMappingNode::table(2, vec![resource(4, 4, 1, 1), resource(0, 4, 1, 0)]);
        let vs = stage(vec![ResourceMappingNode::table(0, vec![inner_a])]);
        let tcs = stage(vec![ResourceMappingNode::table(0, vec![inner_b])]);

        let merged = merger().merge([&vs, &tcs]).unwrap();
        let level1 = merged.nodes()[0].children().unwrap();
        assert_eq!(level1.len(), 1);
        let level2 = level1[0].children().unwrap();
        assert_eq!(&level2[..], &[resource(0, 4, 1, 0), resource(4, 4, 1, 1)]);
        assert_eq!(merged.stats().nested_tables, 2);
    }

    #[test]
    fn size_mismatch_is_a_conflict() {
        let vs = stage(vec![resource(0, 4, 0, 0)]);
        let fs = stage(vec![resource(0, 8, 0, 0)]);
        let err = merger().merge([&vs, &fs]).unwrap_err();
        assert_eq!(
            err,
            MergeError::SizeMismatch {
                offset: 0,
                first: 4,
                other: 8
            }
        );
    }

    #[test]
    fn table_pointer_against_descriptor_is_a_type_conflict() {
        let vs = stage(vec![ResourceMappingNode::table(0, vec![resource(0, 4, 0, 0)])]);
        let fs = stage(vec![resource(0, 1, 0, 0)]);
        let err = merger().merge([&vs, &fs]).unwrap_err();
        assert!(matches!(err, MergeError::TypeMismatch { offset: 0, .. }), "{err:?}");
    }

    #[test]
    fn binding_mismatch_is_a_conflict() {
        let vs = stage(vec![resource(4, 4, 0, 0)]);
        let fs = stage(vec![resource(4, 4, 0, 1)]);
        let err = merger().merge([&vs, &fs]).unwrap_err();
        assert_eq!(
            err,
            MergeError::BindingMismatch {
                offset: 4,
                first: DescriptorBinding::new(0, 0),
                other: DescriptorBinding::new(0, 1),
            }
        );
    }

    #[test]
    fn single_producer_tables_cannot_be_shared() {
        let vs = stage(vec![ResourceMappingNode::indirect_table(2, 16)]);
        let gs = stage(vec![ResourceMappingNode::indirect_table(2, 16)]);
        assert_eq!(
            merger().merge([&vs, &gs]).unwrap_err(),
            MergeError::MultipleIndirectTables { offset: 2 }
        );

        let vs = stage(vec![ResourceMappingNode::stream_out_table(8, 4)]);
        let gs = stage(vec![ResourceMappingNode::stream_out_table(8, 4)]);
        let err = merger().merge([&vs, &gs]).unwrap_err();
        assert_eq!(err, MergeError::MultipleStreamOutTables { offset: 8 });
        assert!(err.to_string().contains("multiple stream-out producers"));
    }

    #[test]
    fn vertex_buffer_tables_must_agree_on_size() {
        let vs = stage(vec![ResourceMappingNode::vertex_buffer_table(1, 64)]);
        let tes = stage(vec![ResourceMappingNode::vertex_buffer_table(1, 64)]);
        assert_eq!(merger().merge([&vs, &tes]).unwrap().nodes().len(), 1);

        let tes = stage(vec![ResourceMappingNode::vertex_buffer_table(1, 32)]);
        assert!(matches!(
            merger().merge([&vs, &tes]).unwrap_err(),
            MergeError::TableSizeMismatch { offset: 1, first: 64, other: 32 }
        ));
    }

    #[test]
    fn conflicts_inside_nested_tables_are_reported() {
        let vs = stage(vec![ResourceMappingNode::table(0, vec![resource(0, 4, 0, 0)])]);
        let fs = stage(vec![ResourceMappingNode::table(0, vec![resource(0, 4, 0, 7)])]);
        assert!(matches!(
            merger().merge([&vs, &fs]).unwrap_err(),
            MergeError::BindingMismatch { offset: 0, .. }
        ));
    }

    #[test]
    fn nesting_depth_is_bounded() {
        fn chain(depth: u32) -> ResourceMappingNode {
            let mut node = resource(0, 4, 0, 0);
            for _ in 0..depth {
                node = ResourceMappingNode::table(0, vec![node]);
            }
            node
        }

        let vs = stage(vec![chain(2)]);
        let fs = stage(vec![chain(2)]);
        assert!(ResourceTableMerger::new(2).merge([&vs, &fs]).is_ok());

        let vs = stage(vec![chain(3)]);
        let fs = stage(vec![chain(3)]);
        assert_eq!(
            ResourceTableMerger::new(2).merge([&vs, &fs]).unwrap_err(),
            MergeError::NestingTooDeep { offset: 0, max: 2 }
        );
    }

    #[test]
    fn single_level_table_fits_depth_one() {
        let vs = stage(vec![ResourceMappingNode::table(0, vec![resource(0, 4, 0, 0)])]);
        let fs = stage(vec![ResourceMappingNode::table(0, vec![resource(0, 4, 0, 0)])]);
        let merged = ResourceTableMerger::new(1).merge([&vs, &fs]).unwrap();
        assert_eq!(merged.nodes().len(), 1);
        assert_eq!(merged.stats().nested_tables, 1);
    }

    #[test]
    fn range_values_are_sorted_and_deduplicated() {
        let values = vec![
            sampler_value(1, 0, vec![9, 9, 9, 9]),
            sampler_value(0, 3, vec![1, 2, 3, 4]),
            sampler_value(0, 3, vec![1, 2, 3, 4]),
            sampler_value(0, 1, vec![5, 6, 7, 8]),
        ];
        let merged = merge_range_values(values).unwrap();
        let keys: Vec<_> = merged.iter().map(|v| (v.set, v.binding)).collect();
        assert_eq!(keys, vec![(0, 1), (0, 3), (1, 0)]);
    }

    #[test]
    fn range_value_conflicts() {
        let err = merge_range_values(vec![
            sampler_value(0, 0, vec![1, 2, 3, 4]),
            sampler_value(0, 0, vec![1, 2, 3, 5]),
        ])
        .unwrap_err();
        assert_eq!(err, MergeError::RangeValueMismatch { set: 0, binding: 0 });

        let err = merge_range_values(vec![
            sampler_value(0, 0, vec![1, 2, 3, 4]),
            sampler_value(0, 0, vec![1, 2]),
        ])
        .unwrap_err();
        assert!(matches!(err, MergeError::RangeArraySizeMismatch { first: 4, other: 2, .. }));

        let err = merge_range_values(vec![
            sampler_value(0, 0, vec![1]),
            DescriptorRangeValue::new(0, 0, DescriptorType::Resource, vec![1]),
        ])
        .unwrap_err();
        assert!(matches!(err, MergeError::RangeTypeMismatch { .. }));
    }

    #[test]
    fn merge_of_a_table_with_itself_is_identity() {
        let table = vec![
            ResourceMappingNode::push_const(0, 2, 0, 0),
            ResourceMappingNode::table(2, vec![resource(0, 8, 0, 1), resource(8, 4, 0, 2)]),
            ResourceMappingNode::vertex_buffer_table(3, 32),
        ];
        let a = stage(table.clone());
        let b = stage(table.clone());
        let merged = merger().merge([&a, &b]).unwrap();
        assert_eq!(&merged.nodes()[..], &table[..]);
    }
}
