use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Immutable, shareable sequence of resource-mapping nodes.
///
/// Nested descriptor tables and merged tables are handed around as `Arc<[_]>` so a merged nested
/// table can be re-parented under a new top-level node without copying or invalidating anything.
pub type NodeTable = Arc<[ResourceMappingNode]>;

/// Immutable, shareable sequence of descriptor range values.
pub type RangeValueTable = Arc<[DescriptorRangeValue]>;

/// Kind of hardware descriptor a leaf node (or an immutable range value) refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorType {
    Resource,
    Sampler,
    CombinedTexture,
    TexelBuffer,
    Fmask,
    Buffer,
    BufferCompact,
}

/// `(set, binding)` pair identifying a descriptor in the API's binding model.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DescriptorBinding {
    pub set: u32,
    pub binding: u32,
}

impl DescriptorBinding {
    pub const fn new(set: u32, binding: u32) -> Self {
        Self { set, binding }
    }
}

impl fmt::Display for DescriptorBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(set={}, binding={})", self.set, self.binding)
    }
}

/// Plain type tag of a [`ResourceMappingNode`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceMappingNodeType {
    DescriptorResource,
    DescriptorSampler,
    DescriptorCombinedTexture,
    DescriptorTexelBuffer,
    DescriptorFmask,
    DescriptorBuffer,
    DescriptorBufferCompact,
    PushConst,
    InlineConst,
    DescriptorTableVaPtr,
    IndirectUserDataVaPtr,
    VertexBufferTableVaPtr,
    StreamOutTableVaPtr,
}

impl ResourceMappingNodeType {
    /// Node types that reference a `(set, binding)` pair directly.
    pub fn has_binding(self) -> bool {
        !matches!(
            self,
            ResourceMappingNodeType::DescriptorTableVaPtr
                | ResourceMappingNodeType::IndirectUserDataVaPtr
                | ResourceMappingNodeType::VertexBufferTableVaPtr
                | ResourceMappingNodeType::StreamOutTableVaPtr
        )
    }

    /// Pointer types the hardware allows exactly one producer of per pipeline.
    pub fn is_single_producer(self) -> bool {
        matches!(
            self,
            ResourceMappingNodeType::IndirectUserDataVaPtr
                | ResourceMappingNodeType::StreamOutTableVaPtr
        )
    }
}

impl From<DescriptorType> for ResourceMappingNodeType {
    fn from(ty: DescriptorType) -> Self {
        match ty {
            DescriptorType::Resource => ResourceMappingNodeType::DescriptorResource,
            DescriptorType::Sampler => ResourceMappingNodeType::DescriptorSampler,
            DescriptorType::CombinedTexture => ResourceMappingNodeType::DescriptorCombinedTexture,
            DescriptorType::TexelBuffer => ResourceMappingNodeType::DescriptorTexelBuffer,
            DescriptorType::Fmask => ResourceMappingNodeType::DescriptorFmask,
            DescriptorType::Buffer => ResourceMappingNodeType::DescriptorBuffer,
            DescriptorType::BufferCompact => ResourceMappingNodeType::DescriptorBufferCompact,
        }
    }
}

/// Type-specific payload of a resource-mapping node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeData {
    /// Leaf descriptor (SRD) loaded from `(set, binding)`.
    Descriptor {
        ty: DescriptorType,
        #[serde(flatten)]
        binding: DescriptorBinding,
    },
    /// Push-constant block.
    PushConst {
        #[serde(flatten)]
        binding: DescriptorBinding,
    },
    /// Constants stored inline in the user-data registers.
    InlineConst {
        #[serde(flatten)]
        binding: DescriptorBinding,
    },
    /// Pointer to a nested descriptor table.
    DescriptorTable { children: NodeTable },
    /// Pointer to an indirect user-data table.
    IndirectTable { table_dwords: u32 },
    /// Pointer to the vertex buffer table.
    VertexBufferTable { table_dwords: u32 },
    /// Pointer to the stream-out buffer table.
    StreamOutTable { table_dwords: u32 },
}

/// One entry of a per-stage user-data layout.
///
/// `offset_in_dwords` is the position inside the stage's user-data window and is the merge key
/// when several stages' tables are consolidated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMappingNode {
    pub offset_in_dwords: u32,
    pub size_in_dwords: u32,
    #[serde(flatten)]
    pub data: NodeData,
}

impl ResourceMappingNode {
    pub fn descriptor(
        ty: DescriptorType,
        offset_in_dwords: u32,
        size_in_dwords: u32,
        set: u32,
        binding: u32,
    ) -> Self {
        Self {
            offset_in_dwords,
            size_in_dwords,
            data: NodeData::Descriptor {
                ty,
                binding: DescriptorBinding::new(set, binding),
            },
        }
    }

    pub fn push_const(offset_in_dwords: u32, size_in_dwords: u32, set: u32, binding: u32) -> Self {
        Self {
            offset_in_dwords,
            size_in_dwords,
            data: NodeData::PushConst {
                binding: DescriptorBinding::new(set, binding),
            },
        }
    }

    pub fn inline_const(
        offset_in_dwords: u32,
        size_in_dwords: u32,
        set: u32,
        binding: u32,
    ) -> Self {
        Self {
            offset_in_dwords,
            size_in_dwords,
            data: NodeData::InlineConst {
                binding: DescriptorBinding::new(set, binding),
            },
        }
    }

    /// Descriptor-table pointer. Table pointers occupy a single dword.
    pub fn table(offset_in_dwords: u32, children: impl Into<NodeTable>) -> Self {
        Self {
            offset_in_dwords,
            size_in_dwords: 1,
            data: NodeData::DescriptorTable {
                children: children.into(),
            },
        }
    }

    pub fn indirect_table(offset_in_dwords: u32, table_dwords: u32) -> Self {
        Self {
            offset_in_dwords,
            size_in_dwords: 1,
            data: NodeData::IndirectTable { table_dwords },
        }
    }

    pub fn vertex_buffer_table(offset_in_dwords: u32, table_dwords: u32) -> Self {
        Self {
            offset_in_dwords,
            size_in_dwords: 1,
            data: NodeData::VertexBufferTable { table_dwords },
        }
    }

    pub fn stream_out_table(offset_in_dwords: u32, table_dwords: u32) -> Self {
        Self {
            offset_in_dwords,
            size_in_dwords: 1,
            data: NodeData::StreamOutTable { table_dwords },
        }
    }

    pub fn node_type(&self) -> ResourceMappingNodeType {
        match &self.data {
            NodeData::Descriptor { ty, .. } => (*ty).into(),
            NodeData::PushConst { .. } => ResourceMappingNodeType::PushConst,
            NodeData::InlineConst { .. } => ResourceMappingNodeType::InlineConst,
            NodeData::DescriptorTable { .. } => ResourceMappingNodeType::DescriptorTableVaPtr,
            NodeData::IndirectTable { .. } => ResourceMappingNodeType::IndirectUserDataVaPtr,
            NodeData::VertexBufferTable { .. } => ResourceMappingNodeType::VertexBufferTableVaPtr,
            NodeData::StreamOutTable { .. } => ResourceMappingNodeType::StreamOutTableVaPtr,
        }
    }

    /// `(set, binding)` of leaf and constant-block nodes.
    pub fn binding(&self) -> Option<DescriptorBinding> {
        match &self.data {
            NodeData::Descriptor { binding, .. }
            | NodeData::PushConst { binding }
            | NodeData::InlineConst { binding } => Some(*binding),
            _ => None,
        }
    }

    /// Nested table of a descriptor-table pointer.
    pub fn children(&self) -> Option<&NodeTable> {
        match &self.data {
            NodeData::DescriptorTable { children } => Some(children),
            _ => None,
        }
    }

    /// Size of the memory table a pointer node points at.
    pub fn pointed_table_dwords(&self) -> Option<u32> {
        match &self.data {
            NodeData::IndirectTable { table_dwords }
            | NodeData::VertexBufferTable { table_dwords }
            | NodeData::StreamOutTable { table_dwords } => Some(*table_dwords),
            _ => None,
        }
    }

    /// One past the last user-data dword this node occupies.
    pub fn end_in_dwords(&self) -> u32 {
        self.offset_in_dwords.saturating_add(self.size_in_dwords)
    }
}

/// Descriptor payload fixed at compile time (e.g. an immutable sampler).
///
/// `value` holds `array_size` words. Two range values describe the same descriptor iff their
/// `(set, binding)` match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorRangeValue {
    pub set: u32,
    pub binding: u32,
    pub ty: DescriptorType,
    pub array_size: u32,
    pub value: Vec<u32>,
}

impl DescriptorRangeValue {
    pub fn new(set: u32, binding: u32, ty: DescriptorType, value: Vec<u32>) -> Self {
        Self {
            set,
            binding,
            ty,
            array_size: value.len() as u32,
            value,
        }
    }

    pub fn key(&self) -> DescriptorBinding {
        DescriptorBinding::new(self.set, self.binding)
    }

    /// The `array_size` words that make up the baked payload.
    pub fn payload(&self) -> &[u32] {
        let len = (self.array_size as usize).min(self.value.len());
        &self.value[..len]
    }
}
