//! Pipeline build-info records.
//!
//! These mirror what the API layer hands the compiler after validation: one
//! [`PipelineShaderInfo`] per logical stage plus the fixed-function state the register builder
//! needs. The compiler core treats them as read-only, except that a multi-stage merge rewrites
//! each active stage's `user_data_nodes` / `descriptor_range_values` to the merged table.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::limits::{
    MAX_COLOR_TARGETS, MAX_GS_STREAMS, MAX_TESS_FACTOR, MAX_TRANSFORM_FEEDBACK_BUFFERS,
};
use crate::{NodeTable, RangeValueTable, ShaderStage};

/// Per-stage shader input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineShaderInfo {
    /// Front-end module for this stage. Only its presence matters here.
    pub module_data: Option<Vec<u8>>,
    pub entry_point: String,
    pub user_data_nodes: NodeTable,
    pub descriptor_range_values: RangeValueTable,
}

impl Default for PipelineShaderInfo {
    fn default() -> Self {
        Self {
            module_data: None,
            entry_point: String::from("main"),
            user_data_nodes: Arc::from(Vec::new()),
            descriptor_range_values: Arc::from(Vec::new()),
        }
    }
}

impl PipelineShaderInfo {
    /// Present stage with the given user-data layout and no immutable descriptors.
    pub fn with_nodes(nodes: impl Into<NodeTable>) -> Self {
        Self {
            module_data: Some(Vec::new()),
            user_data_nodes: nodes.into(),
            ..Self::default()
        }
    }

    pub fn is_present(&self) -> bool {
        self.module_data.is_some()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
    TriangleFan,
    PatchList,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputAssemblyState {
    pub topology: PrimitiveTopology,
    /// Control points per input patch; only meaningful with tessellation.
    pub patch_control_points: u32,
}

impl Default for InputAssemblyState {
    fn default() -> Self {
        Self {
            topology: PrimitiveTopology::TriangleList,
            patch_control_points: 3,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TessPrimitiveMode {
    #[default]
    Triangles,
    Quads,
    Isolines,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TessSpacing {
    #[default]
    Equal,
    FractionalEven,
    FractionalOdd,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexOrder {
    Cw,
    #[default]
    Ccw,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessellationState {
    pub primitive_mode: TessPrimitiveMode,
    pub spacing: TessSpacing,
    pub vertex_order: VertexOrder,
    pub point_mode: bool,
    /// Control points per output patch (declared by the tessellation control stage).
    pub output_control_points: u32,
    pub max_tess_factor: f32,
    pub min_tess_factor: f32,
}

impl Default for TessellationState {
    fn default() -> Self {
        Self {
            primitive_mode: TessPrimitiveMode::Triangles,
            spacing: TessSpacing::Equal,
            vertex_order: VertexOrder::Ccw,
            point_mode: false,
            output_control_points: 3,
            max_tess_factor: MAX_TESS_FACTOR,
            min_tess_factor: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GsInputPrimitive {
    Points,
    Lines,
    LinesAdjacency,
    #[default]
    Triangles,
    TrianglesAdjacency,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GsOutputPrimitive {
    Points,
    LineStrip,
    #[default]
    TriangleStrip,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryState {
    pub input_primitive: GsInputPrimitive,
    pub output_primitive: GsOutputPrimitive,
    pub max_output_vertices: u32,
    pub invocations: u32,
    /// Dwords the ES stage writes per vertex into the ES→GS ring.
    pub es_output_dwords: u32,
    /// Dwords per emitted vertex, per output stream. A zero entry means the stream is unused.
    pub stream_output_dwords: [u32; MAX_GS_STREAMS],
    /// Stream routed to the rasterizer.
    pub rasterized_stream: u32,
}

impl Default for GeometryState {
    fn default() -> Self {
        Self {
            input_primitive: GsInputPrimitive::Triangles,
            output_primitive: GsOutputPrimitive::TriangleStrip,
            max_output_vertices: 3,
            invocations: 1,
            es_output_dwords: 4,
            stream_output_dwords: [4, 0, 0, 0],
            rasterized_stream: 0,
        }
    }
}

/// Outputs of the last vertex-processing stage, as seen by the hardware VS role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VertexOutputState {
    /// Generic vec4 parameters exported to the fragment stage.
    pub param_count: u32,
    pub clip_distance_mask: u8,
    pub cull_distance_mask: u8,
    pub uses_point_size: bool,
    pub uses_viewport_index: bool,
    pub uses_layer: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamOutState {
    /// Vertex stride per transform feedback buffer, in dwords. Zero means the buffer is unbound.
    pub buffer_strides: [u32; MAX_TRANSFORM_FEEDBACK_BUFFERS],
    /// Buffer mask (bit `n` = buffer `n`) written by each vertex stream.
    pub stream_buffers: [u8; MAX_GS_STREAMS],
}

impl StreamOutState {
    pub fn is_enabled(&self) -> bool {
        self.buffer_strides.iter().any(|&stride| stride != 0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMode {
    #[default]
    Smooth,
    Flat,
    NoPerspective,
    Centroid,
    Sample,
}

/// Color export format, encoded as in `SPI_SHADER_COL_FORMAT`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum ExportFormat {
    #[default]
    Zero = 0,
    R32 = 1,
    Gr32 = 2,
    Ar32 = 3,
    Fp16Abgr = 4,
    Unorm16Abgr = 5,
    Snorm16Abgr = 6,
    Uint16Abgr = 7,
    Sint16Abgr = 8,
    Abgr32 = 9,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentState {
    /// Interpolation mode of each generic input, indexed by location.
    pub inputs: Vec<InterpolationMode>,
    pub uses_frag_coord: bool,
    pub uses_front_facing: bool,
    pub export_formats: [ExportFormat; MAX_COLOR_TARGETS],
    pub exports_depth: bool,
    pub exports_stencil: bool,
    pub uses_discard: bool,
    pub early_fragment_tests: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsPipelineBuildInfo {
    pub vs: PipelineShaderInfo,
    pub tcs: PipelineShaderInfo,
    pub tes: PipelineShaderInfo,
    pub gs: PipelineShaderInfo,
    pub fs: PipelineShaderInfo,
    pub input_assembly: InputAssemblyState,
    pub tessellation: TessellationState,
    pub geometry: GeometryState,
    pub vertex_output: VertexOutputState,
    pub stream_out: StreamOutState,
    pub fragment: FragmentState,
}

impl GraphicsPipelineBuildInfo {
    /// Shader info of a native graphics stage. Returns `None` for compute and the copy shader.
    pub fn shader_info(&self, stage: ShaderStage) -> Option<&PipelineShaderInfo> {
        match stage {
            ShaderStage::Vertex => Some(&self.vs),
            ShaderStage::TessControl => Some(&self.tcs),
            ShaderStage::TessEval => Some(&self.tes),
            ShaderStage::Geometry => Some(&self.gs),
            ShaderStage::Fragment => Some(&self.fs),
            ShaderStage::Compute | ShaderStage::CopyShader => None,
        }
    }

    pub fn shader_info_mut(&mut self, stage: ShaderStage) -> Option<&mut PipelineShaderInfo> {
        match stage {
            ShaderStage::Vertex => Some(&mut self.vs),
            ShaderStage::TessControl => Some(&mut self.tcs),
            ShaderStage::TessEval => Some(&mut self.tes),
            ShaderStage::Geometry => Some(&mut self.gs),
            ShaderStage::Fragment => Some(&mut self.fs),
            ShaderStage::Compute | ShaderStage::CopyShader => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputePipelineBuildInfo {
    pub cs: PipelineShaderInfo,
    pub workgroup_size: [u32; 3],
}

impl Default for ComputePipelineBuildInfo {
    fn default() -> Self {
        Self {
            cs: PipelineShaderInfo::default(),
            workgroup_size: [1, 1, 1],
        }
    }
}

/// A full pipeline description as loaded by tools.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineDescription {
    Graphics(GraphicsPipelineBuildInfo),
    Compute(ComputePipelineBuildInfo),
}
