//! Centralized hardware limits.
//!
//! Pipeline descriptions are produced by an external API layer and are only validated for API
//! conformance, not for what the target hardware can encode. These limits bound the values the
//! register builder accepts and the depth of nested descriptor tables the merger walks.

/// Marker for "no value" in 32-bit metadata fields (e.g. no spill threshold).
pub const INVALID_VALUE: u32 = !0;

/// Maximum number of geometry-shader output vertex streams.
pub const MAX_GS_STREAMS: usize = 4;

/// Maximum number of transform feedback (stream-out) buffers.
pub const MAX_TRANSFORM_FEEDBACK_BUFFERS: usize = 4;

const _: () = assert!(MAX_GS_STREAMS == MAX_TRANSFORM_FEEDBACK_BUFFERS);

/// Maximum number of color render targets a fragment shader can export to.
pub const MAX_COLOR_TARGETS: usize = 8;

/// Maximum number of fragment shader interpolants (`SPI_PS_INPUT_CNTL_0..31`).
pub const MAX_INTERPOLANTS: usize = 32;

/// Number of user-data SGPRs the command processor preloads per hardware stage.
///
/// Resource-mapping nodes that do not fit in this window are read from the spill table instead.
pub const MAX_USER_DATA_REGS: u32 = 16;

/// Maximum tessellation factor supported by the fixed-function tessellator.
pub const MAX_TESS_FACTOR: f32 = 64.0;

/// Maximum number of control points in an input or output patch.
pub const MAX_PATCH_CONTROL_POINTS: u32 = 32;

/// Maximum `max_output_vertices` a geometry shader may declare.
pub const MAX_GS_OUTPUT_VERTICES: u32 = 1024;

/// Maximum geometry shader instance count (`VGT_GS_INSTANCE_CNT.CNT` is 7 bits wide).
pub const MAX_GS_INVOCATIONS: u32 = 127;

/// Maximum compute workgroup size along any dimension.
pub const MAX_WORKGROUP_DIM: u32 = 1024;

/// Default cap on descriptor-table nesting walked by the merger.
///
/// Real pipelines use one or two levels (top-level table → per-set table). Anything far deeper is
/// treated as a malformed description rather than recursed into without bound.
pub const MAX_TABLE_NESTING_DEPTH: u32 = 8;
