//! Structured-operation IR: shape inference, verification and
//! canonicalization for tensor/buffer compute ops.
//!
//! The crate models a small family of structured operations (copy, fill,
//! generic, convolution, pooling, init, pad, reshape, cast) over shaped
//! values with partially-static shapes, and provides the analyses a compiler
//! front-end needs before lowering them:
//!
//! - [`shape`] - extents, strides, shaped types and collapse/expand inference
//! - [`affine`] - affine maps, reassociations and contiguity checks
//! - [`op`] - operations, values and their identity keys
//! - [`region`] - scalar compute bodies and the region builder
//! - [`verify`] - structural and shape verification
//! - [`canonicalize`] - local rewrite rules driven to a fixed point
//! - [`reify`] - symbolic result-dimension expressions
//! - [`library`] - external library-call naming
//! - [`error`] - error types and result handling

// Module declarations
pub mod affine;
pub mod canonicalize;
pub mod error;
pub mod library;
pub mod op;
pub mod prelude;
pub mod region;
pub mod reify;
pub mod shape;
pub mod types;
pub mod verify;


// All core types remain accessible at the crate root
pub use affine::{
    is_reshapable_dim_band, validate_reassociation, AffineExpr, AffineMap, Reassociation,
    ReassociationGroup,
};
pub use canonicalize::{canonicalize, CanonicalizeOutput, RuleResult};
pub use error::{Error, Result};
pub use library::library_call_name;
pub use op::{OpKey, OpKind, Operation, Value, ValueDef, ValueKey, ValueType};
pub use region::{build_region, BodyKind, BodyOp, BodyValue, Region, RegionBuilder};
pub use reify::{reify_result_dims, SizeExpr};
pub use shape::{collapsed_type, pad_result_type, Extent, Shape, ShapedType, Stride};
pub use types::{ArithKind, ConstValue, IteratorType, PoolKind, SparseKind};
pub use verify::verify;

// Re-export external types for convenience
pub use strata_dtype::{CastKind, NumericKind, ScalarType};
