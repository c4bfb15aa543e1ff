//! Common imports for working with structured-op graphs.
//!
//! This module provides a convenient way to import the most commonly used
//! types:
//!
//! ```rust,ignore
//! use strata_ir::prelude::*;
//! ```

// Core types
pub use crate::op::{OpKind, Operation, OpKey, Value, ValueDef, ValueKey, ValueType};

// Shapes and maps
pub use crate::affine::{AffineExpr, AffineMap, Reassociation, ReassociationGroup};
pub use crate::shape::{Extent, Shape, ShapedType, Stride};

// Regions
pub use crate::region::{BodyKind, BodyOp, BodyValue, Region, RegionBuilder};

// Attribute enums
pub use crate::types::{ArithKind, ConstValue, IteratorType, PoolKind, SparseKind};

// Passes
pub use crate::canonicalize::{canonicalize, CanonicalizeOutput};
pub use crate::error::{Error, Result};
pub use crate::library::library_call_name;
pub use crate::reify::{reify_result_dims, SizeExpr};
pub use crate::verify::verify;

// Re-exports from dependencies
pub use strata_dtype::{CastKind, NumericKind, ScalarType};
