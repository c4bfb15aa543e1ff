//! Operations and values.
//!
//! Operations and values are immutable nodes behind `Arc` with stable `u64`
//! ids. Use edges point from a value to its defining operation; operations
//! never point back at their uses, so the graph stays acyclic and handles
//! stay stable across rewrites. Map keys use the `ValueKey`/`OpKey` wrappers,
//! which hash the stable identity rather than the allocation.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use smallvec::SmallVec;
use strata_dtype::ScalarType;

use crate::affine::{AffineMap, Reassociation};
use crate::region::Region;
use crate::shape::{Extent, Shape, ShapedType};
use crate::types::{ConstValue, IteratorType, PoolKind, SparseKind};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Type of an IR value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Shaped(ShapedType),
    Scalar(ScalarType),
}

impl ValueType {
    pub fn shaped(&self) -> Option<&ShapedType> {
        match self {
            Self::Shaped(ty) => Some(ty),
            Self::Scalar(_) => None,
        }
    }

    /// Element type for shaped values, the type itself for scalars.
    pub fn elem(&self) -> ScalarType {
        match self {
            Self::Shaped(ty) => ty.elem(),
            Self::Scalar(s) => *s,
        }
    }
}

impl From<ShapedType> for ValueType {
    fn from(ty: ShapedType) -> Self {
        Self::Shaped(ty)
    }
}

impl From<ScalarType> for ValueType {
    fn from(s: ScalarType) -> Self {
        Self::Scalar(s)
    }
}

/// Where a value comes from.
#[derive(Debug, Clone)]
pub enum ValueDef {
    /// External argument (function or block parameter).
    Argument,
    /// Compile-time constant. A shaped constant with a single payload value
    /// is a splat.
    Constant(ConstValue),
    /// The `index`-th result of `op`.
    OpResult { op: Arc<Operation>, index: usize },
}

/// IR value with a stable id.
#[derive(Debug, Clone)]
pub struct Value {
    pub id: u64,
    pub ty: ValueType,
    pub def: ValueDef,
}

impl Value {
    pub fn argument(ty: impl Into<ValueType>) -> Arc<Self> {
        Arc::new(Self { id: next_id(), ty: ty.into(), def: ValueDef::Argument })
    }

    pub fn constant(ty: impl Into<ValueType>, value: ConstValue) -> Arc<Self> {
        Arc::new(Self { id: next_id(), ty: ty.into(), def: ValueDef::Constant(value) })
    }

    /// An index-typed integer constant.
    pub fn index_constant(v: i64) -> Arc<Self> {
        Self::constant(ScalarType::Index, ConstValue::Int(v))
    }

    pub fn shaped(&self) -> Option<&ShapedType> {
        self.ty.shaped()
    }

    pub fn elem(&self) -> ScalarType {
        self.ty.elem()
    }

    pub fn defining_op(&self) -> Option<&Arc<Operation>> {
        match &self.def {
            ValueDef::OpResult { op, .. } => Some(op),
            _ => None,
        }
    }

    pub fn as_const_int(&self) -> Option<i64> {
        match &self.def {
            ValueDef::Constant(c) => c.as_int(),
            _ => None,
        }
    }

    /// The payload of a shaped (splat) constant.
    pub fn as_splat_constant(&self) -> Option<ConstValue> {
        match (&self.def, &self.ty) {
            (ValueDef::Constant(c), ValueType::Shaped(_)) => Some(*c),
            _ => None,
        }
    }

    /// Stable identity. Result values are identified by their defining op and
    /// index, so reconstructing "result `i` of op `o`" always compares equal.
    fn identity(&self) -> (bool, u64, usize) {
        match &self.def {
            ValueDef::OpResult { op, index } => (true, op.id, *index),
            _ => (false, self.id, 0),
        }
    }
}

/// Wrapper for `Arc<Value>` with Hash/Eq on the stable identity.
#[derive(Clone)]
pub struct ValueKey(pub Arc<Value>);

impl std::fmt::Debug for ValueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ValueKey(id={})", self.0.id)
    }
}

impl PartialEq for ValueKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.identity() == other.0.identity()
    }
}

impl Eq for ValueKey {}

impl Hash for ValueKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.identity().hash(state);
    }
}

/// Wrapper for `Arc<Operation>` with Hash/Eq on the stable id.
#[derive(Clone)]
pub struct OpKey(pub Arc<Operation>);

impl std::fmt::Debug for OpKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OpKey(id={})", self.0.id)
    }
}

impl PartialEq for OpKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for OpKey {}

impl Hash for OpKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

/// Operation kind tag with kind-specific attributes.
#[derive(Debug, Clone, PartialEq, strum::AsRefStr, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum OpKind {
    /// Element-wise copy, optionally through permutations of the iteration
    /// space on either side.
    Copy {
        input_permutation: Option<AffineMap>,
        output_permutation: Option<AffineMap>,
    },

    /// Broadcast a scalar into every element of the output.
    Fill,

    /// Fully general structured op: per-operand indexing maps, per-loop
    /// iterator tags, optional per-operand sparsity annotations.
    Generic {
        indexing_maps: Vec<AffineMap>,
        iterator_types: Vec<IteratorType>,
        sparse: Option<Vec<Vec<SparseKind>>>,
    },

    /// Convolution: input, filter, output.
    Conv {
        strides: SmallVec<[usize; 2]>,
        dilations: SmallVec<[usize; 2]>,
    },

    /// Windowed pooling over the input.
    Pooling {
        pool: PoolKind,
        window_dims: Shape,
        strides: SmallVec<[usize; 2]>,
        dilations: SmallVec<[usize; 2]>,
    },

    /// Materialize an uninitialized tensor of the given sizes. Dynamic
    /// entries take their runtime size from the input operands, in order.
    InitTensor { static_sizes: Shape },

    /// Pad the source with low/high amounts per dimension; the region
    /// computes the padding value from the index arguments.
    Pad {
        static_low: SmallVec<[Extent; 4]>,
        static_high: SmallVec<[Extent; 4]>,
    },

    /// Rank-changing reshape. Collapsing or expanding is determined by the
    /// source and result ranks; tensor vs buffer by the operand type.
    Reshape { reassociation: Reassociation },

    /// Shape-knowledge cast between compatible shaped types.
    Cast,
}

impl OpKind {
    /// Structured ops carry an implicit loop nest and a (possibly default)
    /// computation body.
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            Self::Copy { .. } | Self::Fill | Self::Generic { .. } | Self::Conv { .. } | Self::Pooling { .. }
        )
    }
}

/// Operation instance: kind tag, input and output operands, declared result
/// types, and an optional computation region.
///
/// Instances are created once, verified read-only, and replaced wholesale by
/// canonicalization; attributes never mutate after construction.
#[derive(Debug, Clone)]
pub struct Operation {
    pub id: u64,
    pub kind: OpKind,
    pub inputs: SmallVec<[Arc<Value>; 4]>,
    pub outputs: SmallVec<[Arc<Value>; 2]>,
    pub result_types: SmallVec<[ShapedType; 2]>,
    pub region: Option<Region>,
}

impl Operation {
    pub fn new(
        kind: OpKind,
        inputs: impl IntoIterator<Item = Arc<Value>>,
        outputs: impl IntoIterator<Item = Arc<Value>>,
        result_types: impl IntoIterator<Item = ShapedType>,
        region: Option<Region>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: next_id(),
            kind,
            inputs: inputs.into_iter().collect(),
            outputs: outputs.into_iter().collect(),
            result_types: result_types.into_iter().collect(),
            region,
        })
    }

    /// The `index`-th result as a value. The value's identity is derived
    /// from `(op id, index)`, so repeated calls compare equal under
    /// `ValueKey`.
    pub fn result(self: &Arc<Self>, index: usize) -> Arc<Value> {
        debug_assert!(index < self.result_types.len());
        Arc::new(Value {
            id: next_id(),
            ty: ValueType::Shaped(self.result_types[index].clone()),
            def: ValueDef::OpResult { op: self.clone(), index },
        })
    }

    pub fn results(self: &Arc<Self>) -> SmallVec<[Arc<Value>; 2]> {
        (0..self.result_types.len()).map(|i| self.result(i)).collect()
    }

    /// Reconstruct with new operands, keeping kind, result types and region.
    pub fn with_operands(
        self: &Arc<Self>,
        inputs: impl IntoIterator<Item = Arc<Value>>,
        outputs: impl IntoIterator<Item = Arc<Value>>,
    ) -> Arc<Self> {
        Self::new(
            self.kind.clone(),
            inputs,
            outputs,
            self.result_types.iter().cloned(),
            self.region.clone(),
        )
    }

    /// All operands, inputs first.
    pub fn operands(&self) -> impl Iterator<Item = &Arc<Value>> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// True iff every shaped operand is a tensor.
    pub fn has_tensor_semantics(&self) -> bool {
        self.operands().all(|v| v.shaped().is_none_or(ShapedType::is_tensor))
    }
}

// Convenience constructors for the named kinds; tests and builders share
// these rather than spelling out `Operation::new` everywhere.
impl Operation {
    pub fn copy(
        input: Arc<Value>,
        output: Arc<Value>,
        input_permutation: Option<AffineMap>,
        output_permutation: Option<AffineMap>,
    ) -> Arc<Self> {
        Self::new(OpKind::Copy { input_permutation, output_permutation }, [input], [output], [], None)
    }

    /// Fill with buffer semantics: writes into `output`, no results.
    pub fn fill_buffer(value: Arc<Value>, output: Arc<Value>) -> Arc<Self> {
        Self::new(OpKind::Fill, [value], [output], [], None)
    }

    /// Fill with tensor semantics: produces a result of the init's type.
    pub fn fill_tensor(value: Arc<Value>, init: Arc<Value>) -> Arc<Self> {
        let result_ty = init.shaped().cloned();
        Self::new(OpKind::Fill, [value], [init], result_ty, None)
    }

    pub fn init_tensor(
        static_sizes: Shape,
        dynamic_sizes: impl IntoIterator<Item = Arc<Value>>,
        elem: ScalarType,
    ) -> Arc<Self> {
        let result_ty = crate::shape::init_result_type(&static_sizes, elem);
        Self::new(OpKind::InitTensor { static_sizes }, dynamic_sizes, [], [result_ty], None)
    }

    pub fn reshape(src: Arc<Value>, reassociation: Reassociation, result_ty: ShapedType) -> Arc<Self> {
        Self::new(OpKind::Reshape { reassociation }, [src], [], [result_ty], None)
    }

    pub fn cast(src: Arc<Value>, result_ty: ShapedType) -> Arc<Self> {
        Self::new(OpKind::Cast, [src], [], [result_ty], None)
    }

    pub fn pad(
        src: Arc<Value>,
        static_low: SmallVec<[Extent; 4]>,
        static_high: SmallVec<[Extent; 4]>,
        dynamic_pads: impl IntoIterator<Item = Arc<Value>>,
        result_ty: ShapedType,
        region: Region,
    ) -> Arc<Self> {
        let inputs = std::iter::once(src).chain(dynamic_pads);
        Self::new(OpKind::Pad { static_low, static_high }, inputs, [], [result_ty], Some(region))
    }

    pub fn generic(
        indexing_maps: Vec<AffineMap>,
        iterator_types: Vec<IteratorType>,
        inputs: impl IntoIterator<Item = Arc<Value>>,
        outputs: impl IntoIterator<Item = Arc<Value>>,
        result_types: impl IntoIterator<Item = ShapedType>,
        region: Region,
    ) -> Arc<Self> {
        Self::new(
            OpKind::Generic { indexing_maps, iterator_types, sparse: None },
            inputs,
            outputs,
            result_types,
            Some(region),
        )
    }
}
