//! Computation regions and default body synthesis.
//!
//! A region is owned exclusively by its operation: typed block arguments
//! followed by a straight-line body terminated by a yield. Body values are
//! index handles (`BodyValue`) into the argument list or the body, never
//! back-pointers, so regions clone freely and cannot form ownership cycles.

use smallvec::SmallVec;
use strata_dtype::{CastKind, ScalarType};

use crate::error::{Error, RegionArityMismatchSnafu};
use crate::types::{ArithKind, ConstValue};

/// Handle to a value inside a region: a block argument or a prior body op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyValue {
    Arg(usize),
    Op(usize),
}

/// One operation of a region body.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyOp {
    /// Scalar constant, used for captured values such as pad constants.
    Const { value: ConstValue, ty: ScalarType },

    /// Closed-set numeric primitive; the concrete instruction is chosen from
    /// `ty.kind()` (integer vs floating-point) at construction time.
    Arith { kind: ArithKind, lhs: BodyValue, rhs: BodyValue, ty: ScalarType },

    /// Element cast synthesized during body construction.
    Cast { kind: CastKind, src: BodyValue, to: ScalarType },
}

impl BodyOp {
    pub fn ty(&self) -> ScalarType {
        match self {
            Self::Const { ty, .. } | Self::Arith { ty, .. } => *ty,
            Self::Cast { to, .. } => *to,
        }
    }
}

/// Computation region: block arguments, body, yield.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub args: SmallVec<[ScalarType; 4]>,
    pub body: Vec<BodyOp>,
    pub yielded: SmallVec<[BodyValue; 2]>,
}

impl Region {
    pub fn value_type(&self, v: BodyValue) -> ScalarType {
        match v {
            BodyValue::Arg(i) => self.args[i],
            BodyValue::Op(i) => self.body[i].ty(),
        }
    }

    /// Handle lookup without the in-range precondition of [`value_type`].
    ///
    /// [`value_type`]: Self::value_type
    pub fn try_value_type(&self, v: BodyValue) -> Option<ScalarType> {
        match v {
            BodyValue::Arg(i) => self.args.get(i).copied(),
            BodyValue::Op(i) => self.body.get(i).map(BodyOp::ty),
        }
    }

    /// Rebuild the region with block arguments remapped: `mapping[old] = new`
    /// argument position, with dropped arguments redirected to their
    /// surviving duplicate. `new_args` is the retained argument list.
    pub fn remap_args(&self, mapping: &[usize], new_args: SmallVec<[ScalarType; 4]>) -> Self {
        let remap = |v: BodyValue| match v {
            BodyValue::Arg(i) => BodyValue::Arg(mapping[i]),
            BodyValue::Op(i) => BodyValue::Op(i),
        };
        let body = self
            .body
            .iter()
            .map(|op| match op {
                BodyOp::Const { value, ty } => BodyOp::Const { value: *value, ty: *ty },
                BodyOp::Arith { kind, lhs, rhs, ty } => {
                    BodyOp::Arith { kind: *kind, lhs: remap(*lhs), rhs: remap(*rhs), ty: *ty }
                }
                BodyOp::Cast { kind, src, to } => BodyOp::Cast { kind: *kind, src: remap(*src), to: *to },
            })
            .collect();
        let yielded = self.yielded.iter().map(|&v| remap(v)).collect();
        Self { args: new_args, body, yielded }
    }
}

/// What a synthesized default body computes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyKind {
    /// Cast the first value argument to the output element type and yield it
    /// (copy, fill).
    YieldFirst,
    /// Yield a captured constant of the given element type (pad value).
    YieldConst { value: ConstValue, ty: ScalarType },
    /// Apply a numeric primitive to the two input arguments and yield the
    /// result.
    Arith(ArithKind),
}

impl BodyKind {
    /// Value arguments (inputs + outputs) the kind expects, on top of any
    /// index-typed induction arguments.
    fn expected_value_args(&self) -> usize {
        match self {
            Self::YieldFirst => 2,
            Self::YieldConst { .. } => 0,
            Self::Arith(_) => 3,
        }
    }
}

/// Incremental region construction with implicit casting.
pub struct RegionBuilder {
    args: SmallVec<[ScalarType; 4]>,
    body: Vec<BodyOp>,
}

impl RegionBuilder {
    pub fn new(args: impl IntoIterator<Item = ScalarType>) -> Self {
        Self { args: args.into_iter().collect(), body: Vec::new() }
    }

    pub fn arg(&self, i: usize) -> BodyValue {
        debug_assert!(i < self.args.len());
        BodyValue::Arg(i)
    }

    pub fn num_args(&self) -> usize {
        self.args.len()
    }

    fn push(&mut self, op: BodyOp) -> BodyValue {
        self.body.push(op);
        BodyValue::Op(self.body.len() - 1)
    }

    fn type_of(&self, v: BodyValue) -> ScalarType {
        match v {
            BodyValue::Arg(i) => self.args[i],
            BodyValue::Op(i) => self.body[i].ty(),
        }
    }

    pub fn constant(&mut self, value: ConstValue, ty: ScalarType) -> BodyValue {
        self.push(BodyOp::Const { value, ty })
    }

    /// Implicit cast of `v` to `to`.
    ///
    /// An unsupported pairing degrades to the uncast operand with a non-fatal
    /// diagnostic; the verifier reports the resulting type mismatch.
    pub fn cast_to(&mut self, v: BodyValue, to: ScalarType) -> BodyValue {
        let from = self.type_of(v);
        match from.cast_kind(to) {
            CastKind::Identity => v,
            CastKind::Unsupported => {
                tracing::warn!(?from, ?to, "unsupported implicit cast, leaving operand uncast");
                v
            }
            kind => self.push(BodyOp::Cast { kind, src: v, to }),
        }
    }

    /// Numeric primitive over `ty`, casting both operands first.
    pub fn arith(&mut self, kind: ArithKind, lhs: BodyValue, rhs: BodyValue, ty: ScalarType) -> BodyValue {
        let lhs = self.cast_to(lhs, ty);
        let rhs = self.cast_to(rhs, ty);
        self.push(BodyOp::Arith { kind, lhs, rhs, ty })
    }

    pub fn finish(self, yielded: impl IntoIterator<Item = BodyValue>) -> Region {
        Region { args: self.args, body: self.body, yielded: yielded.into_iter().collect() }
    }
}

/// Synthesize a default computation body for a named operation.
///
/// Block arguments are `index_args` index-typed induction arguments followed
/// by the input and output element types. If the resulting argument count
/// violates the kind's arity rule, `on_error` receives the failure and no
/// region is produced.
pub fn build_region(
    body: BodyKind,
    index_args: usize,
    input_types: &[ScalarType],
    output_types: &[ScalarType],
    on_error: &mut dyn FnMut(Error),
) -> Option<Region> {
    let got = input_types.len() + output_types.len();
    let expected = body.expected_value_args();
    if got != expected {
        let error = RegionArityMismatchSnafu { expected: expected + index_args, got: got + index_args }.build();
        on_error(error);
        return None;
    }

    let args = std::iter::repeat(ScalarType::Index)
        .take(index_args)
        .chain(input_types.iter().copied())
        .chain(output_types.iter().copied());
    let mut builder = RegionBuilder::new(args);

    let out_elem = output_types.last().copied();

    let yielded = match body {
        BodyKind::YieldFirst => {
            let input = builder.arg(index_args);
            let out = out_elem.unwrap_or(input_types[0]);
            builder.cast_to(input, out)
        }
        BodyKind::YieldConst { value, ty } => {
            // Pad regions have only index arguments; the pad value is a
            // captured constant.
            builder.constant(value, ty)
        }
        BodyKind::Arith(kind) => {
            let (lhs, rhs) = (builder.arg(index_args), builder.arg(index_args + 1));
            let out = out_elem.unwrap_or(input_types[0]);
            builder.arith(kind, lhs, rhs, out)
        }
    };

    Some(builder.finish([yielded]))
}
