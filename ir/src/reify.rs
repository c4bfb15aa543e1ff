//! Symbolic reification of result dimensions.
//!
//! Reification produces one expression per result dimension, substituting
//! runtime-carried operand values for dynamic extents and folding constants
//! where every participant is statically known. The smart constructors fold
//! eagerly, so `dim + 0` and `2 * 3` never survive as trees.

use smallvec::SmallVec;

use crate::op::{OpKind, Operation, ValueKey};
use crate::shape::Extent;

/// Symbolic size expression over runtime dimensions and operand values.
#[derive(Debug, Clone, PartialEq)]
pub enum SizeExpr {
    Const(usize),
    /// Runtime extent of dimension `dim` of a shaped value.
    DimOf { value: ValueKey, dim: usize },
    /// An index-typed operand carried at runtime.
    Value(ValueKey),
    Add(Box<SizeExpr>, Box<SizeExpr>),
    Mul(Box<SizeExpr>, Box<SizeExpr>),
}

impl SizeExpr {
    pub fn is_const(&self) -> bool {
        matches!(self, Self::Const(_))
    }

    pub fn as_const(&self) -> Option<usize> {
        match self {
            Self::Const(v) => Some(*v),
            _ => None,
        }
    }

    /// Folding addition: constants combine, zero vanishes.
    pub fn add(lhs: Self, rhs: Self) -> Self {
        match (lhs, rhs) {
            (Self::Const(a), Self::Const(b)) => Self::Const(a + b),
            (Self::Const(0), other) | (other, Self::Const(0)) => other,
            (lhs, rhs) => Self::Add(Box::new(lhs), Box::new(rhs)),
        }
    }

    /// Folding multiplication: constants combine, one vanishes, zero wins.
    pub fn mul(lhs: Self, rhs: Self) -> Self {
        match (lhs, rhs) {
            (Self::Const(a), Self::Const(b)) => Self::Const(a * b),
            (Self::Const(1), other) | (other, Self::Const(1)) => other,
            (zero @ Self::Const(0), _) | (_, zero @ Self::Const(0)) => zero,
            (lhs, rhs) => Self::Mul(Box::new(lhs), Box::new(rhs)),
        }
    }

    /// One source dimension: a literal when static, a runtime lookup when not.
    fn source_dim(value: &std::sync::Arc<crate::op::Value>, dim: usize, extent: Extent) -> Self {
        match extent {
            Extent::Static(s) => Self::Const(s),
            Extent::Dynamic => Self::DimOf { value: ValueKey(value.clone()), dim },
        }
    }
}

/// Reify one expression per result dimension of `op`.
///
/// Covers the shape-producing kinds (pad, init, reshape, cast); returns
/// `None` for kinds whose result dims mirror an output operand directly.
pub fn reify_result_dims(op: &std::sync::Arc<Operation>) -> Option<SmallVec<[SizeExpr; 4]>> {
    match &op.kind {
        OpKind::Pad { static_low, static_high } => {
            let src = &op.inputs[0];
            let src_shape = src.shaped()?.shape().clone();

            // Dynamic low amounts come first among the trailing operands,
            // then dynamic high amounts.
            let mut dynamic_operands = op.inputs[1..].iter();
            let mut low_exprs: SmallVec<[SizeExpr; 4]> = SmallVec::with_capacity(static_low.len());
            for extent in static_low {
                low_exprs.push(match extent {
                    Extent::Static(s) => SizeExpr::Const(*s),
                    Extent::Dynamic => SizeExpr::Value(ValueKey(dynamic_operands.next()?.clone())),
                });
            }
            let mut high_exprs: SmallVec<[SizeExpr; 4]> = SmallVec::with_capacity(static_high.len());
            for extent in static_high {
                high_exprs.push(match extent {
                    Extent::Static(s) => SizeExpr::Const(*s),
                    Extent::Dynamic => SizeExpr::Value(ValueKey(dynamic_operands.next()?.clone())),
                });
            }

            Some(
                src_shape
                    .iter()
                    .enumerate()
                    .map(|(dim, extent)| {
                        let source = SizeExpr::source_dim(src, dim, *extent);
                        SizeExpr::add(SizeExpr::add(source, low_exprs[dim].clone()), high_exprs[dim].clone())
                    })
                    .collect(),
            )
        }

        OpKind::InitTensor { static_sizes } => {
            let mut dynamic_operands = op.inputs.iter();
            static_sizes
                .iter()
                .map(|extent| match extent {
                    Extent::Static(s) => Some(SizeExpr::Const(*s)),
                    Extent::Dynamic => Some(SizeExpr::Value(ValueKey(dynamic_operands.next()?.clone()))),
                })
                .collect()
        }

        OpKind::Reshape { reassociation } => {
            let src = &op.inputs[0];
            let src_shape = src.shaped()?.shape().clone();
            let result_rank = op.result_types[0].rank();

            if result_rank < src_shape.len() {
                // Collapsing: each result dim is the product of its group.
                Some(
                    reassociation
                        .iter()
                        .map(|group| {
                            group.iter().fold(SizeExpr::Const(1), |acc, &d| {
                                SizeExpr::mul(acc, SizeExpr::source_dim(src, d, src_shape[d]))
                            })
                        })
                        .collect(),
                )
            } else {
                // Expanding result dims are declared, not derived; dynamic
                // ones stay runtime lookups on the result itself.
                None
            }
        }

        OpKind::Cast => {
            let src = &op.inputs[0];
            let src_shape = src.shaped()?.shape().clone();
            Some(
                src_shape
                    .iter()
                    .enumerate()
                    .map(|(dim, extent)| SizeExpr::source_dim(src, dim, *extent))
                    .collect(),
            )
        }

        _ => None,
    }
}
