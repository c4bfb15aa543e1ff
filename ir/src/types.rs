//! Fundamental attribute and constant types shared across the IR.

use strata_dtype::NumericKind;

/// Constant scalar payload.
///
/// Float equality and hashing are bit-exact so constants can key hash maps
/// and participate in structural comparison.
#[derive(Debug, Clone, Copy)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
}

impl PartialEq for ConstValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for ConstValue {}

impl std::hash::Hash for ConstValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Int(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
        }
    }
}

impl ConstValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(_) => None,
        }
    }
}

impl From<i64> for ConstValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ConstValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// Per-loop-dimension iterator tag of a structured op's implicit loop nest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum IteratorType {
    Parallel,
    Reduction,
    Window,
}

/// Per-dimension sparsity tag. Closed two-valued set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SparseKind {
    Dense,
    Sparse,
}

/// Arithmetic primitives available to synthesized op bodies. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ArithKind {
    Add,
    Sub,
    Mul,
    Max,
    Min,
}

impl ArithKind {
    /// Name of the concrete primitive after numeric-kind dispatch,
    /// e.g. `addi` for integers and `addf` for floats.
    pub fn instruction(&self, kind: NumericKind) -> &'static str {
        match (self, kind) {
            (Self::Add, NumericKind::Int) => "addi",
            (Self::Add, NumericKind::Float) => "addf",
            (Self::Sub, NumericKind::Int) => "subi",
            (Self::Sub, NumericKind::Float) => "subf",
            (Self::Mul, NumericKind::Int) => "muli",
            (Self::Mul, NumericKind::Float) => "mulf",
            (Self::Max, NumericKind::Int) => "maxi",
            (Self::Max, NumericKind::Float) => "maxf",
            (Self::Min, NumericKind::Int) => "mini",
            (Self::Min, NumericKind::Float) => "minf",
        }
    }
}

/// Pooling accumulator selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PoolKind {
    Max,
    Min,
    Sum,
}
