//! Scalar element types and cast classification.

pub mod cast;

#[cfg(any(test, feature = "proptest"))]
pub mod proptest_gen;


pub use cast::CastKind;

/// Numeric kind of a scalar type.
///
/// This is a closed set: default body synthesis picks the concrete arithmetic
/// primitive (integer vs floating-point) from this tag at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    Int,
    Float,
}

/// Scalar element types for shaped values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::EnumCount, strum::EnumIter, strum::VariantArray, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "proptest", derive(proptest_derive::Arbitrary))]
pub enum ScalarType {
    Int8,
    Int16,
    Int32,
    Int64,

    UInt8,
    UInt16,
    UInt32,
    UInt64,

    Float16,
    BFloat16,
    Float32,
    Float64,

    /// Index type for loop induction variables and dimension arithmetic.
    Index,
}

impl ScalarType {
    /// Bit width of the type. Index is modeled as 64-bit.
    pub const fn bits(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 8,
            Self::Int16 | Self::UInt16 | Self::Float16 | Self::BFloat16 => 16,
            Self::Int32 | Self::UInt32 | Self::Float32 => 32,
            Self::Int64 | Self::UInt64 | Self::Float64 | Self::Index => 64,
        }
    }

    pub const fn bytes(&self) -> usize {
        self.bits() / 8
    }

    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub const fn is_unsigned(&self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64)
    }

    pub const fn is_index(&self) -> bool {
        matches!(self, Self::Index)
    }

    pub const fn is_int(&self) -> bool {
        self.is_signed() || self.is_unsigned() || self.is_index()
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::BFloat16 | Self::Float32 | Self::Float64)
    }

    /// The numeric kind used for closed-set arithmetic dispatch.
    pub const fn kind(&self) -> NumericKind {
        if self.is_float() { NumericKind::Float } else { NumericKind::Int }
    }

    /// Short ASCII name used in mangled library-call signatures.
    pub const fn mangled(&self) -> &'static str {
        match self {
            Self::Int8 => "i8",
            Self::Int16 => "i16",
            Self::Int32 => "i32",
            Self::Int64 => "i64",
            Self::UInt8 => "u8",
            Self::UInt16 => "u16",
            Self::UInt32 => "u32",
            Self::UInt64 => "u64",
            Self::Float16 => "f16",
            Self::BFloat16 => "bf16",
            Self::Float32 => "f32",
            Self::Float64 => "f64",
            Self::Index => "index",
        }
    }
}
