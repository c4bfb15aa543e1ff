use crate::ScalarType;

/// The concrete conversion selected for an implicit element cast.
///
/// Classification is a closed match over the (source, destination) numeric
/// kinds. Callers that receive [`CastKind::Unsupported`] degrade to the
/// uncast operand; the verifier reports the mismatch later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastKind {
    /// Source and destination are the same type.
    Identity,
    /// Integer widening, source is signed.
    SignExtend,
    /// Integer widening, source is unsigned.
    ZeroExtend,
    /// Integer narrowing.
    TruncateInt,
    /// Float widening.
    ExtendFloat,
    /// Float narrowing.
    TruncateFloat,
    /// Direct integer to float conversion.
    IntToFloat,
    /// Direct float to integer conversion.
    FloatToInt,
    /// Conversion between Index and a sized integer.
    IndexCast,
    /// No conversion exists for this pairing.
    Unsupported,
}

impl ScalarType {
    /// Classify the implicit cast from `self` to `to`.
    pub fn cast_kind(self, to: Self) -> CastKind {
        if self == to {
            return CastKind::Identity;
        }

        // Index <-> sized integer round-trips through a dedicated cast;
        // Index <-> float has no direct conversion.
        if self.is_index() || to.is_index() {
            let other = if self.is_index() { to } else { self };
            return if other.is_int() { CastKind::IndexCast } else { CastKind::Unsupported };
        }

        match (self.is_int(), to.is_int(), self.is_float(), to.is_float()) {
            (true, true, _, _) => {
                let (from_bits, to_bits) = (self.bits(), to.bits());
                if from_bits < to_bits {
                    if self.is_signed() { CastKind::SignExtend } else { CastKind::ZeroExtend }
                } else if from_bits > to_bits {
                    CastKind::TruncateInt
                } else {
                    // Same width, different signedness: ambiguous, not synthesized.
                    CastKind::Unsupported
                }
            }
            (_, _, true, true) => {
                let (from_bits, to_bits) = (self.bits(), to.bits());
                if from_bits < to_bits {
                    CastKind::ExtendFloat
                } else if from_bits > to_bits {
                    CastKind::TruncateFloat
                } else {
                    // f16 <-> bf16: same width, different encodings.
                    CastKind::Unsupported
                }
            }
            (true, _, _, true) => CastKind::IntToFloat,
            (_, true, true, _) => CastKind::FloatToInt,
            _ => CastKind::Unsupported,
        }
    }
}
