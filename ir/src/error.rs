use snafu::Snafu;
use strata_dtype::ScalarType;

use crate::region::BodyValue;
use crate::shape::{Extent, ShapedType};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Reassociation group is non-contiguous, overlapping, or out of range.
    #[snafu(display("reassociation group {index} is non-contiguous, overlapping, or out of range"))]
    MalformedReassociation { index: usize },

    /// Reassociation group count does not match the collapsed rank.
    #[snafu(display("expected {expected} reassociation groups, got {got}"))]
    ReassociationArityMismatch { expected: usize, got: usize },

    /// Reshape source and result have equal ranks.
    #[snafu(display("reshape of rank {rank} must collapse or expand; equal ranks do neither"))]
    ExpectedCollapseOrExpand { rank: usize },

    /// Collapsed extent disagrees with its group's members.
    #[snafu(display("collapsed dimension {dim} expected extent {expected:?}, got {got:?}"))]
    CollapsedDimMismatch { dim: usize, expected: Extent, got: Extent },

    /// Expanding reshape group has more than one dynamic member.
    #[snafu(display("expanding reassociation group {group} has more than one dynamic dimension"))]
    TooManyDynamicDims { group: usize },

    /// Rank-0 reshape requires unit extents on the ranked side.
    #[snafu(display("rank-0 reshape requires unit extents, dimension {dim} is {got:?}"))]
    ZeroRankReshapeNonUnit { dim: usize, got: Extent },

    /// Reshape must stay within one shaped class.
    #[snafu(display("reshape source and result must both be tensors or both be buffers"))]
    MixedShapedKinds,

    /// Declared buffer layout disagrees with the inferred collapsed layout.
    #[snafu(display("collapsed buffer layout mismatch: inferred {inferred:?}, declared {declared:?}"))]
    LayoutMismatch { inferred: ShapedType, declared: ShapedType },

    /// Inferred result extent disagrees with the declared one.
    #[snafu(display("dimension {dim}: inferred extent {inferred:?} does not match declared {declared:?}"))]
    ShapeMismatch { dim: usize, inferred: Extent, declared: Extent },

    /// Paired operands have different ranks.
    #[snafu(display("rank mismatch: expected {expected}, got {got}"))]
    RankMismatch { expected: usize, got: usize },

    /// Paired operands have different element types.
    #[snafu(display("element type mismatch: expected {expected:?}, got {got:?}"))]
    ElementTypeMismatch { expected: ScalarType, got: ScalarType },

    /// Permutation map is not a permutation of the operand rank.
    #[snafu(display("expected a permutation map of rank {rank}"))]
    InvalidPermutation { rank: usize },

    /// Rank-0 copy admits no permutation maps.
    #[snafu(display("permutation maps are not allowed on rank-0 operands"))]
    PermutationOnRankZero,

    /// Fill without results must target a mutable buffer.
    #[snafu(display("fill producing no result must write into a buffer, not an immutable tensor"))]
    FillNeedsWritableOutput,

    /// Operation kind requires a computation region.
    #[snafu(display("operation requires a computation region"))]
    MissingRegion,

    /// Block argument count violates the kind's arity rule.
    #[snafu(display("region expects {expected} block arguments, got {got}"))]
    RegionArityMismatch { expected: usize, got: usize },

    /// Block argument type violates the kind's arity rule.
    #[snafu(display("region argument {index} expects type {expected:?}, got {got:?}"))]
    RegionArgTypeMismatch { index: usize, expected: ScalarType, got: ScalarType },

    /// Region body or yield references a handle with no backing value.
    #[snafu(display("region references out-of-range value handle {handle:?}"))]
    InvalidBodyHandle { handle: BodyValue },

    /// Yield operand count does not match the parent's output arity.
    #[snafu(display("yield expects {expected} operands, got {got}"))]
    YieldArityMismatch { expected: usize, got: usize },

    /// Yield operand type does not match the corresponding output element type.
    #[snafu(display("yield operand {index} expects type {expected:?}, got {got:?}"))]
    YieldTypeMismatch { index: usize, expected: ScalarType, got: ScalarType },

    /// Attribute list length is wrong for the op's rank or loop structure.
    #[snafu(display("attribute `{attribute}` expects {expected} entries, got {got}"))]
    AttributeArityMismatch { attribute: &'static str, expected: usize, got: usize },

    /// Indexing map dimension count disagrees with the loop count.
    #[snafu(display("indexing map {index} expects {expected_dims} dimensions, got {got_dims}"))]
    IndexingMapArityMismatch { index: usize, expected_dims: usize, got_dims: usize },

    /// Indexing map result count disagrees with the operand rank.
    #[snafu(display("indexing map {index} expects {expected} results for the operand rank, got {got}"))]
    IndexingMapResultMismatch { index: usize, expected: usize, got: usize },

    /// Sparse annotations require pure tensor semantics.
    #[snafu(display("sparse annotations require all operands to be tensors"))]
    SparseRequiresTensorSemantics,

    /// Sparse annotations require exactly one output.
    #[snafu(display("sparse annotations require exactly one output, got {outputs}"))]
    SparseSingleOutput { outputs: usize },

    /// The sole output of a sparse-annotated op may never be sparse.
    #[snafu(display("output dimension {dim} may not be annotated sparse"))]
    SparseOutputAnnotated { dim: usize },

    /// RegionBuilder cannot synthesize the requested numeric conversion.
    #[snafu(display("unsupported cast from {from:?} to {to:?}"))]
    UnsupportedCast { from: ScalarType, to: ScalarType },

    /// Affine evaluation received the wrong number of bindings.
    #[snafu(display(
        "affine evaluation expects {expected_dims} dims and {expected_symbols} symbols, got {got_dims} and {got_symbols}"
    ))]
    EvalArityMismatch { expected_dims: usize, expected_symbols: usize, got_dims: usize, got_symbols: usize },

    /// Operand list length is wrong for the op kind.
    #[snafu(display("{kind} expects {expected} operands, got {got}"))]
    OperandArityMismatch { kind: &'static str, expected: usize, got: usize },

    /// Result list length is wrong for the op kind.
    #[snafu(display("{kind} expects {expected} results, got {got}"))]
    ResultArityMismatch { kind: &'static str, expected: usize, got: usize },

    /// Operand expected to carry a shaped type.
    #[snafu(display("operand {index} must be a shaped value"))]
    NotShaped { index: usize },
}
