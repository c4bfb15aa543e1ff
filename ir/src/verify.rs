//! Per-kind operation verification.
//!
//! One entry point, [`verify`], dispatching on the kind tag. Verification is
//! fail-fast: the first violated rule aborts checking with a single
//! diagnostic. Checks are read-only over the operation and its operands, so
//! independent operations may be verified in parallel as long as diagnostics
//! go through a thread-safe sink.

use snafu::ensure;
use strata_dtype::ScalarType;

use crate::error::*;
use crate::op::{OpKind, Operation, Value};
use crate::region::{BodyOp, BodyValue, Region};
use crate::shape::{collapsed_type, pad_result_type, verify_group_extents, Extent, ShapedType};
use crate::types::{IteratorType, SparseKind};

/// Verify one operation instance against its kind's contract.
pub fn verify(op: &Operation) -> Result<()> {
    // Value-producing kinds declare exactly one result type.
    if matches!(op.kind, OpKind::InitTensor { .. } | OpKind::Pad { .. } | OpKind::Reshape { .. } | OpKind::Cast) {
        ensure!(
            op.result_types.len() == 1,
            ResultArityMismatchSnafu { kind: <&'static str>::from(&op.kind), expected: 1usize, got: op.result_types.len() }
        );
    }

    match &op.kind {
        OpKind::Copy { input_permutation, output_permutation } => {
            verify_copy(op, input_permutation.as_ref(), output_permutation.as_ref())?;
        }
        OpKind::Fill => verify_fill(op)?,
        OpKind::Generic { indexing_maps, iterator_types, sparse } => {
            verify_generic(op, indexing_maps, iterator_types, sparse.as_deref())?;
        }
        OpKind::Conv { strides, dilations } => verify_conv(op, strides, dilations)?,
        OpKind::Pooling { window_dims, strides, dilations, .. } => {
            verify_pooling(op, window_dims, strides, dilations)?;
        }
        OpKind::InitTensor { static_sizes } => verify_init_tensor(op, static_sizes)?,
        OpKind::Pad { static_low, static_high } => verify_pad(op, static_low, static_high)?,
        OpKind::Reshape { reassociation } => verify_reshape(op, reassociation)?,
        OpKind::Cast => verify_cast(op)?,
    }

    if let Some(region) = &op.region {
        verify_body(region)?;
        verify_yield(op, region)?;
    }
    Ok(())
}

/// Every body and yield handle must resolve to an argument or a prior body
/// op, and every body cast must carry a defined conversion. The builder only
/// emits in-range handles and degrades unsupported pairings to the uncast
/// operand, so only hand-built regions can trip these.
fn verify_body(region: &Region) -> Result<()> {
    for op in &region.body {
        match op {
            BodyOp::Const { .. } => {}
            BodyOp::Arith { lhs, rhs, .. } => {
                body_value_type(region, *lhs)?;
                body_value_type(region, *rhs)?;
            }
            BodyOp::Cast { kind, src, to } => {
                let from = body_value_type(region, *src)?;
                ensure!(*kind != strata_dtype::CastKind::Unsupported, UnsupportedCastSnafu { from, to: *to });
            }
        }
    }
    for &yielded in &region.yielded {
        body_value_type(region, yielded)?;
    }
    Ok(())
}

fn body_value_type(region: &Region, v: BodyValue) -> Result<ScalarType> {
    region.try_value_type(v).ok_or_else(|| InvalidBodyHandleSnafu { handle: v }.build())
}

fn shaped_operand(op: &Operation, index: usize) -> Result<&ShapedType> {
    let operand: &Value = op
        .operands()
        .nth(index)
        .ok_or_else(|| OperandArityMismatchSnafu { kind: "operation", expected: index + 1, got: index }.build())?;
    operand.shaped().ok_or_else(|| NotShapedSnafu { index }.build())
}

fn verify_copy(
    op: &Operation,
    input_permutation: Option<&crate::affine::AffineMap>,
    output_permutation: Option<&crate::affine::AffineMap>,
) -> Result<()> {
    ensure!(
        op.inputs.len() == 1 && op.outputs.len() == 1,
        OperandArityMismatchSnafu { kind: "copy", expected: 2usize, got: op.inputs.len() + op.outputs.len() }
    );
    let input = shaped_operand(op, 0)?;
    let output = shaped_operand(op, 1)?;

    ensure!(
        input.elem() == output.elem(),
        ElementTypeMismatchSnafu { expected: input.elem(), got: output.elem() }
    );
    ensure!(input.rank() == output.rank(), RankMismatchSnafu { expected: input.rank(), got: output.rank() });

    let rank = input.rank();
    for map in [input_permutation, output_permutation].into_iter().flatten() {
        ensure!(rank > 0, PermutationOnRankZeroSnafu);
        ensure!(map.is_permutation_of(rank), InvalidPermutationSnafu { rank });
    }
    Ok(())
}

fn verify_fill(op: &Operation) -> Result<()> {
    ensure!(
        op.inputs.len() == 1 && op.outputs.len() == 1,
        OperandArityMismatchSnafu { kind: "fill", expected: 2usize, got: op.inputs.len() + op.outputs.len() }
    );
    let value = &op.inputs[0];
    let output = shaped_operand(op, 1)?;

    ensure!(
        value.elem() == output.elem(),
        ElementTypeMismatchSnafu { expected: output.elem(), got: value.elem() }
    );

    // A fill with no result writes in place; immutable tensors cannot absorb it.
    if op.result_types.is_empty() {
        ensure!(output.is_buffer(), FillNeedsWritableOutputSnafu);
    }
    Ok(())
}

fn verify_generic(
    op: &Operation,
    indexing_maps: &[crate::affine::AffineMap],
    iterator_types: &[IteratorType],
    sparse: Option<&[Vec<SparseKind>]>,
) -> Result<()> {
    let num_operands = op.inputs.len() + op.outputs.len();
    ensure!(
        indexing_maps.len() == num_operands,
        AttributeArityMismatchSnafu { attribute: "indexing_maps", expected: num_operands, got: indexing_maps.len() }
    );

    let loops = iterator_types.len();
    for (index, map) in indexing_maps.iter().enumerate() {
        ensure!(
            map.num_dims == loops,
            IndexingMapArityMismatchSnafu { index, expected_dims: loops, got_dims: map.num_dims }
        );
        let rank = shaped_operand(op, index)?.rank();
        ensure!(
            map.num_results() == rank,
            IndexingMapResultMismatchSnafu { index, expected: rank, got: map.num_results() }
        );
    }

    // Block arguments carry the operand element types, optionally prefixed
    // by index-typed induction arguments.
    let region = op.region.as_ref().ok_or_else(|| MissingRegionSnafu.build())?;
    ensure!(
        region.args.len() >= num_operands,
        RegionArityMismatchSnafu { expected: num_operands, got: region.args.len() }
    );
    let index_args = region.args.len() - num_operands;
    for (index, arg) in region.args[..index_args].iter().enumerate() {
        ensure!(
            *arg == ScalarType::Index,
            RegionArgTypeMismatchSnafu { index, expected: ScalarType::Index, got: *arg }
        );
    }
    for (offset, (arg, operand)) in region.args[index_args..].iter().zip(op.operands()).enumerate() {
        ensure!(
            *arg == operand.elem(),
            RegionArgTypeMismatchSnafu { index: index_args + offset, expected: operand.elem(), got: *arg }
        );
    }

    if let Some(annotations) = sparse {
        verify_sparse(op, annotations)?;
    }
    Ok(())
}

fn verify_sparse(op: &Operation, annotations: &[Vec<SparseKind>]) -> Result<()> {
    ensure!(op.has_tensor_semantics(), SparseRequiresTensorSemanticsSnafu);
    ensure!(op.outputs.len() == 1, SparseSingleOutputSnafu { outputs: op.outputs.len() });

    let num_operands = op.inputs.len() + op.outputs.len();
    ensure!(
        annotations.len() == num_operands,
        AttributeArityMismatchSnafu { attribute: "sparse", expected: num_operands, got: annotations.len() }
    );
    for (index, entry) in annotations.iter().enumerate() {
        let rank = shaped_operand(op, index)?.rank();
        ensure!(
            entry.len() == rank,
            AttributeArityMismatchSnafu { attribute: "sparse", expected: rank, got: entry.len() }
        );
    }

    // The sole output may never be annotated sparse.
    let output_entry = &annotations[op.inputs.len()];
    for (dim, kind) in output_entry.iter().enumerate() {
        ensure!(*kind == SparseKind::Dense, SparseOutputAnnotatedSnafu { dim });
    }
    Ok(())
}

fn verify_conv(op: &Operation, strides: &[usize], dilations: &[usize]) -> Result<()> {
    ensure!(
        op.inputs.len() == 2 && op.outputs.len() == 1,
        OperandArityMismatchSnafu { kind: "conv", expected: 3usize, got: op.inputs.len() + op.outputs.len() }
    );
    let input = shaped_operand(op, 0)?;
    let filter = shaped_operand(op, 1)?;
    let output = shaped_operand(op, 2)?;

    for other in [filter, output] {
        ensure!(
            other.elem() == input.elem(),
            ElementTypeMismatchSnafu { expected: input.elem(), got: other.elem() }
        );
        ensure!(other.rank() == input.rank(), RankMismatchSnafu { expected: input.rank(), got: other.rank() });
    }

    // Batch and channel dims carry no window; spatial loops are rank - 2.
    let spatial = input.rank().saturating_sub(2);
    verify_window_attrs(spatial, strides, dilations)
}

fn verify_pooling(
    op: &Operation,
    window_dims: &crate::shape::Shape,
    strides: &[usize],
    dilations: &[usize],
) -> Result<()> {
    ensure!(
        op.inputs.len() == 1 && op.outputs.len() == 1,
        OperandArityMismatchSnafu { kind: "pooling", expected: 2usize, got: op.inputs.len() + op.outputs.len() }
    );
    let input = shaped_operand(op, 0)?;
    let output = shaped_operand(op, 1)?;

    ensure!(
        output.elem() == input.elem(),
        ElementTypeMismatchSnafu { expected: input.elem(), got: output.elem() }
    );
    ensure!(output.rank() == input.rank(), RankMismatchSnafu { expected: input.rank(), got: output.rank() });
    ensure!(
        window_dims.len() == input.rank(),
        AttributeArityMismatchSnafu { attribute: "window_dims", expected: input.rank(), got: window_dims.len() }
    );

    verify_window_attrs(window_dims.len(), strides, dilations)
}

fn verify_window_attrs(window_loops: usize, strides: &[usize], dilations: &[usize]) -> Result<()> {
    if !strides.is_empty() {
        ensure!(
            strides.len() == window_loops,
            AttributeArityMismatchSnafu { attribute: "strides", expected: window_loops, got: strides.len() }
        );
    }
    if !dilations.is_empty() {
        ensure!(
            dilations.len() == window_loops,
            AttributeArityMismatchSnafu { attribute: "dilations", expected: window_loops, got: dilations.len() }
        );
    }
    Ok(())
}

fn verify_init_tensor(op: &Operation, static_sizes: &crate::shape::Shape) -> Result<()> {
    let declared = &op.result_types[0];
    ensure!(
        static_sizes.len() == declared.rank(),
        AttributeArityMismatchSnafu { attribute: "static_sizes", expected: declared.rank(), got: static_sizes.len() }
    );

    let dynamic = static_sizes.iter().filter(|e| e.is_dynamic()).count();
    ensure!(
        op.inputs.len() == dynamic,
        OperandArityMismatchSnafu { kind: "init_tensor", expected: dynamic, got: op.inputs.len() }
    );

    for (dim, (size, decl)) in static_sizes.iter().zip(declared.shape()).enumerate() {
        ensure!(size == decl, ShapeMismatchSnafu { dim, inferred: *size, declared: *decl });
    }
    Ok(())
}

fn verify_pad(op: &Operation, static_low: &[Extent], static_high: &[Extent]) -> Result<()> {
    let src = shaped_operand(op, 0)?;
    let declared = &op.result_types[0];

    let inferred = pad_result_type(src, static_low, static_high)?;
    ensure!(
        inferred.rank() == declared.rank(),
        RankMismatchSnafu { expected: inferred.rank(), got: declared.rank() }
    );
    ensure!(
        inferred.elem() == declared.elem(),
        ElementTypeMismatchSnafu { expected: inferred.elem(), got: declared.elem() }
    );
    for (dim, (inf, decl)) in inferred.shape().iter().zip(declared.shape()).enumerate() {
        // Only statically-known inferred dims constrain the declared type.
        if let Extent::Static(_) = inf {
            ensure!(inf == decl, ShapeMismatchSnafu { dim, inferred: *inf, declared: *decl });
        }
    }

    // The body computes the pad value from `rank` index arguments.
    let region = op.region.as_ref().ok_or_else(|| MissingRegionSnafu.build())?;
    ensure!(
        region.args.len() == src.rank(),
        RegionArityMismatchSnafu { expected: src.rank(), got: region.args.len() }
    );
    for (index, arg) in region.args.iter().enumerate() {
        ensure!(
            *arg == ScalarType::Index,
            RegionArgTypeMismatchSnafu { index, expected: ScalarType::Index, got: *arg }
        );
    }
    Ok(())
}

fn verify_reshape(op: &Operation, reassociation: &crate::affine::Reassociation) -> Result<()> {
    let src = shaped_operand(op, 0)?;
    let result = &op.result_types[0];

    ensure!(src.is_tensor() == result.is_tensor(), MixedShapedKindsSnafu);
    ensure!(
        src.elem() == result.elem(),
        ElementTypeMismatchSnafu { expected: src.elem(), got: result.elem() }
    );

    let (src_rank, result_rank) = (src.rank(), result.rank());
    ensure!(src_rank != result_rank, ExpectedCollapseOrExpandSnafu { rank: src_rank });

    let expanding = result_rank > src_rank;
    let (collapsed, expanded) = if expanding { (src, result) } else { (result, src) };

    // Rank-0 reshapes carry an empty reassociation; every expanded dim must
    // be a static unit.
    if collapsed.rank() == 0 {
        for (dim, extent) in expanded.shape().iter().enumerate() {
            ensure!(
                *extent == Extent::Static(1),
                ZeroRankReshapeNonUnitSnafu { dim, got: *extent }
            );
        }
        ensure!(
            reassociation.is_empty(),
            ReassociationArityMismatchSnafu { expected: 0usize, got: reassociation.len() }
        );
        return Ok(());
    }

    ensure!(
        reassociation.len() == collapsed.rank(),
        ReassociationArityMismatchSnafu { expected: collapsed.rank(), got: reassociation.len() }
    );
    crate::affine::validate_reassociation(reassociation, expanded.rank())?;
    verify_group_extents(collapsed.shape(), expanded.shape(), reassociation, expanding)?;

    // A collapsing buffer reshape must declare the layout its source strides
    // admit; a non-bandable group infers a dynamic "copy required" layout.
    if !expanding && src.is_buffer() {
        let inferred = collapsed_type(src, reassociation)?;
        ensure!(
            inferred == *result,
            LayoutMismatchSnafu { inferred, declared: result.clone() }
        );
    }
    Ok(())
}

fn verify_cast(op: &Operation) -> Result<()> {
    let src = shaped_operand(op, 0)?;
    let result = &op.result_types[0];

    ensure!(src.is_tensor() == result.is_tensor(), MixedShapedKindsSnafu);
    ensure!(
        src.elem() == result.elem(),
        ElementTypeMismatchSnafu { expected: src.elem(), got: result.elem() }
    );
    ensure!(src.rank() == result.rank(), RankMismatchSnafu { expected: src.rank(), got: result.rank() });

    // A cast may refine or generalize static knowledge, never contradict it.
    for (dim, (s, r)) in src.shape().iter().zip(result.shape()).enumerate() {
        if let (Extent::Static(a), Extent::Static(b)) = (s, r) {
            ensure!(a == b, ShapeMismatchSnafu { dim, inferred: *s, declared: *r });
        }
    }
    Ok(())
}

/// Verify the region terminator against the parent's output contract.
///
/// Structured ops yield one value per output, each of the output's element
/// type. Pad yields exactly one value of the padded element type. Other
/// parents leave the terminator unconstrained.
fn verify_yield(op: &Operation, region: &Region) -> Result<()> {
    let expected: Vec<ScalarType> = if op.kind.is_structured() {
        op.outputs.iter().map(|v| v.elem()).collect()
    } else if matches!(op.kind, OpKind::Pad { .. }) {
        vec![op.result_types[0].elem()]
    } else {
        return Ok(());
    };

    ensure!(
        region.yielded.len() == expected.len(),
        YieldArityMismatchSnafu { expected: expected.len(), got: region.yielded.len() }
    );
    for (index, (&yielded, &want)) in region.yielded.iter().zip(&expected).enumerate() {
        let got = region.value_type(yielded);
        ensure!(got == want, YieldTypeMismatchSnafu { index, expected: want, got });
    }
    Ok(())
}
