//! Canonicalization: local rewrite rules driven to a fixed point.
//!
//! Rules are independently confluent and individually idempotent; no global
//! ordering between them is required. The driver is a single-threaded
//! explicit worklist, not recursive rewriting, so termination and ordering
//! stay auditable. Every successful match strictly reduces operation count
//! or static-shape uncertainty, which bounds the fixed point.
//!
//! Rewrites are atomic per match: a rule fully constructs its replacement
//! (or deletion) and the driver redirects every tracked use before any other
//! rule can observe the target. Replaced values are published through the
//! `becomes_map` so an external driver owning the IR graph can redirect the
//! use-edges it holds.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use smallvec::{smallvec, SmallVec};
use tracing::{debug, trace};

use crate::affine::{AffineMap, Reassociation};
use crate::op::{OpKind, Operation, Value, ValueKey};
use crate::region::BodyValue;
use crate::shape::Extent;
use crate::types::IteratorType;

/// Result of applying one rule to one operation.
#[derive(Debug, Clone)]
pub enum RuleResult {
    /// Rule didn't match or declined to rewrite.
    NoMatch,
    /// Replacement ops to insert, plus one replacement value per old result.
    Rewritten {
        ops: SmallVec<[Arc<Operation>; 2]>,
        results: SmallVec<[Arc<Value>; 2]>,
    },
    /// Delete the op outright.
    Erase,
}

impl RuleResult {
    /// Replace the op wholesale; result `i` becomes result `i` of `op`.
    fn replace(op: Arc<Operation>) -> Self {
        let results = op.results();
        Self::Rewritten { ops: smallvec![op], results }
    }

    /// Replace each result with an existing value; the op disappears.
    fn replace_values(values: SmallVec<[Arc<Value>; 2]>) -> Self {
        Self::Rewritten { ops: smallvec![], results: values }
    }
}

type Rule = fn(&Arc<Operation>) -> RuleResult;

const RULES: &[(&str, Rule)] = &[
    ("erase_dead_op", erase_dead_op),
    ("fold_tensor_cast", fold_tensor_cast),
    ("deduplicate_inputs", deduplicate_inputs),
    ("remove_identity_op", remove_identity_op),
    ("fold_reshape_chain", fold_reshape_chain),
    ("fold_fill_reshape", fold_fill_reshape),
    ("replace_static_dims", replace_static_dims),
    ("fold_init_reshape", fold_init_reshape),
];

// =========================================================================
// Rules
// =========================================================================

/// A structured op touching a buffer with a literal-zero static extent
/// iterates zero times; with no results it can be deleted. Dynamic
/// "possibly zero" extents are not eligible.
fn erase_dead_op(op: &Arc<Operation>) -> RuleResult {
    if !op.kind.is_structured() || !op.result_types.is_empty() {
        return RuleResult::NoMatch;
    }
    let dead = op.operands().any(|v| {
        v.shaped()
            .is_some_and(|ty| ty.is_buffer() && ty.shape().iter().any(|e| *e == Extent::Static(0)))
    });
    if dead { RuleResult::Erase } else { RuleResult::NoMatch }
}

/// Source of a tensor cast that only sharpens static-shape knowledge of `v`.
fn foldable_cast_source(v: &Arc<Value>) -> Option<Arc<Value>> {
    let def = v.defining_op()?;
    if !matches!(def.kind, OpKind::Cast) {
        return None;
    }
    let src = def.inputs[0].clone();
    let src_ty = src.shaped()?;
    let declared = v.shaped()?;
    (src_ty.is_tensor() && src_ty != declared && src_ty.is_refinement_of(declared)).then_some(src)
}

/// Fold shape-sharpening casts on the operands of a structured tensor op.
/// The op is rebuilt against the pre-cast operands and sharper result types;
/// a cast back to each original result type preserves external expectations.
fn fold_tensor_cast(op: &Arc<Operation>) -> RuleResult {
    if !op.kind.is_structured() || !op.has_tensor_semantics() {
        return RuleResult::NoMatch;
    }

    let mut changed = false;
    let new_inputs: SmallVec<[Arc<Value>; 4]> = op
        .inputs
        .iter()
        .map(|v| match foldable_cast_source(v) {
            Some(src) => {
                changed = true;
                src
            }
            None => v.clone(),
        })
        .collect();

    let mut new_outputs: SmallVec<[Arc<Value>; 2]> = SmallVec::with_capacity(op.outputs.len());
    let mut new_result_types = op.result_types.clone();
    for (i, v) in op.outputs.iter().enumerate() {
        match foldable_cast_source(v) {
            Some(src) => {
                changed = true;
                if let (Some(sharper), Some(slot)) = (src.shaped(), new_result_types.get_mut(i)) {
                    *slot = sharper.clone();
                }
                new_outputs.push(src);
            }
            None => new_outputs.push(v.clone()),
        }
    }

    if !changed {
        return RuleResult::NoMatch;
    }

    let new_op = Operation::new(
        op.kind.clone(),
        new_inputs,
        new_outputs,
        new_result_types,
        op.region.clone(),
    );

    // Cast each sharpened result back to its original declared type.
    let mut ops: SmallVec<[Arc<Operation>; 2]> = smallvec![new_op.clone()];
    let mut results: SmallVec<[Arc<Value>; 2]> = SmallVec::with_capacity(op.result_types.len());
    for (i, old_ty) in op.result_types.iter().enumerate() {
        let result = new_op.result(i);
        if new_op.result_types[i] != *old_ty {
            let cast = Operation::cast(result, old_ty.clone());
            results.push(cast.result(0));
            ops.push(cast);
        } else {
            results.push(result);
        }
    }
    RuleResult::Rewritten { ops, results }
}

/// Drop repeated (value, indexing map) input pairs of a pure tensor generic,
/// redirecting region-argument uses to the surviving argument. Output arity
/// is unaffected.
fn deduplicate_inputs(op: &Arc<Operation>) -> RuleResult {
    let OpKind::Generic { indexing_maps, iterator_types, sparse } = &op.kind else {
        return RuleResult::NoMatch;
    };
    if !op.has_tensor_semantics() || sparse.is_some() {
        return RuleResult::NoMatch;
    }
    let Some(region) = &op.region else { return RuleResult::NoMatch };
    let num_operands = op.inputs.len() + op.outputs.len();
    if region.args.len() != num_operands || indexing_maps.len() != num_operands {
        return RuleResult::NoMatch;
    }

    let mut canonical: HashMap<(ValueKey, AffineMap), usize> = HashMap::new();
    let mut arg_mapping: Vec<usize> = Vec::with_capacity(num_operands);
    let mut new_inputs: SmallVec<[Arc<Value>; 4]> = SmallVec::new();
    let mut new_maps: Vec<AffineMap> = Vec::new();

    for (v, map) in op.inputs.iter().zip(indexing_maps) {
        let key = (ValueKey(v.clone()), map.clone());
        match canonical.get(&key) {
            Some(&kept) => arg_mapping.push(kept),
            None => {
                let kept = new_inputs.len();
                canonical.insert(key, kept);
                arg_mapping.push(kept);
                new_inputs.push(v.clone());
                new_maps.push(map.clone());
            }
        }
    }
    if new_inputs.len() == op.inputs.len() {
        return RuleResult::NoMatch;
    }

    for i in 0..op.outputs.len() {
        arg_mapping.push(new_inputs.len() + i);
    }
    new_maps.extend(indexing_maps[op.inputs.len()..].iter().cloned());

    let new_args = new_inputs.iter().chain(op.outputs.iter()).map(|v| v.elem()).collect();
    let new_region = region.remap_args(&arg_mapping, new_args);

    RuleResult::replace(Operation::new(
        OpKind::Generic {
            indexing_maps: new_maps,
            iterator_types: iterator_types.clone(),
            sparse: None,
        },
        new_inputs,
        op.outputs.iter().cloned(),
        op.result_types.iter().cloned(),
        Some(new_region),
    ))
}

/// Delete ops that compute nothing: an all-parallel identity-map generic
/// whose body is exactly "yield input(s)", or a buffer copy of a view onto
/// itself under equal permutations.
fn remove_identity_op(op: &Arc<Operation>) -> RuleResult {
    match &op.kind {
        OpKind::Copy { input_permutation, output_permutation } => {
            let same_view = ValueKey(op.inputs[0].clone()) == ValueKey(op.outputs[0].clone());
            if same_view && input_permutation == output_permutation && op.result_types.is_empty() {
                RuleResult::Erase
            } else {
                RuleResult::NoMatch
            }
        }
        OpKind::Generic { indexing_maps, iterator_types, .. } => {
            if op.result_types.is_empty() || !op.has_tensor_semantics() {
                return RuleResult::NoMatch;
            }
            if !indexing_maps.iter().all(AffineMap::is_identity) {
                return RuleResult::NoMatch;
            }
            if !iterator_types.iter().all(|t| *t == IteratorType::Parallel) {
                return RuleResult::NoMatch;
            }
            let Some(region) = &op.region else { return RuleResult::NoMatch };
            if !region.body.is_empty() || region.yielded.len() != op.result_types.len() {
                return RuleResult::NoMatch;
            }

            let mut replacements: SmallVec<[Arc<Value>; 2]> = SmallVec::with_capacity(op.result_types.len());
            for (yielded, result_ty) in region.yielded.iter().zip(&op.result_types) {
                let BodyValue::Arg(arg) = *yielded else { return RuleResult::NoMatch };
                let Some(input) = op.inputs.get(arg) else { return RuleResult::NoMatch };
                if input.shaped() != Some(result_ty) {
                    return RuleResult::NoMatch;
                }
                replacements.push(input.clone());
            }
            RuleResult::replace_values(replacements)
        }
        _ => RuleResult::NoMatch,
    }
}

/// Concatenate `inner` groups selected by each `outer` group.
fn compose_reassociations(outer: &Reassociation, inner: &Reassociation) -> Reassociation {
    outer.iter().map(|group| group.iter().flat_map(|&d| inner[d].iter().copied()).collect()).collect()
}

fn is_expanding(op: &Operation) -> Option<bool> {
    let src_rank = op.inputs[0].shaped()?.rank();
    Some(op.result_types[0].rank() > src_rank)
}

/// Compose directly chained reshapes that both collapse or both expand; fold
/// an exact inverse pair to its source; fold a reshape of a splat constant to
/// a directly shaped constant.
fn fold_reshape_chain(op: &Arc<Operation>) -> RuleResult {
    let OpKind::Reshape { reassociation } = &op.kind else { return RuleResult::NoMatch };
    let src = &op.inputs[0];

    if let Some(value) = src.as_splat_constant() {
        let constant = Value::constant(op.result_types[0].clone(), value);
        return RuleResult::replace_values(smallvec![constant]);
    }

    let Some(prev) = src.defining_op() else { return RuleResult::NoMatch };
    let OpKind::Reshape { reassociation: prev_groups } = &prev.kind else { return RuleResult::NoMatch };
    let prev_src = prev.inputs[0].clone();

    // Collapse-then-expand (or the reverse) with the same grouping undoes itself.
    if prev_groups == reassociation && prev_src.shaped() == Some(&op.result_types[0]) {
        return RuleResult::replace_values(smallvec![prev_src]);
    }

    let (Some(outer), Some(inner)) = (is_expanding(op), is_expanding(prev)) else {
        return RuleResult::NoMatch;
    };
    if outer != inner {
        return RuleResult::NoMatch;
    }

    let composed = if outer {
        compose_reassociations(prev_groups, reassociation)
    } else {
        compose_reassociations(reassociation, prev_groups)
    };
    RuleResult::replace(Operation::reshape(prev_src, composed, op.result_types[0].clone()))
}

/// Re-target a fill whose result is only reshaped: reshape the init instead
/// and fill at the post-reshape shape.
fn fold_fill_reshape(op: &Arc<Operation>) -> RuleResult {
    let OpKind::Reshape { reassociation } = &op.kind else { return RuleResult::NoMatch };
    let Some(fill) = op.inputs[0].defining_op() else { return RuleResult::NoMatch };
    if !matches!(fill.kind, OpKind::Fill) || fill.result_types.is_empty() {
        return RuleResult::NoMatch;
    }

    let new_reshape =
        Operation::reshape(fill.outputs[0].clone(), reassociation.clone(), op.result_types[0].clone());
    let new_fill = Operation::fill_tensor(fill.inputs[0].clone(), new_reshape.result(0));
    let results = new_fill.results();
    RuleResult::Rewritten { ops: smallvec![new_reshape, new_fill], results }
}

/// An init whose dynamic size is fed by an integer constant becomes a static
/// init, cast back to the originally declared type.
fn replace_static_dims(op: &Arc<Operation>) -> RuleResult {
    let OpKind::InitTensor { static_sizes } = &op.kind else { return RuleResult::NoMatch };

    let mut new_sizes = static_sizes.clone();
    let mut new_dynamic: SmallVec<[Arc<Value>; 4]> = SmallVec::new();
    let mut operands = op.inputs.iter();
    let mut changed = false;
    for extent in new_sizes.iter_mut() {
        if extent.is_dynamic() {
            let Some(operand) = operands.next() else { return RuleResult::NoMatch };
            match operand.as_const_int() {
                Some(v) if v >= 0 => {
                    *extent = Extent::Static(v as usize);
                    changed = true;
                }
                _ => new_dynamic.push(operand.clone()),
            }
        }
    }
    if !changed {
        return RuleResult::NoMatch;
    }

    let elem = op.result_types[0].elem();
    let new_init = Operation::init_tensor(new_sizes, new_dynamic, elem);
    let cast = Operation::cast(new_init.result(0), op.result_types[0].clone());
    let results = cast.results();
    RuleResult::Rewritten { ops: smallvec![new_init, cast], results }
}

/// A reshape of an init materializes nothing; init directly at the
/// post-reshape shape when it is fully static.
fn fold_init_reshape(op: &Arc<Operation>) -> RuleResult {
    if !matches!(op.kind, OpKind::Reshape { .. }) {
        return RuleResult::NoMatch;
    }
    let Some(init) = op.inputs[0].defining_op() else { return RuleResult::NoMatch };
    if !matches!(init.kind, OpKind::InitTensor { .. }) {
        return RuleResult::NoMatch;
    }
    let result_ty = &op.result_types[0];
    if !result_ty.is_tensor() || !result_ty.has_static_shape() {
        return RuleResult::NoMatch;
    }
    RuleResult::replace(Operation::init_tensor(result_ty.shape().clone(), [], result_ty.elem()))
}

// =========================================================================
// Worklist driver
// =========================================================================

/// Result of canonicalization.
pub struct CanonicalizeOutput {
    /// Surviving operations, in first-seen order.
    pub ops: Vec<Arc<Operation>>,
    /// Old result values mapped to their replacements, for external
    /// use-edge redirection.
    pub becomes_map: HashMap<ValueKey, Arc<Value>>,
}

#[derive(Default)]
struct Canonicalizer {
    becomes: HashMap<ValueKey, Arc<Value>>,
}

impl Canonicalizer {
    /// Final replacement for a value, with path compression so repeated
    /// lookups stay O(1).
    fn resolve(&mut self, value: &Arc<Value>) -> Arc<Value> {
        let key = ValueKey(value.clone());
        let Some(result) = self.becomes.get(&key).cloned() else {
            return value.clone();
        };

        let mut current = result;
        let mut path = vec![key];

        const MAX_DEPTH: usize = 100;
        for _ in 0..MAX_DEPTH {
            let current_key = ValueKey(current.clone());
            match self.becomes.get(&current_key) {
                Some(next) if ValueKey(next.clone()) != current_key => {
                    path.push(current_key);
                    current = next.clone();
                }
                _ => break,
            }
        }

        for k in path {
            self.becomes.insert(k, current.clone());
        }
        current
    }

    fn link(&mut self, old: Arc<Value>, new: Arc<Value>) {
        if ValueKey(old.clone()) != ValueKey(new.clone()) {
            self.becomes.insert(ValueKey(old), new);
        }
    }

    /// Refresh an op's operands against the current value map, linking old
    /// results to the refreshed op's results when anything changed.
    fn remap(&mut self, op: &Arc<Operation>) -> Arc<Operation> {
        let mut changed = false;
        let refresh = |v: &Arc<Value>, canon: &mut Self, changed: &mut bool| {
            let resolved = canon.resolve(v);
            if !Arc::ptr_eq(&resolved, v) {
                *changed = true;
            }
            resolved
        };

        let new_inputs: SmallVec<[Arc<Value>; 4]> =
            op.inputs.iter().map(|v| refresh(v, self, &mut changed)).collect();
        let new_outputs: SmallVec<[Arc<Value>; 2]> =
            op.outputs.iter().map(|v| refresh(v, self, &mut changed)).collect();

        if !changed {
            return op.clone();
        }

        let new_op = op.with_operands(new_inputs, new_outputs);
        for i in 0..op.result_types.len() {
            self.link(op.result(i), new_op.result(i));
        }
        new_op
    }

    fn has_stale_operands(&self, op: &Operation) -> bool {
        op.operands().any(|v| self.becomes.contains_key(&ValueKey(v.clone())))
    }
}

fn apply_rules(op: &Arc<Operation>) -> Option<(&'static str, RuleResult)> {
    for (name, rule) in RULES {
        match rule(op) {
            RuleResult::NoMatch => continue,
            matched => return Some((name, matched)),
        }
    }
    None
}

/// Drive the rule set to a fixed point over `ops`.
///
/// Rules apply opportunistically, one match at a time. Replacement ops go
/// back on the worklist; ops whose operands were replaced by a later match
/// are re-seeded until nothing changes.
pub fn canonicalize(ops: Vec<Arc<Operation>>) -> CanonicalizeOutput {
    const MAX_ITERATIONS: usize = 100_000;

    let mut canon = Canonicalizer::default();
    let mut worklist: VecDeque<Arc<Operation>> = ops.into();
    let mut kept: Vec<Arc<Operation>> = Vec::new();
    let mut iterations = 0usize;

    loop {
        while let Some(op) = worklist.pop_front() {
            iterations += 1;
            if iterations > MAX_ITERATIONS {
                panic!(
                    "canonicalization iteration limit ({}) exceeded: a rule is not reducing. Worklist: {}",
                    MAX_ITERATIONS,
                    worklist.len()
                );
            }

            let op = canon.remap(&op);
            match apply_rules(&op) {
                Some((name, RuleResult::Rewritten { ops: new_ops, results })) => {
                    debug_assert_eq!(results.len(), op.result_types.len());
                    for (i, replacement) in results.into_iter().enumerate() {
                        canon.link(op.result(i), replacement);
                    }
                    trace!(rule = name, op = op.id, "rewrite applied");
                    worklist.extend(new_ops);
                }
                Some((name, RuleResult::Erase)) => {
                    trace!(rule = name, op = op.id, "operation erased");
                }
                Some((_, RuleResult::NoMatch)) | None => kept.push(op),
            }
        }

        // A late rewrite can invalidate operands of already-kept ops.
        let (stale, clean): (Vec<_>, Vec<_>) =
            kept.into_iter().partition(|op| canon.has_stale_operands(op));
        kept = clean;
        if stale.is_empty() {
            break;
        }
        worklist.extend(stale);
    }

    debug!(ops = kept.len(), rewritten = canon.becomes.len(), "canonicalization fixed point reached");
    CanonicalizeOutput { ops: kept, becomes_map: canon.becomes }
}
