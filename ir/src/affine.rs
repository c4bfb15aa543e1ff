//! Affine expressions and maps over dimension/symbol indices.
//!
//! Provides the pure algebra behind structured-op verification:
//! - reassociation validity for reshapes
//! - bandability of strided layouts (merge without relocation)
//! - symbol-free per-group map composition
//! - map evaluation for runtime shape reification

use smallvec::SmallVec;
use snafu::ensure;

use crate::error::*;
use crate::shape::{Extent, Stride};

/// Affine integer expression over dimension and symbol indices.
///
/// Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AffineExpr {
    Dim(usize),
    Symbol(usize),
    Constant(i64),
    Add(Box<AffineExpr>, Box<AffineExpr>),
    Mul(Box<AffineExpr>, Box<AffineExpr>),
    /// Floor division by a positive constant.
    FloorDiv(Box<AffineExpr>, i64),
}

impl AffineExpr {
    pub fn add(lhs: Self, rhs: Self) -> Self {
        Self::Add(Box::new(lhs), Box::new(rhs))
    }

    pub fn mul(lhs: Self, rhs: Self) -> Self {
        Self::Mul(Box::new(lhs), Box::new(rhs))
    }

    pub fn floor_div(lhs: Self, divisor: i64) -> Self {
        debug_assert!(divisor > 0);
        Self::FloorDiv(Box::new(lhs), divisor)
    }

    /// Largest dimension index referenced, if any.
    pub fn max_dim(&self) -> Option<usize> {
        match self {
            Self::Dim(d) => Some(*d),
            Self::Symbol(_) | Self::Constant(_) => None,
            Self::Add(l, r) | Self::Mul(l, r) => l.max_dim().max(r.max_dim()),
            Self::FloorDiv(e, _) => e.max_dim(),
        }
    }

    pub fn has_symbols(&self) -> bool {
        match self {
            Self::Symbol(_) => true,
            Self::Dim(_) | Self::Constant(_) => false,
            Self::Add(l, r) | Self::Mul(l, r) => l.has_symbols() || r.has_symbols(),
            Self::FloorDiv(e, _) => e.has_symbols(),
        }
    }

    fn eval(&self, dims: &[i64], symbols: &[i64]) -> i64 {
        match self {
            Self::Dim(d) => dims[*d],
            Self::Symbol(s) => symbols[*s],
            Self::Constant(c) => *c,
            Self::Add(l, r) => l.eval(dims, symbols) + r.eval(dims, symbols),
            Self::Mul(l, r) => l.eval(dims, symbols) * r.eval(dims, symbols),
            Self::FloorDiv(e, divisor) => e.eval(dims, symbols).div_euclid(*divisor),
        }
    }
}

/// Affine map: a function from (dimension, symbol) tuples to an ordered list
/// of affine expressions. Immutable value type with structural equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AffineMap {
    pub num_dims: usize,
    pub num_symbols: usize,
    pub results: SmallVec<[AffineExpr; 4]>,
}

impl AffineMap {
    pub fn new(num_dims: usize, num_symbols: usize, results: impl IntoIterator<Item = AffineExpr>) -> Self {
        Self { num_dims, num_symbols, results: results.into_iter().collect() }
    }

    /// The identity map of the given rank: `(d0, ..., dn-1) -> (d0, ..., dn-1)`.
    pub fn identity(rank: usize) -> Self {
        Self::new(rank, 0, (0..rank).map(AffineExpr::Dim))
    }

    /// A permutation map: result `i` is `Dim(perm[i])`.
    pub fn permutation(perm: &[usize]) -> Self {
        Self::new(perm.len(), 0, perm.iter().map(|&d| AffineExpr::Dim(d)))
    }

    pub fn num_results(&self) -> usize {
        self.results.len()
    }

    pub fn is_identity(&self) -> bool {
        self.num_symbols == 0
            && self.results.len() == self.num_dims
            && self.results.iter().enumerate().all(|(i, e)| matches!(e, AffineExpr::Dim(d) if *d == i))
    }

    /// True iff the map is a bijection of `rank` plain dimensions.
    pub fn is_permutation_of(&self, rank: usize) -> bool {
        if self.num_dims != rank || self.num_symbols != 0 || self.results.len() != rank {
            return false;
        }
        let mut seen = vec![false; rank];
        for expr in &self.results {
            let AffineExpr::Dim(d) = expr else { return false };
            if *d >= rank || seen[*d] {
                return false;
            }
            seen[*d] = true;
        }
        true
    }

    /// Evaluate all result expressions against concrete bindings.
    pub fn eval(&self, dims: &[i64], symbols: &[i64]) -> Result<SmallVec<[i64; 4]>> {
        ensure!(
            dims.len() == self.num_dims && symbols.len() == self.num_symbols,
            EvalArityMismatchSnafu {
                expected_dims: self.num_dims,
                expected_symbols: self.num_symbols,
                got_dims: dims.len(),
                got_symbols: symbols.len(),
            }
        );
        Ok(self.results.iter().map(|e| e.eval(dims, symbols)).collect())
    }
}

/// One reassociation group: expanded-side dimension positions that map to a
/// single collapsed-side dimension. Must be a contiguous increasing span.
pub type ReassociationGroup = SmallVec<[usize; 4]>;

/// A full reassociation: one group per collapsed dimension, partitioning the
/// expanded index range exactly once, in increasing order.
pub type Reassociation = Vec<ReassociationGroup>;

/// Check that `groups` partitions `[0, expanded_rank)` contiguously and in
/// order. The error names the first offending group.
pub fn validate_reassociation(groups: &[ReassociationGroup], expanded_rank: usize) -> Result<()> {
    let mut next = 0usize;
    for (index, group) in groups.iter().enumerate() {
        ensure!(!group.is_empty(), MalformedReassociationSnafu { index });
        for &dim in group {
            ensure!(dim == next, MalformedReassociationSnafu { index });
            next += 1;
        }
    }
    ensure!(
        next == expanded_rank,
        MalformedReassociationSnafu { index: groups.len().saturating_sub(1) }
    );
    Ok(())
}

/// One symbol-free affine map per reassociation group. Each map's dimension
/// count is the maximum dimension referenced plus one.
pub fn reassociation_maps(groups: &[ReassociationGroup]) -> Vec<AffineMap> {
    let num_dims = groups.iter().flatten().max().map_or(0, |d| d + 1);
    groups.iter().map(|group| AffineMap::new(num_dims, 0, group.iter().map(|&d| AffineExpr::Dim(d)))).collect()
}

/// Whether dims `[start, start + len)` of a strided layout can merge into one
/// dimension without relocating data.
///
/// Requires every adjacent pair to be contiguous, `stride[i] ==
/// stride[i + 1] * size[i + 1]`. A dynamic size or stride anywhere in the
/// band defeats the check.
pub fn is_reshapable_dim_band(start: usize, len: usize, sizes: &[Extent], strides: &[Stride]) -> bool {
    debug_assert!(start + len <= sizes.len() && sizes.len() == strides.len());

    for i in start..start + len {
        if sizes[i].is_dynamic() {
            return false;
        }
    }
    for i in start..start + len.saturating_sub(1) {
        let (Stride::Static(outer), Stride::Static(inner)) = (strides[i], strides[i + 1]) else {
            return false;
        };
        let Extent::Static(inner_size) = sizes[i + 1] else { return false };
        if outer != inner * inner_size as isize {
            return false;
        }
    }
    true
}
