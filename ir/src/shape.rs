//! Shaped types and result-shape inference for structured operations.
//!
//! Shapes mix static and dynamic extents. Inference never guesses: a result
//! extent is static only when every contributing extent is static, and
//! dynamic otherwise. Buffer (strided) reshapes additionally consult
//! bandability to decide whether the collapsed layout stays contiguous.

use smallvec::SmallVec;
use snafu::ensure;
use strata_dtype::ScalarType;

use crate::affine::{is_reshapable_dim_band, validate_reassociation, Reassociation};
use crate::error::*;

/// One dimension of a shaped type: a nonnegative size or the dynamic marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extent {
    Static(usize),
    Dynamic,
}

impl Extent {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic)
    }

    pub fn as_static(&self) -> Option<usize> {
        match self {
            Self::Static(v) => Some(*v),
            Self::Dynamic => None,
        }
    }
}

impl From<usize> for Extent {
    fn from(v: usize) -> Self {
        Self::Static(v)
    }
}

/// Shape type - sequence of extents.
///
/// Inline capacity of 4 avoids heap allocation for the common 1D-4D ranks.
pub type Shape = SmallVec<[Extent; 4]>;

/// One stride of a strided buffer layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stride {
    Static(isize),
    Dynamic,
}

impl Stride {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic)
    }
}

/// Shaped value type: element type plus an ordered list of extents.
///
/// Tensors are immutable SSA values; buffers are mutable strided views with
/// an explicit layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShapedType {
    Tensor {
        elem: ScalarType,
        shape: Shape,
    },
    Buffer {
        elem: ScalarType,
        shape: Shape,
        strides: SmallVec<[Stride; 4]>,
        offset: Stride,
    },
}

impl ShapedType {
    pub fn tensor(elem: ScalarType, shape: Shape) -> Self {
        Self::Tensor { elem, shape }
    }

    /// A buffer with a contiguous row-major layout. Dynamic extents force the
    /// affected strides dynamic.
    pub fn contiguous_buffer(elem: ScalarType, shape: Shape) -> Self {
        let strides = contiguous_strides(&shape);
        Self::Buffer { elem, shape, strides, offset: Stride::Static(0) }
    }

    pub fn elem(&self) -> ScalarType {
        match self {
            Self::Tensor { elem, .. } | Self::Buffer { elem, .. } => *elem,
        }
    }

    pub fn shape(&self) -> &Shape {
        match self {
            Self::Tensor { shape, .. } | Self::Buffer { shape, .. } => shape,
        }
    }

    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    pub fn is_tensor(&self) -> bool {
        matches!(self, Self::Tensor { .. })
    }

    pub fn is_buffer(&self) -> bool {
        matches!(self, Self::Buffer { .. })
    }

    pub fn has_static_shape(&self) -> bool {
        self.shape().iter().all(|e| !e.is_dynamic())
    }

    /// True iff `self` carries at least as much static shape knowledge as
    /// `declared` and agrees with it everywhere both are static. Casting a
    /// refinement to the declared type only forgets information.
    pub fn is_refinement_of(&self, declared: &Self) -> bool {
        if self.elem() != declared.elem() || self.rank() != declared.rank() {
            return false;
        }
        if self.is_tensor() != declared.is_tensor() {
            return false;
        }
        self.shape().iter().zip(declared.shape()).all(|(got, decl)| match (got, decl) {
            (_, Extent::Dynamic) => true,
            (Extent::Static(a), Extent::Static(b)) => a == b,
            (Extent::Dynamic, Extent::Static(_)) => false,
        })
    }
}

/// Row-major strides for a shape. A dynamic extent makes every outer stride
/// (which would multiply through it) dynamic.
pub fn contiguous_strides(shape: &Shape) -> SmallVec<[Stride; 4]> {
    let mut strides: SmallVec<[Stride; 4]> = SmallVec::with_capacity(shape.len());
    let mut running = Stride::Static(1);
    for extent in shape.iter().rev() {
        strides.push(running);
        running = match (running, extent) {
            (Stride::Static(s), Extent::Static(e)) => Stride::Static(s * *e as isize),
            _ => Stride::Dynamic,
        };
    }
    strides.reverse();
    strides
}

/// Collapsed extent of one reassociation group: the product of the members
/// when all are static, dynamic otherwise.
fn group_extent(expanded: &Shape, group: &[usize]) -> Extent {
    let mut product = 1usize;
    for &dim in group {
        match expanded[dim] {
            Extent::Static(s) => product *= s,
            Extent::Dynamic => return Extent::Dynamic,
        }
    }
    Extent::Static(product)
}

/// Compute the collapsed type of a reshape.
///
/// Tensor path: per-group extents only. Buffer path: a group that is not
/// bandable cannot keep a contiguous layout, so its stride and the layout
/// offset turn dynamic, marking a "copy required" layout rather than failing.
pub fn collapsed_type(src: &ShapedType, groups: &Reassociation) -> Result<ShapedType> {
    validate_reassociation(groups, src.rank())?;

    let shape: Shape = groups.iter().map(|g| group_extent(src.shape(), g)).collect();

    match src {
        ShapedType::Tensor { elem, .. } => Ok(ShapedType::Tensor { elem: *elem, shape }),
        ShapedType::Buffer { elem, shape: src_shape, strides, offset } => {
            let mut out_strides: SmallVec<[Stride; 4]> = SmallVec::with_capacity(groups.len());
            let mut out_offset = *offset;
            for group in groups {
                let start = group[0];
                if is_reshapable_dim_band(start, group.len(), src_shape, strides) {
                    out_strides.push(strides[start + group.len() - 1]);
                } else {
                    out_strides.push(Stride::Dynamic);
                    out_offset = Stride::Dynamic;
                }
            }
            Ok(ShapedType::Buffer { elem: *elem, shape, strides: out_strides, offset: out_offset })
        }
    }
}

/// Verify per-group extent consistency between the collapsed and expanded
/// sides of a reshape.
///
/// A collapsed extent must equal the product of its group when the whole
/// group is static, and must be dynamic when any member is. On the expanding
/// direction a group admits at most one dynamic member; the collapsing
/// direction leaves divisibility to the runtime.
pub fn verify_group_extents(
    collapsed: &Shape,
    expanded: &Shape,
    groups: &Reassociation,
    expanding: bool,
) -> Result<()> {
    for (dim, group) in groups.iter().enumerate() {
        if expanding {
            let dynamic_members = group.iter().filter(|&&d| expanded[d].is_dynamic()).count();
            ensure!(dynamic_members <= 1, TooManyDynamicDimsSnafu { group: dim });
        }

        let inferred = group_extent(expanded, group);
        let declared = collapsed[dim];
        match (inferred, declared) {
            (Extent::Static(product), Extent::Static(c)) => {
                ensure!(
                    product == c,
                    CollapsedDimMismatchSnafu { dim, expected: inferred, got: declared }
                );
            }
            (Extent::Dynamic, Extent::Dynamic) => {}
            _ => {
                return CollapsedDimMismatchSnafu { dim, expected: inferred, got: declared }.fail();
            }
        }
    }
    Ok(())
}

/// Result shape of a pad: per-dim `source + low + high` when all three are
/// static, dynamic otherwise. Rank is preserved.
pub fn pad_result_shape(src: &Shape, low: &[Extent], high: &[Extent]) -> Result<Shape> {
    ensure!(
        low.len() == src.len(),
        AttributeArityMismatchSnafu { attribute: "static_low", expected: src.len(), got: low.len() }
    );
    ensure!(
        high.len() == src.len(),
        AttributeArityMismatchSnafu { attribute: "static_high", expected: src.len(), got: high.len() }
    );

    Ok(src
        .iter()
        .zip(low.iter().zip(high))
        .map(|(s, (l, h))| match (s, l, h) {
            (Extent::Static(s), Extent::Static(l), Extent::Static(h)) => Extent::Static(s + l + h),
            _ => Extent::Dynamic,
        })
        .collect())
}

/// Inferred result type of a pad over a shaped source.
pub fn pad_result_type(src: &ShapedType, low: &[Extent], high: &[Extent]) -> Result<ShapedType> {
    let shape = pad_result_shape(src.shape(), low, high)?;
    Ok(ShapedType::Tensor { elem: src.elem(), shape })
}

/// Result type of an init: direct construction from the declared sizes. A
/// size literally encoded as the dynamic marker stays dynamic.
pub fn init_result_type(static_sizes: &Shape, elem: ScalarType) -> ShapedType {
    ShapedType::Tensor { elem, shape: static_sizes.clone() }
}
