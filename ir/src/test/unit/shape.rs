use smallvec::smallvec;

use strata_dtype::ScalarType;

use crate::error::Error;
use crate::shape::*;

fn static_shape(dims: &[usize]) -> Shape {
    dims.iter().map(|&d| Extent::Static(d)).collect()
}

#[test]
fn row_major_strides_for_static_shape() {
    let strides = contiguous_strides(&static_shape(&[2, 3, 4]));
    assert_eq!(strides.as_slice(), &[Stride::Static(12), Stride::Static(4), Stride::Static(1)]);
}

#[test]
fn dynamic_extent_poisons_outer_strides() {
    let shape = smallvec![Extent::Static(2), Extent::Dynamic, Extent::Static(4)];
    let strides = contiguous_strides(&shape);
    assert_eq!(strides.as_slice(), &[Stride::Dynamic, Stride::Static(4), Stride::Static(1)]);
}

#[test]
fn collapse_static_tensor() {
    let src = ShapedType::tensor(ScalarType::Float32, static_shape(&[2, 3, 4]));
    let groups = vec![smallvec![0, 1], smallvec![2]];
    let out = collapsed_type(&src, &groups).unwrap();
    assert_eq!(out, ShapedType::tensor(ScalarType::Float32, static_shape(&[6, 4])));
}

#[test]
fn collapse_dynamic_group_goes_dynamic() {
    let shape = smallvec![Extent::Static(2), Extent::Dynamic, Extent::Static(4)];
    let src = ShapedType::tensor(ScalarType::Int32, shape);
    let groups = vec![smallvec![0, 1], smallvec![2]];
    let out = collapsed_type(&src, &groups).unwrap();
    assert_eq!(out.shape().as_slice(), &[Extent::Dynamic, Extent::Static(4)]);
}

#[test]
fn collapse_contiguous_buffer_keeps_layout() {
    let src = ShapedType::contiguous_buffer(ScalarType::Float32, static_shape(&[2, 3, 4]));
    let groups = vec![smallvec![0, 1], smallvec![2]];
    let out = collapsed_type(&src, &groups).unwrap();

    let ShapedType::Buffer { shape, strides, offset, .. } = out else { panic!("expected buffer") };
    assert_eq!(shape, static_shape(&[6, 4]));
    assert_eq!(strides.as_slice(), &[Stride::Static(4), Stride::Static(1)]);
    assert_eq!(offset, Stride::Static(0));
}

#[test]
fn collapse_padded_buffer_requires_copy() {
    // Row stride 24 is not 3*4: merging dims 0 and 1 relocates data, so the
    // merged stride and the offset degrade to dynamic instead of failing.
    let shape = static_shape(&[2, 3, 4]);
    let strides = smallvec![Stride::Static(24), Stride::Static(4), Stride::Static(1)];
    let src = ShapedType::Buffer {
        elem: ScalarType::Float32,
        shape,
        strides,
        offset: Stride::Static(0),
    };

    let groups = vec![smallvec![0, 1], smallvec![2]];
    let out = collapsed_type(&src, &groups).unwrap();
    let ShapedType::Buffer { strides, offset, .. } = out else { panic!("expected buffer") };
    assert_eq!(strides.as_slice(), &[Stride::Dynamic, Stride::Static(1)]);
    assert_eq!(offset, Stride::Dynamic);
}

#[test]
fn collapse_rejects_bad_reassociation() {
    let src = ShapedType::tensor(ScalarType::Float32, static_shape(&[2, 3]));
    let groups = vec![smallvec![0]];
    assert!(matches!(
        collapsed_type(&src, &groups),
        Err(Error::MalformedReassociation { .. })
    ));
}

#[test]
fn group_extents_reject_static_product_mismatch() {
    let collapsed = static_shape(&[7, 4]);
    let expanded = static_shape(&[2, 3, 4]);
    let groups = vec![smallvec![0, 1], smallvec![2]];
    assert!(matches!(
        verify_group_extents(&collapsed, &expanded, &groups, false),
        Err(Error::CollapsedDimMismatch { dim: 0, .. })
    ));
}

#[test]
fn group_extents_require_dynamic_agreement() {
    // Expanded group is all static, collapsed side claims dynamic.
    let collapsed = smallvec![Extent::Dynamic, Extent::Static(4)];
    let expanded = static_shape(&[2, 3, 4]);
    let groups = vec![smallvec![0, 1], smallvec![2]];
    assert!(matches!(
        verify_group_extents(&collapsed, &expanded, &groups, false),
        Err(Error::CollapsedDimMismatch { dim: 0, .. })
    ));
}

#[test]
fn expanding_limits_dynamic_members_per_group() {
    let collapsed = smallvec![Extent::Dynamic];
    let expanded = smallvec![Extent::Dynamic, Extent::Dynamic];
    let groups = vec![smallvec![0, 1]];
    assert!(matches!(
        verify_group_extents(&collapsed, &expanded, &groups, true),
        Err(Error::TooManyDynamicDims { group: 0 })
    ));
    // The collapsing direction leaves divisibility to the runtime.
    assert!(verify_group_extents(&collapsed, &expanded, &groups, false).is_ok());
}

#[test]
fn pad_shape_mixes_static_and_dynamic() {
    let src = smallvec![Extent::Static(2), Extent::Dynamic];
    let low = [Extent::Static(1), Extent::Static(0)];
    let high = [Extent::Static(3), Extent::Static(0)];
    let out = pad_result_shape(&src, &low, &high).unwrap();
    assert_eq!(out.as_slice(), &[Extent::Static(6), Extent::Dynamic]);
}

#[test]
fn pad_rejects_short_amounts() {
    let src = static_shape(&[2, 3]);
    assert!(matches!(
        pad_result_shape(&src, &[Extent::Static(0)], &[Extent::Static(0), Extent::Static(0)]),
        Err(Error::AttributeArityMismatch { attribute: "static_low", .. })
    ));
}

#[test]
fn refinement_ordering() {
    let exact = ShapedType::tensor(ScalarType::Float32, static_shape(&[4, 5]));
    let partial = ShapedType::tensor(
        ScalarType::Float32,
        smallvec![Extent::Static(4), Extent::Dynamic],
    );

    assert!(exact.is_refinement_of(&partial));
    assert!(exact.is_refinement_of(&exact));
    assert!(!partial.is_refinement_of(&exact));

    let other_elem = ShapedType::tensor(ScalarType::Int32, static_shape(&[4, 5]));
    assert!(!other_elem.is_refinement_of(&partial));

    let disagreeing = ShapedType::tensor(ScalarType::Float32, static_shape(&[4, 6]));
    assert!(!disagreeing.is_refinement_of(&exact));
}
