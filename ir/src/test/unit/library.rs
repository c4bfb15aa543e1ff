use smallvec::smallvec;

use strata_dtype::ScalarType;

use crate::library::library_call_name;
use crate::op::{Operation, Value};
use crate::shape::{Extent, Shape, ShapedType};

fn shape(dims: &[usize]) -> Shape {
    dims.iter().map(|&d| Extent::Static(d)).collect()
}

#[test]
fn copy_name_mangles_both_views() {
    let input = Value::argument(ShapedType::contiguous_buffer(ScalarType::Float32, shape(&[2, 3])));
    let output = Value::argument(ShapedType::contiguous_buffer(ScalarType::Float32, shape(&[2, 3])));
    let op = Operation::copy(input, output, None, None);

    assert_eq!(library_call_name(&op), "copy_view2x3xf32_view2x3xf32");
}

#[test]
fn dynamic_extents_mangle_as_sx() {
    let out = Value::argument(ShapedType::contiguous_buffer(
        ScalarType::Float32,
        smallvec![Extent::Static(4), Extent::Dynamic],
    ));
    let op = Operation::fill_buffer(Value::argument(ScalarType::Float32), out);

    // The scalar fill value contributes no view segment.
    assert_eq!(library_call_name(&op), "fill_view4xsxf32");
}

#[test]
fn element_suffix_tracks_the_type() {
    let out = Value::argument(ShapedType::contiguous_buffer(ScalarType::Int64, shape(&[8])));
    let op = Operation::fill_buffer(Value::argument(ScalarType::Int64), out);
    assert_eq!(library_call_name(&op), "fill_view8xi64");

    let out = Value::argument(ShapedType::contiguous_buffer(ScalarType::BFloat16, shape(&[8])));
    let op = Operation::fill_buffer(Value::argument(ScalarType::BFloat16), out);
    assert_eq!(library_call_name(&op), "fill_view8xbf16");
}

#[test]
fn rank_zero_view_is_just_the_element() {
    let out = Value::argument(ShapedType::contiguous_buffer(ScalarType::Float32, shape(&[])));
    let op = Operation::fill_buffer(Value::argument(ScalarType::Float32), out);
    assert_eq!(library_call_name(&op), "fill_viewf32");
}

#[test]
fn name_without_shaped_operands_is_the_kind() {
    let op = Operation::init_tensor(smallvec![Extent::Dynamic], [Value::index_constant(3)], ScalarType::Float32);
    assert_eq!(library_call_name(&op), "init_tensor");
}
