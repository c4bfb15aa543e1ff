use smallvec::smallvec;

use strata_dtype::ScalarType;

use crate::op::{OpKind, Operation, Value, ValueKey};
use crate::shape::{Extent, ShapedType};
use crate::types::ConstValue;

fn tensor(dims: &[usize]) -> ShapedType {
    ShapedType::tensor(ScalarType::Float32, dims.iter().map(|&d| Extent::Static(d)).collect())
}

#[test]
fn result_identity_is_stable_across_calls() {
    let init = Operation::init_tensor(smallvec![Extent::Static(4)], [], ScalarType::Float32);

    let a = init.result(0);
    let b = init.result(0);
    assert_ne!(a.id, b.id);
    assert_eq!(ValueKey(a), ValueKey(b));
}

#[test]
fn distinct_arguments_have_distinct_identity() {
    let a = Value::argument(tensor(&[4]));
    let b = Value::argument(tensor(&[4]));
    assert_ne!(ValueKey(a.clone()), ValueKey(b));
    assert_eq!(ValueKey(a.clone()), ValueKey(a));
}

#[test]
fn with_operands_preserves_contract_under_new_identity() {
    let src = Value::argument(tensor(&[2, 3]));
    let reshape = Operation::reshape(src, vec![smallvec![0, 1]], tensor(&[6]));

    let other = Value::argument(tensor(&[2, 3]));
    let rebuilt = reshape.with_operands([other.clone()], []);

    assert_ne!(rebuilt.id, reshape.id);
    assert_eq!(rebuilt.kind, reshape.kind);
    assert_eq!(rebuilt.result_types, reshape.result_types);
    assert_eq!(ValueKey(rebuilt.inputs[0].clone()), ValueKey(other));
    assert_ne!(ValueKey(rebuilt.result(0)), ValueKey(reshape.result(0)));
}

#[test]
fn tensor_semantics_requires_all_tensors() {
    let value = Value::argument(ScalarType::Float32);
    let init = Value::argument(tensor(&[4]));
    assert!(Operation::fill_tensor(value.clone(), init).has_tensor_semantics());

    let buffer = Value::argument(ShapedType::contiguous_buffer(
        ScalarType::Float32,
        smallvec![Extent::Static(4)],
    ));
    assert!(!Operation::fill_buffer(value, buffer).has_tensor_semantics());
}

#[test]
fn splat_constants_are_shaped() {
    let splat = Value::constant(tensor(&[2, 2]), ConstValue::Float(0.0));
    assert_eq!(splat.as_splat_constant(), Some(ConstValue::Float(0.0)));
    assert_eq!(splat.as_const_int(), None);

    let scalar = Value::index_constant(3);
    assert_eq!(scalar.as_splat_constant(), None);
    assert_eq!(scalar.as_const_int(), Some(3));
}

#[test]
fn kind_names_are_snake_case() {
    assert_eq!(OpKind::Fill.as_ref(), "fill");
    assert_eq!(OpKind::InitTensor { static_sizes: smallvec![] }.as_ref(), "init_tensor");
    assert_eq!(OpKind::Cast.as_ref(), "cast");
}

#[test]
fn fill_tensor_result_matches_init() {
    let value = Value::argument(ScalarType::Float32);
    let init = Value::argument(tensor(&[4, 4]));
    let fill = Operation::fill_tensor(value, init);

    assert_eq!(fill.result_types.as_slice(), &[tensor(&[4, 4])]);
    assert_eq!(fill.result(0).shaped(), Some(&tensor(&[4, 4])));
    assert!(fill.result(0).defining_op().is_some());
}
