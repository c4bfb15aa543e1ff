use smallvec::smallvec;

use strata_dtype::ScalarType;

use crate::op::{Operation, Value, ValueKey};
use crate::region::{build_region, BodyKind};
use crate::reify::{reify_result_dims, SizeExpr};
use crate::shape::{Extent, Shape, ShapedType};
use crate::types::ConstValue;

fn shape(dims: &[usize]) -> Shape {
    dims.iter().map(|&d| Extent::Static(d)).collect()
}

fn tensor(dims: &[usize]) -> ShapedType {
    ShapedType::tensor(ScalarType::Float32, shape(dims))
}

#[test]
fn size_expr_folds_identities() {
    let key = SizeExpr::Value(ValueKey(Value::index_constant(7)));

    assert_eq!(SizeExpr::add(SizeExpr::Const(2), SizeExpr::Const(3)), SizeExpr::Const(5));
    assert_eq!(SizeExpr::add(SizeExpr::Const(0), key.clone()), key);
    assert_eq!(SizeExpr::mul(SizeExpr::Const(1), key.clone()), key);
    assert_eq!(SizeExpr::mul(SizeExpr::Const(0), key), SizeExpr::Const(0));
    assert_eq!(SizeExpr::mul(SizeExpr::Const(2), SizeExpr::Const(3)).as_const(), Some(6));
}

#[test]
fn pad_dims_sum_source_and_amounts() {
    let src = Value::argument(ShapedType::tensor(
        ScalarType::Float32,
        smallvec![Extent::Static(2), Extent::Dynamic],
    ));
    let runtime_pad = Value::index_constant(3);

    let region = build_region(
        BodyKind::YieldConst { value: ConstValue::Float(0.0), ty: ScalarType::Float32 },
        2,
        &[],
        &[],
        &mut |e| panic!("unexpected error: {e}"),
    )
    .unwrap();
    let op = Operation::pad(
        src,
        smallvec![Extent::Static(1), Extent::Dynamic],
        smallvec![Extent::Static(0), Extent::Static(2)],
        [runtime_pad.clone()],
        ShapedType::tensor(ScalarType::Float32, smallvec![Extent::Static(3), Extent::Dynamic]),
        region,
    );

    let dims = reify_result_dims(&op).unwrap();
    // 2 + 1 + 0 folds to a literal.
    assert_eq!(dims[0], SizeExpr::Const(3));
    // ? + pad + 2 stays symbolic but mentions the runtime operand.
    assert!(!dims[1].is_const());
    let SizeExpr::Add(lhs, _) = &dims[1] else { panic!("expected a sum") };
    let SizeExpr::Add(source, low) = lhs.as_ref() else { panic!("expected nested sum") };
    assert!(matches!(source.as_ref(), SizeExpr::DimOf { dim: 1, .. }));
    assert_eq!(low.as_ref(), &SizeExpr::Value(ValueKey(runtime_pad)));
}

#[test]
fn init_dims_mix_literals_and_operands() {
    let size = Value::index_constant(9);
    let op = Operation::init_tensor(
        smallvec![Extent::Static(4), Extent::Dynamic],
        [size.clone()],
        ScalarType::Float32,
    );

    let dims = reify_result_dims(&op).unwrap();
    assert_eq!(dims[0], SizeExpr::Const(4));
    assert_eq!(dims[1], SizeExpr::Value(ValueKey(size)));
}

#[test]
fn collapsing_reshape_multiplies_groups() {
    let src = Value::argument(tensor(&[2, 3, 4]));
    let op = Operation::reshape(src, vec![smallvec![0, 1], smallvec![2]], tensor(&[6, 4]));

    let dims = reify_result_dims(&op).unwrap();
    assert_eq!(dims[0], SizeExpr::Const(6));
    assert_eq!(dims[1], SizeExpr::Const(4));
}

#[test]
fn collapsing_dynamic_group_stays_symbolic() {
    let src = Value::argument(ShapedType::tensor(
        ScalarType::Float32,
        smallvec![Extent::Static(2), Extent::Dynamic],
    ));
    let op = Operation::reshape(
        src.clone(),
        vec![smallvec![0, 1]],
        ShapedType::tensor(ScalarType::Float32, smallvec![Extent::Dynamic]),
    );

    let dims = reify_result_dims(&op).unwrap();
    let SizeExpr::Mul(lhs, rhs) = &dims[0] else { panic!("expected a product") };
    assert_eq!(lhs.as_ref(), &SizeExpr::Const(2));
    assert!(matches!(rhs.as_ref(), SizeExpr::DimOf { dim: 1, .. }));
}

#[test]
fn cast_forwards_source_dims() {
    let src = Value::argument(ShapedType::tensor(
        ScalarType::Float32,
        smallvec![Extent::Static(4), Extent::Dynamic],
    ));
    let op = Operation::cast(
        src.clone(),
        ShapedType::tensor(ScalarType::Float32, smallvec![Extent::Dynamic, Extent::Dynamic]),
    );

    let dims = reify_result_dims(&op).unwrap();
    assert_eq!(dims[0], SizeExpr::Const(4));
    assert_eq!(dims[1], SizeExpr::DimOf { value: ValueKey(src), dim: 1 });
}

#[test]
fn structured_ops_mirror_their_outputs() {
    let value = Value::argument(ScalarType::Float32);
    let fill = Operation::fill_tensor(value, Value::argument(tensor(&[4])));
    assert!(reify_result_dims(&fill).is_none());
}
