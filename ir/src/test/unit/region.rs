use strata_dtype::{CastKind, ScalarType};

use crate::error::Error;
use crate::region::{build_region, BodyKind, BodyOp, BodyValue, Region, RegionBuilder};
use crate::types::{ArithKind, ConstValue};

#[test]
fn yield_first_same_type_is_a_plain_forward() {
    let region = build_region(
        BodyKind::YieldFirst,
        0,
        &[ScalarType::Float32],
        &[ScalarType::Float32],
        &mut |e| panic!("unexpected error: {e}"),
    )
    .unwrap();

    assert_eq!(region.args.as_slice(), &[ScalarType::Float32, ScalarType::Float32]);
    assert!(region.body.is_empty());
    assert_eq!(region.yielded.as_slice(), &[BodyValue::Arg(0)]);
}

#[test]
fn yield_first_inserts_element_cast() {
    let region = build_region(
        BodyKind::YieldFirst,
        0,
        &[ScalarType::Int32],
        &[ScalarType::Float64],
        &mut |e| panic!("unexpected error: {e}"),
    )
    .unwrap();

    assert_eq!(
        region.body.as_slice(),
        &[BodyOp::Cast { kind: CastKind::IntToFloat, src: BodyValue::Arg(0), to: ScalarType::Float64 }]
    );
    assert_eq!(region.yielded.as_slice(), &[BodyValue::Op(0)]);
}

#[test]
fn pad_body_is_index_args_and_a_constant() {
    let region = build_region(
        BodyKind::YieldConst { value: ConstValue::Float(0.0), ty: ScalarType::Float32 },
        2,
        &[],
        &[],
        &mut |e| panic!("unexpected error: {e}"),
    )
    .unwrap();

    assert_eq!(region.args.as_slice(), &[ScalarType::Index, ScalarType::Index]);
    assert_eq!(
        region.body.as_slice(),
        &[BodyOp::Const { value: ConstValue::Float(0.0), ty: ScalarType::Float32 }]
    );
    assert_eq!(region.yielded.as_slice(), &[BodyValue::Op(0)]);
    assert_eq!(region.value_type(region.yielded[0]), ScalarType::Float32);
}

#[test]
fn arity_violation_reports_and_produces_nothing() {
    let mut errors = Vec::new();
    let region = build_region(
        BodyKind::Arith(ArithKind::Add),
        0,
        &[ScalarType::Float32],
        &[ScalarType::Float32],
        &mut |e| errors.push(e),
    );

    assert!(region.is_none());
    assert!(matches!(errors.as_slice(), [Error::RegionArityMismatch { expected: 3, got: 2 }]));
}

#[test]
fn arith_widens_both_operands() {
    let region = build_region(
        BodyKind::Arith(ArithKind::Add),
        0,
        &[ScalarType::Int16, ScalarType::Int32],
        &[ScalarType::Int32],
        &mut |e| panic!("unexpected error: {e}"),
    )
    .unwrap();

    // Only the narrow operand needs a cast.
    assert_eq!(
        region.body.as_slice(),
        &[
            BodyOp::Cast { kind: CastKind::SignExtend, src: BodyValue::Arg(0), to: ScalarType::Int32 },
            BodyOp::Arith {
                kind: ArithKind::Add,
                lhs: BodyValue::Op(0),
                rhs: BodyValue::Arg(1),
                ty: ScalarType::Int32,
            },
        ]
    );
    assert_eq!(region.value_type(region.yielded[0]), ScalarType::Int32);
}

#[test]
fn unsupported_implicit_cast_degrades_to_uncast_operand() {
    let mut builder = RegionBuilder::new([ScalarType::Int32]);
    let v = builder.arg(0);
    // Equal-width signedness change has no defined cast.
    let out = builder.cast_to(v, ScalarType::UInt32);
    assert_eq!(out, v);

    let region = builder.finish([out]);
    assert!(region.body.is_empty());
    assert_eq!(region.value_type(out), ScalarType::Int32);
}

#[test]
fn remap_args_redirects_dropped_duplicates() {
    let region = Region {
        args: [ScalarType::Float32; 3].into_iter().collect(),
        body: vec![BodyOp::Arith {
            kind: ArithKind::Mul,
            lhs: BodyValue::Arg(0),
            rhs: BodyValue::Arg(1),
            ty: ScalarType::Float32,
        }],
        yielded: [BodyValue::Op(0)].into_iter().collect(),
    };

    // Arg 1 was a duplicate of arg 0; arg 2 shifts down.
    let remapped = region.remap_args(&[0, 0, 1], [ScalarType::Float32; 2].into_iter().collect());
    assert_eq!(remapped.args.len(), 2);
    assert_eq!(
        remapped.body.as_slice(),
        &[BodyOp::Arith {
            kind: ArithKind::Mul,
            lhs: BodyValue::Arg(0),
            rhs: BodyValue::Arg(0),
            ty: ScalarType::Float32,
        }]
    );
}

#[test]
fn arith_instruction_selection_follows_numeric_kind() {
    use strata_dtype::NumericKind;

    assert_eq!(ArithKind::Add.instruction(NumericKind::Int), "addi");
    assert_eq!(ArithKind::Add.instruction(NumericKind::Float), "addf");
    assert_eq!(ArithKind::Max.instruction(NumericKind::Float), "maxf");
    assert_eq!(ScalarType::Index.kind(), NumericKind::Int);
}
