use super::*;
use crate::foundation::core::{Reference, References, ScalarValue};

fn inst(id: &str, start: f64, end: Option<f64>) -> Instance {
    Instance::new(id, start, end)
        .with_references(References::from([Reference::Object(id.to_owned())]))
}

fn spans(list: &[Instance]) -> Vec<(f64, Option<f64>)> {
    list.iter().map(|i| (i.start, i.end)).collect()
}

#[test]
fn and_is_intersection() {
    let mut alg = InstanceAlgebra::default();
    let l = Operand::Instances(vec![inst("a", 0.0, Some(10.0)), inst("b", 20.0, Some(30.0))]);
    let r = Operand::Instances(vec![inst("c", 5.0, Some(25.0))]);
    let out = alg.boolean(Some(&l), Some(&r), Operator::And);
    assert_eq!(spans(&out), vec![(5.0, Some(10.0)), (20.0, Some(25.0))]);
    assert!(out[0].references.contains(&Reference::Object("a".into())));
    assert!(out[0].references.contains(&Reference::Object("c".into())));
}

#[test]
fn or_is_union_without_seams() {
    let mut alg = InstanceAlgebra::default();
    let l = Operand::Instances(vec![inst("a", 0.0, Some(10.0))]);
    let r = Operand::Instances(vec![inst("b", 10.0, Some(20.0)), inst("c", 40.0, None)]);
    let out = alg.boolean(Some(&l), Some(&r), Operator::Or);
    assert_eq!(spans(&out), vec![(0.0, Some(20.0)), (40.0, None)]);
}

#[test]
fn scalars_are_truth_values() {
    let mut alg = InstanceAlgebra::default();
    let l = Operand::Instances(vec![inst("a", 5.0, Some(10.0))]);
    let yes = Operand::Scalar(ScalarValue::new(1.0));
    let no = Operand::Scalar(ScalarValue::new(0.0));
    assert_eq!(
        spans(&alg.boolean(Some(&l), Some(&yes), Operator::And)),
        vec![(5.0, Some(10.0))]
    );
    assert!(alg.boolean(Some(&l), Some(&no), Operator::And).is_empty());
    assert_eq!(
        spans(&alg.boolean(Some(&l), Some(&yes), Operator::Or)),
        vec![(0.0, None)]
    );
}

#[test]
fn missing_side_is_never_active() {
    let mut alg = InstanceAlgebra::default();
    let l = Operand::Instances(vec![inst("a", 5.0, Some(10.0))]);
    assert!(alg.boolean(Some(&l), None, Operator::And).is_empty());
    assert_eq!(
        spans(&alg.boolean(None, Some(&l), Operator::Or)),
        vec![(5.0, Some(10.0))]
    );
}
