use super::*;
use crate::foundation::core::{Cap, References};

fn inst(id: &str, start: f64, end: Option<f64>) -> Instance {
    Instance::new(id, start, end)
}

fn spans(list: &[Instance]) -> Vec<(f64, Option<f64>)> {
    list.iter().map(|i| (i.start, i.end)).collect()
}

#[test]
fn invert_of_nothing_is_everything() {
    let mut alg = InstanceAlgebra::default();
    let out = alg.invert(&[]);
    assert_eq!(spans(&out), vec![(0.0, None)]);
    assert!(out[0].is_first);
}

#[test]
fn invert_produces_gaps() {
    let mut alg = InstanceAlgebra::default();
    let out = alg.invert(&[inst("a", 10.0, Some(20.0)), inst("b", 30.0, Some(40.0))]);
    assert_eq!(
        spans(&out),
        vec![
            (0.0, Some(10.0)),
            (20.0, Some(30.0)),
            (40.0, None)
        ]
    );
    assert!(out[0].is_first);
    assert!(!out[1].is_first);
    assert!(out[1].references.contains(&Reference::Instance("a".into())));
    assert!(out[1].references.contains(&Reference::Instance("b".into())));
}

#[test]
fn invert_from_zero_has_no_leading_gap() {
    let mut alg = InstanceAlgebra::default();
    let out = alg.invert(&[inst("a", 0.0, Some(100.0))]);
    assert_eq!(spans(&out), vec![(100.0, None)]);
    assert!(!out[0].is_first);
}

#[test]
fn double_invert_restores_coverage() {
    let mut alg = InstanceAlgebra::default();
    let x = [
        inst("a", 5.0, Some(10.0)),
        inst("b", 8.0, Some(12.0)),
        inst("c", 20.0, None),
    ];
    let cleaned = alg.clean(&x, true, true);
    let once = alg.invert(&cleaned);
    let twice = alg.invert(&once);
    assert_eq!(spans(&twice), spans(&cleaned));
}

#[test]
fn cap_clips_and_records_originals() {
    let mut alg = InstanceAlgebra::default();
    let bound = inst("p", 10.0, Some(20.0))
        .with_references(References::from([Reference::Object("parent".into())]));
    let out = alg.cap(&[inst("a", 5.0, Some(25.0))], &[bound]);
    assert_eq!(spans(&out), vec![(10.0, Some(20.0))]);
    assert_eq!(out[0].original_start, Some(5.0));
    assert_eq!(out[0].original_end, Some(Some(25.0)));
    assert!(out[0]
        .references
        .contains(&Reference::Object("parent".into())));
}

#[test]
fn cap_drops_non_overlapping() {
    let mut alg = InstanceAlgebra::default();
    let out = alg.cap(
        &[inst("a", 0.0, Some(5.0)), inst("b", 30.0, Some(40.0))],
        &[inst("p", 10.0, Some(20.0))],
    );
    assert!(out.is_empty());
}

#[test]
fn cap_into_infinite_bound_is_clean() {
    let mut alg = InstanceAlgebra::default();
    let x = [
        inst("a", 0.0, Some(10.0)),
        inst("b", 5.0, Some(15.0)),
        inst("c", 40.0, None),
    ];
    let everything = inst("all", f64::NEG_INFINITY, None);
    let capped = alg.cap(&x, &[everything]);
    let cleaned = alg.clean(&x, true, true);
    assert_eq!(spans(&capped), spans(&cleaned));
}

#[test]
fn cap_keeps_one_zero_length_per_instant() {
    let mut alg = InstanceAlgebra::default();
    let out = alg.cap(
        &[inst("z", 10.0, Some(10.0))],
        &[inst("p", 0.0, Some(10.0)), inst("q", 10.0, Some(20.0))],
    );
    assert_eq!(spans(&out), vec![(10.0, Some(10.0))]);
}

#[test]
fn cap_keeps_zero_length_edge_touch() {
    let mut alg = InstanceAlgebra::default();
    let out = alg.cap(&[inst("a", 0.0, Some(10.0))], &[inst("p", 10.0, Some(20.0))]);
    assert_eq!(spans(&out), vec![(10.0, Some(10.0))]);
    assert_eq!(out[0].original_start, Some(0.0));

    let out = alg.cap(
        &[inst("a", 0.0, Some(10.0))],
        &[inst("p", 0.0, Some(5.0)), inst("q", 10.0, Some(20.0))],
    );
    assert_eq!(spans(&out), vec![(0.0, Some(5.0)), (10.0, Some(10.0))]);
}

#[test]
fn cap_drops_zero_length_inside_covered_instant() {
    let mut alg = InstanceAlgebra::default();
    let out = alg.cap(
        &[inst("a", 0.0, Some(10.0))],
        &[inst("p", 0.0, Some(10.0)), inst("q", 10.0, Some(20.0))],
    );
    assert_eq!(spans(&out), vec![(0.0, Some(10.0))]);
}

#[test]
fn repeat_emits_limit_count_occurrences() {
    let mut alg = InstanceAlgebra::default();
    let opts = RepeatOptions {
        time: 0.0,
        limit_count: 5,
        limit_time: None,
    };
    let out = alg.repeat(&[inst("a", 0.0, Some(5.0))], &ScalarValue::new(10.0), &opts);
    assert_eq!(
        spans(&out),
        vec![
            (0.0, Some(5.0)),
            (10.0, Some(15.0)),
            (20.0, Some(25.0)),
            (30.0, Some(35.0)),
            (40.0, Some(45.0))
        ]
    );
}

#[test]
fn repeat_starts_at_current_cycle() {
    let mut alg = InstanceAlgebra::default();
    let opts = RepeatOptions {
        time: 25.0,
        ..RepeatOptions::default()
    };
    let out = alg.repeat(&[inst("a", 0.0, Some(5.0))], &ScalarValue::new(10.0), &opts);
    assert_eq!(spans(&out), vec![(20.0, Some(25.0)), (30.0, Some(35.0))]);
}

#[test]
fn repeat_stops_at_limit_time() {
    let mut alg = InstanceAlgebra::default();
    let opts = RepeatOptions {
        time: 0.0,
        limit_count: 100,
        limit_time: Some(30.0),
    };
    let out = alg.repeat(&[inst("a", 0.0, Some(5.0))], &ScalarValue::new(10.0), &opts);
    assert_eq!(out.len(), 3);
}

#[test]
fn repeat_respects_caps() {
    let mut alg = InstanceAlgebra::default();
    let mut child = inst("c", 0.0, Some(5.0));
    child.caps.push(Cap {
        id: "p0".into(),
        start: 0.0,
        end: Some(12.0),
    });
    let opts = RepeatOptions {
        time: 0.0,
        limit_count: 3,
        limit_time: None,
    };
    let out = alg.repeat(&[child], &ScalarValue::new(10.0), &opts);
    assert_eq!(spans(&out), vec![(0.0, Some(5.0)), (10.0, Some(12.0))]);
}

#[test]
fn repeat_with_non_positive_period_is_identity() {
    let mut alg = InstanceAlgebra::default();
    let x = vec![inst("a", 0.0, Some(5.0))];
    let out = alg.repeat(&x, &ScalarValue::new(0.0), &RepeatOptions::default());
    assert_eq!(out, x);
}

#[test]
fn combine_adds_scalar_to_every_instance() {
    let mut alg = InstanceAlgebra::default();
    let a = Operand::Instances(vec![inst("a", 0.0, Some(100.0)), inst("b", 200.0, None)]);
    let b = Operand::Scalar(ScalarValue::new(10.0));
    let Some(Operand::Instances(out)) = alg.combine(&a, &b, Operator::Add) else {
        panic!("expected instances");
    };
    assert_eq!(spans(&out), vec![(10.0, Some(110.0)), (210.0, None)]);
}

#[test]
fn combine_pairs_by_position() {
    let mut alg = InstanceAlgebra::default();
    let a = Operand::Instances(vec![inst("a", 10.0, Some(20.0)), inst("b", 30.0, Some(40.0))]);
    let b = Operand::Instances(vec![inst("c", 1.0, Some(2.0))]);
    let Some(Operand::Instances(out)) = alg.combine(&a, &b, Operator::Sub) else {
        panic!("expected instances");
    };
    assert_eq!(spans(&out), vec![(9.0, Some(18.0))]);
}

#[test]
fn combine_passes_is_first_through() {
    let mut alg = InstanceAlgebra::default();
    let inverted = alg.invert(&[inst("g", 10.0, Some(20.0))]);
    let a = Operand::Instances(inverted);
    let b = Operand::Scalar(ScalarValue::new(10.0));
    let Some(Operand::Instances(out)) = alg.combine(&a, &b, Operator::Add) else {
        panic!("expected instances");
    };
    assert_eq!(spans(&out), vec![(0.0, Some(10.0)), (30.0, None)]);
    assert!(out[0].is_first);
}

#[test]
fn combine_two_scalars() {
    let mut alg = InstanceAlgebra::default();
    let out = alg.combine(
        &Operand::Scalar(ScalarValue::new(6.0)),
        &Operand::Scalar(ScalarValue::new(3.0)),
        Operator::Div,
    );
    assert_eq!(out, Some(Operand::Scalar(ScalarValue::new(2.0))));
    let out = alg.combine(
        &Operand::Scalar(ScalarValue::new(6.0)),
        &Operand::Scalar(ScalarValue::new(0.0)),
        Operator::Div,
    );
    assert_eq!(out, None);
}

#[test]
fn combine_skips_pairs_dividing_by_zero() {
    let mut alg = InstanceAlgebra::default();
    let a = Operand::Instances(vec![
        inst("a0", 10.0, Some(20.0)),
        inst("a1", 40.0, Some(80.0)),
        inst("a2", 60.0, None),
    ]);
    let b = Operand::Instances(vec![
        inst("b0", 5.0, Some(0.0)),
        inst("b1", 4.0, Some(4.0)),
        inst("b2", 2.0, Some(3.0)),
    ]);
    let Some(Operand::Instances(out)) = alg.combine(&a, &b, Operator::Div) else {
        panic!("expected instances");
    };
    assert_eq!(spans(&out), vec![(10.0, Some(20.0)), (30.0, None)]);

    let zero_start = Operand::Instances(vec![inst("z", 0.0, Some(5.0))]);
    let Some(Operand::Instances(out)) = alg.combine(&a, &zero_start, Operator::Rem) else {
        panic!("expected instances");
    };
    assert!(out.is_empty());
}
