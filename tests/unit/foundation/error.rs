use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert_eq!(
        TimelineError::syntax("x").to_string(),
        "syntax error: x".to_string()
    );
    assert_eq!(
        TimelineError::validation("x").to_string(),
        "validation error: x".to_string()
    );
    assert_eq!(
        TimelineError::serde("x").to_string(),
        "serialization error: x".to_string()
    );
    assert_eq!(
        TimelineError::CircularDependency("a".to_string()).to_string(),
        "circular dependency when resolving \"a\"".to_string()
    );
}

#[test]
fn max_iterations_lists_trail() {
    let err = TimelineError::MaxIterationsExceeded {
        iterations: 12,
        trail: vec!["a moved".to_string(), "b moved".to_string()],
    };
    assert_eq!(
        err.to_string(),
        "max conflict iterations reached (12), latest changes: a moved; b moved"
    );
}

#[test]
fn other_preserves_source() {
    let err = anyhow::anyhow!("inner");
    let e = TimelineError::from(err);
    match e {
        TimelineError::Other(inner) => assert_eq!(inner.to_string(), "inner"),
        _ => panic!("expected Other"),
    }
}

#[test]
fn expression_errors_become_syntax_errors() {
    let e = TimelineError::from(crate::expression::ExprError::new(3, "operator not found"));
    assert!(matches!(e, TimelineError::Syntax(ref m) if m.contains("operator not found")));
}
