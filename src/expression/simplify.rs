use crate::expression::ast::{Expression, ExpressionNode, Operator};
use crate::expression::error::ExprError;
use crate::expression::parser::parse_number;

/// Constant-fold numeric subtrees through `+ - * / %`.
///
/// Logical operators and subtrees containing a reference are left untouched. Numeric strings
/// count as constants.
pub fn simplify_expression(expr: &Expression) -> Expression {
    match expr {
        Expression::Text(s) => parse_number(s.trim())
            .map(Expression::Number)
            .unwrap_or_else(|| expr.clone()),
        Expression::Node(node) => {
            let l = simplify_expression(&node.l);
            let r = simplify_expression(&node.r);
            if node.o.is_arithmetic()
                && let (Expression::Number(a), Expression::Number(b)) = (&l, &r)
                && let Some(v) = node.o.apply(*a, *b)
            {
                return Expression::Number(v);
            }
            Expression::Node(Box::new(ExpressionNode { l, o: node.o, r }))
        }
        other => other.clone(),
    }
}

/// Check tree shape: every operator is allowed and only `!` has an empty left operand.
pub fn validate_expression(allowed: &[Operator], expr: &Expression) -> Result<(), ExprError> {
    let Expression::Node(node) = expr else {
        return Ok(());
    };
    if !allowed.contains(&node.o) {
        return Err(ExprError::new(
            0,
            format!("operator '{}' is not allowed here", node.o),
        ));
    }
    if node.o == Operator::Not {
        if !node.l.is_empty() {
            return Err(ExprError::new(0, "'!' takes no left operand"));
        }
    } else if node.l.is_empty() {
        return Err(ExprError::new(
            0,
            format!("missing left operand for '{}'", node.o),
        ));
    }
    if node.r.is_empty() {
        return Err(ExprError::new(
            0,
            format!("missing right operand for '{}'", node.o),
        ));
    }
    validate_expression(allowed, &node.l)?;
    validate_expression(allowed, &node.r)
}

#[cfg(test)]
#[path = "../../tests/unit/expression/simplify.rs"]
mod tests;
