//! Enable expression parsing, simplification and shape validation.

pub(crate) mod ast;
pub(crate) mod error;
pub(crate) mod lexer;
pub(crate) mod memo;
pub(crate) mod parser;
pub(crate) mod simplify;

pub use ast::{Expression, ExpressionNode, Operator};
pub use error::ExprError;
pub use memo::clear_expression_cache;
pub use parser::parse_expression;
pub use simplify::{simplify_expression, validate_expression};

/// Turn string leaves into parsed, simplified trees.
///
/// Typed trees are walked so string leaves nested inside them are parsed too.
pub fn interpret_expression(expr: &Expression) -> Result<Expression, ExprError> {
    let interpreted = match expr {
        Expression::Text(s) => memo::parse_cached(s)?,
        Expression::Node(node) => Expression::node(
            interpret_expression(&node.l)?,
            node.o,
            interpret_expression(&node.r)?,
        ),
        other => other.clone(),
    };
    Ok(simplify_expression(&interpreted))
}

#[cfg(test)]
#[path = "../../tests/unit/expression/mod.rs"]
mod tests;
