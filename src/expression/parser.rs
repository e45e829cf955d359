use crate::expression::ast::{Expression, Operator};
use crate::expression::error::ExprError;
use crate::expression::lexer::{Span, Token, TokenKind, lex};

/// Parse an enable expression string into a tree.
///
/// The token stream is split on the last occurrence of the first operator (in
/// [`Operator::ALL`] order) that appears at the current nesting level, so `a - b + c` groups as
/// `(a - b) + c` and `1 + 2 * 3` as `1 + (2 * 3)`.
pub fn parse_expression(src: &str) -> Result<Expression, ExprError> {
    let src = src.trim();
    if src.is_empty() {
        return Ok(Expression::Null);
    }
    let tokens = lex(src);
    let items = group(tokens)?;
    let items = wrap_not(items);
    fold(&items, 0)
}

/// Parenthesized and `!`-prefixed runs become nested groups.
#[derive(Debug, Clone, PartialEq)]
enum Item {
    Word(String, Span),
    Op(Operator, Span),
    Group(Vec<Item>, usize),
}

impl Item {
    fn offset(&self) -> usize {
        match self {
            Self::Word(_, span) | Self::Op(_, span) => span.start,
            Self::Group(_, offset) => *offset,
        }
    }
}

fn group(tokens: Vec<Token>) -> Result<Vec<Item>, ExprError> {
    let mut stack: Vec<(Vec<Item>, usize)> = vec![(Vec::new(), 0)];
    for tok in tokens {
        match tok.kind {
            TokenKind::LParen => stack.push((Vec::new(), tok.span.start)),
            TokenKind::RParen => {
                let Some((inner, offset)) = stack.pop().filter(|_| !stack.is_empty()) else {
                    return Err(ExprError::new(tok.span.start, "unbalanced parenthesis"));
                };
                if let Some((outer, _)) = stack.last_mut() {
                    outer.push(Item::Group(inner, offset));
                }
            }
            TokenKind::Word(w) => push(&mut stack, Item::Word(w, tok.span)),
            TokenKind::Op(op) => push(&mut stack, Item::Op(op, tok.span)),
        }
    }
    if stack.len() != 1 {
        let offset = stack.last().map(|(_, o)| *o).unwrap_or_default();
        return Err(ExprError::new(offset, "unbalanced parenthesis"));
    }
    Ok(stack.pop().map(|(items, _)| items).unwrap_or_default())
}

fn push(stack: &mut [(Vec<Item>, usize)], item: Item) {
    if let Some((items, _)) = stack.last_mut() {
        items.push(item);
    }
}

/// Bind every `!` to the item right after it. Runs right to left so `!!a` nests.
fn wrap_not(items: Vec<Item>) -> Vec<Item> {
    let mut items: Vec<Item> = items
        .into_iter()
        .map(|item| match item {
            Item::Group(inner, offset) => Item::Group(wrap_not(inner), offset),
            other => other,
        })
        .collect();

    let mut i = items.len();
    while i > 0 {
        i -= 1;
        if matches!(items[i], Item::Op(Operator::Not, _)) && i + 1 < items.len() {
            let operand = items.remove(i + 1);
            let offset = items[i].offset();
            let not = std::mem::replace(&mut items[i], Item::Group(Vec::new(), offset));
            items[i] = Item::Group(vec![not, operand], offset);
        }
    }
    items
}

fn fold(items: &[Item], offset: usize) -> Result<Expression, ExprError> {
    match items {
        [] => Err(ExprError::new(offset, "missing operand")),
        [Item::Word(w, _)] => Ok(leaf(w)),
        [Item::Group(inner, o)] => fold(inner, *o),
        [Item::Op(op, span)] => Err(ExprError::new(
            span.start,
            format!("dangling operator '{op}'"),
        )),
        _ => {
            for op in Operator::ALL {
                let Some(pos) = items
                    .iter()
                    .rposition(|item| matches!(item, Item::Op(o, _) if *o == op))
                else {
                    continue;
                };
                let at = items[pos].offset();
                let (left, right) = (&items[..pos], &items[pos + 1..]);
                let l = if left.is_empty() && op == Operator::Not {
                    Expression::Null
                } else {
                    fold(left, at)?
                };
                let r = fold(right, at)?;
                return Ok(Expression::node(l, op, r));
            }
            Err(ExprError::new(items[0].offset(), "operator not found"))
        }
    }
}

fn leaf(word: &str) -> Expression {
    match word {
        "true" => Expression::Bool(true),
        "false" => Expression::Bool(false),
        _ => parse_number(word)
            .map(Expression::Number)
            .unwrap_or_else(|| Expression::Text(word.to_owned())),
    }
}

/// Numeric literal: optional sign, then a digit.
pub(crate) fn parse_number(word: &str) -> Option<f64> {
    let digits = word.strip_prefix(['-', '+']).unwrap_or(word);
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    word.parse::<f64>().ok()
}

#[cfg(test)]
#[path = "../../tests/unit/expression/parser.rs"]
mod tests;
