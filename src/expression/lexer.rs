use crate::expression::ast::Operator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) start: usize,
    pub(crate) end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    /// Operand text: a number, a boolean literal or a reference.
    Word(String),
    Op(Operator),
    LParen,
    RParen,
}

impl TokenKind {
    fn is_operand(&self) -> bool {
        matches!(self, Self::Word(_))
    }
}

/// Characters that always terminate a word.
pub(crate) const RESERVED_CHARS: [char; 10] = ['&', '|', '+', '-', '*', '/', '%', '!', '(', ')'];

/// Split `input` into words, operators and parentheses.
///
/// A `+` or `-` at the start, or right after an operator or `(`, is folded into the following word
/// as its sign.
pub(crate) fn lex(input: &str) -> Vec<Token> {
    let mut raw: Vec<Token> = Vec::new();
    let mut word_start: Option<usize> = None;

    for (i, c) in input.char_indices() {
        let breaks = c.is_whitespace() || RESERVED_CHARS.contains(&c);
        if !breaks {
            word_start.get_or_insert(i);
            continue;
        }
        if let Some(start) = word_start.take() {
            raw.push(word(input, start, i));
        }
        let span = Span {
            start: i,
            end: i + c.len_utf8(),
        };
        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            _ => match Operator::from_symbol(c) {
                Some(op) => TokenKind::Op(op),
                None => continue,
            },
        };
        raw.push(Token { kind, span });
    }
    if let Some(start) = word_start {
        raw.push(word(input, start, input.len()));
    }

    fold_signs(raw)
}

fn word(input: &str, start: usize, end: usize) -> Token {
    Token {
        kind: TokenKind::Word(input[start..end].to_owned()),
        span: Span { start, end },
    }
}

fn fold_signs(raw: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(raw.len());
    let mut iter = raw.into_iter().peekable();
    while let Some(tok) = iter.next() {
        let sign = match tok.kind {
            TokenKind::Op(Operator::Add) => Some('+'),
            TokenKind::Op(Operator::Sub) => Some('-'),
            _ => None,
        };
        let after_operator = match out.last() {
            None => true,
            Some(prev) => matches!(prev.kind, TokenKind::Op(_) | TokenKind::LParen),
        };
        let next_is_operand = iter.peek().is_some_and(|t| t.kind.is_operand());
        if let (Some(sign), true, true) = (sign, after_operator, next_is_operand)
            && let Some(Token {
                kind: TokenKind::Word(w),
                span,
            }) = iter.next()
        {
            let text = if sign == '-' { format!("-{w}") } else { w };
            out.push(Token {
                kind: TokenKind::Word(text),
                span: Span {
                    start: tok.span.start,
                    end: span.end,
                },
            });
            continue;
        }
        out.push(tok);
    }
    out
}
