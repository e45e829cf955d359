use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use crate::expression::ast::Expression;
use crate::expression::error::ExprError;
use crate::expression::parser::parse_expression;

const PARSE_TTL: Duration = Duration::from_secs(60 * 60);
const SWEEP_THRESHOLD: usize = 1024;

struct CachedParse {
    expr: Expression,
    parsed_at: Instant,
}

fn parsed() -> &'static Mutex<HashMap<String, CachedParse>> {
    static PARSED: OnceLock<Mutex<HashMap<String, CachedParse>>> = OnceLock::new();
    PARSED.get_or_init(|| Mutex::new(HashMap::new()))
}

/// [`parse_expression`] memoized per source string for up to an hour.
pub(crate) fn parse_cached(src: &str) -> Result<Expression, ExprError> {
    let now = Instant::now();
    if let Ok(map) = parsed().lock()
        && let Some(hit) = map.get(src)
        && now.duration_since(hit.parsed_at) < PARSE_TTL
    {
        return Ok(hit.expr.clone());
    }

    let expr = parse_expression(src)?;

    if let Ok(mut map) = parsed().lock() {
        if map.len() >= SWEEP_THRESHOLD {
            let before = map.len();
            map.retain(|_, c| now.duration_since(c.parsed_at) < PARSE_TTL);
            tracing::trace!(swept = before - map.len(), kept = map.len(), "parse memo swept");
        }
        map.insert(
            src.to_owned(),
            CachedParse {
                expr: expr.clone(),
                parsed_at: now,
            },
        );
    }
    Ok(expr)
}

/// Drop every memoized parse.
pub fn clear_expression_cache() {
    if let Ok(mut map) = parsed().lock() {
        map.clear();
    }
}

#[cfg(test)]
pub(crate) fn cached_len() -> usize {
    parsed().lock().map(|m| m.len()).unwrap_or_default()
}
