use crate::ast::Pattern;

use super::Value;

/// Matches `value` against `pattern`, returning the bindings it introduces
/// in left-to-right order, or `None` if it does not match.
pub fn match_pattern(pattern: &Pattern, value: &Value) -> Option<Vec<(String, Value)>> {
    let mut bindings = Vec::new();
    collect(pattern, value, &mut bindings).then_some(bindings)
}

fn collect(pattern: &Pattern, value: &Value, bindings: &mut Vec<(String, Value)>) -> bool {
    match (pattern, value) {
        (Pattern::Var(name), _) => {
            bindings.push((name.clone(), value.clone()));
            true
        }
        (Pattern::Wildcard, _) => true,
        (Pattern::Lit(lit), _) => value.matches_lit(lit),
        (Pattern::Nil, Value::Nil) => true,
        (Pattern::Cons(head, tail), Value::Cons(h, t)) => {
            collect(head, h, bindings) && collect(tail, t, bindings)
        }
        _ => false,
    }
}
