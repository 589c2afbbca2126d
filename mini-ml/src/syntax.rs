use crate::{
    ast::{Expr, Pattern},
    error::SyntaxError,
    parser::{ExprParser, ProgramParser, ReplParser},
};

/// A top-level statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Let { name: String, value: Expr, rec: bool },
    Expr(Expr),
}

impl Decl {
    /// The expression checked and evaluated for this statement. A recursive
    /// binding is closed over itself so it can be run on its own.
    pub fn to_expr(&self) -> Expr {
        match self {
            Decl::Let {
                name,
                value,
                rec: true,
            } => Expr::let_rec(name, value.clone(), Expr::var(name)),
            Decl::Let { value, .. } => value.clone(),
            Decl::Expr(expr) => expr.clone(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Decl::Let { name, .. } => Some(name),
            Decl::Expr(_) => None,
        }
    }
}

/// One equation of a definition, `f p1 .. pn = body`.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub name: String,
    pub params: Vec<Pattern>,
    pub body: Expr,
}

fn arg_name(index: usize) -> String {
    format!("__arg{}", index)
}

const NEXT: &str = "__next";
const UNIT: &str = "__unit";

/// `\x y -> e` as nested single-parameter lambdas.
pub fn lambda(params: Vec<String>, body: Expr) -> Expr {
    params
        .iter()
        .rev()
        .fold(body, |body, param| Expr::abs(param, body))
}

/// `[p1, p2]` as `p1 :: p2 :: []`.
pub fn list_pattern(elems: Vec<Pattern>) -> Pattern {
    elems
        .into_iter()
        .rev()
        .fold(Pattern::Nil, |tail, head| Pattern::cons(head, tail))
}

/// Turns the clauses of one definition into a name and a single expression.
pub fn desugar(mut clauses: Vec<Clause>) -> Result<(String, Expr), &'static str> {
    let (name, arity) = match clauses.first() {
        Some(first) => (first.name.clone(), first.params.len()),
        None => return Err("definition without clauses"),
    };
    if clauses.iter().any(|clause| clause.name != name) {
        return Err("clauses of one definition must share a name");
    }
    if clauses.iter().any(|clause| clause.params.len() != arity) {
        return Err("clauses of one definition must have the same number of parameters");
    }

    let value = match (arity, clauses.len()) {
        (0, 1) => clauses.remove(0).body,
        (0, _) => return Err("a value binding cannot have several clauses"),
        (_, 1) if clauses[0].params.iter().all(Pattern::is_irrefutable) => {
            curried(clauses.remove(0))
        }
        (1, _) => {
            let arms = clauses
                .into_iter()
                .map(|mut clause| (clause.params.remove(0), clause.body))
                .collect();
            Expr::abs(&arg_name(0), Expr::case(Expr::var(&arg_name(0)), arms))
        }
        _ => {
            let matched = clauses
                .into_iter()
                .rev()
                .fold(None, |fallback, clause| Some(match_clause(clause, fallback)));
            let body = matched.ok_or("definition without clauses")?;
            lambda((0..arity).map(arg_name).collect(), body)
        }
    };
    Ok((name, value))
}

/// A clause with only variable or wildcard parameters.
fn curried(clause: Clause) -> Expr {
    let params = clause
        .params
        .iter()
        .enumerate()
        .map(|(i, param)| match param {
            Pattern::Var(name) => name.clone(),
            _ => arg_name(i),
        })
        .collect();
    lambda(params, clause.body)
}

/// Matches the arguments of `clause` left to right, continuing with
/// `fallback` when any of its patterns fails.
fn match_clause(clause: Clause, fallback: Option<Expr>) -> Expr {
    let call_next = Expr::app(Expr::var(NEXT), Expr::int(0));
    let matched = clause
        .params
        .into_iter()
        .enumerate()
        .rev()
        .fold(clause.body, |body, (i, pattern)| {
            let refutable = !pattern.is_irrefutable();
            let mut arms = vec![(pattern, body)];
            if refutable && fallback.is_some() {
                arms.push((Pattern::Wildcard, call_next.clone()));
            }
            Expr::case(Expr::var(&arg_name(i)), arms)
        });

    match fallback {
        Some(next) => Expr::let_in(NEXT, Expr::abs(UNIT, next), matched),
        None => matched,
    }
}

fn syntax_error(err: impl ToString) -> SyntaxError {
    SyntaxError::new(err.to_string())
}

/// Parses a whole file of `;`-terminated declarations.
pub fn parse_program(src: &str) -> Result<Vec<Decl>, SyntaxError> {
    ProgramParser::new().parse(src).map_err(syntax_error)
}

/// Parses one REPL statement; the trailing `;` is optional.
pub fn parse_repl(src: &str) -> Result<Decl, SyntaxError> {
    ReplParser::new().parse(src).map_err(syntax_error)
}

pub fn parse_expr(src: &str) -> Result<Expr, SyntaxError> {
    ExprParser::new().parse(src).map_err(syntax_error)
}
