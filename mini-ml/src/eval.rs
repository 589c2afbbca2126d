use std::rc::Rc;

use log::debug;

use crate::{
    ast::{BinOp, Expr, Pattern},
    error::RuntimeError,
};

mod env;
mod pattern;
mod value;

pub use env::Env;
pub use pattern::match_pattern;
pub use value::{Closure, Value};

pub type EvalResult<T = Value> = std::result::Result<T, RuntimeError>;

pub fn eval(env: &Env, expr: &Expr) -> EvalResult {
    match expr {
        Expr::Lit(lit) => Ok(Value::from(*lit)),
        Expr::Var(name) => env.lookup(name),
        Expr::Abs(param, body) => Ok(Value::Closure(Rc::new(Closure {
            param: param.clone(),
            body: Rc::clone(body),
            env: env.clone(),
        }))),
        Expr::App(func, arg) => {
            let func = eval(env, func)?;
            let arg = eval(env, arg)?;
            apply(func, arg)
        }
        Expr::Let(name, value, body) => {
            let value = eval(env, value)?;
            eval(&env.extend(name.as_str(), value), body)
        }
        Expr::LetRec(name, value, body) => {
            let rec_env = env.extend_rec(name.as_str());
            let value = eval(&rec_env, value)?;
            rec_env.backpatch(value);
            eval(&rec_env, body)
        }
        Expr::If(cond, then, otherwise) => match eval(env, cond)? {
            Value::Bool(true) => eval(env, then),
            Value::Bool(false) => eval(env, otherwise),
            value => Err(RuntimeError::NotABoolean { value }),
        },
        Expr::BinOp(op, left, right) => {
            let left = eval(env, left)?;
            let right = eval(env, right)?;
            eval_binop(*op, left, right)
        }
        Expr::Nil => Ok(Value::Nil),
        Expr::Cons(head, tail) => {
            let head = eval(env, head)?;
            let tail = eval(env, tail)?;
            Ok(Value::Cons(Rc::new(head), Rc::new(tail)))
        }
        Expr::List(elems) => {
            let values = elems
                .iter()
                .map(|elem| eval(env, elem))
                .collect::<EvalResult<Vec<_>>>()?;
            Ok(Value::list(values))
        }
        Expr::Case(scrutinee, arms) => {
            let value = eval(env, scrutinee)?;
            eval_case(env, value, arms)
        }
    }
}

/// Applies a function value to an argument.
pub fn apply(func: Value, arg: Value) -> EvalResult {
    match func {
        Value::Closure(closure) => {
            let env = closure.env.extend(closure.param.as_str(), arg);
            eval(&env, &closure.body)
        }
        value => Err(RuntimeError::NotAFunction { value }),
    }
}

fn eval_case(env: &Env, value: Value, arms: &[(Pattern, Expr)]) -> EvalResult {
    for (pattern, body) in arms {
        if let Some(bindings) = match_pattern(pattern, &value) {
            return eval(&env.extend_many(bindings), body);
        }
    }
    Err(RuntimeError::NonExhaustiveMatch { value })
}

fn eval_binop(op: BinOp, left: Value, right: Value) -> EvalResult {
    match (op, left, right) {
        (BinOp::Add | BinOp::Sub | BinOp::Mul, Value::Int(a), Value::Int(b)) => {
            let result = match op {
                BinOp::Add => a.checked_add(b),
                BinOp::Sub => a.checked_sub(b),
                _ => a.checked_mul(b),
            };
            result
                .map(Value::Int)
                .ok_or(RuntimeError::ArithmeticOverflow {
                    op,
                    left: a,
                    right: b,
                })
        }
        (BinOp::Eq, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a == b)),
        (BinOp::Ne, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a != b)),
        (BinOp::Lt, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a < b)),
        (BinOp::Le, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a <= b)),
        (BinOp::Gt, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a > b)),
        (BinOp::Ge, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a >= b)),
        // Both operands are already evaluated
        (BinOp::And, Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a && b)),
        (BinOp::Or, Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a || b)),
        (op, left, right) => Err(RuntimeError::InvalidOperands { op, left, right }),
    }
}

/// Evaluates one top-level statement.
pub fn eval_top(env: &Env, expr: &Expr) -> EvalResult {
    let value = eval(env, expr)?;
    debug!("evaluated {} => {}", expr, value);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use crate::ast::Lit;

    use super::*;

    fn run(expr: &Expr) -> EvalResult {
        eval_top(&Env::new(), expr)
    }

    fn lam(param: &str, body: Expr) -> Expr {
        Expr::abs(param, body)
    }

    fn var(name: &str) -> Expr {
        Expr::var(name)
    }

    fn app(func: Expr, arg: Expr) -> Expr {
        Expr::app(func, arg)
    }

    fn ints(values: &[i64]) -> Value {
        Value::list(values.iter().map(|n| Value::Int(*n)))
    }

    mod rules {
        use super::*;

        #[test]
        fn let_polymorphic_identity() {
            let expr = Expr::let_in("id", lam("x", var("x")), app(var("id"), Expr::int(5)));
            assert_eq!(run(&expr), Ok(Value::Int(5)));
        }

        #[test]
        fn recursive_factorial() {
            // let rec fact = \n -> if n == 0 then 1 else n * fact (n - 1) in fact 5
            let body = Expr::if_then_else(
                Expr::binop(BinOp::Eq, var("n"), Expr::int(0)),
                Expr::int(1),
                Expr::binop(
                    BinOp::Mul,
                    var("n"),
                    app(
                        var("fact"),
                        Expr::binop(BinOp::Sub, var("n"), Expr::int(1)),
                    ),
                ),
            );
            let expr = Expr::let_rec("fact", lam("n", body), app(var("fact"), Expr::int(5)));
            assert_eq!(run(&expr), Ok(Value::Int(120)));
        }

        #[test]
        fn closures_capture_their_definition_environment() {
            // let x = 1 in let f = \y -> x in let x = 2 in f 0
            let expr = Expr::let_in(
                "x",
                Expr::int(1),
                Expr::let_in(
                    "f",
                    lam("y", var("x")),
                    Expr::let_in("x", Expr::int(2), app(var("f"), Expr::int(0))),
                ),
            );
            assert_eq!(run(&expr), Ok(Value::Int(1)));
        }

        #[test]
        fn list_literal_and_cons() {
            let expr = Expr::cons(Expr::int(0), Expr::List(vec![Expr::int(1), Expr::int(2)]));
            assert_eq!(run(&expr), Ok(ints(&[0, 1, 2])));
        }

        #[test]
        fn case_takes_first_matching_arm() {
            // case [1, 2] of x :: _ -> x | _ -> 0 end
            let expr = Expr::case(
                Expr::List(vec![Expr::int(1), Expr::int(2)]),
                vec![
                    (Pattern::cons(Pattern::var("x"), Pattern::Wildcard), var("x")),
                    (Pattern::Wildcard, Expr::int(0)),
                ],
            );
            assert_eq!(run(&expr), Ok(Value::Int(1)));
        }

        #[test]
        fn case_arm_order_prefers_earlier_literal() {
            let expr = Expr::case(
                Expr::int(0),
                vec![
                    (Pattern::Lit(Lit::Int(0)), Expr::bool(true)),
                    (Pattern::var("n"), Expr::bool(false)),
                ],
            );
            assert_eq!(run(&expr), Ok(Value::Bool(true)));
        }

        #[test]
        fn recursion_over_a_list() {
            // let rec len = \xs -> case xs of [] -> 0 | _ :: t -> 1 + len t end in len [7, 8, 9]
            let body = Expr::case(
                var("xs"),
                vec![
                    (Pattern::Nil, Expr::int(0)),
                    (
                        Pattern::cons(Pattern::Wildcard, Pattern::var("t")),
                        Expr::binop(BinOp::Add, Expr::int(1), app(var("len"), var("t"))),
                    ),
                ],
            );
            let expr = Expr::let_rec(
                "len",
                lam("xs", body),
                app(
                    var("len"),
                    Expr::List(vec![Expr::int(7), Expr::int(8), Expr::int(9)]),
                ),
            );
            assert_eq!(run(&expr), Ok(Value::Int(3)));
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn non_exhaustive_match_reports_scrutinee() {
            let expr = Expr::case(
                Expr::Nil,
                vec![(
                    Pattern::cons(Pattern::Wildcard, Pattern::Wildcard),
                    Expr::int(1),
                )],
            );
            assert_eq!(
                run(&expr),
                Err(RuntimeError::NonExhaustiveMatch { value: Value::Nil })
            );
        }

        #[test]
        fn applying_a_non_function() {
            let expr = app(Expr::int(3), Expr::int(4));
            assert_eq!(
                run(&expr),
                Err(RuntimeError::NotAFunction {
                    value: Value::Int(3)
                })
            );
        }

        #[test]
        fn unbound_variable() {
            assert_eq!(
                run(&var("ghost")),
                Err(RuntimeError::UnboundVariable {
                    name: "ghost".to_string()
                })
            );
        }

        #[test]
        fn non_boolean_condition() {
            let expr = Expr::if_then_else(Expr::int(1), Expr::int(2), Expr::int(3));
            assert_eq!(
                run(&expr),
                Err(RuntimeError::NotABoolean {
                    value: Value::Int(1)
                })
            );
        }

        #[test]
        fn invalid_operands() {
            let expr = Expr::binop(BinOp::Add, Expr::int(1), Expr::bool(true));
            assert_eq!(
                run(&expr),
                Err(RuntimeError::InvalidOperands {
                    op: BinOp::Add,
                    left: Value::Int(1),
                    right: Value::Bool(true),
                })
            );
        }

        #[test]
        fn overflow_is_reported() {
            let expr = Expr::binop(BinOp::Mul, Expr::int(i64::MAX), Expr::int(2));
            assert_eq!(
                run(&expr),
                Err(RuntimeError::ArithmeticOverflow {
                    op: BinOp::Mul,
                    left: i64::MAX,
                    right: 2,
                })
            );
        }

        #[test]
        fn recursive_value_read_too_early() {
            // let rec x = x + 1 in x
            let expr = Expr::let_rec(
                "x",
                Expr::binop(BinOp::Add, var("x"), Expr::int(1)),
                var("x"),
            );
            assert_eq!(
                run(&expr),
                Err(RuntimeError::RecursiveValueNotReady {
                    name: "x".to_string()
                })
            );
        }

        #[test]
        fn strict_boolean_operators_evaluate_both_sides() {
            // false && (1 2)
            let expr = Expr::binop(
                BinOp::And,
                Expr::bool(false),
                app(Expr::int(1), Expr::int(2)),
            );
            assert!(matches!(
                run(&expr),
                Err(RuntimeError::NotAFunction { .. })
            ));
        }
    }
}
