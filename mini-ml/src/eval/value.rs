use std::fmt;
use std::rc::Rc;

use crate::ast::{Expr, Lit};

use super::Env;

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Nil,
    Cons(Rc<Value>, Rc<Value>),
    Closure(Rc<Closure>),
}

/// A function value together with the environment it was created in.
pub struct Closure {
    pub param: String,
    pub body: Rc<Expr>,
    pub env: Env,
}

impl fmt::Debug for Closure {
    // The captured environment may refer back to this closure.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("param", &self.param)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

impl Value {
    pub fn list(values: impl IntoIterator<Item = Value>) -> Value {
        let values: Vec<Value> = values.into_iter().collect();
        values.into_iter().rev().fold(Value::Nil, |tail, head| {
            Value::Cons(Rc::new(head), Rc::new(tail))
        })
    }

    pub fn matches_lit(&self, lit: &Lit) -> bool {
        match (self, lit) {
            (Value::Int(n), Lit::Int(m)) => n == m,
            (Value::Bool(a), Lit::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Lit> for Value {
    fn from(lit: Lit) -> Self {
        match lit {
            Lit::Int(n) => Value::Int(n),
            Lit::Bool(b) => Value::Bool(b),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Cons(h1, t1), Value::Cons(h2, t2)) => h1 == h2 && t1 == t2,
            (Value::Closure(c1), Value::Closure(c2)) => Rc::ptr_eq(c1, c2),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Closure(_) => write!(f, "<fun>"),
            Value::Nil | Value::Cons(_, _) => {
                write!(f, "[")?;
                let mut current = self;
                let mut first = true;
                loop {
                    match current {
                        Value::Cons(head, tail) => {
                            if !first {
                                write!(f, ", ")?;
                            }
                            write!(f, "{}", head)?;
                            first = false;
                            current = tail.as_ref();
                        }
                        Value::Nil => break,
                        // Improper tail, only reachable without type checking
                        other => {
                            write!(f, " | {}", other)?;
                            break;
                        }
                    }
                }
                write!(f, "]")
            }
        }
    }
}
