use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use itertools::Itertools;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Lit),
    Var(String),
    Abs(String, Rc<Expr>),
    App(Box<Expr>, Box<Expr>),
    Let(String, Box<Expr>, Box<Expr>),
    LetRec(String, Box<Expr>, Box<Expr>),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
    BinOp(BinOp, Box<Expr>, Box<Expr>),
    Nil,
    Cons(Box<Expr>, Box<Expr>),
    List(Vec<Expr>),
    Case(Box<Expr>, Vec<(Pattern, Expr)>),
}

impl Expr {
    pub fn var(name: &str) -> Self {
        Expr::Var(name.to_string())
    }

    pub fn int(n: i64) -> Self {
        Expr::Lit(Lit::Int(n))
    }

    pub fn bool(b: bool) -> Self {
        Expr::Lit(Lit::Bool(b))
    }

    pub fn abs(param: &str, body: Expr) -> Self {
        Expr::Abs(param.to_string(), Rc::new(body))
    }

    pub fn app(func: Expr, arg: Expr) -> Self {
        Expr::App(Box::new(func), Box::new(arg))
    }

    pub fn let_in(name: &str, value: Expr, body: Expr) -> Self {
        Expr::Let(name.to_string(), Box::new(value), Box::new(body))
    }

    pub fn let_rec(name: &str, value: Expr, body: Expr) -> Self {
        Expr::LetRec(name.to_string(), Box::new(value), Box::new(body))
    }

    pub fn if_then_else(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::If(Box::new(cond), Box::new(then), Box::new(otherwise))
    }

    pub fn binop(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::BinOp(op, Box::new(left), Box::new(right))
    }

    pub fn cons(head: Expr, tail: Expr) -> Self {
        Expr::Cons(Box::new(head), Box::new(tail))
    }

    pub fn case(scrutinee: Expr, arms: Vec<(Pattern, Expr)>) -> Self {
        Expr::Case(Box::new(scrutinee), arms)
    }

    fn is_atomic(&self) -> bool {
        matches!(
            self,
            Expr::Lit(_) | Expr::Var(_) | Expr::Nil | Expr::List(_) | Expr::Case(_, _)
        )
    }
}

fn fmt_atom(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    if expr.is_atomic() {
        write!(f, "{}", expr)
    } else {
        write!(f, "({})", expr)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Lit(lit) => write!(f, "{}", lit),
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Abs(param, body) => write!(f, "λ{}.{}", param, body),
            Expr::App(func, arg) => {
                match func.as_ref() {
                    Expr::App(_, _) => write!(f, "{}", func)?,
                    _ => fmt_atom(f, func)?,
                }
                write!(f, " ")?;
                fmt_atom(f, arg)
            }
            Expr::Let(var, value, body) => write!(f, "let {} = {} in {}", var, value, body),
            Expr::LetRec(var, value, body) => {
                write!(f, "let rec {} = {} in {}", var, value, body)
            }
            Expr::If(cond, then, otherwise) => {
                write!(f, "if {} then {} else {}", cond, then, otherwise)
            }
            Expr::BinOp(op, left, right) => {
                fmt_atom(f, left)?;
                write!(f, " {} ", op)?;
                fmt_atom(f, right)
            }
            Expr::Nil => write!(f, "[]"),
            Expr::Cons(head, tail) => {
                fmt_atom(f, head)?;
                write!(f, " :: ")?;
                match tail.as_ref() {
                    Expr::Cons(_, _) => write!(f, "{}", tail),
                    _ => fmt_atom(f, tail),
                }
            }
            Expr::List(exprs) => write!(f, "[{}]", exprs.iter().format(", ")),
            Expr::Case(scrutinee, arms) => write!(
                f,
                "case {} of {} end",
                scrutinee,
                arms.iter()
                    .format_with(" | ", |(pat, body), g| g(&format_args!("{} -> {}", pat, body)))
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lit {
    Int(i64),
    Bool(bool),
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lit::Int(n) => write!(f, "{}", n),
            Lit::Bool(b) => write!(f, "{}", b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add, // +
    Sub, // -
    Mul, // *
    Eq,  // ==
    Ne,  // !=
    Lt,  // <
    Le,  // <=
    Gt,  // >
    Ge,  // >=
    And, // &&
    Or,  // ||
}

impl BinOp {
    /// Operand type and result type; both operands share the operand type.
    pub fn signature(self) -> (Type, Type) {
        match self {
            BinOp::Add | BinOp::Sub | BinOp::Mul => (Type::int(), Type::int()),
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                (Type::int(), Type::bool())
            }
            BinOp::And | BinOp::Or => (Type::bool(), Type::bool()),
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        };
        write!(f, "{}", symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Var(String),
    Wildcard,
    Lit(Lit),
    Cons(Box<Pattern>, Box<Pattern>),
    Nil,
}

impl Pattern {
    pub fn var(name: &str) -> Self {
        Pattern::Var(name.to_string())
    }

    pub fn cons(head: Pattern, tail: Pattern) -> Self {
        Pattern::Cons(Box::new(head), Box::new(tail))
    }

    /// Matches every value.
    pub fn is_irrefutable(&self) -> bool {
        matches!(self, Pattern::Var(_) | Pattern::Wildcard)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Var(name) => write!(f, "{}", name),
            Pattern::Wildcard => write!(f, "_"),
            Pattern::Lit(lit) => write!(f, "{}", lit),
            Pattern::Nil => write!(f, "[]"),
            Pattern::Cons(head, tail) => match head.as_ref() {
                Pattern::Cons(_, _) => write!(f, "({}) :: {}", head, tail),
                _ => write!(f, "{} :: {}", head, tail),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TyVar(pub u32);

impl fmt::Display for TyVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TyCon {
    Int,
    Bool,
}

impl fmt::Display for TyCon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TyCon::Int => write!(f, "Int"),
            TyCon::Bool => write!(f, "Bool"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Var(TyVar),
    Con(TyCon),
    Arrow(Box<Type>, Box<Type>),
    List(Box<Type>),
}

impl Type {
    pub fn int() -> Self {
        Type::Con(TyCon::Int)
    }

    pub fn bool() -> Self {
        Type::Con(TyCon::Bool)
    }

    pub fn var(id: u32) -> Self {
        Type::Var(TyVar(id))
    }

    pub fn arrow(from: Type, to: Type) -> Self {
        Type::Arrow(Box::new(from), Box::new(to))
    }

    pub fn list(elem: Type) -> Self {
        Type::List(Box::new(elem))
    }

    /// Type variables in order of first appearance, without duplicates.
    pub fn vars_in_order(&self) -> Vec<TyVar> {
        fn walk(ty: &Type, out: &mut Vec<TyVar>) {
            match ty {
                Type::Var(v) => {
                    if !out.contains(v) {
                        out.push(*v);
                    }
                }
                Type::Con(_) => {}
                Type::Arrow(t1, t2) => {
                    walk(t1, out);
                    walk(t2, out);
                }
                Type::List(elem) => walk(elem, out),
            }
        }

        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }

    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, names: &HashMap<TyVar, String>) -> fmt::Result {
        match self {
            Type::Var(v) => match names.get(v) {
                Some(name) => write!(f, "{}", name),
                None => write!(f, "{}", v),
            },
            Type::Con(con) => write!(f, "{}", con),
            Type::Arrow(t1, t2) => {
                if let Type::Arrow(_, _) = t1.as_ref() {
                    write!(f, "(")?;
                    t1.fmt_with(f, names)?;
                    write!(f, ")")?;
                } else {
                    t1.fmt_with(f, names)?;
                }
                write!(f, " -> ")?;
                t2.fmt_with(f, names)
            }
            Type::List(elem) => {
                write!(f, "[")?;
                elem.fmt_with(f, names)?;
                write!(f, "]")
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with(f, &HashMap::new())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scheme {
    pub vars: Vec<TyVar>,
    pub ty: Type,
}

impl Scheme {
    pub fn mono(ty: Type) -> Self {
        Scheme { vars: vec![], ty }
    }

    /// Renumbers the quantified variables in order of appearance, skipping
    /// ids that occur free so the renaming never captures.
    pub fn normalize(&self) -> Scheme {
        let order = self.ty.vars_in_order();
        let free: Vec<TyVar> = order
            .iter()
            .filter(|v| !self.vars.contains(v))
            .copied()
            .collect();

        let mut next = 0;
        let mut renaming = HashMap::new();
        let mut vars = Vec::new();
        for v in order.iter().filter(|v| self.vars.contains(v)) {
            while free.contains(&TyVar(next)) {
                next += 1;
            }
            renaming.insert(*v, TyVar(next));
            vars.push(TyVar(next));
            next += 1;
        }

        Scheme {
            vars,
            ty: rename(&self.ty, &renaming),
        }
    }
}

fn rename(ty: &Type, renaming: &HashMap<TyVar, TyVar>) -> Type {
    match ty {
        Type::Var(v) => Type::Var(renaming.get(v).copied().unwrap_or(*v)),
        Type::Con(_) => ty.clone(),
        Type::Arrow(t1, t2) => Type::arrow(rename(t1, renaming), rename(t2, renaming)),
        Type::List(elem) => Type::list(rename(elem, renaming)),
    }
}

fn letter_name(index: usize) -> String {
    let letter = (b'a' + (index % 26) as u8) as char;
    match index / 26 {
        0 => letter.to_string(),
        n => format!("{}{}", letter, n),
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quantified: Vec<TyVar> = self
            .ty
            .vars_in_order()
            .into_iter()
            .filter(|v| self.vars.contains(v))
            .collect();
        if quantified.is_empty() {
            return write!(f, "{}", self.ty);
        }

        let names: HashMap<TyVar, String> = quantified
            .iter()
            .enumerate()
            .map(|(i, v)| (*v, letter_name(i)))
            .collect();
        write!(
            f,
            "forall {}. ",
            quantified.iter().map(|v| &names[v]).join(" ")
        )?;
        self.ty.fmt_with(f, &names)
    }
}
