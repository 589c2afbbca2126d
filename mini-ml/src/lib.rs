//! Hindley-Milner type inference (Algorithm W) and a pattern-matching
//! evaluator for a small ML language with integers, booleans and lists.

pub mod ast;
pub mod error;
pub mod eval;
pub mod infer;
pub mod repl;
pub mod session;
pub mod syntax;

use lalrpop_util::lalrpop_mod;

lalrpop_mod!(
    #[allow(clippy::all)]
    pub parser
);
