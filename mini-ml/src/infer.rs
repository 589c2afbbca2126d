use std::collections::BTreeMap;
use std::fmt;

use log::debug;

use crate::{
    ast::{BinOp, Expr, Lit, Pattern, Scheme, TyVar, Type},
    error::{Result, TypeError},
};

mod pattern;
mod polymorphism;
mod subst;
mod unify;

pub use subst::{Subst, Types};

pub type TmVar = String;
pub type TypeEnv = BTreeMap<TmVar, Scheme>;

#[derive(Debug)]
pub struct InferenceTree {
    pub rule: String,
    pub input: String,
    pub output: String,
    pub children: Vec<InferenceTree>,
}

impl InferenceTree {
    fn new(rule: &str, input: &str, output: &str, children: Vec<InferenceTree>) -> Self {
        Self {
            rule: rule.to_string(),
            input: input.to_string(),
            output: output.to_string(),
            children,
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(
            f,
            "{}{}: {} {}",
            "  ".repeat(depth),
            self.rule,
            self.input,
            self.output
        )?;
        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for InferenceTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

/// Fresh-variable state for a single top-level inference run.
#[derive(Debug, Default)]
pub struct TypeInference {
    counter: u32,
    trace: bool,
}

impl TypeInference {
    /// Starts numbering past every variable left free in `env`, so fresh
    /// variables never collide with them.
    pub fn for_env(env: &TypeEnv) -> Self {
        let counter = env.ftv().iter().map(|var| var.0 + 1).max().unwrap_or(0);
        Self {
            counter,
            trace: false,
        }
    }

    /// Fills in the judgements of the derivation. Untraced nodes carry only
    /// their rule names.
    pub fn traced(self) -> Self {
        Self {
            trace: true,
            ..self
        }
    }

    fn fresh_tyvar(&mut self) -> TyVar {
        let var = TyVar(self.counter);
        self.counter += 1;
        var
    }

    fn judgement(&self, env: &TypeEnv, expr: &Expr) -> String {
        if self.trace {
            format!("{} ⊢ {} ⇒", Self::pretty_env(env), expr)
        } else {
            String::new()
        }
    }

    fn show(&self, ty: &Type) -> String {
        if self.trace {
            ty.to_string()
        } else {
            String::new()
        }
    }

    fn pretty_env(env: &TypeEnv) -> String {
        if env.is_empty() {
            "{}".to_string()
        } else {
            let entries: Vec<String> = env.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
            format!("{{{}}}", entries.join(", "))
        }
    }

    pub fn infer(&mut self, env: &TypeEnv, expr: &Expr) -> Result<(Subst, Type, InferenceTree)> {
        match expr {
            Expr::Lit(lit) => self.infer_lit(env, expr, lit),
            Expr::Var(name) => self.infer_var(env, expr, name),
            Expr::Abs(param, body) => self.infer_abs(env, expr, param, body),
            Expr::App(func, arg) => self.infer_app(env, expr, func, arg),
            Expr::Let(var, value, body) => self.infer_let(env, expr, var, value, body),
            Expr::LetRec(var, value, body) => self.infer_let_rec(env, expr, var, value, body),
            Expr::If(cond, then, otherwise) => self.infer_if(env, expr, cond, then, otherwise),
            Expr::BinOp(op, left, right) => self.infer_binop(env, expr, *op, left, right),
            Expr::Nil => self.infer_nil(env, expr),
            Expr::Cons(head, tail) => self.infer_cons(env, expr, head, tail),
            Expr::List(elems) => self.infer_list(env, expr, elems),
            Expr::Case(scrutinee, arms) => self.infer_case(env, expr, scrutinee, arms),
        }
    }

    // ───────────────── (T-Int, T-Bool)
    //    Γ ⊢ n : Int
    fn infer_lit(
        &self,
        env: &TypeEnv,
        expr: &Expr,
        lit: &Lit,
    ) -> Result<(Subst, Type, InferenceTree)> {
        let input = self.judgement(env, expr);
        let (rule, ty) = match lit {
            Lit::Int(_) => ("T-Int", Type::int()),
            Lit::Bool(_) => ("T-Bool", Type::bool()),
        };
        let tree = InferenceTree::new(rule, &input, &self.show(&ty), vec![]);
        Ok((Subst::empty(), ty, tree))
    }

    // x : σ ∈ Γ    τ = inst(σ)
    // ───────────────────────── (T-Var)
    //        Γ ⊢ x : τ
    fn infer_var(
        &mut self,
        env: &TypeEnv,
        expr: &Expr,
        name: &str,
    ) -> Result<(Subst, Type, InferenceTree)> {
        let input = self.judgement(env, expr);

        match env.get(name) {
            Some(scheme) => {
                let instantiated = self.instantiate(scheme);
                let tree = InferenceTree::new("T-Var", &input, &self.show(&instantiated), vec![]);
                Ok((Subst::empty(), instantiated, tree))
            }
            None => Err(TypeError::UnboundVariable {
                name: name.to_string(),
            }),
        }
    }

    // Γ, x : α ⊢ e : τ    α fresh
    // ───────────────────────────── (T-Abs)
    //    Γ ⊢ λx. e : α → τ
    fn infer_abs(
        &mut self,
        env: &TypeEnv,
        expr: &Expr,
        param: &str,
        body: &Expr,
    ) -> Result<(Subst, Type, InferenceTree)> {
        let input = self.judgement(env, expr);

        let param_type = Type::Var(self.fresh_tyvar());
        let mut new_env = env.clone();
        new_env.insert(param.to_string(), Scheme::mono(param_type.clone()));

        let (s1, body_type, tree1) = self.infer(&new_env, body)?;
        let result_type = Type::arrow(param_type.apply(&s1), body_type);

        let tree = InferenceTree::new("T-Abs", &input, &self.show(&result_type), vec![tree1]);
        Ok((s1, result_type, tree))
    }

    // Γ ⊢ e₁ : τ₁    Γ ⊢ e₂ : τ₂    α fresh    S = unify(τ₁, τ₂ → α)
    // ────────────────────────────────────────────────────────────── (T-App)
    //                     Γ ⊢ e₁ e₂ : S(α)
    fn infer_app(
        &mut self,
        env: &TypeEnv,
        expr: &Expr,
        func: &Expr,
        arg: &Expr,
    ) -> Result<(Subst, Type, InferenceTree)> {
        let input = self.judgement(env, expr);

        let (s1, func_type, tree1) = self.infer(env, func)?;
        let (s2, arg_type, tree2) = self.infer(&env.apply(&s1), arg)?;

        let result_type = Type::Var(self.fresh_tyvar());
        let expected_func_type = Type::arrow(arg_type, result_type.clone());
        let (s3, tree3) = Self::unify(&func_type.apply(&s2), &expected_func_type)?;

        let final_subst = s3.compose(&s2.compose(&s1));
        let final_type = result_type.apply(&s3);

        let tree = InferenceTree::new(
            "T-App",
            &input,
            &self.show(&final_type),
            vec![tree1, tree2, tree3],
        );
        Ok((final_subst, final_type, tree))
    }

    // Γ ⊢ e₁ : τ₁    σ = gen(SΓ, τ₁)    SΓ, x : σ ⊢ e₂ : τ₂
    // ────────────────────────────────────────────────────── (T-Let)
    //          Γ ⊢ let x = e₁ in e₂ : τ₂
    fn infer_let(
        &mut self,
        env: &TypeEnv,
        expr: &Expr,
        var: &str,
        value: &Expr,
        body: &Expr,
    ) -> Result<(Subst, Type, InferenceTree)> {
        let input = self.judgement(env, expr);

        let (s1, value_type, tree1) = self.infer(env, value)?;
        let env_subst = env.apply(&s1);
        let scheme = self.generalize(&env_subst, &value_type.apply(&s1));

        let mut new_env = env_subst;
        new_env.insert(var.to_string(), scheme);

        let (s2, body_type, tree2) = self.infer(&new_env, body)?;

        let final_subst = s2.compose(&s1);
        let tree = InferenceTree::new("T-Let", &input, &self.show(&body_type), vec![tree1, tree2]);
        Ok((final_subst, body_type, tree))
    }

    // Γ, x : α ⊢ e₁ : τ₁    S = unify(α, τ₁)    σ = gen(SΓ, Sα)    SΓ, x : σ ⊢ e₂ : τ₂
    // ───────────────────────────────────────────────────────────────────────────── (T-LetRec)
    //                         Γ ⊢ let rec x = e₁ in e₂ : τ₂
    fn infer_let_rec(
        &mut self,
        env: &TypeEnv,
        expr: &Expr,
        var: &str,
        value: &Expr,
        body: &Expr,
    ) -> Result<(Subst, Type, InferenceTree)> {
        let input = self.judgement(env, expr);

        let rec_type = Type::Var(self.fresh_tyvar());
        let mut rec_env = env.clone();
        // Monomorphic inside its own definition
        rec_env.insert(var.to_string(), Scheme::mono(rec_type.clone()));

        let (s1, value_type, tree1) = self.infer(&rec_env, value)?;
        let (s2, tree2) = Self::unify(&rec_type.apply(&s1), &value_type.apply(&s1))?;
        let subst = s2.compose(&s1);

        let env_subst = env.apply(&subst);
        let scheme = self.generalize(&env_subst, &rec_type.apply(&subst));
        let mut new_env = env_subst;
        new_env.insert(var.to_string(), scheme);

        let (s3, body_type, tree3) = self.infer(&new_env, body)?;

        let final_subst = s3.compose(&subst);
        let tree = InferenceTree::new(
            "T-LetRec",
            &input,
            &self.show(&body_type),
            vec![tree1, tree2, tree3],
        );
        Ok((final_subst, body_type, tree))
    }

    // Γ ⊢ e₁ : Bool    Γ ⊢ e₂ : τ    Γ ⊢ e₃ : τ
    // ────────────────────────────────────────── (T-If)
    //    Γ ⊢ if e₁ then e₂ else e₃ : τ
    fn infer_if(
        &mut self,
        env: &TypeEnv,
        expr: &Expr,
        cond: &Expr,
        then: &Expr,
        otherwise: &Expr,
    ) -> Result<(Subst, Type, InferenceTree)> {
        let input = self.judgement(env, expr);

        let (s1, cond_type, tree1) = self.infer(env, cond)?;
        let (s2, tree2) = Self::unify(&Type::bool(), &cond_type)?;
        let subst = s2.compose(&s1);

        let (s3, then_type, tree3) = self.infer(&env.apply(&subst), then)?;
        let subst = s3.compose(&subst);

        let (s4, else_type, tree4) = self.infer(&env.apply(&subst), otherwise)?;
        let subst = s4.compose(&subst);

        let (s5, tree5) = Self::unify(&then_type.apply(&subst), &else_type.apply(&subst))?;
        let final_subst = s5.compose(&subst);
        let final_type = else_type.apply(&final_subst);

        let tree = InferenceTree::new(
            "T-If",
            &input,
            &self.show(&final_type),
            vec![tree1, tree2, tree3, tree4, tree5],
        );
        Ok((final_subst, final_type, tree))
    }

    // Γ ⊢ e₁ : τ₁    Γ ⊢ e₂ : τ₂    op : τ → τ → τᵣ    S = unify(τ, τ₁) ∘ unify(τ, τ₂)
    // ─────────────────────────────────────────────────────────────────────────── (T-BinOp)
    //                           Γ ⊢ e₁ op e₂ : τᵣ
    fn infer_binop(
        &mut self,
        env: &TypeEnv,
        expr: &Expr,
        op: BinOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<(Subst, Type, InferenceTree)> {
        let input = self.judgement(env, expr);
        let (operand_type, result_type) = op.signature();

        let (s1, left_type, tree1) = self.infer(env, left)?;
        let (s2, tree2) = Self::unify(&operand_type, &left_type)?;
        let subst = s2.compose(&s1);

        let (s3, right_type, tree3) = self.infer(&env.apply(&subst), right)?;
        let subst = s3.compose(&subst);
        let (s4, tree4) = Self::unify(&operand_type, &right_type.apply(&subst))?;
        let final_subst = s4.compose(&subst);

        let tree = InferenceTree::new(
            "T-BinOp",
            &input,
            &self.show(&result_type),
            vec![tree1, tree2, tree3, tree4],
        );
        Ok((final_subst, result_type, tree))
    }

    //     α fresh
    // ─────────────── (T-Nil)
    //  Γ ⊢ [] : [α]
    fn infer_nil(&mut self, env: &TypeEnv, expr: &Expr) -> Result<(Subst, Type, InferenceTree)> {
        let input = self.judgement(env, expr);
        let ty = Type::list(Type::Var(self.fresh_tyvar()));
        let tree = InferenceTree::new("T-Nil", &input, &self.show(&ty), vec![]);
        Ok((Subst::empty(), ty, tree))
    }

    // Γ ⊢ e₁ : τ    Γ ⊢ e₂ : [τ]
    // ─────────────────────────── (T-Cons)
    //   Γ ⊢ e₁ :: e₂ : [τ]
    fn infer_cons(
        &mut self,
        env: &TypeEnv,
        expr: &Expr,
        head: &Expr,
        tail: &Expr,
    ) -> Result<(Subst, Type, InferenceTree)> {
        let input = self.judgement(env, expr);

        let (s1, head_type, tree1) = self.infer(env, head)?;
        let (s2, tail_type, tree2) = self.infer(&env.apply(&s1), tail)?;
        let subst = s2.compose(&s1);

        let expected = Type::list(head_type.apply(&subst));
        let (s3, tree3) = Self::unify(&expected, &tail_type.apply(&subst))?;
        let final_subst = s3.compose(&subst);
        let final_type = expected.apply(&s3);

        let tree = InferenceTree::new(
            "T-Cons",
            &input,
            &self.show(&final_type),
            vec![tree1, tree2, tree3],
        );
        Ok((final_subst, final_type, tree))
    }

    // Γ ⊢ e₁ : τ    ...    Γ ⊢ eₙ : τ
    // ───────────────────────────────── (T-List)
    //    Γ ⊢ [e₁, ..., eₙ] : [τ]
    fn infer_list(
        &mut self,
        env: &TypeEnv,
        expr: &Expr,
        elems: &[Expr],
    ) -> Result<(Subst, Type, InferenceTree)> {
        let input = self.judgement(env, expr);

        let elem_type = Type::Var(self.fresh_tyvar());
        let mut subst = Subst::empty();
        let mut trees = Vec::new();

        for elem in elems {
            let (s1, ty, tree1) = self.infer(&env.apply(&subst), elem)?;
            subst = s1.compose(&subst);
            let (s2, tree2) = Self::unify(&elem_type.apply(&subst), &ty.apply(&subst))?;
            subst = s2.compose(&subst);
            trees.push(tree1);
            trees.push(tree2);
        }

        let result_type = Type::list(elem_type.apply(&subst));
        let tree = InferenceTree::new("T-List", &input, &self.show(&result_type), trees);
        Ok((subst, result_type, tree))
    }

    // Γ ⊢ e : τ    pᵢ : τ ⊣ Γᵢ    Γ, Γᵢ ⊢ eᵢ : τ'   (for every arm)
    // ───────────────────────────────────────────────────────── (T-Case)
    //       Γ ⊢ case e of p₁ -> e₁ | ... | pₙ -> eₙ end : τ'
    fn infer_case(
        &mut self,
        env: &TypeEnv,
        expr: &Expr,
        scrutinee: &Expr,
        arms: &[(Pattern, Expr)],
    ) -> Result<(Subst, Type, InferenceTree)> {
        let input = self.judgement(env, expr);

        let (mut subst, scrutinee_type, tree0) = self.infer(env, scrutinee)?;
        let result_type = Type::Var(self.fresh_tyvar());
        let mut trees = vec![tree0];

        for (pattern, body) in arms {
            let mut bindings = Vec::new();
            let (s1, tree1) =
                self.infer_pattern(pattern, &scrutinee_type.apply(&subst), &mut bindings)?;
            subst = s1.compose(&subst);

            // Later bindings of the same name shadow earlier ones
            let mut arm_env = env.apply(&subst);
            for (name, ty) in bindings {
                arm_env.insert(name, Scheme::mono(ty.apply(&subst)));
            }

            let (s2, body_type, tree2) = self.infer(&arm_env, body)?;
            subst = s2.compose(&subst);

            let (s3, tree3) = Self::unify(&result_type.apply(&subst), &body_type.apply(&subst))?;
            subst = s3.compose(&subst);
            trees.extend([tree1, tree2, tree3]);
        }

        let final_type = result_type.apply(&subst);
        let tree = InferenceTree::new("T-Case", &input, &self.show(&final_type), trees);
        Ok((subst, final_type, tree))
    }
}

/// Infers the principal scheme of a top-level expression under `env`.
pub fn infer_top(env: &TypeEnv, expr: &Expr) -> Result<Scheme> {
    infer_with(TypeInference::for_env(env), env, expr).map(|(scheme, _)| scheme)
}

/// Like [`infer_top`], also returning the full derivation.
pub fn run_inference(env: &TypeEnv, expr: &Expr) -> Result<(Scheme, InferenceTree)> {
    infer_with(TypeInference::for_env(env).traced(), env, expr)
}

fn infer_with(
    mut ti: TypeInference,
    env: &TypeEnv,
    expr: &Expr,
) -> Result<(Scheme, InferenceTree)> {
    let (subst, ty, tree) = ti.infer(env, expr)?;
    let scheme = ti.generalize(&env.apply(&subst), &ty.apply(&subst));
    debug!("inferred {} : {}", expr, scheme);
    Ok((scheme, tree))
}

/// Infers a closed expression.
pub fn infer_type_only(expr: &Expr) -> Result<Scheme> {
    infer_top(&TypeEnv::new(), expr)
}
