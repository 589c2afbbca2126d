use log::trace;

use crate::{
    ast::{TyVar, Type},
    error::{Result, TypeError},
};

use super::{InferenceTree, Subst, TypeInference, Types};

impl TypeInference {
    pub fn unify(t1: &Type, t2: &Type) -> Result<(Subst, InferenceTree)> {
        let input = format!("{} ~ {}", t1, t2);
        trace!("unify {}", input);

        match (t1, t2) {
            (Type::Var(v), ty) | (ty, Type::Var(v)) => Self::unify_var(*v, ty, &input),
            (Type::Con(c1), Type::Con(c2)) if c1 == c2 => Self::unify_con(&input),
            (Type::Arrow(a1, a2), Type::Arrow(b1, b2)) => Self::unify_arrow(a1, a2, b1, b2, &input),
            (Type::List(e1), Type::List(e2)) => Self::unify_list(e1, e2, &input),
            _ => Err(TypeError::UnificationFailure {
                expected: t1.clone(),
                actual: t2.clone(),
            }),
        }
    }

    // ───────────────────── (U-Con)
    // unify(C, C) = ∅
    fn unify_con(input: &str) -> Result<(Subst, InferenceTree)> {
        let tree = InferenceTree::new("Unify-Con", input, "{}", vec![]);
        Ok((Subst::empty(), tree))
    }

    // α ∉ ftv(τ)
    // ────────────────────── (U-VarL, U-VarR)
    // unify(α, τ) = [α ↦ τ]
    fn unify_var(v: TyVar, ty: &Type, input: &str) -> Result<(Subst, InferenceTree)> {
        if ty == &Type::Var(v) {
            let tree = InferenceTree::new("Unify-Var-Same", input, "{}", vec![]);
            Ok((Subst::empty(), tree))
        } else if Self::occurs_check(v, ty) {
            Err(TypeError::InfiniteType { var: v, ty: ty.clone() })
        } else {
            let subst = Subst::singleton(v, ty.clone());
            let tree = InferenceTree::new("Unify-Var", input, &subst.to_string(), vec![]);
            Ok((subst, tree))
        }
    }

    // S₁ = unify(τ₁, τ₃)    S₂ = unify(S₁(τ₂), S₁(τ₄))
    // ───────────────────────────────────────────────── (U-Arrow)
    // unify(τ₁ → τ₂, τ₃ → τ₄) = S₂ ∘ S₁
    fn unify_arrow(
        a1: &Type,
        a2: &Type,
        b1: &Type,
        b2: &Type,
        input: &str,
    ) -> Result<(Subst, InferenceTree)> {
        let (s1, tree1) = Self::unify(a1, b1)?;
        let (s2, tree2) = Self::unify(&a2.apply(&s1), &b2.apply(&s1))?;
        let final_subst = s2.compose(&s1);
        let tree = InferenceTree::new(
            "Unify-Arrow",
            input,
            &final_subst.to_string(),
            vec![tree1, tree2],
        );
        Ok((final_subst, tree))
    }

    //   S = unify(τ₁, τ₂)
    // ───────────────────── (U-List)
    // unify([τ₁], [τ₂]) = S
    fn unify_list(e1: &Type, e2: &Type, input: &str) -> Result<(Subst, InferenceTree)> {
        let (subst, inner) = Self::unify(e1, e2)?;
        let tree = InferenceTree::new("Unify-List", input, &subst.to_string(), vec![inner]);
        Ok((subst, tree))
    }

    pub(crate) fn occurs_check(var: TyVar, ty: &Type) -> bool {
        match ty {
            Type::Var(name) => *name == var,
            Type::Arrow(t1, t2) => Self::occurs_check(var, t1) || Self::occurs_check(var, t2),
            Type::List(elem) => Self::occurs_check(var, elem),
            Type::Con(_) => false,
        }
    }
}
