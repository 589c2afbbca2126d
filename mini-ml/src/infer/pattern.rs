use crate::{
    ast::{Lit, Pattern, Type},
    error::Result,
};

use super::{InferenceTree, Subst, TypeInference, Types};

/// Variables a pattern binds, paired with their (not yet substituted) types.
pub(super) type Bindings = Vec<(String, Type)>;

impl TypeInference {
    /// Checks `pattern` against the scrutinee type `expected`, pushing the
    /// variables it binds onto `bindings` in left-to-right order.
    pub(super) fn infer_pattern(
        &mut self,
        pattern: &Pattern,
        expected: &Type,
        bindings: &mut Bindings,
    ) -> Result<(Subst, InferenceTree)> {
        let input = format!("{} : {}", pattern, expected);

        match pattern {
            // ──────────────── (P-Var)
            //  x : τ ⊣ {x : τ}
            Pattern::Var(name) => {
                bindings.push((name.clone(), expected.clone()));
                let tree = InferenceTree::new("P-Var", &input, &format!("{{{}}}", input), vec![]);
                Ok((Subst::empty(), tree))
            }
            Pattern::Wildcard => {
                let tree = InferenceTree::new("P-Wild", &input, "{}", vec![]);
                Ok((Subst::empty(), tree))
            }
            //  S = unify(τ, typeof(l))
            // ───────────────────────── (P-Lit)
            //       l : τ ⊣ {}
            Pattern::Lit(lit) => {
                let lit_type = match lit {
                    Lit::Int(_) => Type::int(),
                    Lit::Bool(_) => Type::bool(),
                };
                let (subst, tree1) = Self::unify(&lit_type, expected)?;
                let tree = InferenceTree::new("P-Lit", &input, &subst.to_string(), vec![tree1]);
                Ok((subst, tree))
            }
            //  S = unify(τ, [α])    α fresh
            // ────────────────────────────── (P-Nil)
            //           [] : τ ⊣ {}
            Pattern::Nil => {
                let elem = Type::Var(self.fresh_tyvar());
                let (subst, tree1) = Self::unify(&Type::list(elem), expected)?;
                let tree = InferenceTree::new("P-Nil", &input, &subst.to_string(), vec![tree1]);
                Ok((subst, tree))
            }
            //  S₁ = unify(τ, [α])    p₁ : S₁α ⊣ Γ₁    p₂ : S₂S₁[α] ⊣ Γ₂
            // ──────────────────────────────────────────────────────── (P-Cons)
            //                p₁ :: p₂ : τ ⊣ Γ₁ ∪ Γ₂
            Pattern::Cons(head, tail) => {
                let elem = Type::Var(self.fresh_tyvar());
                let list = Type::list(elem.clone());
                let (s1, tree1) = Self::unify(&list, expected)?;
                let (s2, tree2) = self.infer_pattern(head, &elem.apply(&s1), bindings)?;
                let subst = s2.compose(&s1);
                let (s3, tree3) = self.infer_pattern(tail, &list.apply(&subst), bindings)?;
                let subst = s3.compose(&subst);

                let tree = InferenceTree::new(
                    "P-Cons",
                    &input,
                    &subst.to_string(),
                    vec![tree1, tree2, tree3],
                );
                Ok((subst, tree))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{ast::TyVar, error::TypeError};

    use super::*;

    fn check(pattern: &Pattern, expected: &Type) -> Result<(Subst, Bindings)> {
        let mut ti = TypeInference { counter: 10, trace: false };
        let mut bindings = Vec::new();
        let (subst, _) = ti.infer_pattern(pattern, expected, &mut bindings)?;
        let bindings = bindings
            .into_iter()
            .map(|(name, ty)| (name, ty.apply(&subst)))
            .collect();
        Ok((subst, bindings))
    }

    #[test]
    fn variable_binds_scrutinee_type() {
        let (subst, bindings) = check(&Pattern::var("x"), &Type::var(0)).unwrap();
        assert!(subst.is_empty());
        assert_eq!(bindings, vec![("x".to_string(), Type::var(0))]);
    }

    #[test]
    fn wildcard_binds_nothing() {
        let (_, bindings) = check(&Pattern::Wildcard, &Type::int()).unwrap();
        assert!(bindings.is_empty());
    }

    #[test]
    fn literal_refines_scrutinee() {
        let (subst, _) = check(&Pattern::Lit(Lit::Bool(true)), &Type::var(0)).unwrap();
        assert_eq!(Type::var(0).apply(&subst), Type::bool());
    }

    #[test]
    fn cons_binds_head_and_tail() {
        let pattern = Pattern::cons(Pattern::var("h"), Pattern::var("t"));
        let (subst, bindings) = check(&pattern, &Type::var(0)).unwrap();
        assert_eq!(Type::var(0).apply(&subst), Type::list(Type::var(10)));
        assert_eq!(
            bindings,
            vec![
                ("h".to_string(), Type::var(10)),
                ("t".to_string(), Type::list(Type::var(10))),
            ]
        );
    }

    #[test]
    fn nested_literal_fixes_element_type() {
        // 0 :: rest against t0 gives t0 = [Int]
        let pattern = Pattern::cons(Pattern::Lit(Lit::Int(0)), Pattern::var("rest"));
        let (subst, bindings) = check(&pattern, &Type::var(0)).unwrap();
        assert_eq!(Type::var(0).apply(&subst), Type::list(Type::int()));
        assert_eq!(bindings, vec![("rest".to_string(), Type::list(Type::int()))]);
    }

    #[test]
    fn nil_against_int_fails() {
        let actual = check(&Pattern::Nil, &Type::int());
        assert!(matches!(actual, Err(TypeError::UnificationFailure { .. })));
    }

    #[test]
    fn literal_against_list_fails() {
        let actual = check(&Pattern::Lit(Lit::Int(1)), &Type::list(Type::Var(TyVar(0))));
        assert!(matches!(actual, Err(TypeError::UnificationFailure { .. })));
    }
}
