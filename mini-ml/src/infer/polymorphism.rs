use crate::ast::{Scheme, Type};

use super::{Subst, TypeEnv, TypeInference, Types};

impl TypeInference {
    /// One fresh variable per quantified variable, substituted simultaneously.
    pub(super) fn instantiate(&mut self, scheme: &Scheme) -> Type {
        let subst: Subst = scheme
            .vars
            .iter()
            .map(|var| (*var, Type::Var(self.fresh_tyvar())))
            .collect();

        scheme.ty.apply(&subst)
    }

    pub(super) fn generalize(&self, env: &TypeEnv, ty: &Type) -> Scheme {
        let env_vars = env.ftv();
        // BTreeSet iteration keeps the quantifier order deterministic
        let vars = ty
            .ftv()
            .into_iter()
            .filter(|var| !env_vars.contains(var))
            .collect();

        Scheme {
            vars,
            ty: ty.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::TyVar;

    use super::*;

    fn tyvar(id: u32) -> Type {
        Type::var(id)
    }

    fn arrow(t1: Type, t2: Type) -> Type {
        Type::arrow(t1, t2)
    }

    mod generalize {
        use super::*;

        #[test]
        fn concrete_type_empty_env() {
            // generalize({}, Int) = Int
            let ti = TypeInference::default();
            let actual = ti.generalize(&TypeEnv::new(), &Type::int());
            assert_eq!(actual, Scheme::mono(Type::int()));
        }

        #[test]
        fn arrow_type_empty_env() {
            // generalize({}, t0 -> t1) = ∀t0 t1. t0 -> t1
            let ti = TypeInference::default();
            let actual = ti.generalize(&TypeEnv::new(), &arrow(tyvar(0), tyvar(1)));
            let expected = Scheme {
                vars: vec![TyVar(0), TyVar(1)],
                ty: arrow(tyvar(0), tyvar(1)),
            };
            assert_eq!(actual, expected);
        }

        #[test]
        fn tyvar_bound_in_env() {
            // generalize({x: t0}, t0 -> t1) = ∀t1. t0 -> t1
            let ti = TypeInference::default();
            let env = TypeEnv::from([("x".to_string(), Scheme::mono(tyvar(0)))]);
            let actual = ti.generalize(&env, &arrow(tyvar(0), tyvar(1)));
            let expected = Scheme {
                vars: vec![TyVar(1)],
                ty: arrow(tyvar(0), tyvar(1)),
            };
            assert_eq!(actual, expected);
        }

        #[test]
        fn quantified_env_variables_do_not_block() {
            // generalize({id: ∀t0. t0 -> t0}, t0) = ∀t0. t0
            let ti = TypeInference::default();
            let env = TypeEnv::from([(
                "id".to_string(),
                Scheme {
                    vars: vec![TyVar(0)],
                    ty: arrow(tyvar(0), tyvar(0)),
                },
            )]);
            let actual = ti.generalize(&env, &tyvar(0));
            assert_eq!(actual.vars, vec![TyVar(0)]);
        }
    }

    mod instantiate {
        use super::*;

        #[test]
        fn monomorphic_type() {
            let mut ti = TypeInference::default();
            let actual = ti.instantiate(&Scheme::mono(arrow(tyvar(5), Type::int())));
            assert_eq!(actual, arrow(tyvar(5), Type::int()));
        }

        #[test]
        fn multiple_tyvars_get_distinct_fresh_vars() {
            // instantiate(∀t0 t1. t0 -> t1 -> t0) = t2 -> t3 -> t2
            let mut ti = TypeInference {
                counter: 2,
                ..TypeInference::default()
            };
            let scheme = Scheme {
                vars: vec![TyVar(0), TyVar(1)],
                ty: arrow(tyvar(0), arrow(tyvar(1), tyvar(0))),
            };
            let actual = ti.instantiate(&scheme);
            assert_eq!(actual, arrow(tyvar(2), arrow(tyvar(3), tyvar(2))));
        }

        #[test]
        fn fresh_ids_may_reuse_quantified_ids() {
            // instantiate(∀t1 t0. t0 -> t1) with counter 0 swaps the names
            let mut ti = TypeInference::default();
            let scheme = Scheme {
                vars: vec![TyVar(1), TyVar(0)],
                ty: arrow(tyvar(0), tyvar(1)),
            };
            let actual = ti.instantiate(&scheme);
            assert_eq!(actual, arrow(tyvar(1), tyvar(0)));
        }
    }
}
