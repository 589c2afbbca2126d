use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::ast::{Scheme, TyVar, Type};

use super::TypeEnv;

/// A finite map from type variables to types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subst(BTreeMap<TyVar, Type>);

impl Subst {
    pub fn empty() -> Self {
        Subst(BTreeMap::new())
    }

    pub fn singleton(var: TyVar, ty: Type) -> Self {
        Subst(BTreeMap::from([(var, ty)]))
    }

    pub fn get(&self, var: &TyVar) -> Option<&Type> {
        self.0.get(var)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `self ∘ other`: applying the result means applying `other`, then `self`.
    pub fn compose(&self, other: &Subst) -> Subst {
        let mut result: BTreeMap<TyVar, Type> = other
            .0
            .iter()
            .map(|(var, ty)| (*var, ty.apply(self)))
            .collect();
        for (var, ty) in &self.0 {
            result.entry(*var).or_insert_with(|| ty.clone());
        }
        Subst(result)
    }

    fn without(&self, vars: &[TyVar]) -> Subst {
        Subst(
            self.0
                .iter()
                .filter(|(var, _)| !vars.contains(var))
                .map(|(var, ty)| (*var, ty.clone()))
                .collect(),
        )
    }
}

impl FromIterator<(TyVar, Type)> for Subst {
    fn from_iter<I: IntoIterator<Item = (TyVar, Type)>>(iter: I) -> Self {
        Subst(iter.into_iter().collect())
    }
}

impl fmt::Display for Subst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "{{}}");
        }
        let entries: Vec<String> = self
            .0
            .iter()
            .map(|(var, ty)| format!("{}/{}", ty, var))
            .collect();
        write!(f, "{{{}}}", entries.join(", "))
    }
}

/// Things that mention type variables.
pub trait Types {
    fn ftv(&self) -> BTreeSet<TyVar>;

    fn apply(&self, subst: &Subst) -> Self;
}

impl Types for Type {
    fn ftv(&self) -> BTreeSet<TyVar> {
        match self {
            Type::Var(v) => BTreeSet::from([*v]),
            Type::Con(_) => BTreeSet::new(),
            Type::Arrow(t1, t2) => {
                let mut set = t1.ftv();
                set.extend(t2.ftv());
                set
            }
            Type::List(elem) => elem.ftv(),
        }
    }

    fn apply(&self, subst: &Subst) -> Type {
        match self {
            Type::Var(v) => subst.get(v).cloned().unwrap_or_else(|| self.clone()),
            Type::Con(_) => self.clone(),
            Type::Arrow(t1, t2) => Type::arrow(t1.apply(subst), t2.apply(subst)),
            Type::List(elem) => Type::list(elem.apply(subst)),
        }
    }
}

impl Types for Scheme {
    fn ftv(&self) -> BTreeSet<TyVar> {
        let mut set = self.ty.ftv();
        // Remove quantified variables
        for var in &self.vars {
            set.remove(var);
        }
        set
    }

    fn apply(&self, subst: &Subst) -> Scheme {
        Scheme {
            vars: self.vars.clone(),
            ty: self.ty.apply(&subst.without(&self.vars)),
        }
    }
}

impl Types for TypeEnv {
    fn ftv(&self) -> BTreeSet<TyVar> {
        self.values().flat_map(|scheme| scheme.ftv()).collect()
    }

    fn apply(&self, subst: &Subst) -> TypeEnv {
        self.iter()
            .map(|(name, scheme)| (name.clone(), scheme.apply(subst)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tyvar(id: u32) -> Type {
        Type::var(id)
    }

    fn arrow(t1: Type, t2: Type) -> Type {
        Type::arrow(t1, t2)
    }

    mod apply {
        use super::*;

        #[test]
        fn rewrites_nested_leaves() {
            // {Int/t0}([t0] -> t0) = [Int] -> Int
            let subst = Subst::singleton(TyVar(0), Type::int());
            let ty = arrow(Type::list(tyvar(0)), tyvar(0));
            assert_eq!(ty.apply(&subst), arrow(Type::list(Type::int()), Type::int()));
        }

        #[test]
        fn leaves_unknown_variables() {
            let subst = Subst::singleton(TyVar(0), Type::int());
            assert_eq!(tyvar(1).apply(&subst), tyvar(1));
        }

        #[test]
        fn scheme_shadows_quantified_variables() {
            // {Int/t0, Bool/t1}(∀t0. t0 -> t1) = ∀t0. t0 -> Bool
            let subst: Subst = [(TyVar(0), Type::int()), (TyVar(1), Type::bool())]
                .into_iter()
                .collect();
            let scheme = Scheme {
                vars: vec![TyVar(0)],
                ty: arrow(tyvar(0), tyvar(1)),
            };
            let expected = Scheme {
                vars: vec![TyVar(0)],
                ty: arrow(tyvar(0), Type::bool()),
            };
            assert_eq!(scheme.apply(&subst), expected);
        }

        #[test]
        fn environment() {
            let env = TypeEnv::from([
                ("x".to_string(), Scheme::mono(tyvar(0))),
                ("y".to_string(), Scheme::mono(arrow(tyvar(0), tyvar(1)))),
            ]);
            let subst = Subst::singleton(TyVar(0), Type::int());
            let actual = env.apply(&subst);
            assert_eq!(actual["x"], Scheme::mono(Type::int()));
            assert_eq!(actual["y"], Scheme::mono(arrow(Type::int(), tyvar(1))));
        }
    }

    mod compose {
        use super::*;

        #[test]
        fn applies_right_then_left() {
            // ({Int/t1} ∘ {t1/t0})(t0) = Int
            let s1 = Subst::singleton(TyVar(0), tyvar(1));
            let s2 = Subst::singleton(TyVar(1), Type::int());
            let composed = s2.compose(&s1);
            assert_eq!(tyvar(0).apply(&composed), Type::int());
            assert_eq!(tyvar(1).apply(&composed), Type::int());
        }

        #[test]
        fn right_operand_wins_on_shared_domain() {
            // s1 already maps t0, so s2's own t0 entry is shadowed
            let s1 = Subst::singleton(TyVar(0), Type::int());
            let s2 = Subst::singleton(TyVar(0), Type::bool());
            let composed = s2.compose(&s1);
            assert_eq!(tyvar(0).apply(&composed), Type::int());
        }

        #[test]
        fn empty_is_identity() {
            let s = Subst::singleton(TyVar(0), arrow(tyvar(1), tyvar(1)));
            assert_eq!(s.compose(&Subst::empty()), s);
            assert_eq!(Subst::empty().compose(&s), s);
        }
    }

    mod free_type_vars {
        use super::*;

        #[test]
        fn type_variables() {
            let ty = arrow(Type::list(tyvar(2)), arrow(tyvar(0), tyvar(2)));
            assert_eq!(ty.ftv(), BTreeSet::from([TyVar(0), TyVar(2)]));
        }

        #[test]
        fn scheme_excludes_quantified() {
            let scheme = Scheme {
                vars: vec![TyVar(0)],
                ty: arrow(tyvar(0), tyvar(1)),
            };
            assert_eq!(scheme.ftv(), BTreeSet::from([TyVar(1)]));
        }

        #[test]
        fn environment_unions_schemes() {
            let env = TypeEnv::from([
                ("f".to_string(), Scheme::mono(tyvar(3))),
                (
                    "id".to_string(),
                    Scheme {
                        vars: vec![TyVar(0)],
                        ty: arrow(tyvar(0), tyvar(0)),
                    },
                ),
            ]);
            assert_eq!(env.ftv(), BTreeSet::from([TyVar(3)]));
        }
    }

    #[test]
    fn display() {
        let subst: Subst = [(TyVar(0), Type::int()), (TyVar(1), Type::bool())]
            .into_iter()
            .collect();
        assert_eq!(subst.to_string(), "{Int/t0, Bool/t1}");
    }
}
