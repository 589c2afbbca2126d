use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use crate::error::RuntimeError;

use super::Value;

/// Persistent runtime environment. Extending it allocates a new frame that
/// points at the old one, so environments captured earlier never change.
#[derive(Clone, Default)]
pub struct Env(Option<Rc<Frame>>);

struct Frame {
    name: String,
    slot: Slot,
    parent: Env,
}

enum Slot {
    Value(Value),
    /// Filled once the recursive definition has been evaluated.
    Rec(OnceCell<Value>),
}

impl Env {
    pub fn new() -> Self {
        Env(None)
    }

    pub fn extend(&self, name: impl Into<String>, value: Value) -> Env {
        self.push(name.into(), Slot::Value(value))
    }

    pub fn extend_many(&self, bindings: impl IntoIterator<Item = (String, Value)>) -> Env {
        bindings
            .into_iter()
            .fold(self.clone(), |env, (name, value)| env.extend(name, value))
    }

    /// Binds `name` to an empty slot, to be filled by [`Env::backpatch`].
    ///
    /// A closure stored in the slot holds this frame, so the frame and the
    /// closure keep each other alive and are never freed. This happens on
    /// every evaluation of a `let rec`, including nested ones run inside a
    /// loop.
    pub fn extend_rec(&self, name: impl Into<String>) -> Env {
        self.push(name.into(), Slot::Rec(OnceCell::new()))
    }

    /// Fills the recursive slot at the head of this environment.
    pub fn backpatch(&self, value: Value) {
        if let Some(frame) = &self.0 {
            if let Slot::Rec(cell) = &frame.slot {
                let filled = cell.set(value).is_ok();
                debug_assert!(filled, "recursive slot {} filled twice", frame.name);
            }
        }
    }

    fn push(&self, name: String, slot: Slot) -> Env {
        Env(Some(Rc::new(Frame {
            name,
            slot,
            parent: self.clone(),
        })))
    }

    pub fn lookup(&self, name: &str) -> Result<Value, RuntimeError> {
        let mut current = self;
        while let Some(frame) = &current.0 {
            if frame.name == name {
                return match &frame.slot {
                    Slot::Value(value) => Ok(value.clone()),
                    Slot::Rec(cell) => {
                        cell.get()
                            .cloned()
                            .ok_or_else(|| RuntimeError::RecursiveValueNotReady {
                                name: name.to_string(),
                            })
                    }
                };
            }
            current = &frame.parent;
        }
        Err(RuntimeError::UnboundVariable {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names().contains(&name)
    }

    /// Visible names, innermost first, without shadowed duplicates.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let mut current = self;
        while let Some(frame) = &current.0 {
            if !names.contains(&frame.name.as_str()) {
                names.push(&frame.name);
            }
            current = &frame.parent;
        }
        names
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_innermost_binding() {
        let env = Env::new().extend("x", Value::Int(1)).extend("x", Value::Int(2));
        assert_eq!(env.lookup("x"), Ok(Value::Int(2)));
        assert_eq!(env.names(), vec!["x"]);
    }

    #[test]
    fn extension_leaves_parent_untouched() {
        let parent = Env::new().extend("x", Value::Int(1));
        let child = parent.extend("y", Value::Bool(true));
        assert!(child.contains("y"));
        assert!(!parent.contains("y"));
        assert_eq!(parent.lookup("x"), Ok(Value::Int(1)));
    }

    #[test]
    fn unbound_name() {
        assert_eq!(
            Env::new().lookup("z"),
            Err(RuntimeError::UnboundVariable {
                name: "z".to_string()
            })
        );
    }

    #[test]
    fn recursive_slot_backpatching() {
        let env = Env::new().extend_rec("f");
        assert_eq!(
            env.lookup("f"),
            Err(RuntimeError::RecursiveValueNotReady {
                name: "f".to_string()
            })
        );
        env.backpatch(Value::Int(7));
        assert_eq!(env.lookup("f"), Ok(Value::Int(7)));
    }

    #[test]
    fn extend_many_binds_in_order() {
        let env = Env::new().extend_many([
            ("a".to_string(), Value::Int(1)),
            ("a".to_string(), Value::Int(2)),
        ]);
        assert_eq!(env.lookup("a"), Ok(Value::Int(2)));
    }
}
