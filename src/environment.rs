use std::collections::HashMap;

use crate::value::Value;

/// Index into the environment arena. RPAL has no assignment statement, so
/// once a frame is populated by a lambda application it is never mutated
/// again — only ever read by the closures created under it. That write-once
/// property is what lets the arena replace the teacher's `Rc<RefCell<..>>`
/// chain: no frame is ever shared mutably once a closure has captured it.
pub type EnvId = usize;

pub struct EnvironmentFrame {
    parent: Option<EnvId>,
    bindings: HashMap<String, Value>,
}

/// The arena of all environment frames created while the CSE machine runs.
pub struct Environments {
    frames: Vec<EnvironmentFrame>,
}

impl Environments {
    /// Creates the arena with a single root frame (e₀), the one returned by
    /// `ROOT`, meant to hold the bound built-ins.
    pub fn new() -> Self {
        Environments { frames: vec![EnvironmentFrame { parent: None, bindings: HashMap::new() }] }
    }

    pub const ROOT: EnvId = 0;

    /// Allocates a new frame whose lookups fall back to `parent`.
    pub fn child(&mut self, parent: EnvId) -> EnvId {
        self.frames.push(EnvironmentFrame { parent: Some(parent), bindings: HashMap::new() });
        self.frames.len() - 1
    }

    pub fn define(&mut self, env: EnvId, name: &str, value: Value) {
        self.frames[env].bindings.insert(name.to_string(), value);
    }

    /// Looks up `name` starting at `env` and walking up through parents.
    pub fn get(&self, env: EnvId, name: &str) -> Option<&Value> {
        let mut current = Some(env);
        while let Some(id) = current {
            let frame = &self.frames[id];
            if let Some(value) = frame.bindings.get(name) {
                return Some(value);
            }
            current = frame.parent;
        }
        None
    }
}

impl Default for Environments {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn child_frame_sees_parent_bindings() {
        let mut envs = Environments::new();
        envs.define(Environments::ROOT, "x", Value::Int(1));
        let child = envs.child(Environments::ROOT);
        envs.define(child, "y", Value::Int(2));

        assert!(matches!(envs.get(child, "x"), Some(Value::Int(1))));
        assert!(matches!(envs.get(child, "y"), Some(Value::Int(2))));
        assert!(envs.get(Environments::ROOT, "y").is_none());
    }

    #[test]
    fn shadowing_prefers_innermost_frame() {
        let mut envs = Environments::new();
        envs.define(Environments::ROOT, "x", Value::Int(1));
        let child = envs.child(Environments::ROOT);
        envs.define(child, "x", Value::Int(2));

        assert!(matches!(envs.get(child, "x"), Some(Value::Int(2))));
        assert!(matches!(envs.get(Environments::ROOT, "x"), Some(Value::Int(1))));
    }

    #[test]
    fn unbound_name_is_none() {
        let envs = Environments::new();
        assert!(envs.get(Environments::ROOT, "missing").is_none());
    }
}
