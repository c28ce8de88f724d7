use std::collections::HashMap;

/// A nested symbol table. Each name maps to a stack of bindings, so pushing a name shadows its
/// previous binding and popping restores it. Lookups that miss locally fall back to an optional
/// read-only containing scope.
#[derive(Debug, Clone)]
pub struct Scope<'a, T> {
    table: HashMap<String, Vec<T>>,
    containing_scope: Option<&'a Scope<'a, T>>,
}

impl<'a, T> Default for Scope<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> Scope<'a, T> {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
            containing_scope: None,
        }
    }

    pub fn set_containing_scope(&mut self, scope: Option<&'a Scope<'a, T>>) {
        self.containing_scope = scope;
    }

    /// The innermost binding of `name`, looking through the containing scope.
    pub fn get(&self, name: &str) -> Option<&T> {
        match self.table.get(name).and_then(|stack| stack.last()) {
            Some(value) => Some(value),
            None => self.containing_scope.and_then(|scope| scope.get(name)),
        }
    }

    /// The innermost local binding. Containing scopes are never mutated.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.table.get_mut(name).and_then(|stack| stack.last_mut())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn push(&mut self, name: impl Into<String>, value: T) {
        self.table.entry(name.into()).or_default().push(value);
    }

    /// Removes and returns the innermost local binding of `name`.
    pub fn pop(&mut self, name: &str) -> T {
        let stack = match self.table.get_mut(name) {
            Some(stack) => stack,
            None => internal_error!("Name not in scope: {}", name),
        };
        let value = match stack.pop() {
            Some(value) => value,
            None => internal_error!("Name not in scope: {}", name),
        };
        if stack.is_empty() {
            self.table.remove(name);
        }
        value
    }

    /// The innermost local binding of every name. Containing scopes are not visited.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.table
            .iter()
            .filter_map(|(name, stack)| stack.last().map(|value| (name.as_str(), value)))
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadowing_and_restore() {
        let mut scope = Scope::new();
        scope.push("x", 1);
        scope.push("x", 2);
        assert_eq!(scope.get("x"), Some(&2));
        assert_eq!(scope.pop("x"), 2);
        assert_eq!(scope.get("x"), Some(&1));
        scope.pop("x");
        assert!(!scope.contains("x"));
        assert!(scope.is_empty());
    }

    #[test]
    fn containing_scope_is_consulted() {
        let mut outer = Scope::new();
        outer.push("a", 10);
        let mut inner = Scope::new();
        inner.set_containing_scope(Some(&outer));
        assert_eq!(inner.get("a"), Some(&10));
        assert!(inner.get_mut("a").is_none());
        inner.push("a", 11);
        assert_eq!(inner.get("a"), Some(&11));
        assert_eq!(inner.iter().count(), 1);
    }

    #[test]
    #[should_panic(expected = "Name not in scope: z")]
    fn popping_unbound_name_is_an_error() {
        let mut scope: Scope<i32> = Scope::new();
        scope.pop("z");
    }
}
