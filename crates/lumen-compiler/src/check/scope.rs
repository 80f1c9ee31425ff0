//! Local bindings visible while checking a body.

use lumen_core::Type;

/// A stack of local bindings.
///
/// Later bindings shadow earlier ones. Nested constructs (`let`) record a
/// [`mark`](LocalScope::mark) and [`restore`](LocalScope::restore) it once
/// their body has been checked.
#[derive(Debug, Default)]
pub struct LocalScope {
    bindings: Vec<(String, Type)>,
}

impl LocalScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, ty: Type) {
        self.bindings.push((name.into(), ty));
    }

    /// The innermost binding named `name`.
    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.bindings
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| ty)
    }

    pub fn mark(&self) -> usize {
        self.bindings.len()
    }

    pub fn restore(&mut self, mark: usize) {
        self.bindings.truncate(mark);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadowing_and_restore() {
        let mut scope = LocalScope::new();
        scope.declare("x", Type::Integer);
        let mark = scope.mark();
        scope.declare("x", Type::Float);
        assert_eq!(scope.lookup("x"), Some(&Type::Float));
        scope.restore(mark);
        assert_eq!(scope.lookup("x"), Some(&Type::Integer));
        assert_eq!(scope.lookup("y"), None);
    }
}
