//! Flattened names.
//!
//! After import resolution every declaration is identified by the dotted
//! path of the module that declares it plus its local name. Terms, types and
//! shaders live in separate namespaces, so one local name may appear in all
//! three within the same module; each namespace gets its own name type so
//! the three can never be confused as map keys or graph vertices.

use std::fmt;

/// A module path such as `com.example.lighting`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulePath(String);

impl ModulePath {
    /// Create a module path from its dotted form.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Create a module path from its components.
    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = components
            .into_iter()
            .map(|c| c.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(".");
        Self(joined)
    }

    /// The dotted form of the path.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The individual path components.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }
}

impl fmt::Debug for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! flattened_name {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            module: ModulePath,
            name: String,
        }

        impl $name {
            /// Create a name from its module and local name.
            pub fn new(module: ModulePath, name: impl Into<String>) -> Self {
                Self {
                    module,
                    name: name.into(),
                }
            }

            /// Parse a fully qualified dotted name; the last component is the
            /// local name. Returns `None` when there is no module part.
            pub fn parse(qualified: &str) -> Option<Self> {
                let (module, name) = qualified.rsplit_once('.')?;
                if module.is_empty() || name.is_empty() {
                    return None;
                }
                Some(Self::new(ModulePath::new(module), name))
            }

            /// The declaring module.
            pub fn module(&self) -> &ModulePath {
                &self.module
            }

            /// The local name within the module.
            pub fn name(&self) -> &str {
                &self.name
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}.{}", self.module, self.name)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}.{}", self.module, self.name)
            }
        }
    };
}

flattened_name!(
    /// A flattened term name: values, user functions and external functions.
    TermName
);

flattened_name!(
    /// A flattened type name: record declarations.
    TypeName
);

flattened_name!(
    /// A flattened shader name: vertex, fragment and program shaders.
    ShaderName
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_path_from_components() {
        let path = ModulePath::from_components(["com", "example", "light"]);
        assert_eq!(path.as_str(), "com.example.light");
        assert_eq!(path.components().collect::<Vec<_>>(), ["com", "example", "light"]);
    }

    #[test]
    fn parse_qualified_name() {
        let name = TermName::parse("com.example.light.attenuate").unwrap();
        assert_eq!(name.module().as_str(), "com.example.light");
        assert_eq!(name.name(), "attenuate");
        assert_eq!(name.to_string(), "com.example.light.attenuate");
    }

    #[test]
    fn parse_rejects_unqualified_names() {
        assert!(ShaderName::parse("main").is_none());
        assert!(ShaderName::parse(".main").is_none());
        assert!(ShaderName::parse("a.").is_none());
    }

    #[test]
    fn names_order_by_module_then_local_name() {
        let a = TypeName::parse("a.z").unwrap();
        let b = TypeName::parse("b.a").unwrap();
        assert!(a < b);
    }
}
