//! Modules and whole programs.

use std::collections::BTreeMap;

use lumen_core::{ModulePath, ShaderName, TermName, Type, TypeName};

use crate::{RecordDecl, ShaderDecl, ShaderKind, TermDecl};

/// The declarations of one module, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Module<A = ()> {
    pub path: ModulePath,
    pub terms: Vec<TermDecl<A>>,
    pub types: Vec<RecordDecl<A>>,
    pub shaders: Vec<ShaderDecl<A>>,
}

impl<A> Module<A> {
    pub fn term(&self, name: &str) -> Option<&TermDecl<A>> {
        self.terms.iter().find(|t| t.name.name() == name)
    }

    pub fn record(&self, name: &str) -> Option<&RecordDecl<A>> {
        self.types.iter().find(|r| r.name.name() == name)
    }

    pub fn shader(&self, name: &str) -> Option<&ShaderDecl<A>> {
        self.shaders.iter().find(|s| s.name.name() == name)
    }
}

impl Module<()> {
    pub fn new(path: ModulePath) -> Self {
        Self {
            path,
            terms: Vec::new(),
            types: Vec::new(),
            shaders: Vec::new(),
        }
    }

    pub fn with_term(mut self, term: TermDecl) -> Self {
        self.terms.push(term);
        self
    }

    pub fn with_record(mut self, record: RecordDecl) -> Self {
        self.types.push(record);
        self
    }

    pub fn with_shader(mut self, shader: ShaderDecl) -> Self {
        self.shaders.push(shader);
        self
    }
}

/// A whole program: every module, keyed by its flattened path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Program<A = ()> {
    pub modules: BTreeMap<ModulePath, Module<A>>,
}

/// A program whose every node carries its final type.
pub type TypedProgram = Program<Type>;

impl<A> Program<A> {
    pub fn new() -> Self {
        Self {
            modules: BTreeMap::new(),
        }
    }

    /// Add or replace a module.
    pub fn insert_module(&mut self, module: Module<A>) {
        self.modules.insert(module.path.clone(), module);
    }

    /// Modules in path order.
    pub fn modules(&self) -> impl Iterator<Item = &Module<A>> {
        self.modules.values()
    }

    pub fn module(&self, path: &ModulePath) -> Option<&Module<A>> {
        self.modules.get(path)
    }

    pub fn term(&self, name: &TermName) -> Option<&TermDecl<A>> {
        self.modules.get(name.module())?.term(name.name())
    }

    pub fn record(&self, name: &TypeName) -> Option<&RecordDecl<A>> {
        self.modules.get(name.module())?.record(name.name())
    }

    pub fn shader(&self, name: &ShaderName) -> Option<&ShaderDecl<A>> {
        self.modules.get(name.module())?.shader(name.name())
    }

    /// The programs declared in `module`, in source order.
    pub fn programs_in(&self, module: &ModulePath) -> Vec<ShaderName> {
        self.modules
            .get(module)
            .map(|m| {
                m.shaders
                    .iter()
                    .filter(|s| matches!(s.kind, ShaderKind::Program(_)))
                    .map(|s| s.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl<A> Default for Program<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> FromIterator<Module<A>> for Program<A> {
    fn from_iter<I: IntoIterator<Item = Module<A>>>(iter: I) -> Self {
        let mut program = Program::new();
        for module in iter {
            program.insert_module(module);
        }
        program
    }
}
