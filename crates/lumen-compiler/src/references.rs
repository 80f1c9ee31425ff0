//! Reference graphs, referenced sets and topology.
//!
//! Three DAGs are built once over a typed program, recording one edge per
//! use site:
//!
//! - `terms`: term uses term
//! - `types`: term or record uses record
//! - `shaders`: shader uses term or record
//!
//! A shader's referenced set is everything reachable from it through the
//! union of the three graphs; its topology is that set ordered so every
//! declaration follows the declarations it uses.

use std::collections::BTreeSet;
use std::fmt;

use lumen_ast::{
    Expr, ExprKind, FragmentLocal, FunctionBody, Parameter, ShaderKind, TermKind, TermRef,
    TypedProgram,
};
use lumen_core::{GraphError, ShaderName, TermName, Type, TypeName};
use rustc_hash::FxHashSet;

use crate::graph::{Dag, reachable, topological_sort};

type Result<T> = std::result::Result<T, GraphError>;

/// A vertex of the reference graphs: a flattened name in one namespace.
///
/// The derived order puts terms before types before shaders; within a
/// namespace names order by module then local name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reference {
    Term(TermName),
    Type(TypeName),
    Shader(ShaderName),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Term(name) => write!(f, "{name}"),
            Reference::Type(name) => write!(f, "{name}"),
            Reference::Shader(name) => write!(f, "{name}"),
        }
    }
}

/// The three reference graphs of a program.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraphs {
    terms: Dag<Reference>,
    types: Dag<Reference>,
    shaders: Dag<Reference>,
    declared: FxHashSet<Reference>,
}

impl ReferenceGraphs {
    /// Build the graphs by walking every declaration of `program`.
    pub fn build(program: &TypedProgram) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("ReferenceGraphs::build");

        let mut graphs = Self::default();

        for module in program.modules() {
            for term in &module.terms {
                graphs.declare(Reference::Term(term.name.clone()));
            }
            for record in &module.types {
                graphs.declare(Reference::Type(record.name.clone()));
            }
            for shader in &module.shaders {
                graphs.declare(Reference::Shader(shader.name.clone()));
            }
        }

        for module in program.modules() {
            for term in &module.terms {
                let from = Reference::Term(term.name.clone());
                let mut uses = Uses::default();
                match &term.kind {
                    TermKind::Value { value, .. } => uses.expr(value),
                    TermKind::Function { params, body, .. } => {
                        uses.params(params);
                        if let FunctionBody::Expr(body) = body {
                            uses.expr(body);
                        }
                    }
                }
                uses.ty(&term.ty);
                for name in uses.terms {
                    graphs.terms.add_edge(from.clone(), Reference::Term(name))?;
                }
                for name in uses.types {
                    graphs.types.add_edge(from.clone(), Reference::Type(name))?;
                }
            }

            for record in &module.types {
                let from = Reference::Type(record.name.clone());
                let mut uses = Uses::default();
                if let Some(r) = record.ty.as_record() {
                    for field in &r.fields {
                        uses.ty(&field.ty);
                    }
                }
                for name in uses.types {
                    graphs.types.add_edge(from.clone(), Reference::Type(name))?;
                }
            }

            for shader in &module.shaders {
                let from = Reference::Shader(shader.name.clone());
                let mut uses = Uses::default();
                match &shader.kind {
                    ShaderKind::Vertex(v) => {
                        uses.params(&v.inputs);
                        uses.params(&v.parameters);
                        for output in &v.outputs {
                            uses.ty(&output.ty);
                        }
                        for local in &v.locals {
                            uses.ty(&local.ty);
                            uses.expr(&local.value);
                        }
                        for write in &v.writes {
                            uses.expr(&write.value);
                        }
                    }
                    ShaderKind::Fragment(f) => {
                        uses.params(&f.inputs);
                        uses.params(&f.parameters);
                        for output in &f.outputs {
                            uses.ty(&output.ty);
                        }
                        for local in &f.locals {
                            match local {
                                FragmentLocal::Value(local) => {
                                    uses.ty(&local.ty);
                                    uses.expr(&local.value);
                                }
                                FragmentLocal::Discard { condition, .. } => uses.expr(condition),
                            }
                        }
                        for write in &f.writes {
                            uses.expr(&write.value);
                        }
                    }
                    ShaderKind::Program(_) => {}
                }
                for name in uses.terms {
                    graphs.shaders.add_edge(from.clone(), Reference::Term(name))?;
                }
                for name in uses.types {
                    graphs.shaders.add_edge(from.clone(), Reference::Type(name))?;
                }
            }
        }

        log::trace!(
            "reference graphs: {} term edges, {} type edges, {} shader edges",
            graphs.terms.edge_count(),
            graphs.types.edge_count(),
            graphs.shaders.edge_count()
        );
        Ok(graphs)
    }

    fn declare(&mut self, reference: Reference) {
        match &reference {
            Reference::Term(_) => self.terms.add_vertex(reference.clone()),
            Reference::Type(_) => self.types.add_vertex(reference.clone()),
            Reference::Shader(_) => self.shaders.add_vertex(reference.clone()),
        };
        self.declared.insert(reference);
    }

    /// Whether `reference` has a declaration in the program.
    pub fn is_declared(&self, reference: &Reference) -> bool {
        self.declared.contains(reference)
    }

    fn all(&self) -> [&Dag<Reference>; 3] {
        [&self.terms, &self.types, &self.shaders]
    }

    /// Every term and record transitively used by `shader`.
    ///
    /// Fails with [`GraphError::MissingVertex`] if the shader, or anything it
    /// reaches, has no declaration.
    pub fn referenced(&self, shader: &ShaderName) -> Result<BTreeSet<Reference>> {
        let root = Reference::Shader(shader.clone());
        if !self.is_declared(&root) {
            return Err(GraphError::MissingVertex {
                name: root.to_string(),
            });
        }
        let set = reachable(&[root], &self.all());
        if let Some(missing) = set.iter().find(|r| !self.is_declared(r)) {
            return Err(GraphError::MissingVertex {
                name: missing.to_string(),
            });
        }
        Ok(set)
    }

    /// Order a referenced set so that dependencies come first.
    pub fn topology(&self, referenced: &BTreeSet<Reference>) -> Result<Vec<Reference>> {
        topological_sort(referenced, &self.all())
    }
}

/// Names used by one declaration.
#[derive(Default)]
struct Uses {
    terms: BTreeSet<TermName>,
    types: BTreeSet<TypeName>,
}

impl Uses {
    fn expr(&mut self, expr: &Expr<Type>) {
        expr.walk(&mut |node| {
            self.ty(&node.ty);
            match &node.kind {
                ExprKind::Name(TermRef::Global(name))
                | ExprKind::Apply {
                    callee: TermRef::Global(name),
                    ..
                } => {
                    self.terms.insert(name.clone());
                }
                ExprKind::Record { ty, .. } => {
                    self.types.insert(ty.clone());
                }
                ExprKind::Let { bindings, .. } => {
                    for binding in bindings {
                        self.ty(&binding.ty);
                    }
                }
                _ => {}
            }
        });
    }

    fn params(&mut self, params: &[Parameter<Type>]) {
        for p in params {
            self.ty(&p.ty);
        }
    }

    /// Records named by a type. Fields of records are the record's own
    /// uses and are not followed.
    fn ty(&mut self, ty: &Type) {
        match ty {
            Type::Record(r) => {
                self.types.insert(r.name.clone());
            }
            Type::Function(f) => {
                for p in &f.params {
                    self.ty(p);
                }
                self.ty(&f.result);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_ast::{
        FragmentShader, Module, Parameter, Program, RecordDecl, ShaderDecl, TermDecl, TypeExpr,
    };
    use lumen_core::{ModulePath, VectorType};

    use crate::check::check_program;

    fn path() -> ModulePath {
        ModulePath::new("demo")
    }

    fn term(n: &str) -> TermName {
        TermName::new(path(), n)
    }

    fn typed(module: Module) -> TypedProgram {
        let program: Program = [module].into_iter().collect();
        check_program(&program).unwrap()
    }

    /// `f` uses `g`, `g` uses `k` and record `r`; `unused` is never used.
    fn sample() -> TypedProgram {
        let r = TypeName::new(path(), "r");
        let v4 = TypeExpr::Vector(VectorType::Vector4F);
        typed(
            Module::new(path())
                .with_record(RecordDecl::new(r.clone(), vec![("x", TypeExpr::Float)]))
                .with_term(TermDecl::value(term("k"), Expr::real(2.0)))
                .with_term(TermDecl::value(term("unused"), Expr::real(3.0)))
                .with_term(TermDecl::function(
                    term("g"),
                    vec![Parameter::new("x", TypeExpr::Float)],
                    TypeExpr::Float,
                    Expr::record(r, vec![("x", Expr::global(term("k")))]).project("x"),
                ))
                .with_term(TermDecl::value(
                    term("f"),
                    Expr::apply(term("g"), vec![Expr::real(1.0)]),
                ))
                .with_shader(ShaderDecl::fragment(
                    ShaderName::new(path(), "frag"),
                    FragmentShader::new()
                        .output("colour", v4.clone(), 0)
                        .write(
                            "colour",
                            Expr::construct(v4, vec![
                                Expr::global(term("f")),
                                Expr::real(0.0),
                                Expr::real(0.0),
                                Expr::real(1.0),
                            ]),
                        ),
                )),
        )
    }

    #[test]
    fn referenced_is_the_transitive_closure() {
        let program = sample();
        let graphs = ReferenceGraphs::build(&program).unwrap();
        let set = graphs
            .referenced(&ShaderName::new(path(), "frag"))
            .unwrap();
        let expected: BTreeSet<_> = [
            Reference::Term(term("f")),
            Reference::Term(term("g")),
            Reference::Term(term("k")),
            Reference::Type(TypeName::new(path(), "r")),
        ]
        .into_iter()
        .collect();
        assert_eq!(set, expected);
    }

    #[test]
    fn topology_puts_uses_first() {
        let program = sample();
        let graphs = ReferenceGraphs::build(&program).unwrap();
        let set = graphs
            .referenced(&ShaderName::new(path(), "frag"))
            .unwrap();
        let order = graphs.topology(&set).unwrap();
        let position = |r: &Reference| order.iter().position(|o| o == r).unwrap();

        assert_eq!(order.len(), set.len());
        assert!(position(&Reference::Term(term("k"))) < position(&Reference::Term(term("g"))));
        assert!(
            position(&Reference::Type(TypeName::new(path(), "r")))
                < position(&Reference::Term(term("g")))
        );
        assert!(position(&Reference::Term(term("g"))) < position(&Reference::Term(term("f"))));
    }

    #[test]
    fn undeclared_use_is_a_missing_vertex() {
        let mut program = sample();
        let module = program.modules.get_mut(&path()).unwrap();
        module.terms.retain(|t| t.name != term("k"));

        let graphs = ReferenceGraphs::build(&program).unwrap();
        let err = graphs
            .referenced(&ShaderName::new(path(), "frag"))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::MissingVertex {
                name: "demo.k".into()
            }
        );
    }

    #[test]
    fn unknown_shader_is_a_missing_vertex() {
        let graphs = ReferenceGraphs::build(&sample()).unwrap();
        assert!(
            graphs
                .referenced(&ShaderName::new(path(), "nope"))
                .is_err()
        );
    }
}
