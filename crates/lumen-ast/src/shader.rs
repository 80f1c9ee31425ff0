//! Shader declarations.
//!
//! A module may declare three kinds of shader:
//!
//! - vertex shaders, with exactly one `main` output holding the clip-space
//!   position;
//! - fragment shaders, with indexed colour outputs and an optional depth
//!   output;
//! - programs, pairing one or more vertex shaders with one fragment shader.
//!
//! Shader bodies are a sequence of local values followed by output writes.
//! Fragment shaders may interleave `discard` conditions with their locals.

use lumen_core::{ShaderName, Span};

use crate::{Expr, LocalValue, Parameter, TypeExpr};

/// A shader declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderDecl<A = ()> {
    pub name: ShaderName,
    pub span: Span,
    pub kind: ShaderKind<A>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShaderKind<A = ()> {
    Vertex(VertexShader<A>),
    Fragment(FragmentShader<A>),
    Program(ProgramShader),
}

impl<A> ShaderKind<A> {
    /// `"vertex"`, `"fragment"` or `"program"`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ShaderKind::Vertex(_) => "vertex",
            ShaderKind::Fragment(_) => "fragment",
            ShaderKind::Program(_) => "program",
        }
    }
}

/// A program: vertex shaders checked against one fragment shader.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramShader {
    pub vertex: Vec<ShaderName>,
    pub fragment: ShaderName,
}

impl ProgramShader {
    /// Every constituent shader, vertex shaders first.
    pub fn constituents(&self) -> impl Iterator<Item = &ShaderName> {
        self.vertex.iter().chain(std::iter::once(&self.fragment))
    }
}

/// A vertex shader.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexShader<A = ()> {
    pub inputs: Vec<Parameter<A>>,
    pub outputs: Vec<VertexOutput<A>>,
    pub parameters: Vec<Parameter<A>>,
    pub locals: Vec<LocalValue<A>>,
    pub writes: Vec<OutputWrite<A>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexOutput<A = ()> {
    pub name: String,
    pub declared: TypeExpr,
    /// Whether this is the position output.
    pub main: bool,
    pub span: Span,
    pub ty: A,
}

/// `out name = value`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputWrite<A = ()> {
    pub output: String,
    pub value: Expr<A>,
    pub span: Span,
}

/// A fragment shader.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentShader<A = ()> {
    pub inputs: Vec<Parameter<A>>,
    pub outputs: Vec<FragmentOutput<A>>,
    pub parameters: Vec<Parameter<A>>,
    pub locals: Vec<FragmentLocal<A>>,
    pub writes: Vec<OutputWrite<A>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentOutput<A = ()> {
    pub name: String,
    pub declared: TypeExpr,
    pub kind: FragmentOutputKind,
    pub span: Span,
    pub ty: A,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentOutputKind {
    /// A colour output bound to draw buffer `index`.
    Color { index: u32 },
    /// The fragment depth.
    Depth,
}

/// One statement of a fragment shader body, before the writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FragmentLocal<A = ()> {
    Value(LocalValue<A>),
    /// `discard if condition`
    Discard { condition: Expr<A>, span: Span },
}

// =========================================================================
// Construction helpers for resolved trees
// =========================================================================

impl ShaderDecl<()> {
    pub fn vertex(name: ShaderName, shader: VertexShader) -> Self {
        Self {
            name,
            span: Span::default(),
            kind: ShaderKind::Vertex(shader),
        }
    }

    pub fn fragment(name: ShaderName, shader: FragmentShader) -> Self {
        Self {
            name,
            span: Span::default(),
            kind: ShaderKind::Fragment(shader),
        }
    }

    pub fn program(name: ShaderName, vertex: Vec<ShaderName>, fragment: ShaderName) -> Self {
        Self {
            name,
            span: Span::default(),
            kind: ShaderKind::Program(ProgramShader { vertex, fragment }),
        }
    }

    /// Attach a source position.
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl VertexShader<()> {
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            parameters: Vec::new(),
            locals: Vec::new(),
            writes: Vec::new(),
        }
    }

    pub fn input(mut self, name: &str, declared: TypeExpr) -> Self {
        self.inputs.push(Parameter::new(name, declared));
        self
    }

    pub fn parameter(mut self, name: &str, declared: TypeExpr) -> Self {
        self.parameters.push(Parameter::new(name, declared));
        self
    }

    /// Declare an ordinary (varying) output.
    pub fn output(mut self, name: &str, declared: TypeExpr) -> Self {
        self.outputs.push(VertexOutput {
            name: name.to_string(),
            declared,
            main: false,
            span: Span::default(),
            ty: (),
        });
        self
    }

    /// Declare the position output.
    pub fn main_output(mut self, name: &str, declared: TypeExpr) -> Self {
        self.outputs.push(VertexOutput {
            name: name.to_string(),
            declared,
            main: true,
            span: Span::default(),
            ty: (),
        });
        self
    }

    pub fn local(mut self, local: LocalValue) -> Self {
        self.locals.push(local);
        self
    }

    pub fn write(mut self, output: &str, value: Expr) -> Self {
        self.writes.push(OutputWrite::new(output, value));
        self
    }
}

impl Default for VertexShader<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl FragmentShader<()> {
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            parameters: Vec::new(),
            locals: Vec::new(),
            writes: Vec::new(),
        }
    }

    pub fn input(mut self, name: &str, declared: TypeExpr) -> Self {
        self.inputs.push(Parameter::new(name, declared));
        self
    }

    pub fn parameter(mut self, name: &str, declared: TypeExpr) -> Self {
        self.parameters.push(Parameter::new(name, declared));
        self
    }

    /// Declare a colour output bound to draw buffer `index`.
    pub fn output(mut self, name: &str, declared: TypeExpr, index: u32) -> Self {
        self.outputs.push(FragmentOutput {
            name: name.to_string(),
            declared,
            kind: FragmentOutputKind::Color { index },
            span: Span::default(),
            ty: (),
        });
        self
    }

    pub fn depth_output(mut self, name: &str) -> Self {
        self.outputs.push(FragmentOutput {
            name: name.to_string(),
            declared: TypeExpr::Float,
            kind: FragmentOutputKind::Depth,
            span: Span::default(),
            ty: (),
        });
        self
    }

    pub fn local(mut self, local: LocalValue) -> Self {
        self.locals.push(FragmentLocal::Value(local));
        self
    }

    pub fn discard_if(mut self, condition: Expr) -> Self {
        let span = condition.span;
        self.locals.push(FragmentLocal::Discard { condition, span });
        self
    }

    pub fn write(mut self, output: &str, value: Expr) -> Self {
        self.writes.push(OutputWrite::new(output, value));
        self
    }
}

impl Default for FragmentShader<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputWrite<()> {
    pub fn new(output: impl Into<String>, value: Expr) -> Self {
        let span = value.span;
        Self {
            output: output.into(),
            value,
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{ModulePath, VectorType};

    fn name(local: &str) -> ShaderName {
        ShaderName::new(ModulePath::new("demo"), local)
    }

    #[test]
    fn program_constituents_list_vertex_first() {
        let p = ProgramShader {
            vertex: vec![name("v0"), name("v1")],
            fragment: name("f"),
        };
        let names: Vec<_> = p.constituents().map(|n| n.name()).collect();
        assert_eq!(names, ["v0", "v1", "f"]);
    }

    #[test]
    fn fragment_builder_keeps_local_order() {
        let f = FragmentShader::new()
            .local(LocalValue::new("a", Expr::boolean(true)))
            .discard_if(Expr::local("a"))
            .output("colour", TypeExpr::Vector(VectorType::Vector4F), 0);

        assert!(matches!(f.locals[0], FragmentLocal::Value(_)));
        assert!(matches!(f.locals[1], FragmentLocal::Discard { .. }));
        assert_eq!(f.outputs[0].kind, FragmentOutputKind::Color { index: 0 });
    }

    #[test]
    fn kind_names() {
        let decl = ShaderDecl::program(name("p"), vec![name("v")], name("f"));
        assert_eq!(decl.kind.kind_name(), "program");
    }
}
