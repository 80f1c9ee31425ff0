//! Lowering transform.
//!
//! Turns one typed shader, its topologically ordered closure and one target
//! version into a [`GlslShader`]. The transform is pure: the same inputs
//! always produce the same tree.
//!
//! Output layout:
//!
//! 1. default precision statements (ES targets);
//! 2. the closure in topological order: records become structs, constant
//!    values become `const` globals, other values become zero-argument
//!    functions, user functions become functions, external functions emit
//!    nothing;
//! 3. the shader's interface (inputs, outputs, uniforms) in the version's
//!    surface syntax;
//! 4. `main`, holding the shader's locals and output writes.
//!
//! Global names are mangled with their module path (see [`term_symbol`]);
//! shader-local names are kept.

mod expr;

use lumen_ast::{
    FragmentLocal, FragmentOutputKind, FragmentShader, FunctionBody, Parameter, ShaderKind,
    TermDecl, TermKind, TypedProgram, VertexShader,
};
use lumen_core::{
    BackendError, CompileError, Features, GraphError, ModulePath, ShaderName, TermName, Type,
    TypeName, Version,
};
use rustc_hash::FxHashSet;

use crate::glsl::{
    GlslDecl, GlslExpr, GlslShader, GlslStmt, GlslType, ShaderStage, StorageQualifier,
};
use crate::references::Reference;
use crate::versions::requirements;

use expr::Locals;

type Result<T> = std::result::Result<T, CompileError>;

/// Lower `shader` for `version`.
///
/// `closure` must be the shader's referenced set in topological order.
pub fn lower_shader(
    program: &TypedProgram,
    closure: &[Reference],
    shader: &ShaderName,
    version: Version,
) -> Result<GlslShader> {
    #[cfg(feature = "profiling")]
    profiling::scope!("lower_shader");

    let unsupported_version = || BackendError::UnsupportedVersion {
        shader: shader.clone(),
        version,
    };
    let features = version.features().ok_or_else(unsupported_version)?;
    // The pipeline only asks for versions that already passed
    // `check_versions`; direct callers get the same guarantee here.
    if !requirements(program, closure, shader)?.supports(version) {
        return Err(unsupported_version().into());
    }

    log::trace!("lowering {shader} for {version}");
    let mut lowering = Lowering {
        program,
        shader,
        version,
        features,
        constants: FxHashSet::default(),
        temporaries: 0,
    };
    lowering.lower(closure)
}

/// The output name of a term.
pub fn term_symbol(name: &TermName) -> String {
    mangle("t", name.module(), name.name())
}

/// The output name of a record.
pub fn record_symbol(name: &TypeName) -> String {
    mangle("r", name.module(), name.name())
}

/// `<kind>_` followed by the module components and the local name, joined by
/// `_0`, with every `_` inside a part written as `_1`. Every `_` after the
/// kind prefix is followed by `0` or `1`, so distinct names never collide.
fn mangle(kind: &str, module: &ModulePath, name: &str) -> String {
    let parts: Vec<String> = module
        .components()
        .chain(std::iter::once(name))
        .map(|part| part.replace('_', "_1"))
        .collect();
    format!("{kind}_{}", parts.join("_0"))
}

struct Lowering<'a> {
    program: &'a TypedProgram,
    shader: &'a ShaderName,
    version: Version,
    features: Features,
    /// Values emitted as `const` globals.
    constants: FxHashSet<TermName>,
    temporaries: usize,
}

impl<'a> Lowering<'a> {
    fn lower(&mut self, closure: &[Reference]) -> Result<GlslShader> {
        let decl = self
            .program
            .shader(self.shader)
            .ok_or_else(|| GraphError::MissingVertex {
                name: self.shader.to_string(),
            })?;

        let mut declarations = Vec::new();
        if self.features.contains(Features::PRECISION) {
            declarations.push(GlslDecl::Precision {
                ty: GlslType::Float,
            });
            declarations.push(GlslDecl::Precision { ty: GlslType::Int });
        }

        for reference in closure {
            if let Some(decl) = self.closure_decl(reference)? {
                declarations.push(decl);
            }
        }

        let stage = match &decl.kind {
            ShaderKind::Vertex(vertex) => {
                self.vertex(vertex, &mut declarations)?;
                ShaderStage::Vertex
            }
            ShaderKind::Fragment(fragment) => {
                self.fragment(fragment, &mut declarations)?;
                ShaderStage::Fragment
            }
            ShaderKind::Program(_) => {
                return Err(self.unsupported("programs are not lowered on their own"));
            }
        };

        Ok(GlslShader {
            version: self.version,
            stage,
            declarations,
        })
    }

    // =====================================================================
    // Closure
    // =====================================================================

    fn closure_decl(&mut self, reference: &Reference) -> Result<Option<GlslDecl>> {
        let missing = || GraphError::MissingVertex {
            name: reference.to_string(),
        };
        match reference {
            Reference::Type(name) => {
                let record = self.program.record(name).ok_or_else(missing)?;
                let fields = record
                    .ty
                    .as_record()
                    .map(|r| r.fields.as_slice())
                    .unwrap_or_default()
                    .iter()
                    .map(|f| Ok((f.name.clone(), self.glsl_type(&f.ty)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(GlslDecl::Struct {
                    name: record_symbol(name),
                    fields,
                }))
            }
            Reference::Term(name) => {
                let term = self.program.term(name).ok_or_else(missing)?;
                self.term(term)
            }
            Reference::Shader(_) => Err(self.unsupported(format!(
                "shader {reference} cannot be part of a closure"
            ))),
        }
    }

    fn term(&mut self, term: &TermDecl<Type>) -> Result<Option<GlslDecl>> {
        let name = term_symbol(&term.name);
        match &term.kind {
            TermKind::Value { value, .. } => {
                let ty = self.glsl_type(&term.ty)?;
                let constant = self.is_constant(value);
                let mut body = Vec::new();
                let result = self.expr(value, &mut Locals::default(), &mut body)?;

                if constant && body.is_empty() {
                    self.constants.insert(term.name.clone());
                    Ok(Some(GlslDecl::Constant {
                        name,
                        ty,
                        value: result,
                    }))
                } else {
                    body.push(GlslStmt::Return(result));
                    Ok(Some(GlslDecl::Function {
                        name,
                        params: Vec::new(),
                        returns: ty,
                        body,
                    }))
                }
            }
            TermKind::Function {
                params,
                body: FunctionBody::Expr(expr),
                ..
            } => {
                let returns = self.glsl_type(&expr.ty)?;
                let mut locals = Locals::default();
                let params = params
                    .iter()
                    .map(|p| {
                        locals.bind(&p.name, p.name.clone());
                        Ok((p.name.clone(), self.glsl_type(&p.ty)?))
                    })
                    .collect::<Result<Vec<_>>>()?;

                let mut body = Vec::new();
                let result = self.expr(expr, &mut locals, &mut body)?;
                body.push(GlslStmt::Return(result));
                Ok(Some(GlslDecl::Function {
                    name,
                    params,
                    returns,
                    body,
                }))
            }
            TermKind::Function {
                body: FunctionBody::External(_),
                ..
            } => Ok(None),
        }
    }

    // =====================================================================
    // Shaders
    // =====================================================================

    fn vertex(&mut self, shader: &VertexShader<Type>, out: &mut Vec<GlslDecl>) -> Result<()> {
        let in_out = self.features.contains(Features::IN_OUT);
        let mut locals = Locals::default();

        for input in &shader.inputs {
            out.push(self.interface(
                input,
                if in_out {
                    StorageQualifier::In
                } else {
                    StorageQualifier::Attribute
                },
                false,
            )?);
            locals.bind(&input.name, input.name.clone());
        }
        for output in &shader.outputs {
            let ty = self.interface_type(&output.name, &output.ty)?;
            out.push(GlslDecl::Interface {
                qualifier: if in_out {
                    StorageQualifier::Out
                } else {
                    StorageQualifier::Varying
                },
                name: output.name.clone(),
                ty,
                flat: in_out && output.ty.is_integral(),
                location: None,
            });
        }
        self.uniforms(&shader.parameters, &mut locals, out)?;

        let mut body = Vec::new();
        for local in &shader.locals {
            let value = self.expr(&local.value, &mut locals, &mut body)?;
            body.push(GlslStmt::Local {
                name: local.name.clone(),
                ty: self.glsl_type(&local.ty)?,
                value: Some(value),
            });
            locals.bind(&local.name, local.name.clone());
        }
        for write in &shader.writes {
            let value = self.expr(&write.value, &mut locals, &mut body)?;
            body.push(GlslStmt::Assign {
                target: GlslExpr::var(write.output.as_str()),
                value,
            });
        }
        if let Some(main) = shader.outputs.iter().find(|o| o.main) {
            body.push(GlslStmt::Assign {
                target: GlslExpr::var("gl_Position"),
                value: GlslExpr::var(main.name.as_str()),
            });
        }

        out.push(GlslDecl::Main { body });
        Ok(())
    }

    fn fragment(&mut self, shader: &FragmentShader<Type>, out: &mut Vec<GlslDecl>) -> Result<()> {
        let in_out = self.features.contains(Features::IN_OUT);
        let declared_outputs = self.features.contains(Features::FRAGMENT_OUTPUT_DECLARATIONS);
        let mut locals = Locals::default();

        for input in &shader.inputs {
            out.push(self.interface(
                input,
                if in_out {
                    StorageQualifier::In
                } else {
                    StorageQualifier::Varying
                },
                in_out && input.ty.is_integral(),
            )?);
            locals.bind(&input.name, input.name.clone());
        }

        for output in &shader.outputs {
            let ty = self.interface_type(&output.name, &output.ty)?;
            if let FragmentOutputKind::Color { index } = output.kind {
                if declared_outputs {
                    out.push(GlslDecl::Interface {
                        qualifier: StorageQualifier::Out,
                        name: output.name.clone(),
                        ty,
                        flat: false,
                        location: self
                            .features
                            .contains(Features::LAYOUT_LOCATION)
                            .then_some(index),
                    });
                }
            }
        }
        self.uniforms(&shader.parameters, &mut locals, out)?;

        let mut body = Vec::new();
        for local in &shader.locals {
            match local {
                FragmentLocal::Value(local) => {
                    let value = self.expr(&local.value, &mut locals, &mut body)?;
                    body.push(GlslStmt::Local {
                        name: local.name.clone(),
                        ty: self.glsl_type(&local.ty)?,
                        value: Some(value),
                    });
                    locals.bind(&local.name, local.name.clone());
                }
                FragmentLocal::Discard { condition, .. } => {
                    let condition = self.expr(condition, &mut locals, &mut body)?;
                    body.push(GlslStmt::If {
                        condition,
                        then_branch: vec![GlslStmt::Discard],
                        else_branch: Vec::new(),
                    });
                }
            }
        }

        for write in &shader.writes {
            let value = self.expr(&write.value, &mut locals, &mut body)?;
            let output = shader
                .outputs
                .iter()
                .find(|o| o.name == write.output)
                .ok_or_else(|| self.unsupported(format!("no output named '{}'", write.output)))?;
            let target = match output.kind {
                FragmentOutputKind::Depth => GlslExpr::var("gl_FragDepth"),
                FragmentOutputKind::Color { .. } if declared_outputs => {
                    GlslExpr::var(output.name.as_str())
                }
                FragmentOutputKind::Color { index } => GlslExpr::Index {
                    expr: Box::new(GlslExpr::var("gl_FragData")),
                    index,
                },
            };
            body.push(GlslStmt::Assign { target, value });
        }

        out.push(GlslDecl::Main { body });
        Ok(())
    }

    fn interface(
        &self,
        param: &Parameter<Type>,
        qualifier: StorageQualifier,
        flat: bool,
    ) -> Result<GlslDecl> {
        Ok(GlslDecl::Interface {
            qualifier,
            name: param.name.clone(),
            ty: self.interface_type(&param.name, &param.ty)?,
            flat,
            location: None,
        })
    }

    fn uniforms(
        &self,
        parameters: &[Parameter<Type>],
        locals: &mut Locals,
        out: &mut Vec<GlslDecl>,
    ) -> Result<()> {
        for param in parameters {
            out.push(GlslDecl::Uniform {
                name: param.name.clone(),
                ty: self.glsl_type(&param.ty)?,
            });
            locals.bind(&param.name, param.name.clone());
        }
        Ok(())
    }

    /// Inputs and outputs may only carry numeric scalars, vectors and
    /// matrices.
    fn interface_type(&self, name: &str, ty: &Type) -> Result<GlslType> {
        match ty {
            Type::Boolean | Type::Record(_) | Type::Sampler(_) | Type::Function(_) => {
                Err(self.unsupported(format!(
                    "interface variable '{name}' of type '{ty}' has no encoding"
                )))
            }
            _ => self.glsl_type(ty),
        }
    }

    // =====================================================================
    // Helpers
    // =====================================================================

    fn glsl_type(&self, ty: &Type) -> Result<GlslType> {
        GlslType::of(ty, record_symbol)
            .ok_or_else(|| self.unsupported(format!("function type '{ty}' is not a value")))
    }

    fn unsupported(&self, message: impl Into<String>) -> CompileError {
        BackendError::UnsupportedConstruct {
            shader: self.shader.clone(),
            version: self.version,
            message: message.into(),
        }
        .into()
    }

    fn temporary(&mut self) -> String {
        let name = format!("_tmp_{}", self.temporaries);
        self.temporaries += 1;
        name
    }
}
