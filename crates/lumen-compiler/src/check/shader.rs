//! Shader rules.

use lumen_ast::{
    FragmentLocal, FragmentOutput, FragmentOutputKind, FragmentShader, OutputWrite, ProgramShader,
    ShaderDecl, ShaderKind, VertexOutput, VertexShader,
};
use lumen_core::{ShaderName, Span, Type, TypeError, TypeErrorKind, VectorType};

use super::{LocalScope, Result, TypeChecker, unresolved};

impl<'p> TypeChecker<'p> {
    pub(crate) fn check_shader(&mut self, decl: &ShaderDecl) -> Result<ShaderDecl<Type>> {
        log::trace!("checking {} shader {}", decl.kind.kind_name(), decl.name);
        let kind = match &decl.kind {
            ShaderKind::Vertex(vertex) => ShaderKind::Vertex(self.check_vertex(vertex, decl)?),
            ShaderKind::Fragment(fragment) => {
                ShaderKind::Fragment(self.check_fragment(fragment)?)
            }
            ShaderKind::Program(program) => {
                self.check_program_shader(program, decl.span)?;
                ShaderKind::Program(program.clone())
            }
        };
        Ok(ShaderDecl {
            name: decl.name.clone(),
            span: decl.span,
            kind,
        })
    }

    fn check_vertex(
        &mut self,
        shader: &VertexShader,
        decl: &ShaderDecl,
    ) -> Result<VertexShader<Type>> {
        let mut scope = LocalScope::new();
        let inputs = shader
            .inputs
            .iter()
            .map(|p| self.check_parameter(p))
            .collect::<Result<Vec<_>>>()?;
        let parameters = shader
            .parameters
            .iter()
            .map(|p| self.check_parameter(p))
            .collect::<Result<Vec<_>>>()?;

        let mut outputs = Vec::with_capacity(shader.outputs.len());
        let mut main: Option<&VertexOutput> = None;
        for output in &shader.outputs {
            let ty = self.resolve_type(&output.declared, output.span)?;
            if output.main {
                if main.is_some() {
                    return Err(TypeError::new(
                        TypeErrorKind::VertexMainDuplicate,
                        output.span,
                        format!(
                            "vertex shader {} declares a second main output '{}'",
                            decl.name, output.name
                        ),
                    ));
                }
                if ty != Type::Vector(VectorType::Vector4F) {
                    return Err(TypeError::new(
                        TypeErrorKind::VertexMainBadType,
                        output.span,
                        format!("main output '{}' must be 'vector_4f', found '{ty}'", output.name),
                    ));
                }
                main = Some(output);
            }
            outputs.push(VertexOutput {
                name: output.name.clone(),
                declared: output.declared.clone(),
                main: output.main,
                span: output.span,
                ty,
            });
        }
        if main.is_none() {
            return Err(TypeError::new(
                TypeErrorKind::VertexMainMissing,
                decl.span,
                format!("vertex shader {} has no main output", decl.name),
            ));
        }

        for p in inputs.iter().chain(&parameters) {
            scope.declare(p.name.clone(), p.ty.clone());
        }
        let locals = shader
            .locals
            .iter()
            .map(|l| self.check_local(l, &mut scope, TypeErrorKind::ShaderAssignmentBadType))
            .collect::<Result<Vec<_>>>()?;

        let targets: Vec<(&str, &Type)> =
            outputs.iter().map(|o| (o.name.as_str(), &o.ty)).collect();
        let writes = self.check_writes(&shader.writes, &targets, &mut scope)?;

        Ok(VertexShader {
            inputs,
            outputs,
            parameters,
            locals,
            writes,
        })
    }

    fn check_fragment(&mut self, shader: &FragmentShader) -> Result<FragmentShader<Type>> {
        let mut scope = LocalScope::new();
        let inputs = shader
            .inputs
            .iter()
            .map(|p| self.check_parameter(p))
            .collect::<Result<Vec<_>>>()?;
        let parameters = shader
            .parameters
            .iter()
            .map(|p| self.check_parameter(p))
            .collect::<Result<Vec<_>>>()?;

        let mut outputs = Vec::with_capacity(shader.outputs.len());
        for output in &shader.outputs {
            let ty = self.resolve_type(&output.declared, output.span)?;
            if output.kind == FragmentOutputKind::Depth && ty != Type::Float {
                return Err(TypeError::new(
                    TypeErrorKind::ShaderAssignmentBadType,
                    output.span,
                    format!("depth output '{}' must be 'float', found '{ty}'", output.name),
                ));
            }
            outputs.push(FragmentOutput {
                name: output.name.clone(),
                declared: output.declared.clone(),
                kind: output.kind,
                span: output.span,
                ty,
            });
        }

        for p in inputs.iter().chain(&parameters) {
            scope.declare(p.name.clone(), p.ty.clone());
        }
        let mut locals = Vec::with_capacity(shader.locals.len());
        for local in &shader.locals {
            locals.push(match local {
                FragmentLocal::Value(value) => FragmentLocal::Value(self.check_local(
                    value,
                    &mut scope,
                    TypeErrorKind::ShaderAssignmentBadType,
                )?),
                FragmentLocal::Discard { condition, span } => {
                    let condition = self.check_expr(condition, &mut scope)?;
                    if condition.ty != Type::Boolean {
                        return Err(TypeError::new(
                            TypeErrorKind::ShaderDiscardNotBoolean,
                            if span.is_known() { *span } else { condition.span },
                            format!("discard condition has type '{}'", condition.ty),
                        ));
                    }
                    FragmentLocal::Discard {
                        condition,
                        span: *span,
                    }
                }
            });
        }

        let targets: Vec<(&str, &Type)> =
            outputs.iter().map(|o| (o.name.as_str(), &o.ty)).collect();
        let writes = self.check_writes(&shader.writes, &targets, &mut scope)?;

        Ok(FragmentShader {
            inputs,
            outputs,
            parameters,
            locals,
            writes,
        })
    }

    fn check_writes(
        &mut self,
        writes: &[OutputWrite],
        outputs: &[(&str, &Type)],
        scope: &mut LocalScope,
    ) -> Result<Vec<OutputWrite<Type>>> {
        let mut typed = Vec::with_capacity(writes.len());
        for write in writes {
            let value = self.check_expr(&write.value, scope)?;
            let span = if write.span.is_known() { write.span } else { value.span };
            let Some((_, declared)) = outputs.iter().find(|(name, _)| *name == write.output) else {
                return Err(unresolved(span, format!("no output named '{}'", write.output)));
            };
            if &value.ty != *declared {
                return Err(TypeError::new(
                    TypeErrorKind::ShaderAssignmentBadType,
                    span,
                    format!(
                        "output '{}' has type '{declared}', found '{}'",
                        write.output, value.ty
                    ),
                ));
            }
            typed.push(OutputWrite {
                output: write.output.clone(),
                value,
                span: write.span,
            });
        }
        Ok(typed)
    }

    fn check_program_shader(&mut self, program: &ProgramShader, span: Span) -> Result<()> {
        let fragment = match self.constituent(&program.fragment, span)? {
            ShaderKind::Fragment(f) => f,
            other => return Err(wrong_kind(&program.fragment, "fragment", other.kind_name(), span)),
        };
        let mut fragment_inputs = Vec::with_capacity(fragment.inputs.len());
        for input in &fragment.inputs {
            let ty = self.resolve_type(&input.declared, input.span)?;
            fragment_inputs.push((input.name.as_str(), ty));
        }

        for name in &program.vertex {
            let vertex = match self.constituent(name, span)? {
                ShaderKind::Vertex(v) => v,
                other => return Err(wrong_kind(name, "vertex", other.kind_name(), span)),
            };
            for (input, input_ty) in &fragment_inputs {
                let Some(output) = vertex.outputs.iter().find(|o| o.name == *input) else {
                    return Err(TypeError::new(
                        TypeErrorKind::ShadersIncompatible,
                        span,
                        format!(
                            "fragment shader {} reads '{input}' which vertex shader {name} \
                             does not write",
                            program.fragment
                        ),
                    ));
                };
                let output_ty = self.resolve_type(&output.declared, output.span)?;
                if output_ty != *input_ty {
                    return Err(TypeError::new(
                        TypeErrorKind::ShadersIncompatible,
                        span,
                        format!(
                            "'{input}' is '{output_ty}' in vertex shader {name} but \
                             '{input_ty}' in fragment shader {}",
                            program.fragment
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    fn constituent(&self, name: &ShaderName, span: Span) -> Result<&'p ShaderKind> {
        let program: &'p lumen_ast::Program = self.program;
        program
            .shader(name)
            .map(|s| &s.kind)
            .ok_or_else(|| unresolved(span, format!("no declaration for shader {name}")))
    }
}

fn wrong_kind(name: &ShaderName, expected: &str, found: &str, span: Span) -> TypeError {
    TypeError::new(
        TypeErrorKind::WrongShaderKind,
        span,
        format!("{name} is a {found} shader, expected a {expected} shader"),
    )
}
