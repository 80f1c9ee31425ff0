//! Expression lowering.
//!
//! Expressions become [`GlslExpr`] trees. Constructs with no expression form
//! (`let`, and conditionals whose branches need statements) push statements
//! onto the enclosing block and yield a temporary.

use lumen_ast::{Expr, ExprKind, FunctionBody, TermKind, TermRef};
use lumen_core::{Features, SamplerType, Type};

use super::{Lowering, Result, term_symbol};
use crate::glsl::{GlslExpr, GlslStmt};

/// Source local names mapped to their output names, innermost last.
#[derive(Debug, Default)]
pub(super) struct Locals {
    names: Vec<(String, String)>,
}

impl Locals {
    pub(super) fn bind(&mut self, source: &str, target: String) {
        self.names.push((source.to_string(), target));
    }

    fn lookup(&self, source: &str) -> Option<&str> {
        self.names
            .iter()
            .rev()
            .find(|(s, _)| s == source)
            .map(|(_, t)| t.as_str())
    }

    fn mark(&self) -> usize {
        self.names.len()
    }

    fn restore(&mut self, mark: usize) {
        self.names.truncate(mark);
    }
}

impl Lowering<'_> {
    pub(super) fn expr(
        &mut self,
        expr: &Expr<Type>,
        locals: &mut Locals,
        out: &mut Vec<GlslStmt>,
    ) -> Result<GlslExpr> {
        Ok(match &expr.kind {
            ExprKind::Boolean(b) => GlslExpr::Bool(*b),
            ExprKind::Integer(i) => GlslExpr::Int(*i),
            ExprKind::Real(r) => GlslExpr::Float(*r),

            ExprKind::Name(TermRef::Local(name)) => match locals.lookup(name) {
                Some(target) => GlslExpr::var(target),
                None => return Err(self.unsupported(format!("unbound local '{name}'"))),
            },
            ExprKind::Name(TermRef::Global(name)) => {
                let term = self
                    .program
                    .term(name)
                    .ok_or_else(|| self.unsupported(format!("undeclared term '{name}'")))?;
                match &term.kind {
                    TermKind::Value { .. } if self.constants.contains(name) => {
                        GlslExpr::var(term_symbol(name))
                    }
                    TermKind::Value { .. } => GlslExpr::call(term_symbol(name), Vec::new()),
                    TermKind::Function { .. } => {
                        return Err(self.unsupported(format!(
                            "function '{name}' cannot be used as a value"
                        )));
                    }
                }
            }

            ExprKind::Apply {
                callee: TermRef::Global(name),
                args,
            } => {
                let lowered = self.exprs(args, locals, out)?;
                let term = self
                    .program
                    .term(name)
                    .ok_or_else(|| self.unsupported(format!("undeclared term '{name}'")))?;
                match &term.kind {
                    TermKind::Function {
                        body: FunctionBody::External(external),
                        ..
                    } => GlslExpr::call(self.builtin(&external.name, args), lowered),
                    TermKind::Function { .. } => GlslExpr::call(term_symbol(name), lowered),
                    TermKind::Value { .. } => {
                        return Err(self.unsupported(format!("value '{name}' is not callable")));
                    }
                }
            }
            ExprKind::Apply {
                callee: TermRef::Local(name),
                ..
            } => {
                return Err(self.unsupported(format!("local '{name}' is not callable")));
            }

            ExprKind::New { args, .. } => {
                let lowered = self.exprs(args, locals, out)?;
                GlslExpr::call(self.glsl_type(&expr.ty)?.name(), lowered)
            }
            ExprKind::Record { fields, .. } => {
                let record = expr
                    .ty
                    .as_record()
                    .ok_or_else(|| self.unsupported(format!("'{}' is not a record", expr.ty)))?;
                let mut args = Vec::with_capacity(record.fields.len());
                for field in &record.fields {
                    let assignment = fields
                        .iter()
                        .find(|f| f.name == field.name)
                        .ok_or_else(|| {
                            self.unsupported(format!("field '{}' is not assigned", field.name))
                        })?;
                    args.push(self.expr(&assignment.value, locals, out)?);
                }
                GlslExpr::call(self.glsl_type(&expr.ty)?.name(), args)
            }

            ExprKind::Projection { expr: inner, field } => GlslExpr::Field {
                expr: Box::new(self.expr(inner, locals, out)?),
                field: field.clone(),
            },
            ExprKind::Swizzle {
                expr: inner,
                components,
            } => GlslExpr::Swizzle {
                expr: Box::new(self.expr(inner, locals, out)?),
                components: components.concat(),
            },

            ExprKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.expr(condition, locals, out)?;
                let mut then_stmts = Vec::new();
                let then_value = self.expr(then_branch, locals, &mut then_stmts)?;
                let mut else_stmts = Vec::new();
                let else_value = self.expr(else_branch, locals, &mut else_stmts)?;

                if then_stmts.is_empty() && else_stmts.is_empty() {
                    GlslExpr::Ternary {
                        condition: Box::new(condition),
                        then_branch: Box::new(then_value),
                        else_branch: Box::new(else_value),
                    }
                } else {
                    let temporary = self.temporary();
                    out.push(GlslStmt::Local {
                        name: temporary.clone(),
                        ty: self.glsl_type(&expr.ty)?,
                        value: None,
                    });
                    then_stmts.push(GlslStmt::Assign {
                        target: GlslExpr::var(temporary.as_str()),
                        value: then_value,
                    });
                    else_stmts.push(GlslStmt::Assign {
                        target: GlslExpr::var(temporary.as_str()),
                        value: else_value,
                    });
                    out.push(GlslStmt::If {
                        condition,
                        then_branch: then_stmts,
                        else_branch: else_stmts,
                    });
                    GlslExpr::Var(temporary)
                }
            }

            ExprKind::Let { bindings, body } => {
                let mark = locals.mark();
                for binding in bindings {
                    let value = self.expr(&binding.value, locals, out)?;
                    let temporary = self.temporary();
                    out.push(GlslStmt::Local {
                        name: temporary.clone(),
                        ty: self.glsl_type(&binding.ty)?,
                        value: Some(value),
                    });
                    locals.bind(&binding.name, temporary);
                }
                let body = self.expr(body, locals, out);
                locals.restore(mark);
                body?
            }
        })
    }

    fn exprs(
        &mut self,
        exprs: &[Expr<Type>],
        locals: &mut Locals,
        out: &mut Vec<GlslStmt>,
    ) -> Result<Vec<GlslExpr>> {
        exprs.iter().map(|e| self.expr(e, locals, out)).collect()
    }

    /// The name of an external function for this version.
    ///
    /// Targets without the unified `texture` built-in spell sampling per
    /// sampler type.
    fn builtin(&self, name: &str, args: &[Expr<Type>]) -> String {
        if self.features.contains(Features::UNIFIED_TEXTURE) {
            return name.to_string();
        }
        let sampler = match args.first().map(|a| &a.ty) {
            Some(Type::Sampler(sampler)) => *sampler,
            _ => return name.to_string(),
        };
        match (name, sampler) {
            ("texture", SamplerType::Sampler2D) => "texture2D",
            ("texture", SamplerType::SamplerCube) => "textureCube",
            ("textureLod", SamplerType::Sampler2D) => "texture2DLod",
            ("textureLod", SamplerType::SamplerCube) => "textureCubeLod",
            _ => name,
        }
        .to_string()
    }

    /// Whether `expr` can initialise a `const` global.
    pub(super) fn is_constant(&self, expr: &Expr<Type>) -> bool {
        match &expr.kind {
            ExprKind::Boolean(_) | ExprKind::Integer(_) | ExprKind::Real(_) => true,
            ExprKind::Name(TermRef::Global(name)) => self.constants.contains(name),
            ExprKind::Name(TermRef::Local(_)) | ExprKind::Apply { .. } | ExprKind::Let { .. } => {
                false
            }
            ExprKind::New { args, .. } => args.iter().all(|a| self.is_constant(a)),
            ExprKind::Record { fields, .. } => fields.iter().all(|f| self.is_constant(&f.value)),
            ExprKind::Projection { expr, .. } | ExprKind::Swizzle { expr, .. } => {
                self.is_constant(expr)
            }
            ExprKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                self.is_constant(condition)
                    && self.is_constant(then_branch)
                    && self.is_constant(else_branch)
            }
        }
    }
}
