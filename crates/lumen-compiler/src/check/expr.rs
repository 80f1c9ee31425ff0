//! Expression rules.
//!
//! Expressions are checked bottom-up; every rule requires exact type
//! equality. There is no implicit conversion anywhere in the language.

use std::sync::Arc;

use lumen_ast::{Expr, ExprKind, FieldAssignment, LocalValue, TermRef, TypeExpr};
use lumen_core::{Span, SwizzleError, Type, TypeError, TypeErrorKind, TypeName};
use rustc_hash::FxHashSet;

use super::{LocalScope, Result, TypeChecker, unresolved};

impl TypeChecker<'_> {
    /// Check an expression in `scope`, returning its typed form.
    pub(crate) fn check_expr(&mut self, expr: &Expr, scope: &mut LocalScope) -> Result<Expr<Type>> {
        let span = expr.span;
        let (kind, ty) = match &expr.kind {
            ExprKind::Boolean(value) => (ExprKind::Boolean(*value), Type::Boolean),
            ExprKind::Integer(value) => (ExprKind::Integer(*value), Type::Integer),
            ExprKind::Real(value) => (ExprKind::Real(*value), Type::Float),
            ExprKind::Name(reference) => {
                let ty = self.reference_type(reference, span, scope)?;
                (ExprKind::Name(reference.clone()), ty)
            }
            ExprKind::Apply { callee, args } => self.check_apply(callee, args, span, scope)?,
            ExprKind::New { ty, args } => self.check_new(ty, args, span, scope)?,
            ExprKind::Record { ty, fields } => self.check_record(ty, fields, span, scope)?,
            ExprKind::Projection { expr, field } => {
                let inner = self.check_expr(expr, scope)?;
                let ty = match inner.ty.as_record() {
                    Some(record) => match record.field(field) {
                        Some(f) => f.ty.clone(),
                        None => {
                            return Err(TypeError::new(
                                TypeErrorKind::ProjectionNoSuchField,
                                span,
                                format!("record '{}' has no field '{field}'", record.name),
                            ));
                        }
                    },
                    None => {
                        return Err(TypeError::new(
                            TypeErrorKind::ProjectionNotRecord,
                            span,
                            format!("cannot project '{field}' from a value of type '{}'", inner.ty),
                        ));
                    }
                };
                (
                    ExprKind::Projection {
                        expr: Box::new(inner),
                        field: field.clone(),
                    },
                    ty,
                )
            }
            ExprKind::Swizzle { expr, components } => {
                let inner = self.check_expr(expr, scope)?;
                let vector = inner.ty.as_vector().ok_or_else(|| {
                    TypeError::new(
                        TypeErrorKind::SwizzleNotVector,
                        span,
                        format!("cannot swizzle a value of type '{}'", inner.ty),
                    )
                })?;
                let ty = vector
                    .swizzle(components)
                    .map_err(|e| swizzle_error(e, span))?;
                (
                    ExprKind::Swizzle {
                        expr: Box::new(inner),
                        components: components.clone(),
                    },
                    ty,
                )
            }
            ExprKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.check_expr(condition, scope)?;
                if condition.ty != Type::Boolean {
                    return Err(TypeError::new(
                        TypeErrorKind::ConditionNotBoolean,
                        condition.span,
                        format!("condition has type '{}'", condition.ty),
                    ));
                }
                let then_branch = self.check_expr(then_branch, scope)?;
                let else_branch = self.check_expr(else_branch, scope)?;
                if then_branch.ty != else_branch.ty {
                    return Err(TypeError::new(
                        TypeErrorKind::ConditionBranchesIncompatible,
                        span,
                        format!(
                            "branches have types '{}' and '{}'",
                            then_branch.ty, else_branch.ty
                        ),
                    ));
                }
                let ty = then_branch.ty.clone();
                (
                    ExprKind::Conditional {
                        condition: Box::new(condition),
                        then_branch: Box::new(then_branch),
                        else_branch: Box::new(else_branch),
                    },
                    ty,
                )
            }
            ExprKind::Let { bindings, body } => {
                let mark = scope.mark();
                let result = self.check_let(bindings, body, scope);
                scope.restore(mark);
                result?
            }
        };

        Ok(Expr { kind, span, ty })
    }

    /// Check a local value and bring it into scope.
    pub(crate) fn check_local(
        &mut self,
        local: &LocalValue,
        scope: &mut LocalScope,
        mismatch: TypeErrorKind,
    ) -> Result<LocalValue<Type>> {
        let value = self.check_expr(&local.value, scope)?;
        let span = if local.span.is_known() {
            local.span
        } else {
            value.span
        };
        self.check_binding(&value.ty, local.ascription.as_ref(), span, mismatch)?;
        let ty = value.ty.clone();
        scope.declare(local.name.clone(), ty.clone());
        Ok(LocalValue {
            name: local.name.clone(),
            ascription: local.ascription.clone(),
            value,
            span: local.span,
            ty,
        })
    }

    fn check_let(
        &mut self,
        bindings: &[LocalValue],
        body: &Expr,
        scope: &mut LocalScope,
    ) -> Result<(ExprKind<Type>, Type)> {
        let bindings = bindings
            .iter()
            .map(|b| self.check_local(b, scope, TypeErrorKind::ValueAscriptionMismatch))
            .collect::<Result<Vec<_>>>()?;
        let body = self.check_expr(body, scope)?;
        let ty = body.ty.clone();
        Ok((
            ExprKind::Let {
                bindings,
                body: Box::new(body),
            },
            ty,
        ))
    }

    fn reference_type(
        &mut self,
        reference: &TermRef,
        span: Span,
        scope: &LocalScope,
    ) -> Result<Type> {
        match reference {
            TermRef::Local(name) => scope
                .lookup(name)
                .cloned()
                .ok_or_else(|| unresolved(span, format!("no binding for local '{name}'"))),
            TermRef::Global(name) => self.term_type(name, span),
        }
    }

    fn check_apply(
        &mut self,
        callee: &TermRef,
        args: &[Expr],
        span: Span,
        scope: &mut LocalScope,
    ) -> Result<(ExprKind<Type>, Type)> {
        let callee_ty = self.reference_type(callee, span, scope)?;
        let function = match &callee_ty {
            Type::Function(f) => Arc::clone(f),
            other => {
                return Err(TypeError::new(
                    TypeErrorKind::ApplicationNotFunction,
                    span,
                    format!("'{}' has type '{other}'", describe(callee)),
                ));
            }
        };

        let args = self.check_args(args, scope)?;
        let matches = args.len() == function.params.len()
            && args.iter().zip(&function.params).all(|(a, p)| &a.ty == p);
        if !matches {
            return Err(TypeError::new(
                TypeErrorKind::ApplicationBadTypes,
                span,
                format!(
                    "'{}' has type '{callee_ty}' but was applied to ({})",
                    describe(callee),
                    list_types(&args)
                ),
            ));
        }

        Ok((
            ExprKind::Apply {
                callee: callee.clone(),
                args,
            },
            function.result.clone(),
        ))
    }

    fn check_new(
        &mut self,
        ty: &TypeExpr,
        args: &[Expr],
        span: Span,
        scope: &mut LocalScope,
    ) -> Result<(ExprKind<Type>, Type)> {
        let target = self.resolve_type(ty, span)?;
        if !target.is_constructible() {
            return Err(TypeError::new(
                TypeErrorKind::NewNotConstructible,
                span,
                format!("type '{target}' has no constructors"),
            ));
        }

        let args = self.check_args(args, scope)?;
        let arg_types: Vec<Type> = args.iter().map(|a| a.ty.clone()).collect();
        if target.find_constructor(&arg_types).is_none() {
            let accepted = target
                .constructors()
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(TypeError::new(
                TypeErrorKind::NewNoMatchingConstructor,
                span,
                format!(
                    "no constructor of '{target}' accepts ({}); accepted: {accepted}",
                    list_types(&args)
                ),
            ));
        }

        Ok((
            ExprKind::New {
                ty: ty.clone(),
                args,
            },
            target,
        ))
    }

    fn check_record(
        &mut self,
        name: &TypeName,
        fields: &[FieldAssignment],
        span: Span,
        scope: &mut LocalScope,
    ) -> Result<(ExprKind<Type>, Type)> {
        let record_ty = self.record_type(name, span)?;
        let record = match &record_ty {
            Type::Record(r) => Arc::clone(r),
            other => return Err(unresolved(span, format!("'{other}' is not a record"))),
        };

        let mut assigned: FxHashSet<&str> = FxHashSet::default();
        let mut typed = Vec::with_capacity(fields.len());
        for field in fields {
            let field_span = if field.span.is_known() { field.span } else { span };
            let Some(declared) = record.field(&field.name) else {
                return Err(TypeError::new(
                    TypeErrorKind::RecordFieldUnknown,
                    field_span,
                    format!("record '{name}' has no field '{}'", field.name),
                ));
            };
            if !assigned.insert(field.name.as_str()) {
                return Err(TypeError::new(
                    TypeErrorKind::RecordFieldDuplicate,
                    field_span,
                    format!("field '{}' of '{name}' is assigned twice", field.name),
                ));
            }
            let value = self.check_expr(&field.value, scope)?;
            if value.ty != declared.ty {
                return Err(TypeError::new(
                    TypeErrorKind::RecordFieldBadType,
                    field_span,
                    format!(
                        "field '{}' of '{name}' has type '{}', found '{}'",
                        field.name, declared.ty, value.ty
                    ),
                ));
            }
            typed.push(FieldAssignment {
                name: field.name.clone(),
                value,
                span: field.span,
            });
        }

        if let Some(missing) = record
            .fields
            .iter()
            .find(|f| !assigned.contains(f.name.as_str()))
        {
            return Err(TypeError::new(
                TypeErrorKind::RecordFieldNotAssigned,
                span,
                format!("field '{}' of '{name}' is not assigned", missing.name),
            ));
        }

        Ok((
            ExprKind::Record {
                ty: name.clone(),
                fields: typed,
            },
            record_ty,
        ))
    }

    fn check_args(&mut self, args: &[Expr], scope: &mut LocalScope) -> Result<Vec<Expr<Type>>> {
        args.iter().map(|a| self.check_expr(a, scope)).collect()
    }
}

fn swizzle_error(error: SwizzleError, span: Span) -> TypeError {
    match error {
        SwizzleError::Empty => {
            TypeError::new(TypeErrorKind::SwizzleBadField, span, "empty swizzle selector")
        }
        SwizzleError::TooManyComponents { count } => TypeError::new(
            TypeErrorKind::SwizzleTooManyFields,
            span,
            format!("{count} components selected, at most 4 allowed"),
        ),
        SwizzleError::UnknownComponent { component } => TypeError::new(
            TypeErrorKind::SwizzleBadField,
            span,
            format!("no component '{component}'"),
        ),
    }
}

fn describe(reference: &TermRef) -> String {
    match reference {
        TermRef::Global(name) => name.to_string(),
        TermRef::Local(name) => name.clone(),
    }
}

fn list_types(args: &[Expr<Type>]) -> String {
    args.iter()
        .map(|a| a.ty.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
