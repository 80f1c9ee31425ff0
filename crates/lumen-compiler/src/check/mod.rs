//! Type checker.
//!
//! Decorates every term, record, shader and expression of a resolved
//! [`Program`] with its type, producing a [`TypedProgram`], or rejects the
//! program with the first [`TypeError`] found.
//!
//! Declarations are checked on demand: a reference to a value that has not
//! been checked yet checks it first, and the result is memoised. Function
//! references only need the declared signature, so bodies are checked once,
//! in module order. The resolver guarantees the program is acyclic; should a
//! value nevertheless refer back to itself the checker reports
//! [`TypeErrorKind::UnresolvedReference`] instead of recursing forever.
//!
//! ## Modules
//!
//! - `expr`: Expression rules
//! - `shader`: Vertex, fragment and program shader rules
//! - [`scope`]: Local binding stack

mod expr;
pub mod scope;
mod shader;

pub use scope::LocalScope;

use lumen_ast::{
    FunctionBody, Module, Parameter, Program, RecordDecl, TermDecl, TermKind, TypeExpr,
    TypedProgram,
};
use lumen_core::{RecordField, Span, TermName, Type, TypeError, TypeErrorKind, TypeName};
use rustc_hash::{FxHashMap, FxHashSet};

type Result<T> = std::result::Result<T, TypeError>;

/// Type check a whole program.
pub fn check_program(program: &Program) -> Result<TypedProgram> {
    #[cfg(feature = "profiling")]
    profiling::scope!("check_program");

    TypeChecker::new(program).check()
}

/// Checks one resolved program.
pub struct TypeChecker<'p> {
    program: &'p Program,
    /// Checked term declarations, waiting to be placed in their module.
    terms: FxHashMap<TermName, TermDecl<Type>>,
    /// The type of every term resolved so far.
    term_types: FxHashMap<TermName, Type>,
    records: FxHashMap<TypeName, Type>,
    terms_in_progress: FxHashSet<TermName>,
    records_in_progress: FxHashSet<TypeName>,
}

impl<'p> TypeChecker<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            terms: FxHashMap::default(),
            term_types: FxHashMap::default(),
            records: FxHashMap::default(),
            terms_in_progress: FxHashSet::default(),
            records_in_progress: FxHashSet::default(),
        }
    }

    /// Check every declaration and assemble the typed program.
    pub fn check(mut self) -> Result<TypedProgram> {
        let program = self.program;
        let mut typed = Program::new();

        for module in program.modules() {
            log::debug!("checking module {}", module.path);

            let mut terms = Vec::with_capacity(module.terms.len());
            for term in &module.terms {
                self.check_term(term)?;
                let checked = self
                    .terms
                    .remove(&term.name)
                    .ok_or_else(|| unresolved(term.span, format!("term {}", term.name)))?;
                terms.push(checked);
            }

            let mut types = Vec::with_capacity(module.types.len());
            for record in &module.types {
                let ty = self.record_type(&record.name, record.span)?;
                types.push(RecordDecl {
                    name: record.name.clone(),
                    fields: record.fields.clone(),
                    span: record.span,
                    ty,
                });
            }

            let shaders = module
                .shaders
                .iter()
                .map(|shader| self.check_shader(shader))
                .collect::<Result<Vec<_>>>()?;

            typed.insert_module(Module {
                path: module.path.clone(),
                terms,
                types,
                shaders,
            });
        }

        Ok(typed)
    }

    // =====================================================================
    // Declarations
    // =====================================================================

    /// The type of the term `name`, checking it first if it is a value.
    pub(crate) fn term_type(&mut self, name: &TermName, span: Span) -> Result<Type> {
        if let Some(ty) = self.term_types.get(name) {
            return Ok(ty.clone());
        }
        let program = self.program;
        let decl = program
            .term(name)
            .ok_or_else(|| unresolved(span, format!("no declaration for term {name}")))?;

        match &decl.kind {
            TermKind::Function {
                params, returns, ..
            } => {
                let ty = self.signature(params, returns, decl.span)?;
                self.term_types.insert(name.clone(), ty.clone());
                Ok(ty)
            }
            TermKind::Value { .. } => self.check_term(decl),
        }
    }

    fn signature(&mut self, params: &[Parameter], returns: &TypeExpr, span: Span) -> Result<Type> {
        let params = params
            .iter()
            .map(|p| self.resolve_type(&p.declared, p.span))
            .collect::<Result<Vec<_>>>()?;
        let result = self.resolve_type(returns, span)?;
        Ok(Type::function(params, result))
    }

    fn check_term(&mut self, decl: &TermDecl) -> Result<Type> {
        if self.terms.contains_key(&decl.name) {
            if let Some(ty) = self.term_types.get(&decl.name) {
                return Ok(ty.clone());
            }
        }
        if !self.terms_in_progress.insert(decl.name.clone()) {
            return Err(unresolved(
                decl.span,
                format!("term {} refers to itself", decl.name),
            ));
        }

        log::trace!("checking term {}", decl.name);
        let checked = self.check_term_body(decl);
        self.terms_in_progress.remove(&decl.name);
        let checked = checked?;

        let ty = checked.ty.clone();
        self.term_types.insert(decl.name.clone(), ty.clone());
        self.terms.insert(decl.name.clone(), checked);
        Ok(ty)
    }

    fn check_term_body(&mut self, decl: &TermDecl) -> Result<TermDecl<Type>> {
        let mut scope = LocalScope::new();
        let (kind, ty) = match &decl.kind {
            TermKind::Value { ascription, value } => {
                let value = self.check_expr(value, &mut scope)?;
                self.check_binding(
                    &value.ty,
                    ascription.as_ref(),
                    decl.span,
                    TypeErrorKind::ValueAscriptionMismatch,
                )?;
                let ty = value.ty.clone();
                (
                    TermKind::Value {
                        ascription: ascription.clone(),
                        value,
                    },
                    ty,
                )
            }
            TermKind::Function {
                params,
                returns,
                body,
            } => {
                let typed_params = params
                    .iter()
                    .map(|p| self.check_parameter(p))
                    .collect::<Result<Vec<_>>>()?;
                let result = self.resolve_type(returns, decl.span)?;
                let ty = Type::function(
                    typed_params.iter().map(|p| p.ty.clone()).collect(),
                    result.clone(),
                );

                let body = match body {
                    FunctionBody::Expr(body) => {
                        for p in &typed_params {
                            scope.declare(p.name.clone(), p.ty.clone());
                        }
                        let body = self.check_expr(body, &mut scope)?;
                        if body.ty != result {
                            return Err(TypeError::new(
                                TypeErrorKind::FunctionBodyReturnIncompatible,
                                body.span,
                                format!(
                                    "function {} returns '{result}' but its body has type '{}'",
                                    decl.name, body.ty
                                ),
                            ));
                        }
                        FunctionBody::Expr(body)
                    }
                    FunctionBody::External(ext) => FunctionBody::External(ext.clone()),
                };

                (
                    TermKind::Function {
                        params: typed_params,
                        returns: returns.clone(),
                        body,
                    },
                    ty,
                )
            }
        };

        Ok(TermDecl {
            name: decl.name.clone(),
            kind,
            span: decl.span,
            ty,
        })
    }

    /// Check a bound value's type: it must be a value type and equal the
    /// ascription, if any.
    pub(crate) fn check_binding(
        &mut self,
        ty: &Type,
        ascription: Option<&TypeExpr>,
        span: Span,
        mismatch: TypeErrorKind,
    ) -> Result<()> {
        if !ty.is_value() {
            return Err(TypeError::new(
                TypeErrorKind::ValueNonValueType,
                span,
                format!("cannot bind a value of function type '{ty}'"),
            ));
        }
        if let Some(ascription) = ascription {
            let expected = self.resolve_type(ascription, span)?;
            if &expected != ty {
                return Err(TypeError::new(
                    mismatch,
                    span,
                    format!("expected '{expected}', found '{ty}'"),
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn check_parameter(&mut self, param: &Parameter) -> Result<Parameter<Type>> {
        Ok(Parameter {
            name: param.name.clone(),
            declared: param.declared.clone(),
            span: param.span,
            ty: self.resolve_type(&param.declared, param.span)?,
        })
    }

    // =====================================================================
    // Types
    // =====================================================================

    /// Turn a type expression into a type, resolving records on demand.
    pub(crate) fn resolve_type(&mut self, ty: &TypeExpr, span: Span) -> Result<Type> {
        match ty {
            TypeExpr::Named(name) => self.record_type(name, span),
            other => self.resolve_known(other, span),
        }
    }

    /// Like [`resolve_type`](Self::resolve_type), for records that have
    /// already been resolved.
    pub(crate) fn resolve_known(&self, ty: &TypeExpr, span: Span) -> Result<Type> {
        Ok(match ty {
            TypeExpr::Boolean => Type::Boolean,
            TypeExpr::Integer => Type::Integer,
            TypeExpr::Float => Type::Float,
            TypeExpr::Vector(v) => Type::Vector(*v),
            TypeExpr::Matrix(m) => Type::Matrix(*m),
            TypeExpr::Sampler(s) => Type::Sampler(*s),
            TypeExpr::Named(name) => self
                .records
                .get(name)
                .cloned()
                .ok_or_else(|| unresolved(span, format!("no declaration for type {name}")))?,
        })
    }

    pub(crate) fn record_type(&mut self, name: &TypeName, span: Span) -> Result<Type> {
        if let Some(ty) = self.records.get(name) {
            return Ok(ty.clone());
        }
        let program = self.program;
        let decl = program
            .record(name)
            .ok_or_else(|| unresolved(span, format!("no declaration for type {name}")))?;
        if !self.records_in_progress.insert(name.clone()) {
            return Err(unresolved(span, format!("record {name} contains itself")));
        }

        let fields = decl
            .fields
            .iter()
            .map(|f| -> Result<RecordField> {
                Ok(RecordField {
                    name: f.name.clone(),
                    ty: self.resolve_type(&f.declared, f.span)?,
                })
            })
            .collect::<Result<Vec<_>>>();
        self.records_in_progress.remove(name);

        let ty = Type::record(name.clone(), fields?);
        self.records.insert(name.clone(), ty.clone());
        Ok(ty)
    }
}

pub(crate) fn unresolved(span: Span, message: impl Into<String>) -> TypeError {
    TypeError::new(TypeErrorKind::UnresolvedReference, span, message)
}
