//! Term and record declarations.

use lumen_core::{Availability, Span, TermName, TypeName};

use crate::{Expr, TypeExpr};

/// A term declaration: a value or a function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermDecl<A = ()> {
    pub name: TermName,
    pub kind: TermKind<A>,
    pub span: Span,
    /// The term's type after checking; function types for functions.
    pub ty: A,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermKind<A = ()> {
    /// `value name [: T] = e`
    Value {
        ascription: Option<TypeExpr>,
        value: Expr<A>,
    },
    /// `function name (p: T, ...): R = body`
    Function {
        params: Vec<Parameter<A>>,
        returns: TypeExpr,
        body: FunctionBody<A>,
    },
}

/// The body of a function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FunctionBody<A = ()> {
    /// A user function defined by an expression.
    Expr(Expr<A>),
    /// A function provided by the target language.
    External(ExternalDecl),
}

/// An external function: a built-in of the target language.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalDecl {
    /// The built-in's name in the target language, e.g. `dot` or `texture`.
    pub name: String,
    /// The target versions that provide the built-in.
    pub availability: Availability,
}

/// A named, typed binding: function parameters, shader inputs and shader
/// parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter<A = ()> {
    pub name: String,
    pub declared: TypeExpr,
    pub span: Span,
    pub ty: A,
}

/// A record type declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordDecl<A = ()> {
    pub name: TypeName,
    pub fields: Vec<RecordFieldDecl>,
    pub span: Span,
    /// The declared record type after checking.
    pub ty: A,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordFieldDecl {
    pub name: String,
    pub declared: TypeExpr,
    pub span: Span,
}

impl<A> TermDecl<A> {
    /// Whether this term is a function (user or external).
    pub fn is_function(&self) -> bool {
        matches!(self.kind, TermKind::Function { .. })
    }

    /// The external declaration, if this is an external function.
    pub fn as_external(&self) -> Option<&ExternalDecl> {
        match &self.kind {
            TermKind::Function {
                body: FunctionBody::External(ext),
                ..
            } => Some(ext),
            _ => None,
        }
    }
}

// =========================================================================
// Construction helpers for resolved trees
// =========================================================================

impl TermDecl<()> {
    /// `value name = value`
    pub fn value(name: TermName, value: Expr) -> Self {
        Self {
            name,
            kind: TermKind::Value {
                ascription: None,
                value,
            },
            span: Span::default(),
            ty: (),
        }
    }

    /// `value name : ascription = value`
    pub fn ascribed_value(name: TermName, ascription: TypeExpr, value: Expr) -> Self {
        Self {
            name,
            kind: TermKind::Value {
                ascription: Some(ascription),
                value,
            },
            span: Span::default(),
            ty: (),
        }
    }

    /// A user function with an expression body.
    pub fn function(
        name: TermName,
        params: Vec<Parameter>,
        returns: TypeExpr,
        body: Expr,
    ) -> Self {
        Self {
            name,
            kind: TermKind::Function {
                params,
                returns,
                body: FunctionBody::Expr(body),
            },
            span: Span::default(),
            ty: (),
        }
    }

    /// An external function mapped to a target built-in.
    pub fn external(
        name: TermName,
        params: Vec<Parameter>,
        returns: TypeExpr,
        external: ExternalDecl,
    ) -> Self {
        Self {
            name,
            kind: TermKind::Function {
                params,
                returns,
                body: FunctionBody::External(external),
            },
            span: Span::default(),
            ty: (),
        }
    }

    /// Attach a source position.
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl ExternalDecl {
    /// A built-in available in every version.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            availability: Availability::everywhere(),
        }
    }

    /// Restrict the versions providing the built-in.
    pub fn available(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }
}

impl Parameter<()> {
    pub fn new(name: impl Into<String>, declared: TypeExpr) -> Self {
        Self {
            name: name.into(),
            declared,
            span: Span::default(),
            ty: (),
        }
    }
}

impl RecordDecl<()> {
    /// A record with `(field, type)` pairs in declaration order.
    pub fn new(name: TypeName, fields: Vec<(&str, TypeExpr)>) -> Self {
        Self {
            name,
            fields: fields
                .into_iter()
                .map(|(name, declared)| RecordFieldDecl {
                    name: name.to_string(),
                    declared,
                    span: Span::default(),
                })
                .collect(),
            span: Span::default(),
            ty: (),
        }
    }
}
