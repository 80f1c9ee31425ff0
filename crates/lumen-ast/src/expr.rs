//! Expression nodes.
//!
//! The language is expression oriented: function bodies, value definitions
//! and shader writes are all single expressions. Sub-expressions are boxed;
//! the tree is owned so it can be shared across threads once built.
//!
//! Resolved trees (`Expr<()>`) are usually built through the convenience
//! constructors at the bottom of this module:
//!
//! ```
//! use lumen_ast::Expr;
//!
//! let e = Expr::conditional(
//!     Expr::boolean(true),
//!     Expr::integer(1),
//!     Expr::integer(2),
//! );
//! ```

use lumen_core::{Span, TermName, TypeName};
use ordered_float::OrderedFloat;

use crate::TypeExpr;

/// A reference to a term: a global declaration or a local binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermRef {
    /// A term declared in some module.
    Global(TermName),
    /// A function parameter, shader input/parameter, or `let`/local value.
    Local(String),
}

/// An expression annotated with `A`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expr<A = ()> {
    pub kind: ExprKind<A>,
    pub span: Span,
    /// `()` before type checking, the expression's type after.
    pub ty: A,
}

/// The kinds of expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprKind<A = ()> {
    Boolean(bool),
    Integer(i64),
    Real(OrderedFloat<f64>),
    /// A reference to a term.
    Name(TermRef),
    /// `f(a, b, ...)`
    Apply { callee: TermRef, args: Vec<Expr<A>> },
    /// `new T(a, b, ...)`
    New { ty: TypeExpr, args: Vec<Expr<A>> },
    /// `record T { f = e, ... }`
    Record {
        ty: TypeName,
        fields: Vec<FieldAssignment<A>>,
    },
    /// `e.f`
    Projection { expr: Box<Expr<A>>, field: String },
    /// `e[x y z]`
    Swizzle {
        expr: Box<Expr<A>>,
        components: Vec<String>,
    },
    /// `if c then a else b`
    Conditional {
        condition: Box<Expr<A>>,
        then_branch: Box<Expr<A>>,
        else_branch: Box<Expr<A>>,
    },
    /// `let v1 = e1; ... in body`
    Let {
        bindings: Vec<LocalValue<A>>,
        body: Box<Expr<A>>,
    },
}

/// One `field = value` assignment of a record literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldAssignment<A = ()> {
    pub name: String,
    pub value: Expr<A>,
    pub span: Span,
}

/// A local value binding (`let` bindings and shader locals).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalValue<A = ()> {
    pub name: String,
    pub ascription: Option<TypeExpr>,
    pub value: Expr<A>,
    pub span: Span,
    /// The bound type after checking.
    pub ty: A,
}

impl<A> Expr<A> {
    /// Visit this expression and every sub-expression in pre-order,
    /// including the values of `let` bindings.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr<A>)) {
        f(self);
        match &self.kind {
            ExprKind::Boolean(_)
            | ExprKind::Integer(_)
            | ExprKind::Real(_)
            | ExprKind::Name(_) => {}
            ExprKind::Apply { args, .. } | ExprKind::New { args, .. } => {
                for arg in args {
                    arg.walk(f);
                }
            }
            ExprKind::Record { fields, .. } => {
                for field in fields {
                    field.value.walk(f);
                }
            }
            ExprKind::Projection { expr, .. } | ExprKind::Swizzle { expr, .. } => expr.walk(f),
            ExprKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.walk(f);
                then_branch.walk(f);
                else_branch.walk(f);
            }
            ExprKind::Let { bindings, body } => {
                for binding in bindings {
                    binding.value.walk(f);
                }
                body.walk(f);
            }
        }
    }
}

// =========================================================================
// Construction helpers for resolved trees
// =========================================================================

impl Expr<()> {
    /// Create an expression with no source position.
    pub fn new(kind: ExprKind<()>) -> Self {
        Self {
            kind,
            span: Span::default(),
            ty: (),
        }
    }

    /// Attach a source position.
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(ExprKind::Boolean(value))
    }

    pub fn integer(value: i64) -> Self {
        Self::new(ExprKind::Integer(value))
    }

    pub fn real(value: f64) -> Self {
        Self::new(ExprKind::Real(OrderedFloat(value)))
    }

    /// A reference to a local binding.
    pub fn local(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Name(TermRef::Local(name.into())))
    }

    /// A reference to a global term.
    pub fn global(name: TermName) -> Self {
        Self::new(ExprKind::Name(TermRef::Global(name)))
    }

    /// Apply a global term to arguments.
    pub fn apply(callee: TermName, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Apply {
            callee: TermRef::Global(callee),
            args,
        })
    }

    /// `new ty(args)`
    pub fn construct(ty: TypeExpr, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::New { ty, args })
    }

    /// A record literal; fields are given as `(name, value)` pairs.
    pub fn record(ty: TypeName, fields: Vec<(&str, Expr)>) -> Self {
        let fields = fields
            .into_iter()
            .map(|(name, value)| FieldAssignment {
                name: name.to_string(),
                value,
                span: Span::default(),
            })
            .collect();
        Self::new(ExprKind::Record { ty, fields })
    }

    /// `self.field`
    pub fn project(self, field: impl Into<String>) -> Self {
        Self::new(ExprKind::Projection {
            expr: Box::new(self),
            field: field.into(),
        })
    }

    /// A swizzle; each character of `selector` is one component.
    pub fn swizzle(self, selector: &str) -> Self {
        Self::new(ExprKind::Swizzle {
            expr: Box::new(self),
            components: selector.chars().map(|c| c.to_string()).collect(),
        })
    }

    pub fn conditional(condition: Expr, then_branch: Expr, else_branch: Expr) -> Self {
        Self::new(ExprKind::Conditional {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    pub fn let_in(bindings: Vec<LocalValue>, body: Expr) -> Self {
        Self::new(ExprKind::Let {
            bindings,
            body: Box::new(body),
        })
    }
}

impl LocalValue<()> {
    /// An unascribed local binding.
    pub fn new(name: impl Into<String>, value: Expr) -> Self {
        Self {
            name: name.into(),
            ascription: None,
            value,
            span: Span::default(),
            ty: (),
        }
    }

    /// Add a type ascription.
    pub fn ascribed(mut self, ty: TypeExpr) -> Self {
        self.ascription = Some(ty);
        self
    }
}
