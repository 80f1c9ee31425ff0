//! Type expressions.
//!
//! A type expression is the syntactic form of a type in a declaration:
//! either one of the built-in types or the flattened name of a record. The
//! type checker turns these into [`Type`](lumen_core::Type) values.

use std::fmt;

use lumen_core::{MatrixType, SamplerType, TypeName, VectorType};

/// A type as written in source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    Boolean,
    Integer,
    Float,
    Vector(VectorType),
    Matrix(MatrixType),
    Sampler(SamplerType),
    /// A record type declared in some module.
    Named(TypeName),
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Boolean => write!(f, "boolean"),
            TypeExpr::Integer => write!(f, "integer"),
            TypeExpr::Float => write!(f, "float"),
            TypeExpr::Vector(v) => write!(f, "{}", v.name()),
            TypeExpr::Matrix(m) => write!(f, "{}", m.name()),
            TypeExpr::Sampler(s) => write!(f, "{}", s.name()),
            TypeExpr::Named(n) => write!(f, "{n}"),
        }
    }
}
