//! Program trees for the Lumen shader language.
//!
//! The same tree shape is used before and after type checking. Every node
//! that has a type carries an annotation of type `A`:
//!
//! - `Program<()>`: the fully resolved program produced by the upstream
//!   resolver. Names are flattened and bound to exactly one declaration.
//! - [`TypedProgram`] (`Program<Type>`): the output of the type checker,
//!   where every expression, binding and declaration records its final type.
//!
//! Trees are immutable once built and are shared read-only between the
//! worker threads of the compilation pipeline.
//!
//! ## Modules
//!
//! - [`type_expr`]: Type expressions as written in declarations
//! - [`expr`]: Expressions and local bindings
//! - [`decl`]: Term and record declarations
//! - [`shader`]: Vertex, fragment and program shader declarations
//! - [`program`]: Modules and whole programs

pub mod decl;
pub mod expr;
pub mod program;
pub mod shader;
pub mod type_expr;

pub use decl::{
    ExternalDecl, FunctionBody, Parameter, RecordDecl, RecordFieldDecl, TermDecl, TermKind,
};
pub use expr::{Expr, ExprKind, FieldAssignment, LocalValue, TermRef};
pub use program::{Module, Program, TypedProgram};
pub use shader::{
    FragmentLocal, FragmentOutput, FragmentOutputKind, FragmentShader, OutputWrite,
    ProgramShader, ShaderDecl, ShaderKind, VertexOutput, VertexShader,
};
pub use type_expr::TypeExpr;
