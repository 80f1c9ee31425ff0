//! Lumen Compiler
//!
//! Type checking, dependency analysis, version selection and lowering for
//! Lumen shader programs, plus the orchestrator that runs them per shader
//! on a worker pool.
//!
//! ## Modules
//!
//! - [`check`]: Type checker producing a [`TypedProgram`](lumen_ast::TypedProgram)
//! - [`graph`]: Minimal owned DAG with insert-time cycle checks and topological sort
//! - [`references`]: Term/type/shader reference graphs, referenced sets and topology
//! - [`versions`]: Per-shader requirements and supported target versions
//! - [`glsl`]: The version-specific output tree
//! - [`lower`]: Lowering of one shader for one target version
//! - [`executor`]: Task executors and cooperative cancellation
//! - [`config`]: Compiler configuration
//! - [`pipeline`]: The pipeline orchestrator

pub mod check;
pub mod config;
pub mod executor;
pub mod glsl;
pub mod graph;
pub mod lower;
pub mod pipeline;
pub mod references;
pub mod versions;

pub use check::{TypeChecker, check_program};
pub use config::CompilerConfig;
pub use executor::{Cancellation, Executor, SequentialExecutor, Task, ThreadPoolExecutor};
pub use glsl::{
    GlslDecl, GlslExpr, GlslShader, GlslStmt, GlslType, ShaderStage, StorageQualifier,
};
pub use graph::Dag;
pub use lower::{lower_shader, record_symbol, term_symbol};
pub use pipeline::{
    CompilationResult, CompiledProgram, CompiledShader, InterfaceVariable, Pipeline,
    ShaderInterface,
};
pub use references::{Reference, ReferenceGraphs};
pub use versions::{Requirements, SupportedVersions, check_versions, recognized, requirements};
