//! Lumen
//!
//! A compiler core for the Lumen shader language. Takes a fully resolved
//! program, type checks it, and lowers each requested shader program to a
//! GLSL-like output tree for every target version it can support.
//!
//! ```ignore
//! use lumen::prelude::*;
//!
//! let programs = [ShaderName::parse("demo.p").unwrap()];
//! let result = lumen::compile(&program, &programs, CompilerConfig::default())?;
//! for (name, program) in &result.programs {
//!     println!("{name}: {:?}", program.versions);
//! }
//! ```

pub use lumen_ast as ast;
pub use lumen_compiler as compiler;
pub use lumen_core as core;

pub use lumen_compiler::{CompilationResult, CompilerConfig};
pub use lumen_core::{CompileError, ShaderName};

pub mod prelude {
    pub use lumen_ast::{Module, Program, TypedProgram};
    pub use lumen_compiler::{
        CompilationResult, CompiledProgram, CompiledShader, CompilerConfig, Executor, GlslShader,
        Pipeline, ReferenceGraphs, SequentialExecutor, ThreadPoolExecutor,
    };
    pub use lumen_core::{
        CompileError, EsVersion, FullVersion, ModulePath, ShaderName, Type, Version,
    };
}

use lumen_ast::Program;
use lumen_compiler::{Pipeline, ReferenceGraphs, ThreadPoolExecutor, check_program};

/// Type check `resolved`, build its reference graphs and compile `programs`
/// on a worker pool sized by `config`.
pub fn compile(
    resolved: &Program,
    programs: &[ShaderName],
    config: CompilerConfig,
) -> Result<CompilationResult, CompileError> {
    #[cfg(feature = "profiling")]
    profiling::scope!("lumen::compile");

    let typed = check_program(resolved)?;
    log::debug!("type checked {} modules", typed.modules().count());

    let graphs = ReferenceGraphs::build(&typed)?;
    let executor = ThreadPoolExecutor::new(config.workers);
    Pipeline::new(&typed, &graphs, config).compile(programs, &executor)
}
