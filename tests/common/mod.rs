//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use lumen::ast::{
    Expr, FragmentShader, Module, Program, ShaderDecl, TermDecl, TypeExpr, TypedProgram,
    VertexShader,
};
use lumen::compiler::{Executor, SequentialExecutor, Task, check_program};
use lumen::core::{CompileError, ModulePath, ShaderName, TermName, TypeName, VectorType};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn path() -> ModulePath {
    ModulePath::new("demo")
}

pub fn shader(name: &str) -> ShaderName {
    ShaderName::new(path(), name)
}

pub fn term(name: &str) -> TermName {
    TermName::new(path(), name)
}

pub fn record(name: &str) -> TypeName {
    TypeName::new(path(), name)
}

pub fn v4() -> TypeExpr {
    TypeExpr::Vector(VectorType::Vector4F)
}

pub fn program(module: Module) -> Program {
    [module].into_iter().collect()
}

pub fn typed(module: Module) -> TypedProgram {
    check_program(&program(module)).expect("fixture should type check")
}

/// `vec4(x, x, x, 1.0)`
pub fn splat(x: Expr) -> Expr {
    Expr::construct(v4(), vec![x.clone(), x.clone(), x, Expr::real(1.0)])
}

/// Vertex shader `v` passes its `position` input through as the main
/// output; fragment shader `f` reads `position` and writes one colour;
/// program `p` combines them.
pub fn scenario() -> Module {
    Module::new(path())
        .with_term(TermDecl::value(term("brightness"), Expr::real(0.5)))
        .with_shader(ShaderDecl::vertex(
            shader("v"),
            VertexShader::new()
                .input("vertex", v4())
                .main_output("position", v4())
                .write("position", Expr::local("vertex")),
        ))
        .with_shader(ShaderDecl::fragment(
            shader("f"),
            FragmentShader::new()
                .input("position", v4())
                .output("colour", v4(), 0)
                .write("colour", splat(Expr::global(term("brightness")))),
        ))
        .with_shader(ShaderDecl::program(shader("p"), vec![shader("v")], shader("f")))
}

/// An executor that counts its invocations and runs tasks inline.
#[derive(Default)]
pub struct CountingExecutor {
    pub calls: AtomicUsize,
}

impl CountingExecutor {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Executor for CountingExecutor {
    fn execute<'env, T: Send + 'env>(
        &self,
        tasks: Vec<Task<'env, T>>,
    ) -> Result<Vec<T>, CompileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        SequentialExecutor.execute(tasks)
    }
}
