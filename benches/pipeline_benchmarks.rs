//! Benchmarks for the Lumen compilation pipeline.
//!
//! Each workload is a generated module with `n` programs. Every program has
//! its own vertex and fragment shader over a shared chain of helper terms,
//! so the pipeline schedules `2n` shader tasks.
//!
//! ```bash
//! cargo bench --bench pipeline_benchmarks
//! cargo bench --features profiling --bench pipeline_benchmarks
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use lumen::ast::{
    Expr, FragmentShader, Module, Program, ShaderDecl, TermDecl, TypeExpr, VertexShader,
};
use lumen::compiler::{
    CompilerConfig, Pipeline, ReferenceGraphs, SequentialExecutor, ThreadPoolExecutor,
    check_program,
};
use lumen::core::{ModulePath, ShaderName, TermName, VectorType};
use std::hint::black_box;

const HELPERS: usize = 32;

fn workload(programs: usize) -> (Program, Vec<ShaderName>) {
    let path = ModulePath::new("bench");
    let term = |n: String| TermName::new(path.clone(), n);
    let shader = |n: String| ShaderName::new(path.clone(), n);
    let v4 = TypeExpr::Vector(VectorType::Vector4F);
    let splat = |x: Expr| {
        Expr::construct(v4.clone(), vec![x.clone(), x.clone(), x, Expr::real(1.0)])
    };

    let mut module = Module::new(path.clone())
        .with_term(TermDecl::value(term("h0".into()), Expr::real(0.5)));
    for i in 1..HELPERS {
        module = module.with_term(TermDecl::value(
            term(format!("h{i}")),
            splat(Expr::global(term(format!("h{}", i - 1)))).swizzle("y"),
        ));
    }

    let mut names = Vec::with_capacity(programs);
    for p in 0..programs {
        let helper = term(format!("h{}", p % HELPERS));
        module = module
            .with_shader(ShaderDecl::vertex(
                shader(format!("v{p}")),
                VertexShader::new()
                    .input("vertex", v4.clone())
                    .main_output("position", v4.clone())
                    .output("shade", TypeExpr::Float)
                    .write("position", Expr::local("vertex"))
                    .write("shade", Expr::global(helper.clone())),
            ))
            .with_shader(ShaderDecl::fragment(
                shader(format!("f{p}")),
                FragmentShader::new()
                    .input("shade", TypeExpr::Float)
                    .output("colour", v4.clone(), 0)
                    .write("colour", splat(Expr::local("shade"))),
            ))
            .with_shader(ShaderDecl::program(
                shader(format!("p{p}")),
                vec![shader(format!("v{p}"))],
                shader(format!("f{p}")),
            ));
        names.push(shader(format!("p{p}")));
    }

    ([module].into_iter().collect(), names)
}

fn bench_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("check");
    for programs in [4, 32, 128] {
        let (program, _) = workload(programs);
        group.throughput(Throughput::Elements(programs as u64));
        group.bench_with_input(BenchmarkId::from_parameter(programs), &program, |b, program| {
            b.iter(|| check_program(black_box(program)).unwrap())
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    for programs in [4, 32, 128] {
        let (program, names) = workload(programs);
        let typed = check_program(&program).unwrap();
        let graphs = ReferenceGraphs::build(&typed).unwrap();
        let pipeline = Pipeline::new(&typed, &graphs, CompilerConfig::default());
        group.throughput(Throughput::Elements(programs as u64));

        group.bench_with_input(BenchmarkId::new("sequential", programs), &names, |b, names| {
            b.iter(|| pipeline.compile(black_box(names), &SequentialExecutor).unwrap())
        });
        let pool = ThreadPoolExecutor::default();
        group.bench_with_input(BenchmarkId::new("thread_pool", programs), &names, |b, names| {
            b.iter(|| pipeline.compile(black_box(names), &pool).unwrap())
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let (program, names) = workload(32);
    c.bench_function("compile_32_programs", |b| {
        b.iter(|| lumen::compile(black_box(&program), &names, CompilerConfig::default()).unwrap())
    });
}

criterion_group!(benches, bench_check, bench_pipeline, bench_end_to_end);
criterion_main!(benches);
