//! End-to-end pipeline scenarios.

mod common;

use common::*;
use lumen::ast::{Expr, FragmentShader, Module, ShaderDecl, TermDecl, TypeExpr, VertexShader};
use lumen::compiler::{
    CompilerConfig, Pipeline, ReferenceGraphs, SupportedVersions, ThreadPoolExecutor,
};
use lumen::core::{
    CompileError, EsVersion, FullVersion, GraphError, PipelineError, TypeErrorKind, Version,
};
use pretty_assertions::assert_eq;

fn es(versions: &[u32]) -> std::collections::BTreeSet<EsVersion> {
    versions.iter().copied().map(EsVersion).collect()
}

fn full(versions: &[u32]) -> std::collections::BTreeSet<FullVersion> {
    versions.iter().copied().map(FullVersion).collect()
}

#[test]
fn program_compiles_for_the_shared_envelope() {
    init_logging();
    let config = CompilerConfig::new()
        .with_es_versions([100])
        .with_full_versions([330]);

    let result = lumen::compile(&program(scenario()), &[shader("p")], config).unwrap();

    let compiled = &result.programs[&shader("p")];
    let v = &result.vertex_shaders[&shader("v")];
    let f = &result.fragment_shaders[&shader("f")];
    assert_eq!(compiled.versions, v.supported.intersect(&f.supported));
    assert_eq!(compiled.versions, SupportedVersions::new(es(&[100]), full(&[330])));

    assert_eq!(
        v.sources.keys().copied().collect::<Vec<_>>(),
        [
            Version::Es(EsVersion(100)),
            Version::Full(FullVersion(330))
        ]
    );
}

#[test]
fn nonexistent_program_never_reaches_the_executor() {
    let typed = typed(scenario());
    let graphs = ReferenceGraphs::build(&typed).unwrap();
    let executor = CountingExecutor::default();

    let err = Pipeline::new(&typed, &graphs, CompilerConfig::default())
        .compile(&[shader("p"), shader("nope")], &executor)
        .unwrap_err();

    assert_eq!(
        err,
        CompileError::from(PipelineError::ProgramDoesNotExist {
            name: shader("nope"),
            programs: vec![shader("p")],
        })
    );
    assert_eq!(executor.calls(), 0);
}

#[test]
fn failing_task_cancels_its_siblings() {
    init_logging();
    let mut typed = typed(scenario());
    typed
        .modules
        .get_mut(&path())
        .unwrap()
        .terms
        .retain(|t| t.name != term("brightness"));
    let graphs = ReferenceGraphs::build(&typed).unwrap();

    let err = Pipeline::new(&typed, &graphs, CompilerConfig::default())
        .compile(&[shader("p")], &ThreadPoolExecutor::new(2))
        .unwrap_err();

    assert!(err.is_internal());
    assert_eq!(
        err,
        CompileError::from(GraphError::MissingVertex {
            name: "demo.brightness".into()
        })
    );
}

/// Vertex shader `v` reads an integer input (ES 300+, full 130+); fragment
/// shader `f` writes depth (ES 300+, every full version).
fn gated() -> Module {
    Module::new(path())
        .with_shader(ShaderDecl::vertex(
            shader("v"),
            VertexShader::new()
                .input("vertex", v4())
                .input("instance", TypeExpr::Integer)
                .main_output("position", v4())
                .write("position", Expr::local("vertex")),
        ))
        .with_shader(ShaderDecl::fragment(
            shader("f"),
            FragmentShader::new()
                .output("colour", v4(), 0)
                .depth_output("depth")
                .write("colour", splat(Expr::real(1.0)))
                .write("depth", Expr::real(0.5)),
        ))
        .with_shader(ShaderDecl::program(shader("p"), vec![shader("v")], shader("f")))
}

#[test]
fn program_versions_are_the_per_family_intersection() {
    let envelopes = [
        (vec![100, 300], vec![120, 130, 330]),
        (vec![100], vec![110, 120]),
        (vec![], vec![460]),
        (vec![300, 310, 320], vec![]),
    ];

    for (es_versions, full_versions) in envelopes {
        let config = CompilerConfig::new()
            .with_es_versions(es_versions.clone())
            .with_full_versions(full_versions.clone())
            .with_workers(2);
        let result = lumen::compile(&program(gated()), &[shader("p")], config).unwrap();

        let v = &result.vertex_shaders[&shader("v")].supported;
        let f = &result.fragment_shaders[&shader("f")].supported;
        let expected = SupportedVersions::new(
            v.es.intersection(&f.es).copied().collect(),
            v.full.intersection(&f.full).copied().collect(),
        );
        assert_eq!(
            result.programs[&shader("p")].versions,
            expected,
            "envelope {es_versions:?} / {full_versions:?}"
        );
    }
}

#[test]
fn feature_gates_select_versions() {
    let config = CompilerConfig::new()
        .with_es_versions([100, 300])
        .with_full_versions([120, 130, 330]);
    let result = lumen::compile(&program(gated()), &[shader("p")], config).unwrap();

    assert_eq!(
        result.vertex_shaders[&shader("v")].supported,
        SupportedVersions::new(es(&[300]), full(&[130, 330]))
    );
    assert_eq!(
        result.fragment_shaders[&shader("f")].supported,
        SupportedVersions::new(es(&[300]), full(&[120, 130, 330]))
    );
    assert_eq!(
        result.programs[&shader("p")].versions,
        SupportedVersions::new(es(&[300]), full(&[130, 330]))
    );
}

#[test]
fn empty_intersection_is_not_an_error() {
    let config = CompilerConfig::new()
        .with_es_versions([100])
        .with_full_versions([]);
    let result = lumen::compile(&program(gated()), &[shader("p")], config).unwrap();
    assert!(result.programs[&shader("p")].versions.is_empty());
}

#[test]
fn shared_constituents_compile_once() {
    let module = scenario().with_shader(ShaderDecl::program(
        shader("q"),
        vec![shader("v")],
        shader("f"),
    ));
    let result = lumen::compile(
        &program(module),
        &[shader("p"), shader("q")],
        CompilerConfig::default(),
    )
    .unwrap();

    assert_eq!(result.programs.len(), 2);
    assert_eq!(result.vertex_shaders.len(), 1);
    assert_eq!(result.fragment_shaders.len(), 1);
}

#[test]
fn type_errors_stop_the_pipeline() {
    let module = scenario().with_term(TermDecl::value(
        term("bad"),
        Expr::conditional(Expr::integer(1), Expr::real(1.0), Expr::real(2.0)),
    ));
    let err = lumen::compile(&program(module), &[shader("p")], CompilerConfig::default())
        .unwrap_err();
    assert_eq!(err.type_error_kind(), Some(TypeErrorKind::ConditionNotBoolean));
}
