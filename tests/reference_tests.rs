//! Referenced sets and topology over generated programs.

mod common;

use std::collections::BTreeSet;

use common::*;
use lumen::ast::{Expr, FragmentShader, Module, ShaderDecl, TermDecl};
use lumen::compiler::{Reference, ReferenceGraphs, lower_shader, term_symbol};
use lumen::core::{EsVersion, Version};

/// Terms `t0..t{n}`: each `t{i}` adds `t{i-1}` and `t{i/2}`. The fragment
/// shader reads `t{root}`; terms above `root` are unused.
fn chain(n: usize, root: usize) -> Module {
    let mut module = Module::new(path()).with_term(TermDecl::value(term("t0"), Expr::real(1.0)));
    for i in 1..=n {
        let add = Expr::construct(v4(), vec![
            Expr::global(term(&format!("t{}", i - 1))),
            Expr::global(term(&format!("t{}", i / 2))),
            Expr::real(0.0),
            Expr::real(1.0),
        ])
        .swizzle("x");
        module = module.with_term(TermDecl::value(term(&format!("t{i}")), add));
    }
    module.with_shader(ShaderDecl::fragment(
        shader("f"),
        FragmentShader::new()
            .output("colour", v4(), 0)
            .write("colour", splat(Expr::global(term(&format!("t{root}"))))),
    ))
}

/// The terms reachable from `t{root}`, computed from the generator's rule.
fn expected(root: usize) -> BTreeSet<Reference> {
    let mut seen = BTreeSet::new();
    let mut pending = vec![root];
    while let Some(i) = pending.pop() {
        if !seen.insert(i) {
            continue;
        }
        if i > 0 {
            pending.push(i - 1);
            pending.push(i / 2);
        }
    }
    seen.into_iter()
        .map(|i| Reference::Term(term(&format!("t{i}"))))
        .collect()
}

fn dependencies(i: usize) -> Vec<usize> {
    if i == 0 { Vec::new() } else { vec![i - 1, i / 2] }
}

#[test]
fn referenced_then_topology_is_a_valid_order_of_the_reachable_set() {
    for (n, root) in [(1, 1), (8, 5), (24, 24), (40, 17)] {
        let typed = typed(chain(n, root));
        let graphs = ReferenceGraphs::build(&typed).unwrap();

        let referenced = graphs.referenced(&shader("f")).unwrap();
        assert_eq!(referenced, expected(root));

        let order = graphs.topology(&referenced).unwrap();
        assert_eq!(order.len(), referenced.len());
        assert_eq!(order.iter().cloned().collect::<BTreeSet<_>>(), referenced);

        let position = |i: usize| {
            order
                .iter()
                .position(|r| *r == Reference::Term(term(&format!("t{i}"))))
                .unwrap()
        };
        for i in 0..=root {
            if !referenced.contains(&Reference::Term(term(&format!("t{i}")))) {
                continue;
            }
            for dependency in dependencies(i) {
                assert!(
                    position(dependency) < position(i),
                    "t{dependency} must precede t{i}"
                );
            }
        }
    }
}

#[test]
fn lowering_emits_exactly_the_closure() {
    let typed = typed(chain(12, 6));
    let graphs = ReferenceGraphs::build(&typed).unwrap();
    let closure = graphs
        .topology(&graphs.referenced(&shader("f")).unwrap())
        .unwrap();

    let lowered =
        lower_shader(&typed, &closure, &shader("f"), Version::Es(EsVersion(100))).unwrap();

    let expected: Vec<String> = closure
        .iter()
        .map(|r| match r {
            Reference::Term(name) => term_symbol(name),
            other => panic!("unexpected {other}"),
        })
        .collect();
    assert_eq!(lowered.declared_names().collect::<Vec<_>>(), expected);
}
