//! Version checker.
//!
//! Decides which of the requested target versions a shader can legally be
//! compiled for. A shader's [`Requirements`] are the capabilities its own
//! interface and body need plus the availability of every external function
//! in its referenced closure; a version is supported when its feature set
//! covers them.

use std::collections::BTreeSet;

use lumen_ast::{
    Expr, ExprKind, FragmentLocal, FragmentOutputKind, FunctionBody, ShaderKind, TermKind,
    TypedProgram,
};
use lumen_core::{
    Availability, CompileError, EsVersion, Features, FullVersion, GraphError, ShaderName,
    TermName, Type, VectorType, Version, VersionError, VersionFamily,
};

use crate::references::Reference;

/// The versions of each family a shader or program supports.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SupportedVersions {
    pub es: BTreeSet<EsVersion>,
    pub full: BTreeSet<FullVersion>,
}

impl SupportedVersions {
    pub fn new(es: BTreeSet<EsVersion>, full: BTreeSet<FullVersion>) -> Self {
        Self { es, full }
    }

    /// Intersect each family independently.
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            es: self.es.intersection(&other.es).copied().collect(),
            full: self.full.intersection(&other.full).copied().collect(),
        }
    }

    /// Every version, ES before full, each family ascending.
    pub fn iter(&self) -> impl Iterator<Item = Version> + '_ {
        self.es
            .iter()
            .copied()
            .map(Version::Es)
            .chain(self.full.iter().copied().map(Version::Full))
    }

    pub fn contains(&self, version: Version) -> bool {
        match version {
            Version::Es(v) => self.es.contains(&v),
            Version::Full(v) => self.full.contains(&v),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.es.is_empty() && self.full.is_empty()
    }

    pub fn len(&self) -> usize {
        self.es.len() + self.full.len()
    }
}

/// What a shader needs from a target version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirements {
    pub features: Features,
    /// External functions in the closure and where they exist.
    pub externals: Vec<(TermName, Availability)>,
}

impl Requirements {
    /// Whether `version` is recognised and provides everything required.
    pub fn supports(&self, version: Version) -> bool {
        version
            .features()
            .is_some_and(|features| features.contains(self.features))
            && self.externals.iter().all(|(_, a)| a.includes(version))
    }
}

/// The recognised subset of the requested versions.
///
/// A family that was requested but contains no recognised version is a
/// configuration error; unrecognised versions next to recognised ones are
/// ignored with a warning. An empty request for a family is not an error.
pub fn recognized(
    es: &BTreeSet<EsVersion>,
    full: &BTreeSet<FullVersion>,
) -> Result<SupportedVersions, VersionError> {
    let es = filter_family(es, VersionFamily::Es, EsVersion::is_recognized, |v: EsVersion| v.0)?;
    let full = filter_family(
        full,
        VersionFamily::Full,
        FullVersion::is_recognized,
        |v: FullVersion| v.0,
    )?;
    Ok(SupportedVersions { es, full })
}

fn filter_family<V: Copy + Ord + std::fmt::Display>(
    requested: &BTreeSet<V>,
    family: VersionFamily,
    is_recognized: impl Fn(V) -> bool,
    number: impl Fn(V) -> u32,
) -> Result<BTreeSet<V>, VersionError> {
    let (known, unknown): (BTreeSet<V>, BTreeSet<V>) =
        requested.iter().copied().partition(|v| is_recognized(*v));
    if !requested.is_empty() && known.is_empty() {
        return Err(VersionError::NoRecognizedVersions {
            family,
            requested: requested.iter().copied().map(number).collect(),
        });
    }
    for v in unknown {
        log::warn!("ignoring unrecognised version {v}");
    }
    Ok(known)
}

/// The requirements of `shader` given its referenced `closure`.
pub fn requirements(
    program: &TypedProgram,
    closure: &[Reference],
    shader: &ShaderName,
) -> Result<Requirements, GraphError> {
    let decl = program.shader(shader).ok_or_else(|| GraphError::MissingVertex {
        name: shader.to_string(),
    })?;

    let mut features = Features::empty();
    let mut bodies: Vec<&Expr<Type>> = Vec::new();

    match &decl.kind {
        ShaderKind::Vertex(v) => {
            if v.inputs.iter().any(|i| i.ty.is_integral()) {
                features |= Features::INTEGER_VERTEX_INPUTS;
            }
            if v.outputs.iter().any(|o| !o.main && o.ty.is_integral()) {
                features |= Features::FLAT_VARYINGS;
            }
            bodies.extend(v.locals.iter().map(|l| &l.value));
            bodies.extend(v.writes.iter().map(|w| &w.value));
        }
        ShaderKind::Fragment(f) => {
            if f.inputs.iter().any(|i| i.ty.is_integral()) {
                features |= Features::FLAT_VARYINGS;
            }
            let colours: Vec<_> = f
                .outputs
                .iter()
                .filter_map(|o| match o.kind {
                    FragmentOutputKind::Color { index } => Some((index, &o.ty)),
                    FragmentOutputKind::Depth => None,
                })
                .collect();
            if colours.len() > 1 || colours.iter().any(|(index, _)| *index > 0) {
                features |= Features::MULTIPLE_DRAW_BUFFERS;
            }
            if colours
                .iter()
                .any(|(_, ty)| **ty != Type::Vector(VectorType::Vector4F))
            {
                features |= Features::FRAGMENT_OUTPUT_DECLARATIONS;
            }
            if f.outputs.iter().any(|o| o.kind == FragmentOutputKind::Depth) {
                features |= Features::FRAGMENT_DEPTH;
            }
            for local in &f.locals {
                match local {
                    FragmentLocal::Value(l) => bodies.push(&l.value),
                    FragmentLocal::Discard { condition, .. } => bodies.push(condition),
                }
            }
            bodies.extend(f.writes.iter().map(|w| &w.value));
        }
        ShaderKind::Program(_) => {}
    }

    let mut externals = Vec::new();
    for reference in closure {
        let Reference::Term(name) = reference else {
            continue;
        };
        let term = program.term(name).ok_or_else(|| GraphError::MissingVertex {
            name: name.to_string(),
        })?;
        match &term.kind {
            TermKind::Value { value, .. } => bodies.push(value),
            TermKind::Function {
                body: FunctionBody::Expr(body),
                ..
            } => bodies.push(body),
            TermKind::Function {
                body: FunctionBody::External(ext),
                ..
            } => externals.push((name.clone(), ext.availability)),
        }
    }

    if bodies.iter().any(|b| constructs_matrix_from_matrix(b)) {
        features |= Features::MATRIX_FROM_MATRIX;
    }

    Ok(Requirements {
        features,
        externals,
    })
}

fn constructs_matrix_from_matrix(expr: &Expr<Type>) -> bool {
    let mut found = false;
    expr.walk(&mut |node| {
        if let ExprKind::New { args, .. } = &node.kind {
            if node.ty.as_matrix().is_some()
                && args.len() == 1
                && args[0].ty.as_matrix().is_some()
            {
                found = true;
            }
        }
    });
    found
}

/// The requested versions `shader` supports.
pub fn check_versions(
    program: &TypedProgram,
    closure: &[Reference],
    shader: &ShaderName,
    es: &BTreeSet<EsVersion>,
    full: &BTreeSet<FullVersion>,
) -> Result<SupportedVersions, CompileError> {
    let candidates = recognized(es, full)?;
    let requirements = requirements(program, closure, shader)?;

    let supported = SupportedVersions {
        es: candidates
            .es
            .into_iter()
            .filter(|v| requirements.supports(Version::Es(*v)))
            .collect(),
        full: candidates
            .full
            .into_iter()
            .filter(|v| requirements.supports(Version::Full(*v)))
            .collect(),
    };
    log::debug!(
        "shader {shader} supports {} of the requested versions (requires {:?})",
        supported.len(),
        requirements.features
    );
    Ok(supported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_ast::{
        ExternalDecl, FragmentShader, Module, Parameter, Program, ShaderDecl, TermDecl, TypeExpr,
        VertexShader,
    };
    use lumen_core::{MatrixType, ModulePath};

    use crate::check::check_program;
    use crate::references::ReferenceGraphs;

    fn path() -> ModulePath {
        ModulePath::new("demo")
    }

    fn es(versions: &[u32]) -> BTreeSet<EsVersion> {
        versions.iter().copied().map(EsVersion).collect()
    }

    fn full(versions: &[u32]) -> BTreeSet<FullVersion> {
        versions.iter().copied().map(FullVersion).collect()
    }

    fn v4() -> TypeExpr {
        TypeExpr::Vector(VectorType::Vector4F)
    }

    fn supported(module: Module, shader: &str) -> SupportedVersions {
        let program: Program = [module].into_iter().collect();
        let typed = check_program(&program).unwrap();
        let graphs = ReferenceGraphs::build(&typed).unwrap();
        let name = ShaderName::new(path(), shader);
        let closure = graphs.topology(&graphs.referenced(&name).unwrap()).unwrap();
        check_versions(
            &typed,
            &closure,
            &name,
            &es(&[100, 300]),
            &full(&[110, 120, 130, 330]),
        )
        .unwrap()
    }

    fn fragment(shader: FragmentShader) -> Module {
        Module::new(path()).with_shader(ShaderDecl::fragment(ShaderName::new(path(), "f"), shader))
    }

    #[test]
    fn intersection_is_per_family() {
        let a = SupportedVersions::new(es(&[100, 300]), full(&[120, 330]));
        let b = SupportedVersions::new(es(&[300]), full(&[110, 120]));
        assert_eq!(a.intersect(&b), SupportedVersions::new(es(&[300]), full(&[120])));
    }

    #[test]
    fn unrecognised_family_is_an_error() {
        let err = recognized(&es(&[200]), &full(&[330])).unwrap_err();
        assert_eq!(
            err,
            VersionError::NoRecognizedVersions {
                family: VersionFamily::Es,
                requested: vec![200]
            }
        );
    }

    #[test]
    fn unrecognised_versions_next_to_known_ones_are_dropped() {
        let versions = recognized(&es(&[100, 200]), &BTreeSet::new()).unwrap();
        assert_eq!(versions.es, es(&[100]));
        assert!(versions.full.is_empty());
    }

    #[test]
    fn simple_fragment_supports_everything() {
        let f = FragmentShader::new()
            .output("colour", v4(), 0)
            .write("colour", Expr::construct(v4(), vec![
                Expr::real(1.0),
                Expr::real(1.0),
                Expr::real(1.0),
                Expr::real(1.0),
            ]));
        let s = supported(fragment(f), "f");
        assert_eq!(s.es, es(&[100, 300]));
        assert_eq!(s.full, full(&[110, 120, 130, 330]));
    }

    #[test]
    fn non_vec4_colour_needs_declared_outputs() {
        let f = FragmentShader::new().output("colour", TypeExpr::Float, 0);
        let s = supported(fragment(f), "f");
        assert_eq!(s.es, es(&[300]));
        assert_eq!(s.full, full(&[130, 330]));
    }

    #[test]
    fn depth_and_draw_buffers() {
        let f = FragmentShader::new()
            .output("colour", v4(), 1)
            .depth_output("depth");
        let s = supported(fragment(f), "f");
        assert_eq!(s.es, es(&[300]));
        assert_eq!(s.full, full(&[110, 120, 130, 330]));
    }

    #[test]
    fn integer_vertex_inputs() {
        let v = VertexShader::new()
            .input("id", TypeExpr::Integer)
            .main_output("clip", v4());
        let module =
            Module::new(path()).with_shader(ShaderDecl::vertex(ShaderName::new(path(), "v"), v));
        let s = supported(module, "v");
        assert_eq!(s.es, es(&[300]));
        assert_eq!(s.full, full(&[130, 330]));
    }

    #[test]
    fn matrix_from_matrix() {
        let m3 = TypeExpr::Matrix(MatrixType::Matrix3x3F);
        let m4 = TypeExpr::Matrix(MatrixType::Matrix4x4F);
        let v = VertexShader::new()
            .parameter("model", m4)
            .main_output("clip", v4())
            .local(lumen_ast::LocalValue::new(
                "normal_matrix",
                Expr::construct(m3, vec![Expr::local("model")]),
            ));
        let module =
            Module::new(path()).with_shader(ShaderDecl::vertex(ShaderName::new(path(), "v"), v));
        let s = supported(module, "v");
        assert_eq!(s.es, es(&[300]));
        assert_eq!(s.full, full(&[120, 130, 330]));
    }

    #[test]
    fn external_availability_limits_versions() {
        let texel_fetch = TermName::new(path(), "texel");
        let module = Module::new(path())
            .with_term(TermDecl::external(
                texel_fetch.clone(),
                vec![Parameter::new("x", TypeExpr::Float)],
                TypeExpr::Float,
                ExternalDecl::new("texelFetch")
                    .available(Availability::since(Some(EsVersion(300)), Some(FullVersion(130)))),
            ))
            .with_shader(ShaderDecl::fragment(
                ShaderName::new(path(), "f"),
                FragmentShader::new().output("colour", v4(), 0).write(
                    "colour",
                    Expr::construct(v4(), vec![
                        Expr::apply(texel_fetch, vec![Expr::real(0.0)]),
                        Expr::real(0.0),
                        Expr::real(0.0),
                        Expr::real(1.0),
                    ]),
                ),
            ));
        let s = supported(module, "f");
        assert_eq!(s.es, es(&[300]));
        assert_eq!(s.full, full(&[130, 330]));
    }
}
