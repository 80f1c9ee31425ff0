//! Pipeline orchestrator.
//!
//! Compiles requested programs in three steps:
//!
//! 1. resolve every requested name to a program declaration, failing before
//!    any work is scheduled;
//! 2. run one task per distinct vertex or fragment constituent on an
//!    [`Executor`]; a task computes the shader's referenced closure and
//!    topology, checks its versions and lowers it once per supported
//!    version;
//! 3. assemble each program from its constituents on the calling thread,
//!    intersecting their supported versions family by family.

use std::collections::{BTreeMap, BTreeSet};

use lumen_ast::{FragmentOutputKind, ProgramShader, ShaderKind, TypedProgram};
use lumen_core::{CompileError, GraphError, PipelineError, ShaderName, Type, Version};

use crate::config::CompilerConfig;
use crate::executor::{Cancellation, Executor, Task};
use crate::glsl::{GlslShader, ShaderStage};
use crate::lower::lower_shader;
use crate::references::ReferenceGraphs;
use crate::versions::{SupportedVersions, check_versions, recognized};

type Result<T> = std::result::Result<T, CompileError>;

/// One declared input, output or parameter of a compiled shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceVariable {
    pub name: String,
    pub ty: Type,
    /// Draw buffer index of a fragment colour output.
    pub index: Option<u32>,
}

impl InterfaceVariable {
    fn new(name: &str, ty: &Type) -> Self {
        Self {
            name: name.to_string(),
            ty: ty.clone(),
            index: None,
        }
    }
}

/// The declared interface of a shader, for the metadata encoder.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShaderInterface {
    pub inputs: Vec<InterfaceVariable>,
    pub outputs: Vec<InterfaceVariable>,
    pub parameters: Vec<InterfaceVariable>,
}

/// A shader lowered for every version it supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledShader {
    pub name: ShaderName,
    pub stage: ShaderStage,
    pub interface: ShaderInterface,
    pub supported: SupportedVersions,
    /// One output tree per supported version.
    pub sources: BTreeMap<Version, GlslShader>,
}

/// A program and the versions all of its constituents support.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledProgram {
    pub name: ShaderName,
    pub vertex: Vec<ShaderName>,
    pub fragment: ShaderName,
    pub versions: SupportedVersions,
}

/// Everything produced by one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompilationResult {
    pub vertex_shaders: BTreeMap<ShaderName, CompiledShader>,
    pub fragment_shaders: BTreeMap<ShaderName, CompiledShader>,
    pub programs: BTreeMap<ShaderName, CompiledProgram>,
}

impl CompilationResult {
    /// Look up a compiled vertex or fragment shader.
    pub fn shader(&self, name: &ShaderName) -> Option<&CompiledShader> {
        self.vertex_shaders
            .get(name)
            .or_else(|| self.fragment_shaders.get(name))
    }
}

/// Compiles programs of one typed program.
///
/// The typed program and its graphs are only read; a pipeline can run any
/// number of compilations.
#[derive(Debug)]
pub struct Pipeline<'p> {
    program: &'p TypedProgram,
    graphs: &'p ReferenceGraphs,
    config: CompilerConfig,
}

impl<'p> Pipeline<'p> {
    pub fn new(
        program: &'p TypedProgram,
        graphs: &'p ReferenceGraphs,
        config: CompilerConfig,
    ) -> Self {
        Self {
            program,
            graphs,
            config,
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile `programs` using `executor` for the per-shader tasks.
    pub fn compile<E: Executor>(
        &self,
        programs: &[ShaderName],
        executor: &E,
    ) -> Result<CompilationResult> {
        #[cfg(feature = "profiling")]
        profiling::scope!("Pipeline::compile");

        let resolved = programs
            .iter()
            .map(|name| Ok((name, self.resolve(name)?)))
            .collect::<Result<Vec<_>>>()?;
        let versions = recognized(&self.config.es, &self.config.full)?;

        let shaders: BTreeSet<&ShaderName> = resolved
            .iter()
            .flat_map(|(_, program)| program.constituents())
            .collect();
        log::debug!(
            "compiling {} programs with {} distinct shaders",
            resolved.len(),
            shaders.len()
        );

        let versions = &versions;
        let tasks: Vec<Task<'_, CompiledShader>> = shaders
            .into_iter()
            .map(|name| {
                Box::new(move |cancel: &Cancellation| self.compile_shader(name, versions, cancel))
                    as Task<'_, CompiledShader>
            })
            .collect();

        let compiled = executor.execute(tasks).map_err(|err| {
            if err.is_cancelled() {
                PipelineError::Interrupted.into()
            } else {
                err
            }
        })?;

        let mut result = CompilationResult::default();
        for shader in compiled {
            let map = match shader.stage {
                ShaderStage::Vertex => &mut result.vertex_shaders,
                ShaderStage::Fragment => &mut result.fragment_shaders,
            };
            map.insert(shader.name.clone(), shader);
        }

        for (name, program) in resolved {
            let compiled = self.assemble(name, program, &result)?;
            result.programs.insert(name.clone(), compiled);
        }

        log::info!(
            "compiled {} programs ({} vertex, {} fragment shaders)",
            result.programs.len(),
            result.vertex_shaders.len(),
            result.fragment_shaders.len()
        );
        Ok(result)
    }

    fn resolve(&self, name: &ShaderName) -> Result<&'p ProgramShader> {
        let siblings = || self.program.programs_in(name.module());
        match self.program.shader(name).map(|decl| &decl.kind) {
            Some(ShaderKind::Program(program)) => Ok(program),
            Some(other) => Err(PipelineError::NotAProgram {
                name: name.clone(),
                kind: other.kind_name(),
                programs: siblings(),
            }
            .into()),
            None => Err(PipelineError::ProgramDoesNotExist {
                name: name.clone(),
                programs: siblings(),
            }
            .into()),
        }
    }

    /// The per-shader task body.
    fn compile_shader(
        &self,
        name: &ShaderName,
        versions: &SupportedVersions,
        cancel: &Cancellation,
    ) -> Result<CompiledShader> {
        #[cfg(feature = "profiling")]
        profiling::scope!("compile_shader");

        cancel.check()?;
        log::debug!("compiling shader {name}");

        let referenced = self.graphs.referenced(name)?;
        let closure = self.graphs.topology(&referenced)?;
        cancel.check()?;

        let supported = check_versions(self.program, &closure, name, &versions.es, &versions.full)?;
        let mut sources = BTreeMap::new();
        for version in supported.iter() {
            cancel.check()?;
            sources.insert(
                version,
                lower_shader(self.program, &closure, name, version)?,
            );
        }

        let decl = self
            .program
            .shader(name)
            .ok_or_else(|| GraphError::MissingVertex {
                name: name.to_string(),
            })?;
        let (stage, interface) = match &decl.kind {
            ShaderKind::Vertex(v) => (ShaderStage::Vertex, ShaderInterface {
                inputs: v
                    .inputs
                    .iter()
                    .map(|p| InterfaceVariable::new(&p.name, &p.ty))
                    .collect(),
                outputs: v
                    .outputs
                    .iter()
                    .map(|o| InterfaceVariable::new(&o.name, &o.ty))
                    .collect(),
                parameters: v
                    .parameters
                    .iter()
                    .map(|p| InterfaceVariable::new(&p.name, &p.ty))
                    .collect(),
            }),
            ShaderKind::Fragment(f) => (ShaderStage::Fragment, ShaderInterface {
                inputs: f
                    .inputs
                    .iter()
                    .map(|p| InterfaceVariable::new(&p.name, &p.ty))
                    .collect(),
                outputs: f
                    .outputs
                    .iter()
                    .map(|o| InterfaceVariable {
                        index: match o.kind {
                            FragmentOutputKind::Color { index } => Some(index),
                            FragmentOutputKind::Depth => None,
                        },
                        ..InterfaceVariable::new(&o.name, &o.ty)
                    })
                    .collect(),
                parameters: f
                    .parameters
                    .iter()
                    .map(|p| InterfaceVariable::new(&p.name, &p.ty))
                    .collect(),
            }),
            ShaderKind::Program(_) => {
                return Err(PipelineError::NotAProgram {
                    name: name.clone(),
                    kind: decl.kind.kind_name(),
                    programs: Vec::new(),
                }
                .into());
            }
        };

        log::debug!(
            "shader {name}: {} versions lowered from a closure of {}",
            sources.len(),
            closure.len()
        );
        Ok(CompiledShader {
            name: name.clone(),
            stage,
            interface,
            supported,
            sources,
        })
    }

    fn assemble(
        &self,
        name: &ShaderName,
        program: &ProgramShader,
        compiled: &CompilationResult,
    ) -> Result<CompiledProgram> {
        let mut versions: Option<SupportedVersions> = None;
        for constituent in program.constituents() {
            let shader = compiled
                .shader(constituent)
                .ok_or_else(|| GraphError::MissingVertex {
                    name: constituent.to_string(),
                })?;
            versions = Some(match versions {
                Some(acc) => acc.intersect(&shader.supported),
                None => shader.supported.clone(),
            });
        }
        let versions = versions.unwrap_or_default();
        if versions.is_empty() {
            log::warn!("program {name} supports none of the requested versions");
        }

        Ok(CompiledProgram {
            name: name.clone(),
            vertex: program.vertex.clone(),
            fragment: program.fragment.clone(),
            versions,
        })
    }
}
