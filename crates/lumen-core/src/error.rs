//! Error types for every compilation phase.
//!
//! ## Error Hierarchy
//!
//! ```text
//! CompileError (top-level wrapper)
//! ├── TypeError      - type checking, one TypeErrorKind per cause
//! ├── GraphError     - reference graph contract violations
//! ├── VersionError   - unusable version configuration
//! ├── BackendError   - constructs with no encoding in a target version
//! └── PipelineError  - program lookup and worker pool failures
//! ```
//!
//! Wrapping is transparent: converting a phase error into a
//! [`CompileError`] keeps its kind and its message, so callers can always
//! match on the exact cause.

use thiserror::Error;

use crate::{ShaderName, Span, Version, VersionFamily};

// ============================================================================
// Type Errors
// ============================================================================

/// Categories of type errors.
///
/// Every rule of the type checker fails with its own kind so tools and tests
/// can assert the exact cause of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeErrorKind {
    // Application
    /// The callee of an application is not a function.
    ApplicationNotFunction,
    /// Argument count or argument types do not match the callee.
    ApplicationBadTypes,

    // Construction
    /// `new` was used with a type that has no constructors.
    NewNotConstructible,
    /// No constructor signature matches the argument types exactly.
    NewNoMatchingConstructor,

    // Records
    /// A record literal assigns a field the record does not declare.
    RecordFieldUnknown,
    /// A record literal leaves a declared field unassigned.
    RecordFieldNotAssigned,
    /// A record literal assigns a value of the wrong type to a field.
    RecordFieldBadType,
    /// A record literal assigns the same field more than once.
    RecordFieldDuplicate,
    /// A projection is applied to a non-record value.
    ProjectionNotRecord,
    /// A projection names a field the record does not declare.
    ProjectionNoSuchField,

    // Swizzles
    /// A swizzle is applied to a non-vector value.
    SwizzleNotVector,
    /// A swizzle selects more than four components.
    SwizzleTooManyFields,
    /// A swizzle names a component that does not exist.
    SwizzleBadField,

    // Values
    /// A value's ascribed type differs from its inferred type.
    ValueAscriptionMismatch,
    /// A value is bound to an expression of function type.
    ValueNonValueType,

    // Conditionals
    /// A conditional's condition is not boolean.
    ConditionNotBoolean,
    /// A conditional's branches have different types.
    ConditionBranchesIncompatible,

    // Functions
    /// A function body's type differs from the declared return type.
    FunctionBodyReturnIncompatible,

    // Shaders
    /// A shader output write has the wrong type.
    ShaderAssignmentBadType,
    /// A fragment discard condition is not boolean.
    ShaderDiscardNotBoolean,
    /// A vertex shader declares no main output.
    VertexMainMissing,
    /// A vertex shader declares more than one main output.
    VertexMainDuplicate,
    /// A vertex shader's main output is not a 4-wide float vector.
    VertexMainBadType,
    /// A program names a shader of the wrong kind.
    WrongShaderKind,
    /// A program's vertex outputs do not satisfy its fragment inputs.
    ShadersIncompatible,

    // Contract violations
    /// A name the resolver should have bound is missing.
    UnresolvedReference,
}

impl TypeErrorKind {
    /// Returns a human-readable name for this error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeErrorKind::ApplicationNotFunction => "application of non-function",
            TypeErrorKind::ApplicationBadTypes => "application argument mismatch",
            TypeErrorKind::NewNotConstructible => "type is not constructible",
            TypeErrorKind::NewNoMatchingConstructor => "no matching constructor",
            TypeErrorKind::RecordFieldUnknown => "unknown record field",
            TypeErrorKind::RecordFieldNotAssigned => "record field not assigned",
            TypeErrorKind::RecordFieldBadType => "record field has wrong type",
            TypeErrorKind::RecordFieldDuplicate => "record field assigned twice",
            TypeErrorKind::ProjectionNotRecord => "projection of non-record",
            TypeErrorKind::ProjectionNoSuchField => "projection of unknown field",
            TypeErrorKind::SwizzleNotVector => "swizzle of non-vector",
            TypeErrorKind::SwizzleTooManyFields => "swizzle has too many components",
            TypeErrorKind::SwizzleBadField => "swizzle component does not exist",
            TypeErrorKind::ValueAscriptionMismatch => "value ascription mismatch",
            TypeErrorKind::ValueNonValueType => "value of non-value type",
            TypeErrorKind::ConditionNotBoolean => "condition is not boolean",
            TypeErrorKind::ConditionBranchesIncompatible => "conditional branches differ",
            TypeErrorKind::FunctionBodyReturnIncompatible => "function body type mismatch",
            TypeErrorKind::ShaderAssignmentBadType => "shader assignment has wrong type",
            TypeErrorKind::ShaderDiscardNotBoolean => "discard condition is not boolean",
            TypeErrorKind::VertexMainMissing => "vertex shader has no main output",
            TypeErrorKind::VertexMainDuplicate => "vertex shader has several main outputs",
            TypeErrorKind::VertexMainBadType => "vertex main output has wrong type",
            TypeErrorKind::WrongShaderKind => "wrong shader kind",
            TypeErrorKind::ShadersIncompatible => "shaders incompatible",
            TypeErrorKind::UnresolvedReference => "unresolved reference",
        }
    }
}

impl std::fmt::Display for TypeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A type error with location and context.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {span}: {message}")]
pub struct TypeError {
    /// The category of this error.
    pub kind: TypeErrorKind,
    /// The source location where the error occurred.
    pub span: Span,
    /// A detailed error message.
    pub message: String,
}

impl TypeError {
    /// Create a new type error.
    pub fn new(kind: TypeErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }
}

// ============================================================================
// Graph Errors
// ============================================================================

/// Violations of the reference graph invariants.
///
/// The resolver guarantees an acyclic program in which every reference has a
/// declaration; these errors mean that guarantee was broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Inserting the edge would close a cycle.
    #[error("internal error: edge {from} -> {to} would create a cycle")]
    CycleDetected { from: String, to: String },

    /// A referenced name has no declaration.
    #[error("internal error: no declaration for referenced name {name}")]
    MissingVertex { name: String },
}

// ============================================================================
// Version Errors
// ============================================================================

/// Errors in the requested version configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// A requested family contains no version the compiler recognises.
    #[error("none of the requested {family} versions {requested:?} are recognised")]
    NoRecognizedVersions {
        family: VersionFamily,
        requested: Vec<u32>,
    },
}

// ============================================================================
// Backend Errors
// ============================================================================

/// Errors raised while lowering a shader for one target version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The shader cannot be produced for this version at all.
    #[error("shader {shader} does not support version {version}")]
    UnsupportedVersion { shader: ShaderName, version: Version },

    /// A construct in the shader has no encoding in this version.
    #[error("shader {shader}, version {version}: {message}")]
    UnsupportedConstruct {
        shader: ShaderName,
        version: Version,
        message: String,
    },
}

// ============================================================================
// Pipeline Errors
// ============================================================================

fn join_names(names: &[ShaderName]) -> String {
    if names.is_empty() {
        return "none".to_string();
    }
    names
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised by the pipeline orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// A requested program does not exist.
    #[error("program {name} does not exist (programs in module: {})", join_names(programs))]
    ProgramDoesNotExist {
        /// The requested name.
        name: ShaderName,
        /// The programs declared in the same module.
        programs: Vec<ShaderName>,
    },

    /// A requested name is a shader but not a program.
    #[error(
        "{name} is a {kind} shader, not a program (programs in module: {})",
        join_names(programs)
    )]
    NotAProgram {
        /// The requested name.
        name: ShaderName,
        /// What the name actually is.
        kind: &'static str,
        /// The programs declared in the same module.
        programs: Vec<ShaderName>,
    },

    /// A worker thread panicked while running a task.
    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: String },

    /// A worker thread could not be started.
    #[error("failed to spawn worker: {message}")]
    WorkerSpawn { message: String },

    /// Waiting for task results was interrupted.
    #[error("interrupted while waiting for shader tasks")]
    Interrupted,
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// The unified error type for all compilation phases.
///
/// Each variant uses `#[from]` to enable automatic conversion with the `?`
/// operator, and `#[error(transparent)]` so the inner error's message is
/// shown unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// A type error.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// A reference graph invariant violation.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A version configuration error.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// A lowering error.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// An orchestration error.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The task observed a cancellation request and stopped early.
    ///
    /// Only exchanged between tasks and the executor; never returned by the
    /// pipeline.
    #[error("task cancelled")]
    Cancelled,
}

impl CompileError {
    /// The type error kind, if this is a type error.
    pub fn type_error_kind(&self) -> Option<TypeErrorKind> {
        match self {
            CompileError::Type(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Check if this is a graph invariant violation.
    pub fn is_internal(&self) -> bool {
        matches!(self, CompileError::Graph(_))
    }

    /// Check if this is a cancellation marker.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CompileError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EsVersion, ModulePath};

    fn shader(name: &str) -> ShaderName {
        ShaderName::new(ModulePath::new("demo"), name)
    }

    #[test]
    fn type_error_display() {
        let err = TypeError::new(
            TypeErrorKind::ConditionNotBoolean,
            Span::new(4, 9, 1),
            "found 'integer'",
        );
        assert_eq!(
            err.to_string(),
            "condition is not boolean at 4:9: found 'integer'"
        );
    }

    #[test]
    fn compile_error_keeps_kind() {
        let err: CompileError =
            TypeError::new(TypeErrorKind::SwizzleBadField, Span::default(), "q").into();
        assert_eq!(err.type_error_kind(), Some(TypeErrorKind::SwizzleBadField));
        assert!(!err.is_internal());
    }

    #[test]
    fn transparent_display() {
        let err: CompileError = GraphError::MissingVertex {
            name: "demo.x".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "internal error: no declaration for referenced name demo.x"
        );
        assert!(err.is_internal());
    }

    #[test]
    fn program_lookup_lists_siblings() {
        let err = PipelineError::ProgramDoesNotExist {
            name: shader("missing"),
            programs: vec![shader("p"), shader("q")],
        };
        assert_eq!(
            err.to_string(),
            "program demo.missing does not exist (programs in module: demo.p, demo.q)"
        );

        let err = PipelineError::NotAProgram {
            name: shader("v"),
            kind: "vertex",
            programs: vec![],
        };
        assert_eq!(
            err.to_string(),
            "demo.v is a vertex shader, not a program (programs in module: none)"
        );
    }

    #[test]
    fn backend_error_display() {
        let err = BackendError::UnsupportedVersion {
            shader: shader("f"),
            version: Version::Es(EsVersion(100)),
        };
        assert_eq!(err.to_string(), "shader demo.f does not support version ES 100");
    }

    #[test]
    fn version_error_display() {
        let err = VersionError::NoRecognizedVersions {
            family: VersionFamily::Es,
            requested: vec![200],
        };
        assert_eq!(
            err.to_string(),
            "none of the requested ES versions [200] are recognised"
        );
    }
}
