//! Lumen Core
//!
//! Shared vocabulary for the Lumen shader compiler crates.
//!
//! ## Modules
//!
//! - [`span`]: Source positions carried by tree nodes and errors
//! - [`name`]: Flattened (module-qualified) names for terms, types and shaders
//! - [`types`]: The closed type domain, constructor signatures and swizzles
//! - [`version`]: Target version identifiers and the per-version feature table
//! - [`error`]: Error types for every compilation phase

pub mod error;
pub mod name;
pub mod span;
pub mod types;
pub mod version;

pub use error::{
    BackendError, CompileError, GraphError, PipelineError, TypeError, TypeErrorKind,
    VersionError,
};
pub use name::{ModulePath, ShaderName, TermName, TypeName};
pub use span::Span;
pub use types::{
    Constructor, ElementKind, FunctionType, MatrixType, RecordField, RecordType, SamplerType,
    SwizzleError, Type, VectorType,
};
pub use version::{Availability, EsVersion, Features, FullVersion, Version, VersionFamily};
