//! The version-specific output tree.
//!
//! One [`GlslShader`] is produced per shader and target version. The tree
//! is already in the target's surface syntax (qualifiers, built-in names,
//! declaration order); turning it into text is the pretty-printer's job.

use lumen_core::{MatrixType, SamplerType, Type, VectorType, Version};
use ordered_float::OrderedFloat;

/// Which pipeline stage a shader runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// One shader lowered for one version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlslShader {
    pub version: Version,
    pub stage: ShaderStage,
    /// Declarations in emission order; `main` is last.
    pub declarations: Vec<GlslDecl>,
}

impl GlslShader {
    /// The names of all declared globals, in order.
    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        self.declarations.iter().filter_map(GlslDecl::name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GlslType {
    Bool,
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    IVec2,
    IVec3,
    IVec4,
    Mat3,
    Mat4,
    Sampler2D,
    SamplerCube,
    /// A struct declared earlier in the shader.
    Struct(String),
}

impl GlslType {
    /// The target-language spelling of the type.
    pub fn name(&self) -> &str {
        match self {
            GlslType::Bool => "bool",
            GlslType::Int => "int",
            GlslType::Float => "float",
            GlslType::Vec2 => "vec2",
            GlslType::Vec3 => "vec3",
            GlslType::Vec4 => "vec4",
            GlslType::IVec2 => "ivec2",
            GlslType::IVec3 => "ivec3",
            GlslType::IVec4 => "ivec4",
            GlslType::Mat3 => "mat3",
            GlslType::Mat4 => "mat4",
            GlslType::Sampler2D => "sampler2D",
            GlslType::SamplerCube => "samplerCube",
            GlslType::Struct(name) => name,
        }
    }

    pub fn vector(vector: VectorType) -> Self {
        match vector {
            VectorType::Vector2F => GlslType::Vec2,
            VectorType::Vector3F => GlslType::Vec3,
            VectorType::Vector4F => GlslType::Vec4,
            VectorType::Vector2I => GlslType::IVec2,
            VectorType::Vector3I => GlslType::IVec3,
            VectorType::Vector4I => GlslType::IVec4,
        }
    }

    pub fn matrix(matrix: MatrixType) -> Self {
        match matrix {
            MatrixType::Matrix3x3F => GlslType::Mat3,
            MatrixType::Matrix4x4F => GlslType::Mat4,
        }
    }

    pub fn sampler(sampler: SamplerType) -> Self {
        match sampler {
            SamplerType::Sampler2D => GlslType::Sampler2D,
            SamplerType::SamplerCube => GlslType::SamplerCube,
        }
    }

    /// The output type of a value type; `None` for function types.
    ///
    /// `record_name` maps a record to its declared struct name.
    pub fn of(ty: &Type, record_name: impl Fn(&lumen_core::TypeName) -> String) -> Option<Self> {
        Some(match ty {
            Type::Boolean => GlslType::Bool,
            Type::Integer => GlslType::Int,
            Type::Float => GlslType::Float,
            Type::Vector(v) => GlslType::vector(*v),
            Type::Matrix(m) => GlslType::matrix(*m),
            Type::Sampler(s) => GlslType::sampler(*s),
            Type::Record(r) => GlslType::Struct(record_name(&r.name)),
            Type::Function(_) => return None,
        })
    }
}

/// Interface storage qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageQualifier {
    /// Pre-`in`/`out` vertex input.
    Attribute,
    /// Pre-`in`/`out` vertex output or fragment input.
    Varying,
    In,
    Out,
}

impl StorageQualifier {
    pub fn keyword(self) -> &'static str {
        match self {
            StorageQualifier::Attribute => "attribute",
            StorageQualifier::Varying => "varying",
            StorageQualifier::In => "in",
            StorageQualifier::Out => "out",
        }
    }
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GlslDecl {
    /// `precision highp <ty>;`
    Precision { ty: GlslType },
    Struct {
        name: String,
        fields: Vec<(String, GlslType)>,
    },
    /// `const <ty> <name> = <value>;`
    Constant {
        name: String,
        ty: GlslType,
        value: GlslExpr,
    },
    Function {
        name: String,
        params: Vec<(String, GlslType)>,
        returns: GlslType,
        body: Vec<GlslStmt>,
    },
    /// An interface variable (`attribute`, `varying`, `in` or `out`).
    Interface {
        qualifier: StorageQualifier,
        name: String,
        ty: GlslType,
        /// `flat` interpolation, required for integer varyings.
        flat: bool,
        /// `layout(location = N)`.
        location: Option<u32>,
    },
    Uniform {
        name: String,
        ty: GlslType,
    },
    /// `void main() { ... }`
    Main { body: Vec<GlslStmt> },
}

impl GlslDecl {
    /// The declared name, for declarations that introduce one.
    pub fn name(&self) -> Option<&str> {
        match self {
            GlslDecl::Precision { .. } | GlslDecl::Main { .. } => None,
            GlslDecl::Struct { name, .. }
            | GlslDecl::Constant { name, .. }
            | GlslDecl::Function { name, .. }
            | GlslDecl::Interface { name, .. }
            | GlslDecl::Uniform { name, .. } => Some(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GlslStmt {
    /// `<ty> <name> [= <value>];`
    Local {
        name: String,
        ty: GlslType,
        value: Option<GlslExpr>,
    },
    Assign {
        target: GlslExpr,
        value: GlslExpr,
    },
    If {
        condition: GlslExpr,
        then_branch: Vec<GlslStmt>,
        else_branch: Vec<GlslStmt>,
    },
    Discard,
    Return(GlslExpr),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GlslExpr {
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    /// A variable, constant or built-in variable such as `gl_Position`.
    Var(String),
    /// A function call or constructor.
    Call { name: String, args: Vec<GlslExpr> },
    Field { expr: Box<GlslExpr>, field: String },
    Swizzle { expr: Box<GlslExpr>, components: String },
    Index { expr: Box<GlslExpr>, index: u32 },
    Ternary {
        condition: Box<GlslExpr>,
        then_branch: Box<GlslExpr>,
        else_branch: Box<GlslExpr>,
    },
}

impl GlslExpr {
    pub fn var(name: impl Into<String>) -> Self {
        GlslExpr::Var(name.into())
    }

    pub fn call(name: impl Into<String>, args: Vec<GlslExpr>) -> Self {
        GlslExpr::Call {
            name: name.into(),
            args,
        }
    }
}
