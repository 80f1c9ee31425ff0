//! The closed type domain.
//!
//! Every value in a shader program has one of a fixed set of types:
//!
//! - scalars: `boolean`, `integer`, `float`
//! - vectors: `vector_{2,3,4}f` and `vector_{2,3,4}i`
//! - matrices: `matrix_3x3f`, `matrix_4x4f`
//! - samplers: `sampler_2d`, `sampler_cube`
//! - records: named, ordered fields
//! - functions: ordered parameters and a result
//!
//! Base, vector, matrix and sampler types are singletons (enum variants).
//! Records and functions are structural and shared behind `Arc`, so cloning
//! a [`Type`] is always cheap.
//!
//! Constructible types expose the exact parameter lists accepted by a
//! `new T(...)` expression through [`Type::constructors`]. There is no
//! implicit conversion and no ranking: an argument list either matches one
//! signature exactly or the construction is rejected.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use crate::TypeName;

/// The element kind of a numeric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    Float,
    Integer,
}

impl ElementKind {
    /// The scalar type with this element kind.
    pub fn scalar(self) -> Type {
        match self {
            ElementKind::Float => Type::Float,
            ElementKind::Integer => Type::Integer,
        }
    }

    fn other(self) -> Self {
        match self {
            ElementKind::Float => ElementKind::Integer,
            ElementKind::Integer => ElementKind::Float,
        }
    }
}

/// Vector types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VectorType {
    Vector2F,
    Vector3F,
    Vector4F,
    Vector2I,
    Vector3I,
    Vector4I,
}

/// Errors produced when evaluating a swizzle selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwizzleError {
    /// The selector has no components.
    Empty,
    /// The selector has more than four components.
    TooManyComponents { count: usize },
    /// A component is not a letter valid for the vector's width.
    UnknownComponent { component: String },
}

impl VectorType {
    /// All vector types.
    pub const ALL: [VectorType; 6] = [
        VectorType::Vector2F,
        VectorType::Vector3F,
        VectorType::Vector4F,
        VectorType::Vector2I,
        VectorType::Vector3I,
        VectorType::Vector4I,
    ];

    /// The vector type with the given element kind and width, if one exists.
    pub fn new(element: ElementKind, width: usize) -> Option<Self> {
        match (element, width) {
            (ElementKind::Float, 2) => Some(VectorType::Vector2F),
            (ElementKind::Float, 3) => Some(VectorType::Vector3F),
            (ElementKind::Float, 4) => Some(VectorType::Vector4F),
            (ElementKind::Integer, 2) => Some(VectorType::Vector2I),
            (ElementKind::Integer, 3) => Some(VectorType::Vector3I),
            (ElementKind::Integer, 4) => Some(VectorType::Vector4I),
            _ => None,
        }
    }

    /// The element kind of the vector's components.
    pub fn element(self) -> ElementKind {
        match self {
            VectorType::Vector2F | VectorType::Vector3F | VectorType::Vector4F => {
                ElementKind::Float
            }
            VectorType::Vector2I | VectorType::Vector3I | VectorType::Vector4I => {
                ElementKind::Integer
            }
        }
    }

    /// The number of components.
    pub fn width(self) -> usize {
        match self {
            VectorType::Vector2F | VectorType::Vector2I => 2,
            VectorType::Vector3F | VectorType::Vector3I => 3,
            VectorType::Vector4F | VectorType::Vector4I => 4,
        }
    }

    /// The source-language name of the type.
    pub fn name(self) -> &'static str {
        match self {
            VectorType::Vector2F => "vector_2f",
            VectorType::Vector3F => "vector_3f",
            VectorType::Vector4F => "vector_4f",
            VectorType::Vector2I => "vector_2i",
            VectorType::Vector3I => "vector_3i",
            VectorType::Vector4I => "vector_4i",
        }
    }

    /// The type of a swizzle expression over this vector.
    ///
    /// One component yields the element scalar type; two to four yield the
    /// vector of the same element kind with that many components. Letters
    /// are `x`, `y`, `z`, `w` and must address a component the vector has.
    pub fn swizzle<S: AsRef<str>>(self, components: &[S]) -> Result<Type, SwizzleError> {
        let count = components.len();
        if count == 0 {
            return Err(SwizzleError::Empty);
        }
        if count > 4 {
            return Err(SwizzleError::TooManyComponents { count });
        }

        for component in components {
            let component = component.as_ref();
            let index = match component {
                "x" => 0,
                "y" => 1,
                "z" => 2,
                "w" => 3,
                _ => usize::MAX,
            };
            if index >= self.width() {
                return Err(SwizzleError::UnknownComponent {
                    component: component.to_string(),
                });
            }
        }

        match count {
            1 => Ok(self.element().scalar()),
            n => VectorType::new(self.element(), n)
                .map(Type::Vector)
                .ok_or(SwizzleError::TooManyComponents { count: n }),
        }
    }
}

/// Square float matrix types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatrixType {
    Matrix3x3F,
    Matrix4x4F,
}

impl MatrixType {
    /// The type of one column.
    pub fn column(self) -> VectorType {
        match self {
            MatrixType::Matrix3x3F => VectorType::Vector3F,
            MatrixType::Matrix4x4F => VectorType::Vector4F,
        }
    }

    /// The source-language name of the type.
    pub fn name(self) -> &'static str {
        match self {
            MatrixType::Matrix3x3F => "matrix_3x3f",
            MatrixType::Matrix4x4F => "matrix_4x4f",
        }
    }
}

/// Opaque texture sampler types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SamplerType {
    Sampler2D,
    SamplerCube,
}

impl SamplerType {
    /// The source-language name of the type.
    pub fn name(self) -> &'static str {
        match self {
            SamplerType::Sampler2D => "sampler_2d",
            SamplerType::SamplerCube => "sampler_cube",
        }
    }
}

/// A single field of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordField {
    pub name: String,
    pub ty: Type,
}

/// A record type: a declared name and its fields in declaration order.
///
/// Two record types are equal when their names and their field lists
/// (names, types and order) are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordType {
    pub name: TypeName,
    pub fields: Vec<RecordField>,
}

impl RecordType {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A function type: ordered parameter types and a result type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub result: Type,
}

/// A type in the closed domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Boolean,
    Integer,
    Float,
    Vector(VectorType),
    Matrix(MatrixType),
    Sampler(SamplerType),
    Record(Arc<RecordType>),
    Function(Arc<FunctionType>),
}

/// One accepted parameter list of a `new` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructor {
    pub params: Vec<Type>,
}

impl Type {
    /// Create a record type.
    pub fn record(name: TypeName, fields: Vec<RecordField>) -> Type {
        Type::Record(Arc::new(RecordType { name, fields }))
    }

    /// Create a function type.
    pub fn function(params: Vec<Type>, result: Type) -> Type {
        Type::Function(Arc::new(FunctionType { params, result }))
    }

    /// Whether values of this type may be bound by `value` or `let`.
    pub fn is_value(&self) -> bool {
        !matches!(self, Type::Function(_))
    }

    /// The vector type, if this is a vector.
    pub fn as_vector(&self) -> Option<VectorType> {
        match self {
            Type::Vector(v) => Some(*v),
            _ => None,
        }
    }

    /// The matrix type, if this is a matrix.
    pub fn as_matrix(&self) -> Option<MatrixType> {
        match self {
            Type::Matrix(m) => Some(*m),
            _ => None,
        }
    }

    /// The record type, if this is a record.
    pub fn as_record(&self) -> Option<&RecordType> {
        match self {
            Type::Record(r) => Some(r),
            _ => None,
        }
    }

    /// The function type, if this is a function.
    pub fn as_function(&self) -> Option<&FunctionType> {
        match self {
            Type::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Whether this is `integer` or an integer vector.
    pub fn is_integral(&self) -> bool {
        match self {
            Type::Integer => true,
            Type::Vector(v) => v.element() == ElementKind::Integer,
            _ => false,
        }
    }

    /// The accepted parameter lists of `new` for this type.
    ///
    /// Empty for types that cannot be constructed.
    pub fn constructors(&self) -> &'static [Constructor] {
        CONSTRUCTORS
            .get(self)
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `new` may be used with this type at all.
    pub fn is_constructible(&self) -> bool {
        !self.constructors().is_empty()
    }

    /// The constructor whose parameter list equals `args` exactly.
    pub fn find_constructor(&self, args: &[Type]) -> Option<&'static Constructor> {
        self.constructors().iter().find(|c| c.params == args)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Type::Boolean => write!(f, "boolean"),
            Type::Integer => write!(f, "integer"),
            Type::Float => write!(f, "float"),
            Type::Vector(v) => write!(f, "{}", v.name()),
            Type::Matrix(m) => write!(f, "{}", m.name()),
            Type::Sampler(s) => write!(f, "{}", s.name()),
            Type::Record(r) => write!(f, "{}", r.name),
            Type::Function(func) => {
                write!(f, "(")?;
                for (i, p) in func.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {}", func.result)
            }
        }
    }
}

impl Display for Constructor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, ")")
    }
}

// ============================================================================
// Constructor table
// ============================================================================

lazy_static! {
    static ref CONSTRUCTORS: FxHashMap<Type, Vec<Constructor>> = build_constructors();
}

fn build_constructors() -> FxHashMap<Type, Vec<Constructor>> {
    let mut table = FxHashMap::default();

    table.insert(
        Type::Integer,
        vec![signature(&[Type::Integer]), signature(&[Type::Float])],
    );
    table.insert(
        Type::Float,
        vec![signature(&[Type::Float]), signature(&[Type::Integer])],
    );

    for vector in VectorType::ALL {
        table.insert(Type::Vector(vector), vector_constructors(vector));
    }

    let m3 = Type::Matrix(MatrixType::Matrix3x3F);
    let m4 = Type::Matrix(MatrixType::Matrix4x4F);
    let v3 = Type::Vector(VectorType::Vector3F);
    let v4 = Type::Vector(VectorType::Vector4F);
    table.insert(
        m3.clone(),
        vec![
            signature(&[v3.clone(), v3.clone(), v3]),
            signature(&[m3.clone()]),
            signature(&[m4.clone()]),
        ],
    );
    table.insert(
        m4.clone(),
        vec![
            signature(&[v4.clone(), v4.clone(), v4.clone(), v4]),
            signature(&[m4.clone()]),
            signature(&[m3]),
        ],
    );

    table
}

fn signature(params: &[Type]) -> Constructor {
    Constructor {
        params: params.to_vec(),
    }
}

/// Constructors of a vector: every ordered split of its width into scalars
/// and narrower vectors of the same element kind, the vector itself, the
/// same-width vector of the other element kind, and (for width 3) the
/// truncation of a width-4 vector.
fn vector_constructors(vector: VectorType) -> Vec<Constructor> {
    let element = vector.element();
    let width = vector.width();

    let part_type = |n: usize| match n {
        1 => Some(element.scalar()),
        n => VectorType::new(element, n).map(Type::Vector),
    };

    let mut out = Vec::new();
    for parts in compositions(width) {
        let params: Option<Vec<Type>> = parts.iter().map(|&n| part_type(n)).collect();
        if let Some(params) = params {
            out.push(Constructor { params });
        }
    }

    out.push(signature(&[Type::Vector(vector)]));
    if let Some(other) = VectorType::new(element.other(), width) {
        out.push(signature(&[Type::Vector(other)]));
    }
    if width == 3 {
        if let Some(wide) = VectorType::new(element, 4) {
            out.push(signature(&[Type::Vector(wide)]));
        }
    }
    out
}

/// All ordered compositions of `n` into at least two positive parts.
fn compositions(n: usize) -> Vec<Vec<usize>> {
    fn go(remaining: usize, prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if remaining == 0 {
            if prefix.len() > 1 {
                out.push(prefix.clone());
            }
            return;
        }
        for part in 1..=remaining {
            prefix.push(part);
            go(remaining - part, prefix, out);
            prefix.pop();
        }
    }

    let mut out = Vec::new();
    go(n, &mut Vec::new(), &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModulePath;

    fn v(t: VectorType) -> Type {
        Type::Vector(t)
    }

    fn light() -> Type {
        Type::record(
            TypeName::new(ModulePath::new("demo"), "Light"),
            vec![
                RecordField {
                    name: "color".into(),
                    ty: v(VectorType::Vector3F),
                },
                RecordField {
                    name: "intensity".into(),
                    ty: Type::Float,
                },
            ],
        )
    }

    #[test]
    fn swizzle_widths() {
        for vector in VectorType::ALL {
            let letters = ["x", "y", "z", "w"];
            for k in 1..=vector.width() {
                let result = vector.swizzle(&letters[..k]).unwrap();
                if k == 1 {
                    assert_eq!(result, vector.element().scalar());
                } else {
                    assert_eq!(
                        result,
                        Type::Vector(VectorType::new(vector.element(), k).unwrap())
                    );
                }
            }
        }
    }

    #[test]
    fn swizzle_can_widen_narrow_vectors() {
        // Repeated components may produce a wider vector than the operand.
        assert_eq!(
            VectorType::Vector2I.swizzle(&["x", "y", "x", "y"]),
            Ok(v(VectorType::Vector4I))
        );
    }

    #[test]
    fn swizzle_too_many_components() {
        assert_eq!(
            VectorType::Vector4F.swizzle(&["x", "y", "z", "w", "x"]),
            Err(SwizzleError::TooManyComponents { count: 5 })
        );
    }

    #[test]
    fn swizzle_unknown_component() {
        assert_eq!(
            VectorType::Vector4F.swizzle(&["x", "q"]),
            Err(SwizzleError::UnknownComponent {
                component: "q".into()
            })
        );
        // `z` does not exist on a two-component vector.
        assert_eq!(
            VectorType::Vector2F.swizzle(&["z"]),
            Err(SwizzleError::UnknownComponent {
                component: "z".into()
            })
        );
    }

    #[test]
    fn swizzle_empty() {
        let none: [&str; 0] = [];
        assert_eq!(VectorType::Vector3F.swizzle(&none), Err(SwizzleError::Empty));
    }

    #[test]
    fn vector_4f_constructors() {
        let f = Type::Float;
        let ctor = |params: &[Type]| v(VectorType::Vector4F).find_constructor(params);
        assert!(ctor(&[f.clone(), f.clone(), f.clone(), f.clone()]).is_some());
        assert!(ctor(&[v(VectorType::Vector3F), f.clone()]).is_some());
        assert!(ctor(&[f.clone(), v(VectorType::Vector3F)]).is_some());
        assert!(ctor(&[v(VectorType::Vector2F), v(VectorType::Vector2F)]).is_some());
        assert!(ctor(&[v(VectorType::Vector4I)]).is_some());
        // No implicit conversion of individual components.
        assert!(ctor(&[v(VectorType::Vector3F), Type::Integer]).is_none());
        assert!(ctor(&[f.clone(), f.clone(), f]).is_none());
    }

    #[test]
    fn scalar_conversion_constructors() {
        assert!(Type::Float.find_constructor(&[Type::Integer]).is_some());
        assert!(Type::Integer.find_constructor(&[Type::Float]).is_some());
        assert!(Type::Float.find_constructor(&[Type::Boolean]).is_none());
    }

    #[test]
    fn matrix_constructors() {
        let m3 = Type::Matrix(MatrixType::Matrix3x3F);
        let v3 = v(VectorType::Vector3F);
        assert!(m3.find_constructor(&[v3.clone(), v3.clone(), v3]).is_some());
        assert!(
            m3.find_constructor(&[Type::Matrix(MatrixType::Matrix4x4F)])
                .is_some()
        );
    }

    #[test]
    fn non_constructible_types() {
        assert!(!Type::Boolean.is_constructible());
        assert!(!Type::Sampler(SamplerType::Sampler2D).is_constructible());
        assert!(!light().is_constructible());
        assert!(!Type::function(vec![], Type::Float).is_constructible());
    }

    #[test]
    fn record_equality_is_structural() {
        assert_eq!(light(), light());

        let reordered = Type::record(
            TypeName::new(ModulePath::new("demo"), "Light"),
            vec![
                RecordField {
                    name: "intensity".into(),
                    ty: Type::Float,
                },
                RecordField {
                    name: "color".into(),
                    ty: v(VectorType::Vector3F),
                },
            ],
        );
        assert_ne!(light(), reordered);
    }

    #[test]
    fn function_type_display() {
        let f = Type::function(vec![Type::Float, v(VectorType::Vector2I)], Type::Boolean);
        assert_eq!(f.to_string(), "(float, vector_2i) -> boolean");
        assert!(!f.is_value());
    }

    #[test]
    fn compositions_of_four() {
        assert_eq!(compositions(4).len(), 7);
        assert_eq!(compositions(2), vec![vec![1, 1]]);
    }
}
