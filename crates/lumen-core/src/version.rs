//! Target version identifiers.
//!
//! Output is produced for two disjoint families of the target shading
//! language: the embedded (ES) family and the full (desktop) family. Each
//! family is independently ordered; a [`Version`] is a member of exactly one
//! of them.
//!
//! The table of recognised versions and the capabilities each provides is
//! process-wide static data. The version checker compares a shader's
//! requirements against it and the lowering transform selects surface
//! syntax from it.

use std::collections::BTreeMap;
use std::fmt;

use bitflags::bitflags;
use lazy_static::lazy_static;

/// A version of the embedded (ES) family, e.g. `100` or `300`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EsVersion(pub u32);

/// A version of the full (desktop) family, e.g. `120` or `330`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FullVersion(pub u32);

/// The two version families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VersionFamily {
    Es,
    Full,
}

impl fmt::Display for VersionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionFamily::Es => write!(f, "ES"),
            VersionFamily::Full => write!(f, "full"),
        }
    }
}

/// A target version from either family.
///
/// The derived ordering places every ES version before every full version;
/// within a family versions order by number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Version {
    Es(EsVersion),
    Full(FullVersion),
}

bitflags! {
    /// Capabilities provided by a target version.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Features: u32 {
        /// `in`/`out` interface qualifiers instead of `attribute`/`varying`.
        const IN_OUT = 1 << 0;
        /// Fragment outputs are declared variables instead of `gl_FragData`.
        const FRAGMENT_OUTPUT_DECLARATIONS = 1 << 1;
        /// `layout(location = N)` on fragment outputs.
        const LAYOUT_LOCATION = 1 << 2;
        /// Overloaded `texture()` instead of per-sampler built-ins.
        const UNIFIED_TEXTURE = 1 << 3;
        /// Writing more than one colour output.
        const MULTIPLE_DRAW_BUFFERS = 1 << 4;
        /// Writing `gl_FragDepth`.
        const FRAGMENT_DEPTH = 1 << 5;
        /// Integer-typed vertex inputs.
        const INTEGER_VERTEX_INPUTS = 1 << 6;
        /// Integer-typed varyings (`flat` qualified).
        const FLAT_VARYINGS = 1 << 7;
        /// Matrix constructors taking a matrix.
        const MATRIX_FROM_MATRIX = 1 << 8;
        /// Default precision statements.
        const PRECISION = 1 << 9;
    }
}

lazy_static! {
    static ref VERSION_TABLE: BTreeMap<Version, Features> = build_version_table();
}

fn build_version_table() -> BTreeMap<Version, Features> {
    let modern_es = Features::IN_OUT
        | Features::FRAGMENT_OUTPUT_DECLARATIONS
        | Features::LAYOUT_LOCATION
        | Features::UNIFIED_TEXTURE
        | Features::MULTIPLE_DRAW_BUFFERS
        | Features::FRAGMENT_DEPTH
        | Features::INTEGER_VERTEX_INPUTS
        | Features::FLAT_VARYINGS
        | Features::MATRIX_FROM_MATRIX
        | Features::PRECISION;

    let full_110 = Features::MULTIPLE_DRAW_BUFFERS | Features::FRAGMENT_DEPTH;
    let full_120 = full_110 | Features::MATRIX_FROM_MATRIX;
    let full_130 = full_120
        | Features::IN_OUT
        | Features::FRAGMENT_OUTPUT_DECLARATIONS
        | Features::UNIFIED_TEXTURE
        | Features::INTEGER_VERTEX_INPUTS
        | Features::FLAT_VARYINGS;
    let full_330 = full_130 | Features::LAYOUT_LOCATION;

    let mut table = BTreeMap::new();
    table.insert(Version::Es(EsVersion(100)), Features::PRECISION);
    for es in [300, 310, 320] {
        table.insert(Version::Es(EsVersion(es)), modern_es);
    }
    table.insert(Version::Full(FullVersion(110)), full_110);
    table.insert(Version::Full(FullVersion(120)), full_120);
    for full in [130, 140, 150] {
        table.insert(Version::Full(FullVersion(full)), full_130);
    }
    for full in [330, 400, 410, 420, 430, 440, 450, 460] {
        table.insert(Version::Full(FullVersion(full)), full_330);
    }
    table
}

impl EsVersion {
    pub const ES_100: EsVersion = EsVersion(100);
    pub const ES_300: EsVersion = EsVersion(300);

    /// Whether this version is in the recognised table.
    pub fn is_recognized(self) -> bool {
        VERSION_TABLE.contains_key(&Version::Es(self))
    }

    /// Every recognised ES version, ascending.
    pub fn all() -> impl Iterator<Item = EsVersion> {
        VERSION_TABLE.keys().filter_map(|v| match v {
            Version::Es(es) => Some(*es),
            Version::Full(_) => None,
        })
    }
}

impl FullVersion {
    pub const FULL_110: FullVersion = FullVersion(110);
    pub const FULL_330: FullVersion = FullVersion(330);

    /// Whether this version is in the recognised table.
    pub fn is_recognized(self) -> bool {
        VERSION_TABLE.contains_key(&Version::Full(self))
    }

    /// Every recognised full version, ascending.
    pub fn all() -> impl Iterator<Item = FullVersion> {
        VERSION_TABLE.keys().filter_map(|v| match v {
            Version::Full(full) => Some(*full),
            Version::Es(_) => None,
        })
    }
}

impl Version {
    /// The family this version belongs to.
    pub fn family(self) -> VersionFamily {
        match self {
            Version::Es(_) => VersionFamily::Es,
            Version::Full(_) => VersionFamily::Full,
        }
    }

    /// The bare version number.
    pub fn number(self) -> u32 {
        match self {
            Version::Es(EsVersion(n)) | Version::Full(FullVersion(n)) => n,
        }
    }

    /// The capabilities of this version, or `None` if it is not recognised.
    pub fn features(self) -> Option<Features> {
        VERSION_TABLE.get(&self).copied()
    }

    /// The text following `#version` in an output source.
    pub fn directive(self) -> String {
        match self {
            Version::Es(EsVersion(100)) => "100".to_string(),
            Version::Es(EsVersion(n)) => format!("{n} es"),
            Version::Full(FullVersion(n)) => n.to_string(),
        }
    }
}

impl From<EsVersion> for Version {
    fn from(v: EsVersion) -> Self {
        Version::Es(v)
    }
}

impl From<FullVersion> for Version {
    fn from(v: FullVersion) -> Self {
        Version::Full(v)
    }
}

impl fmt::Display for EsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ES {}", self.0)
    }
}

impl fmt::Display for FullVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "full {}", self.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Es(v) => write!(f, "{v}"),
            Version::Full(v) => write!(f, "{v}"),
        }
    }
}

/// Where an external (built-in) function exists.
///
/// Each family holds the lowest version providing the function, or `None`
/// if no version of that family provides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Availability {
    pub es: Option<EsVersion>,
    pub full: Option<FullVersion>,
}

impl Availability {
    /// Available in every recognised version.
    pub fn everywhere() -> Self {
        Self {
            es: Some(EsVersion::ES_100),
            full: Some(FullVersion::FULL_110),
        }
    }

    /// Available from the given minimum versions onwards.
    pub fn since(es: Option<EsVersion>, full: Option<FullVersion>) -> Self {
        Self { es, full }
    }

    /// Whether the function exists in `version`.
    pub fn includes(&self, version: Version) -> bool {
        match version {
            Version::Es(v) => self.es.is_some_and(|min| v >= min),
            Version::Full(v) => self.full.is_some_and(|min| v >= min),
        }
    }
}

impl Default for Availability {
    fn default() -> Self {
        Self::everywhere()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_are_disjoint_and_ordered() {
        let es: Vec<_> = EsVersion::all().collect();
        let full: Vec<_> = FullVersion::all().collect();
        assert_eq!(es.first(), Some(&EsVersion(100)));
        assert_eq!(full.first(), Some(&FullVersion(110)));
        assert!(es.windows(2).all(|w| w[0] < w[1]));
        assert!(full.windows(2).all(|w| w[0] < w[1]));
        assert!(Version::Es(EsVersion(320)) < Version::Full(FullVersion(110)));
    }

    #[test]
    fn unrecognised_versions() {
        assert!(!EsVersion(200).is_recognized());
        assert!(!FullVersion(100).is_recognized());
        assert_eq!(Version::Full(FullVersion(335)).features(), None);
    }

    #[test]
    fn feature_table_matches_documented_thresholds() {
        let es100 = Version::Es(EsVersion(100)).features().unwrap();
        assert!(es100.contains(Features::PRECISION));
        assert!(!es100.contains(Features::MULTIPLE_DRAW_BUFFERS));

        let full120 = Version::Full(FullVersion(120)).features().unwrap();
        assert!(full120.contains(Features::MATRIX_FROM_MATRIX));
        assert!(!full120.contains(Features::IN_OUT));

        let full150 = Version::Full(FullVersion(150)).features().unwrap();
        assert!(full150.contains(Features::IN_OUT));
        assert!(!full150.contains(Features::LAYOUT_LOCATION));

        let full330 = Version::Full(FullVersion(330)).features().unwrap();
        assert!(full330.contains(Features::LAYOUT_LOCATION));
        assert!(!full330.contains(Features::PRECISION));
    }

    #[test]
    fn version_directives() {
        assert_eq!(Version::Es(EsVersion(100)).directive(), "100");
        assert_eq!(Version::Es(EsVersion(300)).directive(), "300 es");
        assert_eq!(Version::Full(FullVersion(330)).directive(), "330");
    }

    #[test]
    fn availability_bounds() {
        let a = Availability::since(Some(EsVersion(300)), None);
        assert!(a.includes(Version::Es(EsVersion(310))));
        assert!(!a.includes(Version::Es(EsVersion(100))));
        assert!(!a.includes(Version::Full(FullVersion(460))));
        assert!(Availability::everywhere().includes(Version::Full(FullVersion(110))));
    }
}
