//! Index metadata
//!
//! `IndexInfo` describes a physical or virtual index the way the schema
//! layer declares it: a name, attribute flags and, for virtual indexes, the
//! underlying indexes plus the parameters of the composition.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::index::{IndexError, IndexResult};
use crate::tuple::Value;

/// Attribute flags of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IndexAttributes(u16);

impl IndexAttributes {
    pub const NONE: IndexAttributes = IndexAttributes(0);
    pub const PRIMARY: IndexAttributes = IndexAttributes(1);
    pub const VIRTUAL: IndexAttributes = IndexAttributes(1 << 1);
    pub const UNION: IndexAttributes = IndexAttributes(1 << 2);
    pub const JOIN: IndexAttributes = IndexAttributes(1 << 3);
    pub const FILTERED: IndexAttributes = IndexAttributes(1 << 4);
    pub const VIEW: IndexAttributes = IndexAttributes(1 << 5);
    pub const TYPED: IndexAttributes = IndexAttributes(1 << 6);
    pub const ABSTRACT: IndexAttributes = IndexAttributes(1 << 7);

    const NAMES: [(IndexAttributes, &'static str); 8] = [
        (Self::PRIMARY, "PRIMARY"),
        (Self::VIRTUAL, "VIRTUAL"),
        (Self::UNION, "UNION"),
        (Self::JOIN, "JOIN"),
        (Self::FILTERED, "FILTERED"),
        (Self::VIEW, "VIEW"),
        (Self::TYPED, "TYPED"),
        (Self::ABSTRACT, "ABSTRACT"),
    ];

    /// Flags that select the composition of a virtual index
    const KINDS: [(IndexAttributes, IndexKind); 5] = [
        (Self::UNION, IndexKind::Union),
        (Self::JOIN, IndexKind::Join),
        (Self::FILTERED, IndexKind::Filter),
        (Self::VIEW, IndexKind::View),
        (Self::TYPED, IndexKind::Typed),
    ];

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, other: IndexAttributes) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: IndexAttributes) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for IndexAttributes {
    type Output = IndexAttributes;

    fn bitor(self, rhs: IndexAttributes) -> IndexAttributes {
        IndexAttributes(self.0 | rhs.0)
    }
}

impl fmt::Display for IndexAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", names.join(" | "))
        }
    }
}

/// Composition selected by an index's attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Physical,
    Union,
    Join,
    Filter,
    View,
    Typed,
}

/// Rows kept by a filtered index: those whose discriminator column holds
/// one of `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub column: usize,
    pub values: Vec<Value>,
}

impl FilterSpec {
    pub fn new(column: usize, values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            column,
            values: values.into_iter().collect(),
        }
    }
}

/// Constant type identifier a typed index adds to its rows, and the
/// column position it is inserted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub type_id: i64,
    pub column: usize,
}

/// Declared index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub attributes: IndexAttributes,

    /// Root first for joins
    #[serde(default)]
    pub underlying: Vec<IndexInfo>,

    #[serde(default)]
    pub filter: Option<FilterSpec>,

    /// Underlying column for each view column
    #[serde(default)]
    pub view_columns: Vec<usize>,

    #[serde(default)]
    pub type_spec: Option<TypeSpec>,
}

impl IndexInfo {
    /// Index with explicit attributes and no composition parameters
    pub fn new(name: impl Into<String>, attributes: IndexAttributes) -> Self {
        Self {
            name: name.into(),
            attributes,
            underlying: Vec::new(),
            filter: None,
            view_columns: Vec::new(),
            type_spec: None,
        }
    }

    /// Physical index resolved from storage by name
    pub fn physical(name: impl Into<String>) -> Self {
        Self::new(name, IndexAttributes::NONE)
    }

    pub fn union(name: impl Into<String>, members: Vec<IndexInfo>) -> Self {
        Self::new(name, IndexAttributes::VIRTUAL | IndexAttributes::UNION).with_underlying(members)
    }

    pub fn join(name: impl Into<String>, root: IndexInfo, inheritors: Vec<IndexInfo>) -> Self {
        let mut underlying = vec![root];
        underlying.extend(inheritors);
        Self::new(name, IndexAttributes::VIRTUAL | IndexAttributes::JOIN).with_underlying(underlying)
    }

    pub fn filter(name: impl Into<String>, inner: IndexInfo, spec: FilterSpec) -> Self {
        let mut info = Self::new(name, IndexAttributes::VIRTUAL | IndexAttributes::FILTERED)
            .with_underlying(vec![inner]);
        info.filter = Some(spec);
        info
    }

    pub fn view(name: impl Into<String>, inner: IndexInfo, columns: Vec<usize>) -> Self {
        let mut info = Self::new(name, IndexAttributes::VIRTUAL | IndexAttributes::VIEW)
            .with_underlying(vec![inner]);
        info.view_columns = columns;
        info
    }

    pub fn typed(name: impl Into<String>, inner: IndexInfo, spec: TypeSpec) -> Self {
        let mut info = Self::new(name, IndexAttributes::VIRTUAL | IndexAttributes::TYPED)
            .with_underlying(vec![inner]);
        info.type_spec = Some(spec);
        info
    }

    pub fn with_underlying(mut self, underlying: Vec<IndexInfo>) -> Self {
        self.underlying = underlying;
        self
    }

    /// Adds flags such as `PRIMARY` or `ABSTRACT`
    pub fn with_attributes(mut self, attributes: IndexAttributes) -> Self {
        self.attributes = self.attributes | attributes;
        self
    }

    pub fn is_virtual(&self) -> bool {
        self.attributes.contains(IndexAttributes::VIRTUAL)
    }

    /// Resolves the composition kind.
    ///
    /// A virtual index carries exactly one kind flag; a physical index
    /// carries none. `PRIMARY` and `ABSTRACT` never affect the kind.
    pub fn kind(&self) -> IndexResult<IndexKind> {
        let kinds: Vec<IndexKind> = IndexAttributes::KINDS
            .iter()
            .filter(|(flag, _)| self.attributes.contains(*flag))
            .map(|(_, kind)| *kind)
            .collect();

        match (self.is_virtual(), kinds.as_slice()) {
            (false, []) => Ok(IndexKind::Physical),
            (true, [kind]) => Ok(*kind),
            _ => Err(IndexError::unsupported_kind(&self.name, self.attributes)),
        }
    }
}
