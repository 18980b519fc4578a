// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use alloc::collections::BTreeSet;
use alloc::{boxed::Box, vec::Vec};
use core::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::Rc;

/// Where in a template a shape was observed.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Location {
    pub file: Rc<str>,
    pub line: u32,
    pub col: u32,
}

impl Location {
    pub fn new(file: Rc<str>, line: u32, col: u32) -> Self {
        Location { file, line, col }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

/// Primitive flavour of a scalar. Template values are weakly typed, so
/// kinds never conflict; they only widen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Any,
    String,
    Number,
    Boolean,
    Null,
}

impl ScalarKind {
    pub fn join(self, other: ScalarKind) -> ScalarKind {
        if self == other {
            self
        } else {
            ScalarKind::Any
        }
    }

    fn name(self) -> &'static str {
        match self {
            ScalarKind::Any => "scalar",
            ScalarKind::String => "string",
            ScalarKind::Number => "number",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Null => "null",
        }
    }
}

/// The shape of a value.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// Nothing observed yet. Bottom of the lattice.
    Unknown,
    Scalar(ScalarKind),
    List(Box<Type>),
    Tuple(Vec<Type>),
    /// Field order is insertion order; equality ignores it.
    Dictionary(IndexMap<Rc<str>, Type>),
}

/// Structural type inferred from usage, plus the diagnostics metadata
/// accumulated while merging.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Type {
    pub kind: TypeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<Rc<str>>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub locations: BTreeSet<Location>,
}

impl Default for Type {
    fn default() -> Self {
        Self::unknown()
    }
}

impl From<TypeKind> for Type {
    fn from(kind: TypeKind) -> Self {
        Type {
            kind,
            label: None,
            locations: BTreeSet::new(),
        }
    }
}

impl Type {
    pub fn unknown() -> Self {
        TypeKind::Unknown.into()
    }

    pub fn scalar() -> Self {
        TypeKind::Scalar(ScalarKind::Any).into()
    }

    pub fn scalar_of(kind: ScalarKind) -> Self {
        TypeKind::Scalar(kind).into()
    }

    pub fn string() -> Self {
        Self::scalar_of(ScalarKind::String)
    }

    pub fn number() -> Self {
        Self::scalar_of(ScalarKind::Number)
    }

    pub fn boolean() -> Self {
        Self::scalar_of(ScalarKind::Boolean)
    }

    pub fn null() -> Self {
        Self::scalar_of(ScalarKind::Null)
    }

    pub fn list(item: Type) -> Self {
        TypeKind::List(Box::new(item)).into()
    }

    pub fn tuple(items: Vec<Type>) -> Self {
        TypeKind::Tuple(items).into()
    }

    pub fn dictionary() -> Self {
        TypeKind::Dictionary(IndexMap::new()).into()
    }

    pub fn dictionary_from<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Type)>,
        K: Into<Rc<str>>,
    {
        TypeKind::Dictionary(fields.into_iter().map(|(k, v)| (k.into(), v)).collect()).into()
    }

    /// A dictionary with the single field `name`.
    pub fn field(name: impl Into<Rc<str>>, ty: Type) -> Self {
        Self::dictionary_from([(name, ty)])
    }

    pub fn with_label(mut self, label: impl Into<Rc<str>>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.insert(location);
        self
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, TypeKind::Scalar(_))
    }

    pub fn fields(&self) -> Option<&IndexMap<Rc<str>, Type>> {
        match &self.kind {
            TypeKind::Dictionary(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.fields().and_then(|fields| fields.get(name))
    }

    /// Element type of a list, if this is one.
    pub fn item(&self) -> Option<&Type> {
        match &self.kind {
            TypeKind::List(item) => Some(item),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&[Type]> {
        match &self.kind {
            TypeKind::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Nesting depth of the shape; scalars and unknowns count as one.
    pub fn depth(&self) -> usize {
        match &self.kind {
            TypeKind::Unknown | TypeKind::Scalar(_) => 1,
            TypeKind::List(item) => 1 + item.depth(),
            TypeKind::Tuple(items) => 1 + items.iter().map(Type::depth).max().unwrap_or(0),
            TypeKind::Dictionary(fields) => {
                1 + fields.values().map(Type::depth).max().unwrap_or(0)
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Unknown => f.write_str("unknown"),
            TypeKind::Scalar(kind) => f.write_str(kind.name()),
            TypeKind::List(item) => write!(f, "list[{item}]"),
            TypeKind::Tuple(items) => {
                f.write_str("tuple(")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            TypeKind::Dictionary(fields) => {
                f.write_str("dict{")?;
                for (idx, (name, ty)) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                f.write_str("}")
            }
        }
    }
}
