//! # Field Module - *Arrow-compliant Column Metadata Tagging*
//!
//! A `Field` captures a column's name, logical type, nullability and
//! optional lightweight metadata. It is one node of a schema tree. Nested
//! types hold their child `Field`s inside the [`ArrowType`].
//!
//! This module contains only the schema description. It does not hold
//! any row data.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use crate::enums::error::{BridgeError, Result};
use crate::ffi::arrow_dtype::ArrowType;

/// # Field
///
/// Name, type, nullability and key-value metadata of one schema node.
///
/// ### Tips:
/// - `Field` is *cloned often*, so keep metadata lightweight.
/// - Names may be empty. The C Data Interface allows unnamed nodes, and list
///   items are conventionally called `item`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub dtype: ArrowType,
    pub nullable: bool,
    pub metadata: BTreeMap<String, String>,
}

impl Field {
    /// Constructs a new `Field`.
    pub fn new<T: Into<String>>(
        name: T,
        dtype: ArrowType,
        nullable: bool,
        metadata: Option<BTreeMap<String, String>>,
    ) -> Self {
        Field {
            name: name.into(),
            dtype,
            nullable,
            metadata: metadata.unwrap_or_default(),
        }
    }

    /// `List` field over the given item field.
    pub fn list<T: Into<String>>(name: T, item: Field, nullable: bool) -> Self {
        Field::new(name, ArrowType::List(Box::new(item)), nullable, None)
    }

    /// `Struct` field over the given child fields.
    pub fn structure<T: Into<String>>(name: T, fields: Vec<Field>, nullable: bool) -> Self {
        Field::new(name, ArrowType::Struct(fields), nullable, None)
    }

    /// Deep structural comparison against the field actually found.
    ///
    /// Compares name, type tag, nullability and children recursively.
    /// Metadata is informational and does not participate.
    pub fn ensure_matches(&self, found: &Field, parent: &str) -> Result<()> {
        let path = if parent.is_empty() {
            self.name.clone()
        } else {
            format!("{parent}.{}", self.name)
        };
        if self.name != found.name {
            return Err(BridgeError::schema_mismatch(
                &path,
                format!("field '{}'", self.name),
                format!("field '{}'", found.name),
            ));
        }
        if self.dtype.tag() != found.dtype.tag() {
            return Err(BridgeError::schema_mismatch(&path, &self.dtype, &found.dtype));
        }
        if self.nullable != found.nullable {
            return Err(BridgeError::schema_mismatch(
                &path,
                nullability(self.nullable),
                nullability(found.nullable),
            ));
        }
        let (expected, actual) = (self.dtype.children(), found.dtype.children());
        if expected.len() != actual.len() {
            return Err(BridgeError::schema_mismatch(
                &path,
                format!("{} children", expected.len()),
                format!("{} children", actual.len()),
            ));
        }
        for (e, a) in expected.iter().zip(actual) {
            e.ensure_matches(a, &path)?;
        }
        Ok(())
    }
}

fn nullability(nullable: bool) -> &'static str {
    if nullable { "nullable" } else { "non-nullable" }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Field \"{}\": {}{}",
            self.name,
            self.dtype,
            if self.nullable { " (nullable)" } else { "" }
        )?;
        if !self.metadata.is_empty() {
            write!(f, " [metadata: {:?}]", self.metadata)?;
        }
        Ok(())
    }
}
