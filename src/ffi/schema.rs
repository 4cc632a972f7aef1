use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use crate::enums::error::{BridgeError, Result};
use crate::ffi::arrow_dtype::ArrowType;
use crate::structs::field::Field;

/// Schema of a `RecordBatch` or `Table`: ordered top-level fields plus
/// schema-level metadata.
///
/// Across the C Data Interface a schema travels as a single `+s` struct
/// node whose children are the fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub fields: Vec<Field>,
    pub metadata: BTreeMap<String, String>,
}

impl Schema {
    #[inline]
    pub fn new(fields: Vec<Field>, metadata: BTreeMap<String, String>) -> Self {
        Self { fields, metadata }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[inline]
    pub fn field(&self, i: usize) -> Option<&Field> {
        self.fields.get(i)
    }

    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| BridgeError::NotFound(format!("no field named '{name}'")))
    }

    /// Deep structural equality check of `actual` against this expected schema.
    ///
    /// Fails on the first differing node with a `SchemaMismatch` that names
    /// its dotted path. Field order matters.
    pub fn ensure_matches(&self, actual: &Schema) -> Result<()> {
        if self.fields.len() != actual.fields.len() {
            return Err(BridgeError::schema_mismatch(
                "",
                format!("{} fields", self.fields.len()),
                format!("{} fields", actual.fields.len()),
            ));
        }
        for (expected, found) in self.fields.iter().zip(&actual.fields) {
            expected.ensure_matches(found, "")?;
        }
        Ok(())
    }

    /// The struct type that represents a whole batch of this schema.
    pub fn to_struct_type(&self) -> ArrowType {
        ArrowType::Struct(self.fields.clone())
    }

    /// Rebuilds a schema from the root struct field of a C interface export.
    pub fn try_from_struct_field(field: Field) -> Result<Self> {
        match field.dtype {
            ArrowType::Struct(fields) => Ok(Schema::new(fields, field.metadata)),
            other => Err(BridgeError::InvalidData(format!(
                "record batch schema must be a struct, found {other}"
            ))),
        }
    }
}

impl From<Vec<Field>> for Schema {
    fn from(fields: Vec<Field>) -> Self {
        Self { fields, ..Default::default() }
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Schema ({} fields)", self.fields.len())?;
        for field in &self.fields {
            writeln!(f, "  {field}")?;
        }
        Ok(())
    }
}
