//! # **RecordBatch Module** - *Equal-length named columns under one schema*
//!
//! Columnar container pairing a [`Schema`] with one [`ArrayData`] per field.
//! Equivalent in role to Apache Arrow's `RecordBatch`.
//!
//! Across the C Data Interface a batch travels as one struct array whose
//! children are the columns; see [`RecordBatch::to_struct_data`].

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::enums::error::{BridgeError, Result};
use crate::ffi::arrow_dtype::ArrowType;
use crate::ffi::schema::Schema;
use crate::structs::array_data::ArrayData;
use crate::structs::builders::ArrayBuilder;
use crate::structs::memory_pool::MemoryPool;
use crate::structs::views::ArrayView;
use crate::traits::print::{MAX_PREVIEW, value_to_string, write_cells, write_rule};

/// # RecordBatch
///
/// - All columns have `num_rows` slots.
/// - Column `i` has exactly the dtype of `schema.fields[i]`.
/// - Cloning is cheap: schema and columns are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch {
    schema: Arc<Schema>,
    columns: Vec<Arc<ArrayData>>,
    num_rows: usize,
}

impl RecordBatch {
    pub fn try_new(schema: Arc<Schema>, columns: Vec<Arc<ArrayData>>) -> Result<Self> {
        if schema.len() != columns.len() {
            return Err(BridgeError::InvalidArgument(format!(
                "schema has {} fields but {} columns were given",
                schema.len(),
                columns.len()
            )));
        }
        for (field, column) in schema.fields.iter().zip(&columns) {
            if &field.dtype != column.dtype() {
                return Err(BridgeError::schema_mismatch(&field.name, &field.dtype, column.dtype()));
            }
        }
        let num_rows = columns.first().map_or(0, |c| c.len());
        if let Some((field, column)) =
            schema.fields.iter().zip(&columns).find(|(_, c)| c.len() != num_rows)
        {
            return Err(BridgeError::InvalidArgument(format!(
                "column '{}' has {} rows, expected {num_rows}",
                field.name,
                column.len()
            )));
        }
        Ok(Self { schema, columns, num_rows })
    }

    /// A batch with no rows of the given schema.
    pub fn new_empty(schema: Arc<Schema>) -> Result<Self> {
        let columns = schema
            .fields
            .iter()
            .map(|f| ArrayBuilder::new(&f.dtype, MemoryPool::default_pool()).finish().map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        Self::try_new(schema, columns)
    }

    #[inline]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    #[inline]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn columns(&self) -> &[Arc<ArrayData>] {
        &self.columns
    }

    #[inline]
    pub fn column(&self, i: usize) -> Option<&Arc<ArrayData>> {
        self.columns.get(i)
    }

    pub fn column_by_name(&self, name: &str) -> Result<&Arc<ArrayData>> {
        let i = self.schema.index_of(name)?;
        Ok(&self.columns[i])
    }

    /// Zero-copy window of `len` rows starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<Self> {
        let columns = self
            .columns
            .iter()
            .map(|c| c.slice(offset, len).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { schema: self.schema.clone(), columns, num_rows: len })
    }

    /// Batch with only the named columns, in the given order.
    pub fn project(&self, names: &[&str]) -> Result<Self> {
        let mut fields = Vec::with_capacity(names.len());
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let i = self.schema.index_of(name)?;
            fields.push(self.schema.fields[i].clone());
            columns.push(self.columns[i].clone());
        }
        let schema = Schema::new(fields, self.schema.metadata.clone());
        Ok(Self { schema: Arc::new(schema), columns, num_rows: self.num_rows })
    }

    /// The batch as a single non-null struct array, sharing every column.
    pub fn to_struct_data(&self) -> Result<ArrayData> {
        ArrayData::try_new(
            self.schema.to_struct_type(),
            self.num_rows,
            0,
            0,
            vec![None],
            self.columns.clone(),
        )
    }

    /// Splits a struct array back into columns under `schema`.
    ///
    /// A struct offset is pushed down into the children by slicing, and
    /// struct-level nulls are rejected since a batch row cannot be null.
    pub fn from_struct_data(schema: Arc<Schema>, data: &ArrayData) -> Result<Self> {
        let ArrowType::Struct(fields) = data.dtype() else {
            return Err(BridgeError::InvalidData(format!(
                "record batch must be a struct array, found {}",
                data.dtype()
            )));
        };
        schema.ensure_matches(&Schema::from(fields.clone()))?;
        if data.null_count() > 0 {
            return Err(BridgeError::InvalidData(format!(
                "record batch struct has {} null rows",
                data.null_count()
            )));
        }
        let columns = data
            .children()
            .iter()
            .map(|c| {
                if c.offset() == 0 && data.offset() == 0 && c.len() == data.len() {
                    Ok(c.clone())
                } else {
                    c.slice(data.offset(), data.len()).map(Arc::new)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Self::try_new(schema, columns)
    }
}

impl Display for RecordBatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.columns.is_empty() {
            return writeln!(f, "RecordBatch [0 rows × 0 cols] – empty");
        }
        let views = self
            .columns
            .iter()
            .map(|c| ArrayView::try_new(c))
            .collect::<Result<Vec<_>>>()
            .map_err(|_| std::fmt::Error)?;

        // Head and tail only once the batch is past the preview size.
        let truncated = self.num_rows > MAX_PREVIEW;
        let shown: Vec<usize> = if truncated {
            (0..10).chain(self.num_rows - 10..self.num_rows).collect()
        } else {
            (0..self.num_rows).collect()
        };

        let mut header = vec!["idx".to_string()];
        header.extend(self.schema.fields.iter().map(|fd| format!("{}:{}", fd.name, fd.dtype)));
        let body: Vec<Vec<String>> = shown
            .iter()
            .map(|&row| {
                let mut cells = vec![row.to_string()];
                cells.extend(views.iter().map(|v| value_to_string(v, row)));
                cells
            })
            .collect();

        let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
        for cells in &body {
            for (w, cell) in widths.iter_mut().zip(cells) {
                *w = (*w).max(cell.chars().count());
            }
        }
        let ellipsis = vec!["…"; widths.len()];

        writeln!(f, "RecordBatch [{} rows × {} cols]", self.num_rows, self.columns.len())?;
        write_rule(f, &widths)?;
        write_cells(f, header.iter().map(String::as_str), &widths)?;
        write_rule(f, &widths)?;
        for (i, cells) in body.iter().enumerate() {
            write_cells(f, cells.iter().map(String::as_str), &widths)?;
            if truncated && i == 9 {
                write_cells(f, ellipsis.iter().copied(), &widths)?;
            }
        }
        write_rule(f, &widths)
    }
}
