//! # **Print Module** - *Pretty Printing with Attitude*
//!
//! Contains the `Display` helpers for record batches and tables, and the
//! `Print` trait which wraps `Display` to provide `myobj.print()`.
use std::fmt::{self, Display, Formatter};

use crate::enums::value::Value;
use crate::structs::views::ArrayView;

pub(crate) const MAX_PREVIEW: usize = 50;

/// # Print
///
/// Loaded print trait for pretty printing batches and tables.
///
/// Avoids the need to write `println!("{}", batch);`
pub trait Print {
    #[inline]
    fn print(&self)
    where
        Self: Display,
    {
        println!("{}", self);
    }
}

impl<T: Display> Print for T where T: Display {}

// Helper functions

pub(crate) fn value_to_string(view: &ArrayView<'_>, idx: usize) -> String {
    match view.value(idx) {
        Ok(Value::Float32(v)) => format_float(v as f64),
        Ok(Value::Float64(v)) => format_float(v),
        Ok(Value::Utf8(s)) => s,
        Ok(v) => v.to_string(),
        Err(_) => "<invalid>".into(),
    }
}

/// `+-----+------+` border; `widths` includes the row-index column.
pub(crate) fn write_rule(f: &mut Formatter<'_>, widths: &[usize]) -> fmt::Result {
    f.write_str("+")?;
    for &w in widths {
        write!(f, "{}+", "-".repeat(w + 2))?;
    }
    writeln!(f)
}

/// One table line. The first cell is the row index, right aligned; the rest
/// are centred.
pub(crate) fn write_cells<'c>(
    f: &mut Formatter<'_>,
    cells: impl IntoIterator<Item = &'c str>,
    widths: &[usize],
) -> fmt::Result {
    f.write_str("|")?;
    for (i, (cell, &w)) in cells.into_iter().zip(widths).enumerate() {
        if i == 0 {
            write!(f, " {cell:>w$} |")?;
        } else {
            write!(f, " {cell:^w$} |")?;
        }
    }
    writeln!(f)
}

pub(crate) fn format_float(v: f64) -> String {
    let s = format!("{:.6}", v);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float_trims() {
        assert_eq!(format_float(10.0), "10");
        assert_eq!(format_float(12.5), "12.5");
        assert_eq!(format_float(1.0 / 3.0), "0.333333");
    }
}
