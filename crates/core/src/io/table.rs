//! Transition tables as CSV
//!
//! One header row with the period fields followed by `area_ha`, then one row
//! per transition history. Areas are written with 4 decimal places; null
//! classes are written as `NULL`.

use crate::error::{Error, Result};
use crate::vector::ClassValue;
use std::io::{BufRead, Write};

/// Name of the trailing area column
pub const AREA_COLUMN: &str = "area_ha";

/// A parsed transition row: class history and area in hectares
pub type TransitionRow = (Vec<ClassValue>, f64);

/// Write a transition table.
///
/// Every history must have one class per field.
pub fn write_transition_csv<W, I, K>(mut writer: W, fields: &[String], rows: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = (K, f64)>,
    K: AsRef<[ClassValue]>,
{
    let header: Vec<&str> = fields
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(AREA_COLUMN))
        .collect();
    writeln!(writer, "{}", header.join(","))?;

    for (history, area) in rows {
        let history = history.as_ref();
        if history.len() != fields.len() {
            return Err(Error::InvalidParameter {
                name: "history",
                value: history.len().to_string(),
                reason: format!("expected {} class value(s)", fields.len()),
            });
        }
        for class in history {
            write!(writer, "{},", class)?;
        }
        writeln!(writer, "{:.4}", area)?;
    }

    writer.flush()?;
    Ok(())
}

/// Read a transition table written by [`write_transition_csv`].
///
/// Returns the period fields and the rows.
pub fn read_transition_csv<R: BufRead>(reader: R) -> Result<(Vec<String>, Vec<TransitionRow>)> {
    let mut lines = reader.lines();
    let header = lines
        .next()
        .transpose()?
        .ok_or_else(|| Error::Other("empty transition table".into()))?;
    let mut fields: Vec<String> = header.split(',').map(|s| s.trim().to_string()).collect();
    if fields.pop().as_deref() != Some(AREA_COLUMN) {
        return Err(Error::MissingField {
            field: AREA_COLUMN.to_string(),
            layer: "transition table".to_string(),
        });
    }

    let mut rows = Vec::new();
    for (lineno, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        let bad_row = |reason: String| Error::InvalidAttribute {
            field: AREA_COLUMN.to_string(),
            index: lineno + 1,
            reason,
        };
        let Some((area, classes)) = cells.split_last() else {
            continue;
        };
        if classes.len() != fields.len() {
            return Err(bad_row(format!("expected {} columns", fields.len() + 1)));
        }
        let area: f64 = area
            .parse()
            .map_err(|_| bad_row(format!("'{}' is not a number", area)))?;
        let history = classes
            .iter()
            .map(|c| match *c {
                "NULL" | "" => Ok(ClassValue::Null),
                c => c
                    .parse()
                    .map(ClassValue::Class)
                    .map_err(|_| bad_row(format!("'{}' is not a class id", c))),
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push((history, area));
    }

    Ok((fields, rows))
}
