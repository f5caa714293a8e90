//! Minimal tabular (CSV) reading and writing for score sheets.
//!
//! Rows are exposed as header-name → [`Cell`] maps so callers can address columns
//! by their localized header rather than by position.

use std::collections::HashMap;

use thiserror::Error;

const UTF8_BOM: char = '\u{feff}';

#[derive(Debug, Error)]
pub enum TabularError {
    #[error("file is not valid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("file has no header row")]
    MissingHeader,
    #[error("failed to write CSV: {0}")]
    Io(#[from] std::io::Error),
}

/// A single cell as read from a file. Cells keep their raw text; numeric
/// interpretation happens on demand through [`Cell::as_f64`].
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
}

impl Cell {
    /// Classify raw text read from a file. Text cells are kept verbatim so that
    /// identifiers such as `"03"` keep their leading zeros.
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn to_trimmed_string(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
        }
    }

    /// Parse the cell text as a finite number, if possible.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }
}

pub type Row = HashMap<String, Cell>;

/// A parsed sheet: the header row plus every data row in file order.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Headers from `required` that the sheet does not carry, in `required` order.
    pub fn missing_columns<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|name| !self.headers.iter().any(|h| h == name))
            .collect()
    }
}

/// Parse CSV bytes. Header names are trimmed and a leading UTF-8 BOM is dropped.
/// Rows with fewer fields than the header get [`Cell::Empty`] for the rest.
pub fn read_csv(data: &[u8]) -> Result<Table, TabularError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches(UTF8_BOM) } else { h };
            h.trim().to_string()
        })
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(TabularError::MissingHeader);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let row: Row = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let cell = record.get(i).map(Cell::from_raw).unwrap_or(Cell::Empty);
                (header.clone(), cell)
            })
            .collect();
        rows.push(row);
    }

    Ok(Table { headers, rows })
}

/// Serialize a header row and data rows to CSV, prefixed with a UTF-8 BOM so that
/// spreadsheet applications pick the right encoding.
pub fn write_csv<I, R>(headers: &[&str], rows: I) -> Result<Vec<u8>, TabularError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = String>,
{
    let mut buf = Vec::new();
    buf.extend_from_slice(UTF8_BOM.to_string().as_bytes());

    let mut writer = csv::Writer::from_writer(buf);
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row.into_iter().collect::<Vec<_>>())?;
    }

    writer.into_inner().map_err(|e| TabularError::Io(e.into_error()))
}
