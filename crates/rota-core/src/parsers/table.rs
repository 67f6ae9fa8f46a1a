//! Tabular inputs and the shared column normalization.

use super::ParseError;
use crate::models::{in_range, PointRecord};
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use std::io::Cursor;

/// Canonical column order handed downstream.
pub const REQUIRED_COLUMNS: [&str; 3] = ["NOME", "LATITUDE", "LONGITUDE"];

const SYNONYMS: &[(&str, &str)] = &[
    ("NOME", "NOME"),
    ("NAME", "NOME"),
    ("LATITUDE", "LATITUDE"),
    ("LAT", "LATITUDE"),
    ("Y", "LATITUDE"),
    ("LONGITUDE", "LONGITUDE"),
    ("LON", "LONGITUDE"),
    ("LONG", "LONGITUDE"),
    ("X", "LONGITUDE"),
];

/// Header row plus string cells, before any typing.
#[derive(Debug, Clone, Default)]
pub(crate) struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

/// One data row. `number` is 1-based and counts source rows below the
/// header, so it survives rows the reader never hands over.
#[derive(Debug, Clone)]
pub(crate) struct Row {
    pub number: usize,
    pub cells: Vec<String>,
}

/// Normalize a header: trim, drop spaces/hyphens/underscores, upper-case,
/// then map known synonyms. Unknown headers come back normalized but unmapped.
pub fn canonical_column(header: &str) -> String {
    let squashed: String = header
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_' | '\u{feff}'))
        .collect::<String>()
        .to_uppercase();
    SYNONYMS
        .iter()
        .find(|(alias, _)| *alias == squashed)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(squashed)
}

/// Locate NOME, LATITUDE and LONGITUDE and type every row.
pub(crate) fn records_from_table(table: &Table) -> Result<Vec<PointRecord>, ParseError> {
    let mut positions: [Option<usize>; 3] = [None; 3];

    for (idx, header) in table.headers.iter().enumerate() {
        let canonical = canonical_column(header);
        let Some(slot) = REQUIRED_COLUMNS.iter().position(|c| *c == canonical) else {
            continue;
        };
        if let Some(previous) = positions[slot] {
            return Err(ParseError::AmbiguousColumns {
                canonical,
                first: table.headers[previous].clone(),
                second: header.clone(),
            });
        }
        positions[slot] = Some(idx);
    }

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .zip(positions.iter())
        .filter(|(_, position)| position.is_none())
        .map(|(name, _)| name.to_string())
        .collect();
    let (Some(name_col), Some(lat_col), Some(lon_col)) = (positions[0], positions[1], positions[2])
    else {
        return Err(ParseError::MissingColumns { missing });
    };

    let mut records = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let row_number = row.number;
        let cell = |col: usize| row.cells.get(col).map(|value| value.trim()).unwrap_or("");

        let latitude = parse_float(row_number, "LATITUDE", cell(lat_col))?;
        let longitude = parse_float(row_number, "LONGITUDE", cell(lon_col))?;
        if !in_range(latitude, longitude) {
            return Err(ParseError::RowParse {
                row: row_number,
                column: "LATITUDE/LONGITUDE".to_string(),
                value: format!("{}, {}", latitude, longitude),
                reason: "outside [-90, 90] / [-180, 180]".to_string(),
            });
        }

        records.push(PointRecord {
            name: cell(name_col).to_string(),
            latitude,
            longitude,
        });
    }
    Ok(records)
}

fn parse_float(row: usize, column: &str, value: &str) -> Result<f64, ParseError> {
    value.parse::<f64>().map_err(|err| ParseError::RowParse {
        row,
        column: column.to_string(),
        value: value.to_string(),
        reason: err.to_string(),
    })
}

/// Comma by default; semicolon when the header line only uses that.
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let header_line = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    if !header_line.contains(&b',') && header_line.contains(&b';') {
        b';'
    } else {
        b','
    }
}

pub fn parse_csv(bytes: &[u8]) -> Result<Vec<PointRecord>, ParseError> {
    let malformed = |err: csv::Error| ParseError::MalformedDocument {
        format: "CSV",
        reason: err.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(bytes))
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(malformed)?
        .iter()
        .map(str::to_string)
        .collect();

    // Empty lines are not records but still count towards row numbers.
    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(malformed)?;
        let number = record
            .position()
            .map(|position| (position.line() as usize).saturating_sub(1))
            .unwrap_or(idx + 1);
        rows.push(Row {
            number,
            cells: record.iter().map(str::to_string).collect(),
        });
    }

    records_from_table(&Table { headers, rows })
}

/// Read the first worksheet of an `.xlsx` workbook.
pub fn parse_xlsx(bytes: &[u8]) -> Result<Vec<PointRecord>, ParseError> {
    let malformed = |reason: String| ParseError::MalformedDocument {
        format: "XLSX",
        reason,
    };

    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|err: calamine::XlsxError| malformed(err.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| malformed("workbook has no worksheets".to_string()))?
        .map_err(|err| malformed(err.to_string()))?;

    let mut rows = range.rows().map(|cells| {
        cells
            .iter()
            .map(|cell| match cell {
                Data::Empty => String::new(),
                other => other.to_string(),
            })
            .collect::<Vec<String>>()
    });

    let headers = rows.next().unwrap_or_default();
    let rows = rows
        .enumerate()
        .map(|(idx, cells)| Row {
            number: idx + 1,
            cells,
        })
        .collect();

    records_from_table(&Table { headers, rows })
}
