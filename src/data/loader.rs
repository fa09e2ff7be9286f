use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use calamine::{open_workbook_auto, Data, Reader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Reading, Timing, VariantDataset, VariantRecord, NOT_MEASURED};
use crate::error::{ChartError, ChartResult};

/// File name prefix of the per-variant tables: `early_late_var<N>.<ext>`.
pub const TABLE_PREFIX: &str = "early_late_var";

/// Supported table extensions, in the order they are tried.
pub const TABLE_EXTENSIONS: [&str; 6] = ["csv", "tsv", "txt", "parquet", "pq", "json"];

// ---------------------------------------------------------------------------
// One variant table: instrument row key → early/late pair
// ---------------------------------------------------------------------------

/// The rows of a single `early_late_var<N>` table, before instrument lookup.
#[derive(Debug, Clone)]
pub struct TableRows {
    pub source: String,
    pub rows: Vec<(String, Reading)>,
}

impl TableRows {
    fn new(path: &Path) -> Self {
        TableRows {
            source: display_name(path),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, key: &str, reading: Reading) -> ChartResult<()> {
        let key = key.trim();
        if self.rows.iter().any(|(k, _)| k == key) {
            return Err(ChartError::malformed(
                &self.source,
                format!("instrument '{key}' appears more than once"),
            ));
        }
        self.rows.push((key.to_string(), reading));
        Ok(())
    }

    /// Reading of one instrument, failing loudly when the row is absent.
    pub fn reading(&self, instrument: &str) -> ChartResult<Reading> {
        self.rows
            .iter()
            .find(|(k, _)| k == instrument.trim())
            .map(|(_, r)| *r)
            .ok_or_else(|| {
                ChartError::missing(format!(
                    "{}: no row for instrument '{instrument}'",
                    self.source
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load one variant table.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`            – comma-delimited, first column is the instrument
/// * `.tsv` / `.txt`   – same, tab-delimited
/// * `.parquet` / `.pq`– first Utf8 column is the instrument, `early` / `late` numeric
/// * `.json`           – `{ "<instrument>": { "early": 40, "late": 60 }, ... }`
pub fn load_table(path: &Path) -> ChartResult<TableRows> {
    if !path.is_file() {
        return Err(ChartError::missing(format!(
            "table {} does not exist",
            path.display()
        )));
    }
    match extension_of(path).as_str() {
        "csv" => load_delimited(path, b','),
        "tsv" | "txt" => load_delimited(path, b'\t'),
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        other => Err(ChartError::malformed(
            display_name(path),
            format!("unsupported file extension: .{other}"),
        )),
    }
}

/// Load one table per variant and pick the declared instruments out of each.
pub fn load_tables(files: &[(u32, PathBuf)], instruments: &[String]) -> ChartResult<VariantDataset> {
    let mut records = Vec::with_capacity(files.len());
    for (variant, path) in files {
        let table = load_table(path)?;
        let readings = instruments
            .iter()
            .map(|name| table.reading(name))
            .collect::<ChartResult<Vec<_>>>()?;

        let ignored = table
            .rows
            .iter()
            .filter(|(k, _)| !instruments.iter().any(|i| i.trim() == k.as_str()))
            .count();
        if ignored > 0 {
            log::debug!("{}: ignoring {ignored} undeclared instrument rows", table.source);
        }

        records.push(VariantRecord {
            variant: *variant,
            readings,
        });
    }
    log::info!(
        "Loaded {} variant tables for {} instruments",
        records.len(),
        instruments.len()
    );
    Ok(VariantDataset::new(instruments.to_vec(), records))
}

/// Variant number and extension of a table file name, if it follows the
/// `early_late_var<N>.<ext>` convention with a supported extension.
pub fn parse_table_name(file_name: &str) -> Option<(u32, String)> {
    let rest = file_name.strip_prefix(TABLE_PREFIX)?;
    let (num, ext) = rest.split_once('.')?;
    let variant = num.parse::<u32>().ok()?;
    let ext = ext.to_ascii_lowercase();
    TABLE_EXTENSIONS.contains(&ext.as_str()).then_some((variant, ext))
}

/// Find every variant table in `dir`, ordered by variant number.
///
/// When a variant exists in several formats the first extension of
/// [`TABLE_EXTENSIONS`] wins.
pub fn discover_tables(dir: &Path) -> ChartResult<Vec<(u32, PathBuf)>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ChartError::missing(format!("data directory {} does not exist", dir.display()))
        } else {
            ChartError::io(dir, e)
        }
    })?;

    let mut found: Vec<(u32, usize, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ChartError::io(dir, e))?;
        let name = entry.file_name();
        let Some((variant, ext)) = parse_table_name(&name.to_string_lossy()) else {
            continue;
        };
        let rank = TABLE_EXTENSIONS
            .iter()
            .position(|e| *e == ext)
            .unwrap_or(TABLE_EXTENSIONS.len());
        found.push((variant, rank, entry.path()));
    }
    found.sort();

    let mut tables: Vec<(u32, PathBuf)> = Vec::with_capacity(found.len());
    for (variant, _, path) in found {
        if tables.last().is_some_and(|(v, _)| *v == variant) {
            log::warn!("Ignoring {}: variant {variant} already loaded", path.display());
            continue;
        }
        tables.push((variant, path));
    }

    if tables.is_empty() {
        return Err(ChartError::missing(format!(
            "no {TABLE_PREFIX}<N> tables in {}",
            dir.display()
        )));
    }
    Ok(tables)
}

/// Locate the table of each requested variant in `dir`, keeping the given order.
pub fn resolve_tables(dir: &Path, variants: &[u32]) -> ChartResult<Vec<(u32, PathBuf)>> {
    variants
        .iter()
        .map(|&variant| {
            TABLE_EXTENSIONS
                .iter()
                .map(|ext| dir.join(format!("{TABLE_PREFIX}{variant}.{ext}")))
                .find(|p| p.is_file())
                .map(|p| (variant, p))
                .ok_or_else(|| {
                    ChartError::missing(format!(
                        "no table for variant {variant} ({TABLE_PREFIX}{variant}.csv) in {}",
                        dir.display()
                    ))
                })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Delimited loader
// ---------------------------------------------------------------------------

/// Layout: header row, first column the instrument name (header usually
/// blank), columns `early` and `late` anywhere after it.
fn load_delimited(path: &Path, delimiter: u8) -> ChartResult<TableRows> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let early_idx = header_index(&headers, Timing::Early, path)?;
    let late_idx = header_index(&headers, Timing::Late, path)?;

    let mut table = TableRows::new(path);
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| csv_error(path, e))?;
        let key = record.get(0).unwrap_or("");
        if key.is_empty() {
            return Err(ChartError::malformed(
                format!("{}, row {}", table.source, row_no + 1),
                "row has no instrument name",
            ));
        }
        let location = |timing: Timing| format!("{}, {key}, {}", table.source, timing.column());
        let early = parse_percentage(record.get(early_idx).unwrap_or(""), &location(Timing::Early))?;
        let late = parse_percentage(record.get(late_idx).unwrap_or(""), &location(Timing::Late))?;
        table.push(key, Reading { early, late })?;
    }
    Ok(table)
}

/// Read failures stay I/O; anything the parser rejects is bad data.
fn csv_error(path: &Path, e: csv::Error) -> ChartError {
    if matches!(e.kind(), csv::ErrorKind::Io(_)) {
        ChartError::io(path, e)
    } else {
        ChartError::malformed(display_name(path), e.to_string())
    }
}

fn header_index(headers: &[String], timing: Timing, path: &Path) -> ChartResult<usize> {
    headers
        .iter()
        .skip(1)
        .position(|h| h.trim().eq_ignore_ascii_case(timing.column()))
        .map(|i| i + 1)
        .ok_or_else(|| {
            ChartError::missing(format!(
                "{}: no '{}' column",
                display_name(path),
                timing.column()
            ))
        })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (index-oriented, the default `df.to_json(orient='index')`):
///
/// ```json
/// {
///   "China MGISEQ-2000": { "early": 40.0, "late": 12.5 },
///   "DE MiniSeq":        { "early": -1,   "late": 30.0 }
/// }
/// ```
fn load_json(path: &Path) -> ChartResult<TableRows> {
    let text = std::fs::read_to_string(path).map_err(|e| ChartError::io(path, e))?;
    let root: JsonValue = serde_json::from_str(&text)
        .map_err(|e| ChartError::malformed(display_name(path), format!("invalid JSON: {e}")))?;

    let mut table = TableRows::new(path);
    let rows = root
        .as_object()
        .ok_or_else(|| ChartError::malformed(&table.source, "expected a top-level JSON object"))?;

    for (key, row) in rows {
        let early = json_percentage(row, Timing::Early, &table.source, key)?;
        let late = json_percentage(row, Timing::Late, &table.source, key)?;
        table.push(key, Reading { early, late })?;
    }
    Ok(table)
}

fn json_percentage(row: &JsonValue, timing: Timing, source: &str, key: &str) -> ChartResult<f64> {
    let location = format!("{source}, {key}, {}", timing.column());
    let cell = row
        .as_object()
        .ok_or_else(|| ChartError::malformed(&location, "row is not a JSON object"))?
        .get(timing.column())
        .ok_or_else(|| ChartError::missing(format!("{source}: no '{}' column", timing.column())))?;
    match cell {
        JsonValue::Number(n) => {
            let v = n
                .as_f64()
                .ok_or_else(|| ChartError::malformed(&location, format!("'{n}' is not a number")))?;
            check_range(v, &location)
        }
        JsonValue::String(s) => parse_percentage(s, &location),
        other => Err(ChartError::malformed(&location, format!("'{other}' is not a number"))),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Expected schema:
/// - the first Utf8 / LargeUtf8 column holds the instrument name
///   (Pandas writes a string index as `__index_level_0__`)
/// - `early`, `late`: Int32 / Int64 / Float32 / Float64
fn load_parquet(path: &Path) -> ChartResult<TableRows> {
    let file = std::fs::File::open(path).map_err(|e| ChartError::io(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| ChartError::io(path, format!("reading parquet metadata: {e}")))?;
    let reader = builder
        .build()
        .map_err(|e| ChartError::io(path, format!("building parquet reader: {e}")))?;

    let mut table = TableRows::new(path);

    for batch_result in reader {
        let batch = batch_result.map_err(|e| ChartError::io(path, e))?;
        let schema = batch.schema();

        let key_idx = schema
            .fields()
            .iter()
            .position(|f| matches!(f.data_type(), DataType::Utf8 | DataType::LargeUtf8))
            .ok_or_else(|| {
                ChartError::missing(format!("{}: no instrument name column", table.source))
            })?;
        let column_of = |timing: Timing| {
            schema
                .fields()
                .iter()
                .position(|f| f.name().eq_ignore_ascii_case(timing.column()))
                .ok_or_else(|| {
                    ChartError::missing(format!("{}: no '{}' column", table.source, timing.column()))
                })
        };
        let early_col = batch.column(column_of(Timing::Early)?);
        let late_col = batch.column(column_of(Timing::Late)?);
        let key_col = batch.column(key_idx);

        for row in 0..batch.num_rows() {
            let key = extract_string(key_col, row).ok_or_else(|| {
                ChartError::malformed(format!("{}, row {}", table.source, row + 1), "null instrument name")
            })?;
            let location = |timing: Timing| format!("{}, {key}, {}", table.source, timing.column());
            let early = extract_percentage(early_col, row, &location(Timing::Early))?;
            let late = extract_percentage(late_col, row, &location(Timing::Late))?;
            table.push(&key, Reading { early, late })?;
        }
    }

    Ok(table)
}

// -- Parquet / Arrow helpers --

fn extract_string(col: &Arc<dyn Array>, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Utf8 => Some(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Some(col.as_string::<i64>().value(row).to_string()),
        _ => None,
    }
}

fn extract_percentage(col: &Arc<dyn Array>, row: usize, location: &str) -> ChartResult<f64> {
    if col.is_null(row) {
        return Err(ChartError::malformed(location, "empty cell"));
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Float64 => any.downcast_ref::<Float64Array>().map(|a| a.value(row)),
        DataType::Float32 => any.downcast_ref::<Float32Array>().map(|a| a.value(row) as f64),
        DataType::Int64 => any.downcast_ref::<Int64Array>().map(|a| a.value(row) as f64),
        DataType::Int32 => any.downcast_ref::<Int32Array>().map(|a| a.value(row) as f64),
        _ => None,
    };
    match value {
        Some(v) => check_range(v, location),
        None => Err(ChartError::malformed(
            location,
            format!("column type {:?} is not numeric", col.data_type()),
        )),
    }
}

// ---------------------------------------------------------------------------
// Workbook loader
// ---------------------------------------------------------------------------

/// A worksheet cell, detached from the spreadsheet library.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl From<&Data> for Cell {
    fn from(d: &Data) -> Self {
        match d {
            Data::Empty => Cell::Empty,
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }
}

/// Load a workbook laid out as: header row `<blank> | early var16 | late var16 | ...`,
/// then one row per instrument.
///
/// `sheet` defaults to the first worksheet; `variants` defaults to every
/// variant of the header, in header order.
pub fn load_workbook(
    path: &Path,
    sheet: Option<&str>,
    instruments: &[String],
    variants: Option<&[u32]>,
) -> ChartResult<VariantDataset> {
    if !path.is_file() {
        return Err(ChartError::missing(format!(
            "workbook {} does not exist",
            path.display()
        )));
    }
    let mut workbook = open_workbook_auto(path).map_err(|e| ChartError::io(path, e))?;
    let sheet_names = workbook.sheet_names();
    let sheet_name = match sheet {
        Some(name) if sheet_names.iter().any(|s| s == name) => name.to_string(),
        Some(name) => {
            return Err(ChartError::missing(format!(
                "{}: no worksheet named '{name}'",
                path.display()
            )))
        }
        None => sheet_names.first().cloned().ok_or_else(|| {
            ChartError::missing(format!("{}: workbook has no worksheets", path.display()))
        })?,
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ChartError::io(path, e))?;

    let rows: Vec<Vec<Cell>> = range
        .rows()
        .map(|row| row.iter().map(Cell::from).collect())
        .collect();

    let source = format!("{} [{sheet_name}]", display_name(path));
    let dataset = parse_workbook_rows(&rows, &source, instruments, variants)?;
    log::info!(
        "Loaded {} variants for {} instruments from {source}",
        dataset.len(),
        instruments.len()
    );
    Ok(dataset)
}

/// Interpret worksheet rows; see [`load_workbook`] for the layout.
pub fn parse_workbook_rows(
    rows: &[Vec<Cell>],
    source: &str,
    instruments: &[String],
    variants: Option<&[u32]>,
) -> ChartResult<VariantDataset> {
    let header = rows
        .first()
        .ok_or_else(|| ChartError::missing(format!("{source}: worksheet is empty")))?;

    let columns: Vec<(usize, Timing, u32)> = header
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(j, cell)| match cell {
            Cell::Text(s) => parse_workbook_header(s).map(|(t, v)| (j, t, v)),
            _ => None,
        })
        .collect();

    let column_for = |timing: Timing, variant: u32| {
        columns
            .iter()
            .find(|(_, t, v)| *t == timing && *v == variant)
            .map(|(j, _, _)| *j)
            .ok_or_else(|| {
                ChartError::missing(format!(
                    "{source}: no '{} var{variant}' column",
                    timing.column()
                ))
            })
    };

    let order: Vec<u32> = match variants {
        Some(v) => v.to_vec(),
        None => {
            let mut seen = Vec::new();
            for (_, timing, variant) in &columns {
                if *timing == Timing::Early && !seen.contains(variant) {
                    seen.push(*variant);
                }
            }
            seen
        }
    };
    if order.is_empty() {
        return Err(ChartError::missing(format!(
            "{source}: header has no 'early var<N>' columns"
        )));
    }

    let instrument_rows = instruments
        .iter()
        .map(|name| {
            let mut matching = rows
                .iter()
                .skip(1)
                .filter(|row| matches!(row.first(), Some(Cell::Text(s)) if s.trim() == name.trim()));
            let row = matching.next().ok_or_else(|| {
                ChartError::missing(format!("{source}: no row for instrument '{name}'"))
            })?;
            if matching.next().is_some() {
                return Err(ChartError::malformed(
                    source,
                    format!("instrument '{name}' appears more than once"),
                ));
            }
            Ok(row)
        })
        .collect::<ChartResult<Vec<_>>>()?;

    let mut records = Vec::with_capacity(order.len());
    for variant in order {
        let early_col = column_for(Timing::Early, variant)?;
        let late_col = column_for(Timing::Late, variant)?;
        let readings = instruments
            .iter()
            .zip(&instrument_rows)
            .map(|(name, row)| {
                let cell = |col: usize, timing: Timing| {
                    let location = format!("{source}, {name}, {} var{variant}", timing.column());
                    cell_percentage(row.get(col).unwrap_or(&Cell::Empty), &location)
                };
                Ok(Reading {
                    early: cell(early_col, Timing::Early)?,
                    late: cell(late_col, Timing::Late)?,
                })
            })
            .collect::<ChartResult<Vec<_>>>()?;
        records.push(VariantRecord { variant, readings });
    }

    Ok(VariantDataset::new(instruments.to_vec(), records))
}

/// `"early var16"` → `(Early, 16)`; also accepts `early_var16`.
pub fn parse_workbook_header(s: &str) -> Option<(Timing, u32)> {
    let lower = s.trim().to_ascii_lowercase();
    let (timing, rest) = lower.split_once([' ', '_'])?;
    let timing = timing.parse::<Timing>().ok()?;
    let variant = rest.trim().strip_prefix("var")?.trim().parse::<u32>().ok()?;
    Some((timing, variant))
}

fn cell_percentage(cell: &Cell, location: &str) -> ChartResult<f64> {
    match cell {
        Cell::Number(v) => check_range(*v, location),
        Cell::Text(s) => parse_percentage(s, location),
        Cell::Empty => Err(ChartError::malformed(location, "empty cell")),
    }
}

// ---------------------------------------------------------------------------
// Cell validation
// ---------------------------------------------------------------------------

fn parse_percentage(raw: &str, location: &str) -> ChartResult<f64> {
    let tok = raw.trim();
    if tok.is_empty() {
        return Err(ChartError::malformed(location, "empty cell"));
    }
    let v = tok
        .parse::<f64>()
        .map_err(|_| ChartError::malformed(location, format!("'{tok}' is not a number")))?;
    check_range(v, location)
}

/// Accept the sentinel or a percentage in [0, 100].
fn check_range(v: f64, location: &str) -> ChartResult<f64> {
    if v == NOT_MEASURED || (0.0..=100.0).contains(&v) {
        Ok(v)
    } else {
        Err(ChartError::malformed(
            location,
            format!("{v} is outside 0-100 and is not the not-measured marker ({NOT_MEASURED})"),
        ))
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
