//! Loading claims CSVs and star-ratings workbooks into [`Table`]s.
//!
//! Load failures are caught here and nowhere else: [`load_or_empty`] turns
//! them into an empty table plus a diagnostic, so downstream metrics degrade
//! to empty results instead of aborting. [`DataCache`] parses each source at
//! most once until it is explicitly reloaded or invalidated.

use calamine::{Data, Reader, open_workbook_auto};
use chrono::NaiveTime;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::LoadError;
use crate::table::{Table, Value};

/// Identity of a data source; the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    Csv(PathBuf),
    Sheet { path: PathBuf, sheet: String },
}

impl Source {
    pub fn csv(path: impl Into<PathBuf>) -> Self {
        Source::Csv(path.into())
    }

    pub fn sheet(path: impl Into<PathBuf>, sheet: impl Into<String>) -> Self {
        Source::Sheet {
            path: path.into(),
            sheet: sheet.into(),
        }
    }

    /// Picks a loader from the file extension: `.xlsx`, `.xlsm`, `.xls` and
    /// `.ods` read `sheet`, anything else is treated as CSV.
    pub fn detect(path: impl Into<PathBuf>, sheet: &str) -> Self {
        let path = path.into();
        let is_workbook = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| {
                matches!(
                    e.to_ascii_lowercase().as_str(),
                    "xlsx" | "xlsm" | "xls" | "ods"
                )
            });
        if is_workbook {
            Source::sheet(path, sheet)
        } else {
            Source::Csv(path)
        }
    }

    /// Reads the source from disk.
    pub fn load(&self) -> Result<Table, LoadError> {
        match self {
            Source::Csv(path) => load_csv(path),
            Source::Sheet { path, sheet } => load_sheet(path, sheet),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Csv(path) => write!(f, "{}", path.display()),
            Source::Sheet { path, sheet } => write!(f, "{}#{}", path.display(), sheet),
        }
    }
}

/// Reads a CSV file with a header row. Cell types are inferred per cell.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_csv(path: &Path) -> Result<Table, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(csv_err)?;

    let headers = rdr.headers().map_err(csv_err)?.clone();
    let mut table = Table::new(headers.iter());

    for result in rdr.records() {
        let record = result.map_err(csv_err)?;
        table.push_row(record.iter().map(Value::parse).collect());
    }

    debug!(rows = table.len(), columns = table.columns().len(), "CSV loaded");
    Ok(table)
}

/// Reads one sheet of a workbook. The first row is the header.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_sheet(path: &Path, sheet: &str) -> Result<Table, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let mut workbook = open_workbook_auto(path).map_err(|e| LoadError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Err(LoadError::MissingSheet {
            path: path.to_path_buf(),
            sheet: sheet.to_string(),
        });
    }

    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| LoadError::Workbook {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let table = range_to_table(range.rows());
    debug!(rows = table.len(), columns = table.columns().len(), "Sheet loaded");
    Ok(table)
}

/// Reads every sheet of a workbook, keyed by sheet name.
pub fn load_workbook(path: &Path) -> Result<HashMap<String, Table>, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let mut workbook = open_workbook_auto(path).map_err(|e| LoadError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut sheets = HashMap::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| LoadError::Workbook {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        sheets.insert(name, range_to_table(range.rows()));
    }

    Ok(sheets)
}

fn range_to_table<'a>(mut rows: impl Iterator<Item = &'a [Data]>) -> Table {
    let Some(header) = rows.next() else {
        return Table::empty();
    };

    let mut table = Table::new(header.iter().map(|c| cell_value(c).to_string()));
    for row in rows {
        table.push_row(row.iter().map(cell_value).collect());
    }
    table
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Missing,
        Data::Int(i) => Value::number(*i as f64),
        Data::Float(f) => Value::from_option(Some(*f)),
        Data::Bool(b) => Value::Text(b.to_string()),
        Data::String(s) => Value::parse(s),
        // Dates become ISO text so service dates parse like CSV ones
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(dt) if dt.time() == NaiveTime::MIN => {
                Value::Text(dt.format("%Y-%m-%d").to_string())
            }
            Some(dt) => Value::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Value::Missing,
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.trim().to_string()),
    }
}

/// A loaded table, or an empty one plus the reason it could not be loaded.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub table: Arc<Table>,
    pub diagnostic: Option<String>,
}

impl Loaded {
    pub fn is_ok(&self) -> bool {
        self.diagnostic.is_none()
    }
}

/// Loads `source`, converting any [`LoadError`] into an empty table and a
/// logged diagnostic.
pub fn load_or_empty(source: &Source) -> Loaded {
    match source.load() {
        Ok(table) => {
            info!(source = %source, rows = table.len(), "Source loaded");
            Loaded {
                table: Arc::new(table),
                diagnostic: None,
            }
        }
        Err(e) => {
            warn!(source = %source, error = %e, "Source failed to load, using empty table");
            Loaded {
                table: Arc::new(Table::empty()),
                diagnostic: Some(e.to_string()),
            }
        }
    }
}

/// Memoizes loads by [`Source`].
///
/// Cached tables are shared read-only through [`Arc`].
#[derive(Debug, Default)]
pub struct DataCache {
    entries: HashMap<Source, Loaded>,
    parses: usize,
}

impl DataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached load of `source`, parsing it on first use.
    pub fn load_once(&mut self, source: &Source) -> Loaded {
        if let Some(loaded) = self.entries.get(source) {
            debug!(source = %source, "Cache hit");
            return loaded.clone();
        }
        self.reload(source)
    }

    /// Parses `source` again and replaces the cached entry.
    pub fn reload(&mut self, source: &Source) -> Loaded {
        let loaded = load_or_empty(source);
        self.parses += 1;
        self.entries.insert(source.clone(), loaded.clone());
        loaded
    }

    /// Opens the workbook at `path` once and caches every sheet, so later
    /// [`load_once`](Self::load_once) calls for its sheets skip the disk.
    /// Returns the number of sheets cached; on failure nothing is cached and
    /// each sheet load reports its own diagnostic.
    pub fn preload_workbook(&mut self, path: &Path) -> usize {
        let sheets = match load_workbook(path) {
            Ok(sheets) => sheets,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Workbook preload failed");
                return 0;
            }
        };
        self.parses += 1;

        let count = sheets.len();
        for (sheet, table) in sheets {
            debug!(path = %path.display(), sheet, rows = table.len(), "Sheet cached");
            self.entries.insert(
                Source::sheet(path, sheet),
                Loaded {
                    table: Arc::new(table),
                    diagnostic: None,
                },
            );
        }
        info!(path = %path.display(), sheets = count, "Workbook loaded");
        count
    }

    /// Drops the cached entry for `source`. Returns whether one existed.
    pub fn invalidate(&mut self, source: &Source) -> bool {
        self.entries.remove(source).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_cached(&self, source: &Source) -> bool {
        self.entries.contains_key(source)
    }

    /// Number of times a source was actually read from disk.
    pub fn parse_count(&self) -> usize {
        self.parses
    }
}
