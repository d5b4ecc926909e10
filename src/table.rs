//! The persisted versions table.
//!
//! The table is a CSV file with a `Version,Runtime,Date` header, newest
//! release first. The first release of every minor series (and the first
//! release built with every minor runtime) is emphasized as `**v1.23.0**`
//! so the file renders nicely as a markdown-ish table. Emphasis is
//! presentation only: it is stripped on load and recomputed on save.
//!
//! ```text
//! Version,Runtime,Date
//! v1.23.1,go1.19.5,2023-01-12
//! **v1.23.0**,go1.19.4,2023-01-10
//! v1.22.2,**go1.19.4**,2022-12-06
//! ```

use crate::error::TableError;
use crate::record::VersionRecord;
use std::collections::HashSet;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

const HEADER: [&str; 3] = ["Version", "Runtime", "Date"];
const EMPHASIS: &str = "**";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    rows: Vec<VersionRecord>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<VersionRecord>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[VersionRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row. Duplicate versions are the caller's problem.
    pub fn push(&mut self, row: VersionRecord) {
        self.rows.push(row);
    }

    /// Versions already present, for skipping known releases.
    pub fn versions(&self) -> HashSet<String> {
        self.rows.iter().filter_map(|r| r.version.clone()).collect()
    }

    /// Parse a table. The first row is the header; blank lines are skipped.
    /// Every data row must have exactly three fields.
    pub fn load<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            if record.len() != HEADER.len() {
                return Err(TableError::FieldCount {
                    line: record.position().map(|p| p.line()).unwrap_or(0),
                    fields: record.len(),
                });
            }
            rows.push(VersionRecord::new(
                strip_emphasis(&record[0]),
                strip_emphasis(&record[1]),
                strip_emphasis(&record[2]),
            ));
        }

        Ok(Self { rows })
    }

    /// Load from a file. A missing file is an empty table.
    pub fn load_path(path: &Path) -> Result<Self, TableError> {
        match fs::File::open(path) {
            Ok(file) => Self::load(io::BufReader::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the header and every row, sorted and emphasized.
    pub fn save<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(HEADER)?;
        for row in format_rows(&self.rows) {
            wtr.write_record(&row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Replace the file at `path` with this table.
    ///
    /// The table is written to a sibling temporary file which is then
    /// renamed over `path`; a failed write leaves the old file untouched.
    /// An existing file keeps its permissions; a new one gets the usual
    /// `0666 & !umask`.
    pub fn save_path(&self, path: &Path) -> Result<(), TableError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let existing = match fs::metadata(path) {
            Ok(meta) => Some(meta.permissions()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let mut builder = tempfile::Builder::new();
        builder.prefix(".histver");
        if let (None, Some(perms)) = (&existing, new_file_permissions()) {
            builder.permissions(perms);
        }
        let mut tmp = builder.tempfile_in(dir)?;
        if let Some(perms) = existing {
            fs::set_permissions(tmp.path(), perms)?;
        }

        self.save(io::BufWriter::new(tmp.as_file_mut()))?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Mode for a freshly created table, before the umask is applied.
#[cfg(unix)]
fn new_file_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o666))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<fs::Permissions> {
    None
}

fn strip_emphasis(field: &str) -> &str {
    field.trim_matches('*')
}

/// `v1.23.1` -> `v1.23`. Strings without a dot are returned unchanged.
pub fn minor_version(version: &str) -> &str {
    version
        .rsplit_once('.')
        .map(|(minor, _)| minor)
        .unwrap_or(version)
}

/// `go1.19.5` -> `go1.19`, while old two-component runtimes like `go1.2`
/// already are a minor version.
pub fn minor_runtime(runtime: &str) -> &str {
    if runtime.matches('.').count() == 1 {
        runtime
    } else {
        minor_version(runtime)
    }
}

/// Sort newest first and emphasize the first row of each minor series.
///
/// Sorting is by date descending, then version descending. Series starts
/// are found scanning oldest to newest, independently for the version and
/// runtime columns. Empty fields are never emphasized.
pub fn format_rows(rows: &[VersionRecord]) -> Vec<[String; 3]> {
    let mut sorted: Vec<&VersionRecord> = rows.iter().collect();
    sorted.sort_by(|a, b| {
        b.date_str()
            .cmp(a.date_str())
            .then_with(|| b.version_str().cmp(a.version_str()))
    });

    let mut out: Vec<[String; 3]> = sorted
        .iter()
        .map(|r| {
            [
                r.version_str().to_string(),
                r.runtime_str().to_string(),
                r.date_str().to_string(),
            ]
        })
        .collect();

    let mut prev_version_minor: Option<&str> = None;
    let mut prev_runtime_minor: Option<&str> = None;
    for (row, formatted) in sorted.iter().zip(out.iter_mut()).rev() {
        if let Some(runtime) = row.runtime.as_deref() {
            let minor = minor_runtime(runtime);
            if prev_runtime_minor != Some(minor) {
                prev_runtime_minor = Some(minor);
                formatted[1] = emphasize(runtime);
            }
        }
        if let Some(version) = row.version.as_deref() {
            let minor = minor_version(version);
            if prev_version_minor != Some(minor) {
                prev_version_minor = Some(minor);
                formatted[0] = emphasize(version);
            }
        }
    }

    out
}

fn emphasize(field: &str) -> String {
    format!("{EMPHASIS}{field}{EMPHASIS}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(version: &str, runtime: &str, date: &str) -> VersionRecord {
        VersionRecord::new(version, runtime, date)
    }

    #[test]
    fn test_minor_version() {
        assert_eq!(minor_version("v1.23.1"), "v1.23");
        assert_eq!(minor_version("v1.23"), "v1");
        assert_eq!(minor_version("nodots"), "nodots");
    }

    #[test]
    fn test_minor_runtime() {
        assert_eq!(minor_runtime("go1.19.5"), "go1.19");
        assert_eq!(minor_runtime("go1.2"), "go1.2");
        assert_eq!(minor_runtime("go1.21.0"), "go1.21");
    }

    #[test]
    fn test_format_sorts_by_date_then_version() {
        let rows = vec![
            row("v1.0.0", "go1.4", "2019-01-01"),
            row("v1.0.2", "go1.4", "2019-03-01"),
            row("v1.0.1", "go1.4", "2019-03-01"),
        ];
        let out = format_rows(&rows);
        let versions: Vec<_> = out.iter().map(|r| strip_emphasis(&r[0])).collect();
        assert_eq!(versions, ["v1.0.2", "v1.0.1", "v1.0.0"]);
    }

    #[test]
    fn test_format_emphasizes_first_of_each_minor() {
        let rows = vec![
            row("v1.3.0", "go1.16.1", "2021-03-01"),
            row("v1.2.0", "go1.15.7", "2021-01-01"),
            row("v1.2.1", "go1.15.8", "2021-02-01"),
        ];
        let out = format_rows(&rows);
        assert_eq!(out[0], ["**v1.3.0**", "**go1.16.1**", "2021-03-01"]);
        assert_eq!(out[1], ["v1.2.1", "go1.15.8", "2021-02-01"]);
        assert_eq!(out[2], ["**v1.2.0**", "**go1.15.7**", "2021-01-01"]);
    }

    #[test]
    fn test_format_runtime_columns_independent() {
        let rows = vec![
            row("v1.2.0", "go1.15.7", "2021-01-01"),
            row("v1.2.1", "go1.16.0", "2021-02-01"),
        ];
        let out = format_rows(&rows);
        assert_eq!(out[0], ["v1.2.1", "**go1.16.0**", "2021-02-01"]);
        assert_eq!(out[1], ["**v1.2.0**", "**go1.15.7**", "2021-01-01"]);
    }

    #[test]
    fn test_format_skips_empty_runtime() {
        let rows = vec![
            row("v1.2.0", "go1.15.7", "2021-01-01"),
            row("v1.2.1", "", "2021-02-01"),
            row("v1.2.2", "go1.15.8", "2021-03-01"),
        ];
        let out = format_rows(&rows);
        assert_eq!(out[1][1], "");
        assert_eq!(out[0][1], "go1.15.8");
    }

    #[test]
    fn test_load_strips_emphasis_and_skips_blank_lines() {
        let csv = "Version,Runtime,Date\n**v1.23.0**,**go1.19.4**,2023-01-10\n\nv1.22.2,go1.19.4,2022-12-06\n";
        let table = Table::load(csv.as_bytes()).unwrap();
        assert_eq!(
            table.rows(),
            &[
                row("v1.23.0", "go1.19.4", "2023-01-10"),
                row("v1.22.2", "go1.19.4", "2022-12-06"),
            ]
        );
    }

    #[test]
    fn test_load_short_row_is_error() {
        let csv = "Version,Runtime,Date\nv1.23.0,go1.19.4,2023-01-10\nv1.22.2,go1.19.4\n";
        let err = Table::load(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, TableError::FieldCount { line: 3, fields: 2 }));
    }

    #[test]
    fn test_load_long_row_is_error() {
        let csv = "Version,Runtime,Date\nv1.0.0,go1.13.8,2019-02-05,EXTRA\n";
        let err = Table::load(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, TableError::FieldCount { line: 2, fields: 4 }));
    }

    #[test]
    fn test_load_empty_input() {
        assert!(Table::load("".as_bytes()).unwrap().is_empty());
        assert!(Table::load("Version,Runtime,Date\n".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_save_writes_header_and_quotes() {
        let table = Table::from_rows(vec![row("v1,0", "go1.4", "2015-01-01")]);
        let mut buf = Vec::new();
        table.save(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "Version,Runtime,Date\n\"**v1,0**\",**go1.4**,2015-01-01\n");
    }

    #[test]
    fn test_versions_set() {
        let table = Table::from_rows(vec![
            row("v1.0.0", "go1.4", "2015-01-01"),
            VersionRecord::default(),
        ]);
        let versions = table.versions();
        assert_eq!(versions.len(), 1);
        assert!(versions.contains("v1.0.0"));
    }
}
