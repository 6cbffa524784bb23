//! Row sources for the command-line tool.
//!
//! The extraction core only needs rows in document order; these loaders
//! cover tables already exported from the schedule (CSV or JSON) and page
//! text dumped one line per row.

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use tracing::info;
use walkdir::WalkDir;

use crate::error::ExtractError;
use crate::pipeline::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Comma-separated table, no header row, ragged rows allowed.
    Csv,
    /// `[["cell", "cell"], …]` or `["line", …]`, nulls allowed in cells.
    Json,
    /// Plain text, one row per line.
    Lines,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "txt" => Some(Self::Lines),
            _ => None,
        }
    }
}

impl FromStr for InputFormat {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "lines" | "txt" => Ok(Self::Lines),
            other => Err(ExtractError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonRow {
    Cells(Vec<Option<String>>),
    Line(String),
}

/// Load rows from a file, or from every recognized file in a directory
/// (sorted by name, concatenated). `format` overrides the extension.
pub fn load_rows(path: &Path, format: Option<InputFormat>) -> Result<Vec<Row>, ExtractError> {
    if !path.is_dir() {
        let format = match format.or_else(|| InputFormat::from_path(path)) {
            Some(f) => f,
            None => {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                return Err(ExtractError::UnknownFormat(ext.to_string()));
            }
        };
        return load_file(path, format);
    }

    let mut rows = Vec::new();
    for entry in WalkDir::new(path)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let file = entry.path();
        if !file.is_file() {
            continue;
        }
        let Some(file_format) = format.or_else(|| InputFormat::from_path(file)) else {
            continue;
        };
        if format.is_some() && InputFormat::from_path(file).is_none() {
            continue;
        }
        rows.extend(load_file(file, file_format)?);
    }
    Ok(rows)
}

fn load_file(path: &Path, format: InputFormat) -> Result<Vec<Row>, ExtractError> {
    let rows = match format {
        InputFormat::Csv => load_csv(path)?,
        InputFormat::Json => {
            let text = read(path)?;
            parse_json_rows(&text)?
        }
        InputFormat::Lines => read(path)?.lines().map(Row::line).collect(),
    };
    info!("loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn read(path: &Path) -> Result<String, ExtractError> {
    std::fs::read_to_string(path).map_err(|e| ExtractError::io(path, e))
}

fn load_csv(path: &Path) -> Result<Vec<Row>, ExtractError> {
    let csv_err = |source| ExtractError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(Row::new(record.iter()));
    }
    Ok(rows)
}

pub fn parse_json_rows(text: &str) -> Result<Vec<Row>, ExtractError> {
    let raw: Vec<JsonRow> = serde_json::from_str(text)?;
    Ok(raw
        .into_iter()
        .map(|row| match row {
            JsonRow::Cells(cells) => Row::new(cells.into_iter().map(Option::unwrap_or_default)),
            JsonRow::Line(line) => Row::line(line),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_name() {
        assert_eq!("CSV".parse::<InputFormat>().unwrap(), InputFormat::Csv);
        assert_eq!("lines".parse::<InputFormat>().unwrap(), InputFormat::Lines);
        assert!(matches!(
            "pdf".parse::<InputFormat>(),
            Err(ExtractError::UnknownFormat(_))
        ));
        assert_eq!(InputFormat::from_path(Path::new("a/b.json")), Some(InputFormat::Json));
        assert_eq!(InputFormat::from_path(Path::new("a/b.xlsx")), None);
    }

    #[test]
    fn test_json_rows_with_nulls_and_lines() {
        let rows = parse_json_rows(r#"[["Перша черга", null], "вул. Садова, 1"]"#).unwrap();
        assert_eq!(rows[0], Row::new(["Перша черга", ""]));
        assert_eq!(rows[1], Row::line("вул. Садова, 1"));
    }

    #[test]
    fn test_csv_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedule.csv");
        std::fs::write(
            &path,
            "Полтавська філія\nПерша черга І підчерга,\n1,\"м.Полтава: вул. Садова, 1, 3\"\n",
        )
        .unwrap();
        let rows = load_rows(&path, None).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].cells, vec!["Полтавська філія"]);
        assert_eq!(rows[2].address_cell(), "м.Полтава: вул. Садова, 1, 3");
    }

    #[test]
    fn test_directory_concatenated_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("02.txt"), "вул. Миру, 2\n").unwrap();
        std::fs::write(dir.path().join("01.txt"), "Перша черга І підчерга\n").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored\n").unwrap();
        let rows = load_rows(dir.path(), None).unwrap();
        assert_eq!(
            rows,
            vec![Row::line("Перша черга І підчерга"), Row::line("вул. Миру, 2")]
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_rows(Path::new("/nonexistent/schedule.txt"), None).unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }
}
