//! Record loading for the CLI: CSV with encoding and delimiter auto-detection,
//! or a JSON array of objects.
//!
//! The conversion engine never calls into this module.

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::{LoadError, LoadResult};
use crate::models::Record;

/// Input file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> LoadResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Ok(InputFormat::Csv),
            "json" => Ok(InputFormat::Json),
            _ => Err(LoadError::UnknownFormat(path.display().to_string())),
        }
    }
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed records
    pub records: Vec<Record>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter (CSV only)
    pub delimiter: Option<char>,
    /// Column headers, in file order for CSV, sorted for JSON
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best_sep = ';';
    let mut best_count = 0;

    for sep in [';', ',', '\t', '|'] {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV into records with explicit delimiter.
///
/// Each row becomes a record keyed by the column headers; every cell is a
/// string. Short rows are padded with empty strings, extra cells are ignored.
///
/// # Example
/// ```
/// use rowmap::parser::parse_csv_str;
///
/// let rows = parse_csv_str("name;age\nAlice;30\nBob;25", ';').unwrap();
///
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[0]["name"], "Alice");
/// assert_eq!(rows[0]["age"], "30");
/// ```
pub fn parse_csv_str(content: &str, delimiter: char) -> LoadResult<Vec<Record>> {
    parse_csv_with_headers(content, delimiter).map(|(records, _)| records)
}

fn parse_csv_with_headers(
    content: &str,
    delimiter: char,
) -> LoadResult<(Vec<Record>, Vec<String>)> {
    if content.trim().is_empty() {
        return Err(LoadError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::NoHeaders);
    }
    // Unnamed trailing columns are tolerated; named ones must be unique.
    let mut seen = HashSet::new();
    if let Some(duplicate) = headers
        .iter()
        .find(|h| !h.is_empty() && !seen.insert(h.as_str()))
    {
        return Err(LoadError::DuplicateHeader(duplicate.clone()));
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: Record = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let cell = row.get(i).unwrap_or("");
                (header.clone(), Value::String(cell.to_string()))
            })
            .collect();
        records.push(record);
    }

    Ok((records, headers))
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_csv_bytes_auto(bytes: &[u8]) -> LoadResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    debug!(%encoding, ?delimiter, "detected CSV layout");

    let (records, headers) = parse_csv_with_headers(&content, delimiter)?;

    Ok(ParseResult {
        records,
        encoding,
        delimiter: Some(delimiter),
        headers,
    })
}

/// Parse a JSON array of objects into records.
pub fn parse_json_str(content: &str) -> LoadResult<Vec<Record>> {
    if content.trim().is_empty() {
        return Err(LoadError::EmptyFile);
    }

    let entries: Vec<Value> = serde_json::from_str(content)?;
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            Value::Object(map) => Ok(map),
            _ => Err(LoadError::NotAnObject { index }),
        })
        .collect()
}

/// Load records from a file, guessing the format from its extension unless given.
pub fn load_records(
    path: impl AsRef<Path>,
    format: Option<InputFormat>,
) -> LoadResult<ParseResult> {
    let path = path.as_ref();
    let format = match format {
        Some(f) => f,
        None => InputFormat::from_path(path)?,
    };
    let bytes = std::fs::read(path)?;

    match format {
        InputFormat::Csv => parse_csv_bytes_auto(&bytes),
        InputFormat::Json => {
            let records = parse_json_str(&String::from_utf8_lossy(&bytes))?;
            let mut headers: Vec<String> =
                records.iter().flat_map(|r| r.keys().cloned()).collect();
            headers.sort();
            headers.dedup();
            Ok(ParseResult {
                records,
                encoding: "utf-8".to_string(),
                delimiter: None,
                headers,
            })
        }
    }
}

/// Remove empty-string cells so that blank spreadsheet cells read as absent fields.
pub fn drop_empty_cells(records: &mut [Record]) {
    for record in records.iter_mut() {
        record.retain(|_, value| !matches!(value, Value::String(s) if s.trim().is_empty()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_simple_csv() {
        let rows = parse_csv_str("name;age\nAlice;30\nBob;25", ';').unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Alice");
        assert_eq!(rows[1]["name"], "Bob");
        assert_eq!(rows[1]["age"], "25");
    }

    #[test]
    fn test_quoted_values() {
        let csv = "name;value\n\"Alice\";\"Hello; World\"";
        let rows = parse_csv_str(csv, ';').unwrap();

        assert_eq!(rows[0]["name"], "Alice");
        assert_eq!(rows[0]["value"], "Hello; World");
    }

    #[test]
    fn test_missing_and_extra_values() {
        let rows = parse_csv_str("a;b;c\n1;;3\n4\n5;6;7;8", ';').unwrap();

        assert_eq!(rows[0]["b"], "");
        assert_eq!(rows[1]["c"], "");
        assert_eq!(rows[2].len(), 3);
    }

    #[test]
    fn test_duplicate_header_rejected() {
        let err = parse_csv_str("id;name;id\n1;Ann;2", ';').unwrap_err();
        assert!(matches!(err, LoadError::DuplicateHeader(ref h) if h == "id"));

        let rows = parse_csv_str("id;name;;\n1;Ann;;", ';').unwrap();
        assert_eq!(rows[0]["id"], "1");
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_csv_str("", ';'), Err(LoadError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
    }

    #[test]
    fn test_auto_parse() {
        let result = parse_csv_bytes_auto(b"name,age\nAlice,30\nBob,25").unwrap();

        assert_eq!(result.delimiter, Some(','));
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.headers, vec!["name", "age"]);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        assert_eq!(decode_content(bytes, "iso-8859-1"), "Société");
    }

    #[test]
    fn test_json_records() {
        let records = parse_json_str(r#"[{"a": 1}, {"b": [true]}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["b"], serde_json::json!([true]));

        assert!(matches!(
            parse_json_str(r#"[{"a": 1}, 2]"#),
            Err(LoadError::NotAnObject { index: 1 })
        ));
    }

    #[test]
    fn test_drop_empty_cells() {
        let mut rows = parse_csv_str("a;b\n1;\n;", ';').unwrap();
        drop_empty_cells(&mut rows);

        assert_eq!(rows[0].len(), 1);
        assert!(rows[1].is_empty());
    }

    #[test]
    fn test_load_records_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"[{{"name": "Ann", "age": 3}}]"#).unwrap();

        let result = load_records(file.path(), None).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.headers, vec!["age", "name"]);
        assert_eq!(result.delimiter, None);

        let unknown = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        assert!(matches!(
            load_records(unknown.path(), None),
            Err(LoadError::UnknownFormat(_))
        ));
    }
}
