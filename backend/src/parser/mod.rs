//! CSV to [`Table`] parser with encoding and delimiter auto-detection.
//!
//! Used for the bundled fixtures and for importing warehouse exports into the
//! extract cache. Every cell is kept as a trimmed string; typing happens in
//! the transforms.

use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::table::Table;

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed rows
    pub table: Table,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
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
            encoding_rs::ISO_8859_15.decode(bytes).0.to_string()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        // UTF-8, ASCII and anything unknown: lossy UTF-8
        _ => String::from_utf8_lossy(bytes).to_string(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text into a table with an explicit delimiter.
///
/// Quoted fields may contain the delimiter (`"Release of Substance, Fire"`).
/// Blank lines are skipped, short rows are padded with empty strings and
/// extra trailing fields are ignored.
///
/// # Example
/// ```ignore
/// use profiles::parser::parse_csv;
///
/// let table = parse_csv("Company,Year\nNOVA,2013", ',').unwrap();
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.rows()[0]["Year"], "2013");
/// ```
pub fn parse_csv(content: &str, delimiter: char) -> CsvResult<Table> {
    let content = content.trim_start_matches('\u{feff}');
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CsvError::ParseError { line: 1, message: e.to_string() })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }
    for (i, header) in headers.iter().enumerate() {
        if headers[..i].contains(header) {
            return Err(CsvError::DuplicateHeader(header.clone()));
        }
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| CsvError::ParseError {
            line: e.position().map(|p| p.line() as usize).unwrap_or(idx + 2),
            message: e.to_string(),
        })?;

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let mut row = Map::new();
        for (i, header) in headers.iter().enumerate() {
            let value = record.get(i).map(str::trim).unwrap_or("");
            row.insert(header.clone(), Value::String(value.to_string()));
        }
        rows.push(row);
    }

    Ok(Table::new(headers, rows))
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let table = parse_csv(&content, delimiter)?;

    Ok(ParseResult {
        table,
        encoding,
        delimiter,
    })
}

/// Parse CSV file with auto-detection of encoding and delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let table = parse_csv("name,age\nAlice,30\nBob,25", ',').unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0]["name"], "Alice");
        assert_eq!(table.rows()[0]["age"], "30");
        assert_eq!(table.rows()[1]["name"], "Bob");
    }

    #[test]
    fn test_quoted_delimiter_kept_in_field() {
        let csv = "Incident Number,Incident Types\nINC1,\"Release of Substance, Fire\"";
        let table = parse_csv(csv, ',').unwrap();

        assert_eq!(table.rows()[0]["Incident Types"], "Release of Substance, Fire");
    }

    #[test]
    fn test_empty_lines_skipped() {
        let table = parse_csv("a;b\n1;2\n\n3;4\n", ';').unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_missing_values_padded() {
        let table = parse_csv("a;b;c\n1;;3\n4", ';').unwrap();

        assert_eq!(table.rows()[0]["b"], "");
        assert_eq!(table.rows()[1]["a"], "4");
        assert_eq!(table.rows()[1]["c"], "");
    }

    #[test]
    fn test_duplicate_header_rejected() {
        let err = parse_csv("Company,Year,Company\nA,1,B", ',').unwrap_err();
        assert!(matches!(err, CsvError::DuplicateHeader(ref h) if h == "Company"));
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_csv("", ','), Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
    }

    #[test]
    fn test_auto_parse_with_bom_and_crlf() {
        let csv = "\u{feff}Pipeline,Path\r\nAlliance,Zone 2 to Chicago\r\n";
        let result = parse_bytes_auto(csv.as_bytes()).unwrap();

        assert_eq!(result.delimiter, ',');
        assert_eq!(result.table.headers(), &["Pipeline".to_string(), "Path".to_string()]);
        assert_eq!(result.table.rows()[0]["Path"], "Zone 2 to Chicago");
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }
}
