//! CSV table reading shared by the delimited and sectioned adapters.
//!
//! Handles delimiter auto-detection, UTF-8 BOM stripping, and row-length
//! normalization. Structural failures abort the whole artifact: adapters
//! must not emit partial record sets.

use csv::{ReaderBuilder, Terminator};

use super::adapters_errors::{ParseError, Result};

/// Options controlling how an artifact's CSV body is read.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Delimiter byte, or `None` to auto-detect among `,`, `;`, and tab.
    pub delimiter: Option<u8>,
    /// Rows discarded before the header row (title banners, disclaimers).
    pub skip_top_rows: usize,
    /// Rows discarded at the end (totals rows, footnotes).
    pub skip_bottom_rows: usize,
}

/// A fully-read CSV body: every line as a vector of cells, lengths not yet
/// normalized, empty lines preserved (the sectioned layout is sensitive to
/// them).
#[derive(Debug)]
pub struct RawTable {
    pub lines: Vec<Vec<String>>,
    pub delimiter: u8,
}

/// A header-led table with rows padded or truncated to the header width.
#[derive(Debug)]
pub struct Table {
    pub headers: Vec<String>,
    /// (source line number, cells) pairs; line numbers are 1-based over the
    /// original artifact.
    pub rows: Vec<(usize, Vec<String>)>,
}

/// Reads the raw line grid of an artifact.
pub fn read_lines(content: &[u8], options: &ReadOptions) -> Result<RawTable> {
    let text = decode_utf8(content)?;
    if text.trim().is_empty() {
        return Err(ParseError::EmptyArtifact(
            "artifact contains no data".to_string(),
        ));
    }

    let delimiter = options.delimiter.unwrap_or_else(|| detect_delimiter(&text));

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .terminator(Terminator::Any(b'\n'))
        .from_reader(text.as_bytes());

    let mut lines: Vec<Vec<String>> = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            ParseError::MalformedStructure(format!("line {}: {}", idx + 1, e))
        })?;
        lines.push(record.iter().map(|s| s.trim().to_string()).collect());
    }

    if lines.is_empty() {
        return Err(ParseError::EmptyArtifact(
            "artifact contains no rows".to_string(),
        ));
    }

    Ok(RawTable { lines, delimiter })
}

/// Reads a single header-led table, applying the skip window and dropping
/// blank rows.
pub fn read_table(content: &[u8], options: &ReadOptions) -> Result<Table> {
    let raw = read_lines(content, options)?;

    let total = raw.lines.len();
    let start = options.skip_top_rows;
    let end = total.saturating_sub(options.skip_bottom_rows);
    if start >= end {
        return Err(ParseError::MalformedStructure(format!(
            "skip settings leave no rows ({} total, skip {} top / {} bottom)",
            total, options.skip_top_rows, options.skip_bottom_rows
        )));
    }

    let mut iter = raw
        .lines
        .into_iter()
        .enumerate()
        .skip(start)
        .take(end - start)
        .filter(|(_, cells)| !is_blank(cells));

    let (_, headers) = iter.next().ok_or_else(|| {
        ParseError::EmptyArtifact("no header row found".to_string())
    })?;
    let headers: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ParseError::MalformedStructure(
            "header row is blank".to_string(),
        ));
    }

    let width = headers.len();
    let rows = iter
        .map(|(idx, cells)| (idx + 1, normalize_width(cells, width)))
        .collect();

    Ok(Table { headers, rows })
}

/// Decodes bytes as UTF-8, tolerating and stripping a leading BOM.
pub fn decode_utf8(content: &[u8]) -> Result<String> {
    let body = if content.len() >= 3 && content[0] == 0xEF && content[1] == 0xBB && content[2] == 0xBF
    {
        &content[3..]
    } else {
        content
    };

    std::str::from_utf8(body)
        .map(|s| s.to_string())
        .map_err(|e| {
            ParseError::Encoding(format!("invalid UTF-8 at byte {}", e.valid_up_to()))
        })
}

/// Picks the delimiter whose per-line counts are largest and most consistent
/// over the first few lines.
fn detect_delimiter(text: &str) -> u8 {
    let candidates = [b',', b';', b'\t'];
    let lines: Vec<&str> = text.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0usize;
    for candidate in candidates {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| line.bytes().filter(|b| *b == candidate).count())
            .collect();
        let first = counts.first().copied().unwrap_or(0);
        if first == 0 {
            continue;
        }
        let consistent = counts.iter().filter(|&&c| c == first).count();
        let score = first * consistent;
        if score > best_score {
            best_score = score;
            best = candidate;
        }
    }
    best
}

pub(crate) fn is_blank(cells: &[String]) -> bool {
    cells.iter().all(|cell| cell.trim().is_empty())
}

pub(crate) fn normalize_width(mut cells: Vec<String>, width: usize) -> Vec<String> {
    if cells.len() < width {
        cells.resize(width, String::new());
    } else if cells.len() > width {
        cells.truncate(width);
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_simple_table() {
        let content = b"Holding,Weight\nGlobal Shares,55.0\nCash,45.0";
        let table = read_table(content, &ReadOptions::default()).unwrap();

        assert_eq!(table.headers, vec!["Holding", "Weight"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].1, vec!["Global Shares", "55.0"]);
    }

    #[test]
    fn test_detects_semicolon_delimiter() {
        let content = b"Holding;Weight\nGlobal Shares;55.0";
        let table = read_table(content, &ReadOptions::default()).unwrap();
        assert_eq!(table.headers, vec!["Holding", "Weight"]);
    }

    #[test]
    fn test_strips_utf8_bom() {
        let content = b"\xEF\xBB\xBFHolding,Weight\nCash,100";
        let table = read_table(content, &ReadOptions::default()).unwrap();
        assert_eq!(table.headers[0], "Holding");
    }

    #[test]
    fn test_skip_top_and_bottom_rows() {
        let content = b"Disclosure as at 30 June\n\nHolding,Weight\nCash,100\nTotal,100";
        let options = ReadOptions {
            skip_top_rows: 1,
            skip_bottom_rows: 1,
            ..Default::default()
        };
        let table = read_table(content, &options).unwrap();

        assert_eq!(table.headers, vec!["Holding", "Weight"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].1, vec!["Cash", "100"]);
    }

    #[test]
    fn test_uneven_rows_normalized_to_header_width() {
        let content = b"a,b,c\n1,2\n3,4,5,6";
        let table = read_table(content, &ReadOptions::default()).unwrap();

        assert_eq!(table.rows[0].1, vec!["1", "2", ""]);
        assert_eq!(table.rows[1].1, vec!["3", "4", "5"]);
    }

    #[test]
    fn test_empty_artifact_is_an_error() {
        let err = read_table(b"", &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::EmptyArtifact(_)));
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        let err = read_table(&[0xFF, 0xFE, 0x41], &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::Encoding(_)));
    }
}
