use super::adapters_errors::{ParseError, Result};
use super::adapters_model::{RawArtifact, RawRecord, SourceFormat};
use super::adapters_traits::SourceAdapter;
use super::csv_parser::{is_blank, normalize_width, read_lines, ReadOptions};

/// Column key under which a table's section label line is passed through.
pub const SECTION_LABEL_KEY: &str = "section_label";
/// Column key under which a table's secondary section line is passed through.
pub const SECTION_NOTE_KEY: &str = "section_note";

/// Adapter for artifacts laid out as a sequence of tables, each preceded by
/// one or two label lines in the first column (typically the asset class and
/// the internal/external management note). Labels are passed through verbatim
/// under [`SECTION_LABEL_KEY`] / [`SECTION_NOTE_KEY`]; interpreting them is
/// the mapper's job.
pub struct SectionedHoldingsAdapter {
    options: ReadOptions,
}

impl SectionedHoldingsAdapter {
    pub fn new() -> Self {
        Self {
            options: ReadOptions::default(),
        }
    }
}

impl Default for SectionedHoldingsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceAdapter for SectionedHoldingsAdapter {
    fn format(&self) -> SourceFormat {
        SourceFormat::SectionedHoldings
    }

    fn parse(&self, artifact: &RawArtifact) -> Result<Vec<RawRecord>> {
        let content = artifact.content()?;
        let raw = read_lines(&content, &self.options)?;

        let mut records: Vec<RawRecord> = Vec::new();
        let mut section_label: Option<String> = None;
        let mut section_note: Option<String> = None;
        let mut headers: Option<Vec<String>> = None;

        for (idx, cells) in raw.lines.into_iter().enumerate() {
            let line_number = idx + 1;

            if is_blank(&cells) {
                // A blank line closes the current table; the next table
                // brings its own labels.
                headers = None;
                continue;
            }

            let filled = cells.iter().filter(|c| !c.trim().is_empty()).count();
            let label_line = filled == 1 && !cells[0].trim().is_empty();

            if label_line {
                let value = cells[0].trim().to_string();
                if headers.is_some() || section_note.is_some() {
                    // Start of the next section.
                    section_label = Some(value);
                    section_note = None;
                    headers = None;
                } else if section_label.is_none() {
                    section_label = Some(value);
                } else {
                    section_note = Some(value);
                }
                continue;
            }

            match &headers {
                None => {
                    headers = Some(cells.iter().map(|h| h.trim().to_string()).collect());
                }
                Some(header_row) => {
                    let cells = normalize_width(cells, header_row.len());
                    let mut record = RawRecord::new(line_number);
                    if let Some(label) = &section_label {
                        record.push(SECTION_LABEL_KEY, label.clone());
                    }
                    if let Some(note) = &section_note {
                        record.push(SECTION_NOTE_KEY, note.clone());
                    }
                    for (header, value) in header_row.iter().zip(cells) {
                        if header.is_empty() {
                            continue;
                        }
                        record.push(header.clone(), value);
                    }
                    records.push(record);
                }
            }
        }

        if records.is_empty() {
            return Err(ParseError::MalformedStructure(
                "no table rows found in sectioned artifact".to_string(),
            ));
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTIONED: &[u8] = b"\
CASH\n\
Internally Managed\n\
Name,Currency,Value,Weighting\n\
Cash at bank,AUD,1000,40.0\n\
\n\
LISTED EQUITY\n\
Externally Managed\n\
Name,Currency,Value,Weighting\n\
Global Shares Fund,USD,900,35.0\n\
Aus Shares Fund,AUD,600,25.0\n";

    #[test]
    fn test_sections_carried_onto_records() {
        let artifact = RawArtifact::from_bytes("phd.csv", SECTIONED.to_vec());
        let adapter = SectionedHoldingsAdapter::new();

        let records = adapter.parse(&artifact).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get(SECTION_LABEL_KEY), Some("CASH"));
        assert_eq!(records[0].get(SECTION_NOTE_KEY), Some("Internally Managed"));
        assert_eq!(records[0].get("Name"), Some("Cash at bank"));
        assert_eq!(records[1].get(SECTION_LABEL_KEY), Some("LISTED EQUITY"));
        assert_eq!(records[2].get("Weighting"), Some("25.0"));
    }

    #[test]
    fn test_section_without_note_line() {
        let content = b"PROPERTY\nName,Weighting\nOffice Trust,100";
        let artifact = RawArtifact::from_bytes("phd.csv", content.to_vec());
        let adapter = SectionedHoldingsAdapter::new();

        let records = adapter.parse(&artifact).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get(SECTION_LABEL_KEY), Some("PROPERTY"));
        assert_eq!(records[0].get(SECTION_NOTE_KEY), None);
    }

    #[test]
    fn test_tables_without_rows_fail() {
        let content = b"CASH\nInternally Managed\n";
        let artifact = RawArtifact::from_bytes("phd.csv", content.to_vec());
        let adapter = SectionedHoldingsAdapter::new();

        assert!(adapter.parse(&artifact).is_err());
    }
}
