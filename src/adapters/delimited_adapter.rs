use super::adapters_errors::Result;
use super::adapters_model::{RawArtifact, RawRecord, SourceFormat};
use super::adapters_traits::SourceAdapter;
use super::csv_parser::{read_table, ReadOptions};

/// Adapter for single-table artifacts: one header row, one record per data
/// row. Covers both wide holdings tables and unit-price series; which one is
/// declared by the format identifier.
pub struct DelimitedAdapter {
    format: SourceFormat,
    options: ReadOptions,
}

impl DelimitedAdapter {
    pub fn new(format: SourceFormat) -> Self {
        Self {
            format,
            options: ReadOptions::default(),
        }
    }

    pub fn with_options(format: SourceFormat, options: ReadOptions) -> Self {
        Self { format, options }
    }
}

impl SourceAdapter for DelimitedAdapter {
    fn format(&self) -> SourceFormat {
        self.format
    }

    fn parse(&self, artifact: &RawArtifact) -> Result<Vec<RawRecord>> {
        let content = artifact.content()?;
        let table = read_table(&content, &self.options)?;

        let records = table
            .rows
            .into_iter()
            .map(|(line_number, cells)| {
                let mut record = RawRecord::new(line_number);
                for (header, value) in table.headers.iter().zip(cells) {
                    if header.is_empty() {
                        continue;
                    }
                    record.push(header.clone(), value);
                }
                record
            })
            .collect();

        Ok(records)
    }
}
