use std::collections::HashMap;
use std::sync::Arc;

use super::adapters_errors::{ParseError, Result};
use super::adapters_model::SourceFormat;
use super::adapters_traits::SourceAdapter;
use super::delimited_adapter::DelimitedAdapter;
use super::sectioned_adapter::SectionedHoldingsAdapter;

/// Registry resolving a declared format identifier to its adapter.
pub struct AdapterRegistry {
    adapters: HashMap<SourceFormat, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    /// Registry with the built-in formats.
    pub fn new() -> Self {
        let mut adapters: HashMap<SourceFormat, Arc<dyn SourceAdapter>> = HashMap::new();
        adapters.insert(
            SourceFormat::DelimitedHoldings,
            Arc::new(DelimitedAdapter::new(SourceFormat::DelimitedHoldings)),
        );
        adapters.insert(
            SourceFormat::DelimitedPrices,
            Arc::new(DelimitedAdapter::new(SourceFormat::DelimitedPrices)),
        );
        adapters.insert(
            SourceFormat::SectionedHoldings,
            Arc::new(SectionedHoldingsAdapter::new()),
        );
        Self { adapters }
    }

    /// Registers (or replaces) an adapter for a format.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(adapter.format(), adapter);
    }

    pub fn get(&self, format: SourceFormat) -> Result<Arc<dyn SourceAdapter>> {
        self.adapters
            .get(&format)
            .cloned()
            .ok_or_else(|| ParseError::UnknownFormat(format.to_string()))
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
