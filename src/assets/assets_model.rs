use serde::{Deserialize, Serialize};

/// Region bucket used by the dashboard's domestic/foreign filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Domestic,
    Foreign,
}

/// Static reference entity describing an investable instrument.
/// Written once by the external ingestion process; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub ticker: String,
    pub name: String,
    /// Free-form class label (e.g., "Equity", "Bond", "Commodity").
    pub asset_class: String,
    pub region: Region,
    /// Trading currency of the instrument (e.g., "USD", "KRW").
    pub currency: String,
}

impl Asset {
    /// Display name falling back to the ticker when no name was ingested.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.ticker
        } else {
            &self.name
        }
    }
}
