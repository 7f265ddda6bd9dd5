use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One tracked object as delivered by the catalog collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitalRecord {
    /// Common name (e.g. "INTELSAT 901")
    pub name: String,
    /// First line of the two-line element set
    pub line1: String,
    /// Second line of the two-line element set
    pub line2: String,
    /// Launch date, when the catalog provides one
    #[serde(default)]
    pub launch_date: Option<NaiveDate>,
}

impl OrbitalRecord {
    /// Create a record from a two-line element set
    pub fn new(name: impl Into<String>, line1: impl Into<String>, line2: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            line1: line1.into(),
            line2: line2.into(),
            launch_date: None,
        }
    }

    /// Attach a catalog launch date
    pub fn with_launch_date(mut self, launch_date: NaiveDate) -> Self {
        self.launch_date = Some(launch_date);
        self
    }

    /// Catalog number read from line 1, if the column is readable
    pub fn catalog_number(&self) -> Option<u32> {
        self.line1.get(2..7).and_then(|s| s.trim().parse().ok())
    }
}
