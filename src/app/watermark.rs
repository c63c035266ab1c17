//! Per-job completion watermarks for incremental downloads

use std::collections::HashMap;
use std::fmt;

/// Which half of a job's results a watermark tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCategory {
    /// Job information (the CSV of pair results)
    Info,
    /// Job pair output files
    Output,
}

impl ResultCategory {
    /// Archive type requested from the download endpoint
    pub fn archive_type(self) -> &'static str {
        match self {
            ResultCategory::Info => "job",
            ResultCategory::Output => "j_outputs",
        }
    }

    /// Category tracked for a given archive type, if it is incremental at all
    pub fn from_archive_type(archive_type: &str) -> Option<Self> {
        match archive_type {
            "job" => Some(ResultCategory::Info),
            "j_outputs" => Some(ResultCategory::Output),
            _ => None,
        }
    }
}

impl fmt::Display for ResultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultCategory::Info => f.write_str("info"),
            ResultCategory::Output => f.write_str("output"),
        }
    }
}

/// Highest completion sequence number seen per (job, category).
///
/// Reads default to 0. Values only move forward.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatermarkTable {
    marks: HashMap<(u64, ResultCategory), u64>,
}

impl WatermarkTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, job_id: u64, category: ResultCategory) -> u64 {
        self.marks.get(&(job_id, category)).copied().unwrap_or(0)
    }

    /// Record a newly observed maximum. Returns the stored value afterwards.
    pub fn advance(&mut self, job_id: u64, category: ResultCategory, value: u64) -> u64 {
        let entry = self.marks.entry((job_id, category)).or_insert(0);
        if value > *entry {
            *entry = value;
        }
        *entry
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zero() {
        let table = WatermarkTable::new();
        assert_eq!(table.get(7, ResultCategory::Info), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_advance_is_monotonic() {
        // Test that a lower value never replaces a higher one
        let mut table = WatermarkTable::new();
        assert_eq!(table.advance(7, ResultCategory::Info, 10), 10);
        assert_eq!(table.advance(7, ResultCategory::Info, 4), 10);
        assert_eq!(table.get(7, ResultCategory::Info), 10);
    }

    #[test]
    fn test_categories_are_independent() {
        let mut table = WatermarkTable::new();
        table.advance(7, ResultCategory::Info, 10);
        table.advance(7, ResultCategory::Output, 3);
        table.advance(8, ResultCategory::Info, 1);
        assert_eq!(table.get(7, ResultCategory::Info), 10);
        assert_eq!(table.get(7, ResultCategory::Output), 3);
        assert_eq!(table.get(8, ResultCategory::Output), 0);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_archive_type_mapping() {
        assert_eq!(ResultCategory::Info.archive_type(), "job");
        assert_eq!(ResultCategory::from_archive_type("j_outputs"), Some(ResultCategory::Output));
        assert_eq!(ResultCategory::from_archive_type("solver"), None);
    }
}
