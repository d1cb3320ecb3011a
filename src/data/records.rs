//! Record file loading.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{GlobeError, Result};
use crate::records::{sort_chronologically, Record};

/// Read a JSON array of records. Records whose coordinates are off the
/// globe, or whose id repeats an earlier record's, are dropped with a
/// warning; the rest come back in chronological order.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let mut bytes = fs::read(path).map_err(|e| GlobeError::io(path, e))?;
    let records = parse_records(&mut bytes)?;
    info!(path = %path.display(), count = records.len(), "records loaded");
    Ok(records)
}

pub fn parse_records(bytes: &mut [u8]) -> Result<Vec<Record>> {
    let raw: Vec<Record> = simd_json::serde::from_slice(bytes)?;
    let mut seen = HashSet::with_capacity(raw.len());
    let mut records: Vec<Record> = raw
        .into_iter()
        .filter(|r| {
            if !r.has_valid_location() {
                warn!(id = %r.id, lat = r.location.lat, lon = r.location.lon, "record skipped: location off the globe");
                return false;
            }
            // First occurrence in file order wins
            if !seen.insert(r.id.clone()) {
                warn!(id = %r.id, "record skipped: duplicate id");
                return false;
            }
            true
        })
        .collect();
    sort_chronologically(&mut records);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Category;

    #[test]
    fn test_parse_records_sorts_and_filters() {
        let mut doc = br#"[
            {"id": "b", "title": "Later", "date": "2025-03-01", "activityType": "Food",
             "location": {"lat": 30.0, "lng": 104.0, "name": "Chengdu"}},
            {"id": "a", "title": "Earlier", "date": "2025-01-01", "category": "Travel",
             "location": {"lat": 39.9, "lon": 116.4}},
            {"id": "c", "title": "Broken", "date": "2025-02-01", "category": "Work",
             "location": {"lat": 95.0, "lon": 0.0}}
        ]"#
        .to_vec();
        let records = parse_records(&mut doc).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(records[1].category, Category::Food);
        assert_eq!(records[1].location.lon, 104.0);
    }

    #[test]
    fn test_parse_records_drops_duplicate_ids() {
        let mut doc = br#"[
            {"id": "x", "title": "First", "date": "2025-05-01", "category": "Travel",
             "location": {"lat": 10.0, "lon": 20.0}},
            {"id": "x", "title": "Second", "date": "2025-01-01", "category": "Work",
             "location": {"lat": -10.0, "lon": -20.0}},
            {"id": "y", "title": "Other", "date": "2025-03-01", "category": "Work",
             "location": {"lat": 0.0, "lon": 0.0}}
        ]"#
        .to_vec();
        let records = parse_records(&mut doc).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["y", "x"]);
        assert_eq!(records[1].title, "First");
    }

    #[test]
    fn test_parse_records_rejects_bad_date() {
        let mut doc = br#"[{"id": "x", "date": "2025-02-30", "category": "Work",
            "location": {"lat": 0.0, "lon": 0.0}}]"#
            .to_vec();
        assert!(parse_records(&mut doc).is_err());
    }

    #[test]
    fn test_load_records_missing_file() {
        let err = load_records(Path::new("/nonexistent/records.json")).unwrap_err();
        assert!(matches!(err, GlobeError::Io { .. }));
    }
}
