//! Geo-tagged records as the engine sees them: read-only input owned by the
//! host, plus the pure derivations the renderer needs every frame.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::GlobeError;
use crate::map::globe::LonLat;
use crate::map::palette::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Category {
    Travel,
    Food,
    Sport,
    Work,
    Leisure,
    Social,
    Nature,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Travel,
        Category::Food,
        Category::Sport,
        Category::Work,
        Category::Leisure,
        Category::Social,
        Category::Nature,
    ];

    /// Marker color.
    pub fn rgb(self) -> Rgb {
        match self {
            Category::Travel => [0xff, 0x00, 0xff],
            Category::Food => [0x00, 0xff, 0xff],
            Category::Sport => [0x00, 0xff, 0x00],
            Category::Work => [0xff, 0xff, 0xff],
            Category::Leisure => [0xff, 0xff, 0x00],
            Category::Social => [0xff, 0x00, 0x55],
            Category::Nature => [0x33, 0xff, 0xaa],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Travel => "Travel",
            Category::Food => "Food",
            Category::Sport => "Sport",
            Category::Work => "Work",
            Category::Leisure => "Leisure",
            Category::Social => "Social",
            Category::Nature => "Nature",
        }
    }
}

/// Calendar date, only ever used for ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct RecordDate {
    year: u16,
    month: u8,
    day: u8,
}

impl RecordDate {
    pub fn new(year: u16, month: u8, day: u8) -> Option<Self> {
        let max_day = match month {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            2 if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) => 29,
            2 => 28,
            _ => return None,
        };
        (1..=max_day).contains(&day).then_some(Self { year, month, day })
    }
}

impl FromStr for RecordDate {
    type Err = GlobeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || GlobeError::Date(s.to_string());
        let mut parts = s.trim().splitn(3, '-');
        let mut field = |len: usize| {
            parts
                .next()
                .filter(|p| p.len() == len && p.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|p| p.parse::<u16>().ok())
        };
        let year = field(4).ok_or_else(err)?;
        let month = field(2).ok_or_else(err)?;
        let day = field(2).ok_or_else(err)?;
        RecordDate::new(year, month as u8, day as u8).ok_or_else(err)
    }
}

impl TryFrom<String> for RecordDate {
    type Error = GlobeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for RecordDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Location {
    pub lat: f64,
    #[serde(alias = "lng")]
    pub lon: f64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub date: RecordDate,
    #[serde(alias = "activityType")]
    pub category: Category,
    pub location: Location,
}

impl Record {
    pub fn lon_lat(&self) -> LonLat {
        (self.location.lon, self.location.lat)
    }

    pub fn has_valid_location(&self) -> bool {
        let Location { lat, lon, .. } = self.location;
        (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
    }
}

/// Total order: by date, ties broken by the identifier's lexical order.
pub fn chronological_cmp(a: &Record, b: &Record) -> Ordering {
    a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id))
}

pub fn sort_chronologically(records: &mut [Record]) {
    records.sort_by(chronological_cmp);
}

/// Borrowed view of `records` in chronological order.
pub fn chronological(records: &[Record]) -> Vec<&Record> {
    let mut sorted: Vec<&Record> = records.iter().collect();
    sorted.sort_by(|a, b| chronological_cmp(a, b));
    sorted
}

/// The records that get a marker this frame, in chronological order.
///
/// Playback wins over focus, focus wins over show-all. A focused id that is
/// not in `records` yields nothing.
pub fn visible_records<'a>(
    records: &'a [Record],
    focused: Option<&str>,
    playback_index: Option<usize>,
    show_all: bool,
) -> Vec<&'a Record> {
    if let Some(index) = playback_index {
        let mut sorted = chronological(records);
        sorted.truncate(index.saturating_add(1));
        return sorted;
    }
    if let Some(id) = focused {
        return records.iter().filter(|r| r.id == id).take(1).collect();
    }
    if show_all {
        return chronological(records);
    }
    Vec::new()
}

/// Built-in demo data, used when the host is given no records file.
pub fn sample_records() -> Vec<Record> {
    let record = |id: &str, title: &str, date: (u16, u8, u8), category, lat, lon, name: &str, description: &str| Record {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        images: Vec::new(),
        date: RecordDate { year: date.0, month: date.1, day: date.2 },
        category,
        location: Location { lat, lon, name: name.to_string() },
    };
    vec![
        record(
            "1",
            "Forbidden City Snow",
            (2025, 1, 5),
            Category::Travel,
            39.9163,
            116.3972,
            "Beijing, Forbidden City",
            "White snow on red walls, winter at its most authentic.",
        ),
        record(
            "2",
            "Bund Sleepless Night",
            (2025, 2, 14),
            Category::Social,
            31.24,
            121.49,
            "Shanghai, The Bund",
            "Lights on both banks of the Huangpu, the city's heartbeat.",
        ),
        record(
            "3",
            "Chengdu Hotpot Night",
            (2025, 3, 10),
            Category::Food,
            30.6574,
            104.0764,
            "Chengdu, Taikoo Li",
            "Boiling red oil and a drink at the end of Yulin Road.",
        ),
        record(
            "4",
            "Broken Bridge Snow",
            (2025, 3, 20),
            Category::Nature,
            30.2596,
            120.1534,
            "Hangzhou, West Lake",
            "Shimmering water, misty hills, strange rain.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, date: &str) -> Record {
        Record {
            id: id.to_string(),
            title: String::new(),
            description: String::new(),
            images: Vec::new(),
            date: date.parse().unwrap(),
            category: Category::Travel,
            location: Location { lat: 0.0, lon: 0.0, name: String::new() },
        }
    }

    fn ids(records: &[&Record]) -> Vec<String> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_date_parsing() {
        let d: RecordDate = "2025-02-14".parse().unwrap();
        assert_eq!(d.to_string(), "2025-02-14");
        assert!("2024-02-29".parse::<RecordDate>().is_ok());
        for bad in ["2025-02-29", "2025-13-01", "2025-1-05", "20250105", "", "2025-01-05x"] {
            assert!(bad.parse::<RecordDate>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_chronological_order() {
        let mut records = vec![rec("2", "2025-02-14"), rec("1", "2025-01-05")];
        sort_chronologically(&mut records);
        assert_eq!(records[0].id, "1");
        assert_eq!(records[1].id, "2");
    }

    #[test]
    fn test_same_date_breaks_tie_by_id() {
        let records = vec![rec("b", "2025-01-01"), rec("a", "2025-01-01")];
        assert_eq!(ids(&chronological(&records)), vec!["a", "b"]);
    }

    #[test]
    fn test_visible_empty_when_idle() {
        let records = vec![rec("1", "2025-01-05"), rec("2", "2025-02-14")];
        assert!(visible_records(&records, None, None, false).is_empty());
    }

    #[test]
    fn test_visible_all_when_show_all() {
        let records = vec![rec("2", "2025-02-14"), rec("1", "2025-01-05")];
        assert_eq!(ids(&visible_records(&records, None, None, true)), vec!["1", "2"]);
    }

    #[test]
    fn test_visible_focused_only() {
        let records = vec![rec("1", "2025-01-05"), rec("2", "2025-02-14")];
        assert_eq!(ids(&visible_records(&records, Some("2"), None, true)), vec!["2"]);
        assert!(visible_records(&records, Some("missing"), None, true).is_empty());
    }

    #[test]
    fn test_visible_playback_prefix() {
        let records = vec![
            rec("c", "2025-03-10"),
            rec("a", "2025-01-05"),
            rec("d", "2025-03-20"),
            rec("b", "2025-02-14"),
        ];
        assert_eq!(ids(&visible_records(&records, Some("d"), Some(1), false)), vec!["a", "b"]);
        assert_eq!(ids(&visible_records(&records, None, Some(0), false)), vec!["a"]);
        assert_eq!(visible_records(&records, None, Some(99), false).len(), 4);
    }

    #[test]
    fn test_deserialize_original_field_names() {
        let mut json = br#"{
            "id": "7", "title": "Dawn", "images": ["a.jpg"], "date": "2025-04-01",
            "activityType": "Nature",
            "location": {"lat": 30.5, "lng": 120.25, "name": "Hangzhou"}
        }"#
        .to_vec();
        let record: Record = simd_json::serde::from_slice(&mut json).unwrap();
        assert_eq!(record.category, Category::Nature);
        assert_eq!(record.lon_lat(), (120.25, 30.5));
        assert_eq!(record.description, "");
        assert!(record.has_valid_location());
    }

    #[test]
    fn test_sample_records_are_sorted_and_unique() {
        let samples = sample_records();
        let sorted = chronological(&samples);
        assert_eq!(ids(&sorted), vec!["1", "2", "3", "4"]);
        assert_eq!(Category::ALL.len(), 7);
        assert_eq!(Category::Social.rgb(), [0xff, 0x00, 0x55]);
    }
}
