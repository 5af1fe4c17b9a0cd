/// Shared data structures for the gallery
///
/// These structs represent the data model read from the static
/// gallery file and handed to the UI layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Represents a single photo in the gallery
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Photo {
    /// Unique, stable id
    pub id: u64,
    pub title: String,
    /// Full-resolution image reference (e.g., "images/IMG_9923.jpg")
    pub filename: String,
    /// Thumbnail reference, used for the grid and for prefetching
    pub thumbnail: String,
    /// Calendar date the photo was taken, serialized as YYYY-MM-DD
    pub date: NaiveDate,
    /// Free-text tag (e.g., "street", "family")
    pub tag: String,
    pub season: Season,
    pub caption: String,
}

/// The fixed set of season labels
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
            Season::Winter => "Winter",
        };
        f.write_str(label)
    }
}

/// How the gallery list is ordered for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Newest first
    #[default]
    Date,
    /// Spring through winter, newest first within each season
    Season,
}

impl SortOrder {
    /// Compare two photos under this ordering.
    /// Ties fall back to the id so the order is stable across re-sorts.
    pub fn compare(self, a: &Photo, b: &Photo) -> Ordering {
        let primary = match self {
            SortOrder::Date => b.date.cmp(&a.date),
            SortOrder::Season => a.season.cmp(&b.season).then_with(|| b.date.cmp(&a.date)),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }

    pub fn label(self) -> &'static str {
        match self {
            SortOrder::Date => "By Date",
            SortOrder::Season => "By Season",
        }
    }
}

impl Photo {
    /// Date formatted the way the viewer header shows it (e.g., "March 4, 2024")
    pub fn display_date(&self) -> String {
        self.date.format("%B %-d, %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(id: u64, date: &str, season: Season) -> Photo {
        Photo {
            id,
            title: format!("Photo {}", id),
            filename: format!("images/{}.jpg", id),
            thumbnail: format!("images/{}_thumb.jpg", id),
            date: date.parse().unwrap(),
            tag: "test".to_string(),
            season,
            caption: String::new(),
        }
    }

    #[test]
    fn test_parse_photo_json() {
        let json = r#"{
            "id": 7,
            "title": "Petrol Heads",
            "filename": "images/IMG_9923.jpg",
            "thumbnail": "images/IMG_9923_thumb.jpg",
            "date": "2024-03-04",
            "tag": "cars",
            "season": "spring",
            "caption": "Engines and old friends"
        }"#;

        let photo: Photo = serde_json::from_str(json).unwrap();
        assert_eq!(photo.id, 7);
        assert_eq!(photo.season, Season::Spring);
        assert_eq!(photo.date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(photo.display_date(), "March 4, 2024");
    }

    #[test]
    fn test_rejects_unknown_season() {
        let json = r#"{"id":1,"title":"t","filename":"f","thumbnail":"t","date":"2024-01-01","tag":"x","season":"monsoon","caption":""}"#;
        assert!(serde_json::from_str::<Photo>(json).is_err());
    }

    #[test]
    fn test_date_order_newest_first() {
        let a = photo(1, "2023-05-01", Season::Spring);
        let b = photo(2, "2024-01-10", Season::Winter);
        assert_eq!(SortOrder::Date.compare(&a, &b), Ordering::Greater);
        assert_eq!(SortOrder::Date.compare(&b, &a), Ordering::Less);
    }

    #[test]
    fn test_season_order_then_date() {
        let winter = photo(1, "2024-01-10", Season::Winter);
        let old_spring = photo(2, "2021-04-01", Season::Spring);
        let new_spring = photo(3, "2024-04-01", Season::Spring);

        let mut photos = vec![winter.clone(), old_spring.clone(), new_spring.clone()];
        photos.sort_by(|a, b| SortOrder::Season.compare(a, b));

        let ids: Vec<u64> = photos.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }
}
