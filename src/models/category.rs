use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Fixed civic issue classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum Category {
    #[serde(rename = "Pothole")]
    Pothole,
    #[serde(rename = "Broken Streetlight")]
    BrokenStreetlight,
    #[serde(rename = "Overflowing Trash Bin")]
    OverflowingTrashBin,
    #[serde(rename = "Graffiti")]
    Graffiti,
    #[serde(rename = "Damaged Public Property")]
    DamagedPublicProperty,
    #[serde(rename = "Water Leak")]
    WaterLeak,
    #[serde(rename = "Sidewalk Damage")]
    SidewalkDamage,
    #[serde(rename = "Traffic Signal Issue")]
    TrafficSignalIssue,
    #[serde(rename = "Other")]
    Other,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Pothole,
        Category::BrokenStreetlight,
        Category::OverflowingTrashBin,
        Category::Graffiti,
        Category::DamagedPublicProperty,
        Category::WaterLeak,
        Category::SidewalkDamage,
        Category::TrafficSignalIssue,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Pothole => "Pothole",
            Category::BrokenStreetlight => "Broken Streetlight",
            Category::OverflowingTrashBin => "Overflowing Trash Bin",
            Category::Graffiti => "Graffiti",
            Category::DamagedPublicProperty => "Damaged Public Property",
            Category::WaterLeak => "Water Leak",
            Category::SidewalkDamage => "Sidewalk Damage",
            Category::TrafficSignalIssue => "Traffic Signal Issue",
            Category::Other => "Other",
        }
    }

    /// Civic severity used by the priority scorer.
    pub fn severity(self) -> f64 {
        match self {
            Category::WaterLeak | Category::TrafficSignalIssue => 9.0,
            Category::Pothole => 7.0,
            Category::BrokenStreetlight => 6.0,
            Category::SidewalkDamage => 5.0,
            Category::DamagedPublicProperty | Category::OverflowingTrashBin => 4.0,
            Category::Other => 3.0,
            Category::Graffiti => 2.0,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts display names ("Water Leak") and slug forms ("water_leak", "water-leak"),
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        Category::ALL
            .into_iter()
            .find(|c| {
                let key: String = c
                    .as_str()
                    .chars()
                    .filter(|ch| ch.is_ascii_alphanumeric())
                    .map(|ch| ch.to_ascii_lowercase())
                    .collect();
                key == wanted
            })
            .ok_or_else(|| {
                format!(
                    "category must be one of: {}",
                    Category::ALL.map(Category::as_str).join(", ")
                )
            })
    }
}
