use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Image served when a record carries no photograph reference.
const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/800x600";

/// Coordinate pair for the map view. Passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// A single restaurant as served by the listing API and persisted in the
/// record store.
///
/// The API serves two favorite flags that are not guaranteed to agree:
/// a boolean `favorites` and a string `is_favorite` compared against
/// `"true"`. They are kept as separate fields with separate predicates
/// rather than unified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: i64,
    pub name: String,
    pub neighborhood: String,
    pub cuisine_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photograph: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latlng: Option<LatLng>,
    /// Boolean favorite flag, read by `DataService::by_favorites`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorites: Option<bool>,
    /// String favorite flag (`"true"` / `"false"`), read by the combined
    /// listing filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<String>,
    /// Fields this layer does not interpret. Preserved so a record survives
    /// a store round trip byte-for-byte in meaning.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Restaurant {
    /// Whether the boolean `favorites` flag matches `want`. Absent counts
    /// as no match either way.
    pub fn favorites_eq(&self, want: bool) -> bool {
        self.favorites == Some(want)
    }

    /// Whether the string `is_favorite` flag reads `"true"`.
    pub fn marked_favorite(&self) -> bool {
        self.is_favorite.as_deref() == Some("true")
    }

    /// Detail page URL for this record.
    pub fn page_url(&self) -> String {
        format!("./restaurant.html?id={}", self.id)
    }

    /// Image URL, falling back to a placeholder when no photograph is set.
    pub fn image_url(&self) -> String {
        match self.photograph {
            Some(ref photo) => format!("img/{}.jpg", photo),
            None => PLACEHOLDER_IMAGE_URL.to_string(),
        }
    }
}
