use serde::{Deserialize, Serialize};

/// The two flavors of listing the marketplace serves. Sites and rooms share
/// one schema and one set of handlers; the kind only scopes lookups and URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Site,
    Room,
}

impl ListingKind {
    /// Parses the plural path segment used in URLs, e.g. `/sites/{id}`.
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "sites" => Some(Self::Site),
            "rooms" => Some(Self::Room),
            _ => None,
        }
    }

    /// Parses the singular form the database stores.
    pub fn from_singular(raw: &str) -> Option<Self> {
        match raw {
            "site" => Some(Self::Site),
            "room" => Some(Self::Room),
            _ => None,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Self::Site => "sites",
            Self::Room => "rooms",
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            Self::Site => "site",
            Self::Room => "room",
        }
    }
}

/// A geocoded position, longitude first to match the GeoJSON axis order
/// the geocoding API responds with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

/// Reference to an already-uploaded image: the URL clients render and the
/// storage filename the server releases when the image is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
}

impl FlashLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub fn from_str(raw: &str) -> Option<Self> {
        match raw {
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// A one-shot notice stored on the session and consumed by the next page
/// that renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}
