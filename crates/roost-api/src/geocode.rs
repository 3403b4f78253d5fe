use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use roost_types::models::GeoPoint;

const MAPBOX_PLACES_URL: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places";

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("geocoding response malformed: {0}")]
    Malformed(String),
}

/// Forward geocoding: resolve a free-form location string to a point.
/// Ok(None) means the provider had no result for the query, which callers
/// treat differently from a transport failure.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn forward(&self, query: &str) -> Result<Option<GeoPoint>, GeocodeError>;
}

pub struct MapboxGeocoder {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl MapboxGeocoder {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url: MAPBOX_PLACES_URL.to_string(),
        }
    }
}

#[async_trait]
impl Geocoder for MapboxGeocoder {
    async fn forward(&self, query: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| GeocodeError::Malformed(format!("bad geocoder base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| GeocodeError::Malformed("geocoder base url cannot be a base".to_string()))?
            .push(&format!("{query}.json"));
        url.query_pairs_mut()
            .append_pair("access_token", &self.token)
            .append_pair("limit", "1");

        let response = self.client.get(url).send().await?.error_for_status()?;
        let body: FeatureCollection = response.json().await?;

        Ok(first_point(body))
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

/// GeoJSON puts longitude before latitude.
fn first_point(body: FeatureCollection) -> Option<GeoPoint> {
    let feature = body.features.into_iter().next()?;
    if feature.geometry.coordinates.len() < 2 {
        return None;
    }
    Some(GeoPoint {
        longitude: feature.geometry.coordinates[0],
        latitude: feature.geometry.coordinates[1],
    })
}
