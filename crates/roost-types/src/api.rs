use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Flash, GeoPoint, ImageRef, ListingKind};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// The signed-in user as page responses expose it, enough for a client to
/// render the navbar and decide which owner controls to show.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUserResponse {
    pub id: Uuid,
    pub username: String,
}

// -- Listings --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateListingRequest {
    pub title: String,
    pub description: String,
    pub location: String,
    pub price: i64,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

/// Update carries the same fields as create plus the filenames of images to
/// drop. New images are appended before the listed ones are removed.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateListingRequest {
    pub title: String,
    pub description: String,
    pub location: String,
    pub price: i64,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub delete_images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub id: Uuid,
    pub kind: ListingKind,
    pub title: String,
    pub description: String,
    pub location: String,
    pub price: i64,
    pub geometry: GeoPoint,
    pub images: Vec<ImageRef>,
    pub author_id: Uuid,
    pub author_username: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct ListingDetailResponse {
    pub id: Uuid,
    pub kind: ListingKind,
    pub title: String,
    pub description: String,
    pub location: String,
    pub price: i64,
    pub geometry: GeoPoint,
    pub images: Vec<ImageRef>,
    pub author_id: Uuid,
    pub author_username: String,
    pub reviews: Vec<ReviewResponse>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

// -- Reviews --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReviewRequest {
    pub body: String,
    pub rating: i64,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub body: String,
    pub rating: i64,
    pub author_id: Uuid,
    pub author_username: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// -- Discovery --

#[derive(Debug, Serialize)]
pub struct AutocompleteEntry {
    pub id: Uuid,
    pub label: String,
}

// -- Pages --

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub current_user: Option<SessionUserResponse>,
    pub flash: Option<Flash>,
}

#[derive(Debug, Serialize)]
pub struct AuthPageResponse {
    pub flash: Option<Flash>,
}

#[derive(Debug, Serialize)]
pub struct ListingIndexResponse {
    pub listings: Vec<ListingResponse>,
    pub current_user: Option<SessionUserResponse>,
    pub flash: Option<Flash>,
}

#[derive(Debug, Serialize)]
pub struct ListingShowResponse {
    pub listing: ListingDetailResponse,
    pub current_user: Option<SessionUserResponse>,
    pub flash: Option<Flash>,
}

#[derive(Debug, Serialize)]
pub struct ListingFormResponse {
    pub kind: ListingKind,
    pub current_user: Option<SessionUserResponse>,
    pub flash: Option<Flash>,
}

#[derive(Debug, Serialize)]
pub struct ListingEditResponse {
    pub listing: ListingResponse,
    pub current_user: Option<SessionUserResponse>,
    pub flash: Option<Flash>,
}
