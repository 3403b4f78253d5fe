/// Database row types. These map directly to SQLite rows and stay distinct
/// from the roost-types API models to keep the DB layer independent.
use roost_types::models::ListingKind;

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct ListingRow {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub longitude: f64,
    pub latitude: f64,
    pub price: i64,
    pub author_id: String,
    pub author_username: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct ImageRow {
    pub listing_id: String,
    pub url: String,
    pub filename: String,
    pub position: i64,
}

pub struct ReviewRow {
    pub id: String,
    pub author_id: String,
    pub author_username: String,
    pub body: String,
    pub rating: i64,
    pub created_at: String,
}

pub struct SessionRow {
    pub id: String,
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub return_to: Option<String>,
    pub flash_level: Option<String>,
    pub flash_message: Option<String>,
    pub expires_at: String,
    pub created_at: String,
}

/// Insert payload for a listing. Images ride along in the same transaction.
pub struct NewListing<'a> {
    pub id: &'a str,
    pub kind: ListingKind,
    pub title: &'a str,
    pub description: &'a str,
    pub location: &'a str,
    pub longitude: f64,
    pub latitude: f64,
    pub price: i64,
    pub author_id: &'a str,
}

/// Field updates for a listing. Geometry is untouched on update; only a
/// fresh create geocodes the location.
pub struct ListingPatch<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub location: &'a str,
    pub price: i64,
}
