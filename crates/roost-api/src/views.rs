use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use roost_db::models::{ImageRow, ListingRow, ReviewRow};
use roost_types::api::{ListingDetailResponse, ListingResponse, ReviewResponse};
use roost_types::models::{GeoPoint, ImageRef, ListingKind};

pub(crate) fn parse_uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS[.SSS]" without timezone.
/// Parse as naive UTC and convert; epoch on garbage rather than a 500.
pub(crate) fn parse_timestamp(raw: &str, what: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", raw, what, e);
            DateTime::default()
        })
}

fn kind_of(row: &ListingRow) -> ListingKind {
    ListingKind::from_singular(&row.kind).unwrap_or_else(|| {
        warn!("Corrupt kind '{}' on listing '{}'", row.kind, row.id);
        ListingKind::Site
    })
}

pub(crate) fn image_refs(rows: Vec<ImageRow>) -> Vec<ImageRef> {
    rows.into_iter()
        .map(|row| ImageRef {
            url: row.url,
            filename: row.filename,
        })
        .collect()
}

pub(crate) fn listing_response(row: ListingRow, images: Vec<ImageRow>) -> ListingResponse {
    ListingResponse {
        id: parse_uuid(&row.id, "listing id"),
        kind: kind_of(&row),
        geometry: GeoPoint {
            longitude: row.longitude,
            latitude: row.latitude,
        },
        images: image_refs(images),
        author_id: parse_uuid(&row.author_id, "author id"),
        created_at: parse_timestamp(&row.created_at, "listing"),
        updated_at: parse_timestamp(&row.updated_at, "listing"),
        title: row.title,
        description: row.description,
        location: row.location,
        price: row.price,
        author_username: row.author_username,
    }
}

pub(crate) fn listing_detail_response(
    row: ListingRow,
    images: Vec<ImageRow>,
    reviews: Vec<ReviewRow>,
) -> ListingDetailResponse {
    ListingDetailResponse {
        id: parse_uuid(&row.id, "listing id"),
        kind: kind_of(&row),
        geometry: GeoPoint {
            longitude: row.longitude,
            latitude: row.latitude,
        },
        images: image_refs(images),
        author_id: parse_uuid(&row.author_id, "author id"),
        reviews: reviews.into_iter().map(review_response).collect(),
        created_at: parse_timestamp(&row.created_at, "listing"),
        updated_at: parse_timestamp(&row.updated_at, "listing"),
        title: row.title,
        description: row.description,
        location: row.location,
        price: row.price,
        author_username: row.author_username,
    }
}

pub(crate) fn review_response(row: ReviewRow) -> ReviewResponse {
    ReviewResponse {
        id: parse_uuid(&row.id, "review id"),
        author_id: parse_uuid(&row.author_id, "author id"),
        created_at: parse_timestamp(&row.created_at, "review"),
        body: row.body,
        rating: row.rating,
        author_username: row.author_username,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sqlite_timestamps_with_and_without_millis() {
        let plain = parse_timestamp("2026-08-24 10:30:00", "test");
        assert_eq!(plain.to_rfc3339(), "2026-08-24T10:30:00+00:00");

        let millis = parse_timestamp("2026-08-24 10:30:00.123", "test");
        assert!(millis > plain);
    }

    #[test]
    fn garbage_timestamp_falls_back_to_epoch() {
        let fallback = parse_timestamp("not a date", "test");
        assert_eq!(fallback, DateTime::<Utc>::default());
    }

    #[test]
    fn garbage_uuid_falls_back_to_nil() {
        assert_eq!(parse_uuid("not-a-uuid", "test"), Uuid::default());
    }
}
