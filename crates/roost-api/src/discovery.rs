use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::Response,
};
use serde::Deserialize;

use roost_types::api::AutocompleteEntry;
use roost_types::models::{FlashLevel, ListingKind};

use crate::error::ApiError;
use crate::listings::parse_kind;
use crate::session::{SessionHandle, flash_and_redirect, found};
use crate::state::AppState;
use crate::views;

#[derive(Debug, Deserialize)]
pub struct AutocompleteQuery {
    #[serde(default)]
    pub term: String,
}

/// Search-as-you-type source for the navbar. An absent or empty term matches
/// everything; the cap stays at 20 either way.
pub async fn autocomplete(
    State(state): State<AppState>,
    Path(kind_slug): Path<String>,
    Query(query): Query<AutocompleteQuery>,
) -> Result<Json<Vec<AutocompleteEntry>>, ApiError> {
    let kind = parse_kind(&kind_slug)?;

    let rows = state
        .with_db(move |db| db.autocomplete_titles(kind, &query.term))
        .await?;

    let entries = rows
        .into_iter()
        .map(|(id, label)| AutocompleteEntry {
            id: views::parse_uuid(&id, "listing id"),
            label,
        })
        .collect();

    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct FindSiteQuery {
    #[serde(rename = "findSite", default)]
    pub term: String,
}

#[derive(Debug, Deserialize)]
pub struct FindRoomQuery {
    #[serde(rename = "findRoom", default)]
    pub term: String,
}

pub async fn find_site(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Query(query): Query<FindSiteQuery>,
) -> Result<Response, ApiError> {
    find_exact(state, session, ListingKind::Site, query.term).await
}

pub async fn find_room(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Query(query): Query<FindRoomQuery>,
) -> Result<Response, ApiError> {
    find_exact(state, session, ListingKind::Room, query.term).await
}

/// Exact-title jump from the search box. When titles collide the most
/// recently updated listing wins; no match lands back on the index with a
/// notice.
async fn find_exact(
    state: AppState,
    session: SessionHandle,
    kind: ListingKind,
    title: String,
) -> Result<Response, ApiError> {
    let row = state
        .with_db(move |db| db.find_listing_by_title(kind, &title))
        .await?;

    match row {
        Some(row) => Ok(found(&format!("/{}/{}", kind.slug(), row.id))),
        None => {
            let message = format!("Cannot find that {}!", kind.singular());
            Ok(flash_and_redirect(
                &state,
                &session,
                FlashLevel::Error,
                &message,
                &format!("/{}", kind.slug()),
            )
            .await)
        }
    }
}
