use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::warn;
use uuid::Uuid;

use roost_db::models::{ImageRow, ListingPatch, NewListing};
use roost_types::api::{
    CreateListingRequest, ListingEditResponse, ListingFormResponse, ListingIndexResponse,
    ListingShowResponse, UpdateListingRequest,
};
use roost_types::models::{FlashLevel, ListingKind};

use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::session::{SessionHandle, flash_and_redirect, found};
use crate::state::AppState;
use crate::validate;
use crate::views;

pub(crate) fn parse_kind(slug: &str) -> Result<ListingKind, ApiError> {
    ListingKind::from_slug(slug).ok_or(ApiError::NotFound)
}

pub async fn index(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Path(kind_slug): Path<String>,
) -> Result<Response, ApiError> {
    let kind = parse_kind(&kind_slug)?;

    let (rows, image_rows) = state
        .with_db(move |db| {
            let rows = db.list_listings(kind)?;
            let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
            let images = db.images_for_listings(&ids)?;
            Ok((rows, images))
        })
        .await?;

    // Group images by listing before building responses.
    let mut image_map: HashMap<String, Vec<ImageRow>> = HashMap::new();
    for image in image_rows {
        image_map.entry(image.listing_id.clone()).or_default().push(image);
    }

    let listings = rows
        .into_iter()
        .map(|row| {
            let images = image_map.remove(&row.id).unwrap_or_default();
            views::listing_response(row, images)
        })
        .collect();

    let flash = session.take_flash(&state).await;
    Ok(Json(ListingIndexResponse {
        listings,
        current_user: session.current_user(),
        flash,
    })
    .into_response())
}

pub async fn new_form(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Path(kind_slug): Path<String>,
) -> Result<Response, ApiError> {
    let kind = parse_kind(&kind_slug)?;
    let flash = session.take_flash(&state).await;
    Ok(Json(ListingFormResponse {
        kind,
        current_user: session.current_user(),
        flash,
    })
    .into_response())
}

pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Extension(user): Extension<CurrentUser>,
    Path(kind_slug): Path<String>,
    Json(req): Json<CreateListingRequest>,
) -> Result<Response, ApiError> {
    let kind = parse_kind(&kind_slug)?;
    validate::listing(&req.title, &req.description, &req.location, req.price, &req.images)?;

    // No geocoding match means the listing never lands on a map, so creation
    // is rejected rather than stored with undefined geometry.
    let Some(point) = state.geocoder.forward(&req.location).await? else {
        return Err(ApiError::Validation("location could not be geocoded".to_string()));
    };

    let id = Uuid::new_v4().to_string();
    {
        let id = id.clone();
        state
            .with_db(move |db| {
                db.insert_listing(
                    &NewListing {
                        id: &id,
                        kind,
                        title: &req.title,
                        description: &req.description,
                        location: &req.location,
                        longitude: point.longitude,
                        latitude: point.latitude,
                        price: req.price,
                        author_id: &user.id,
                    },
                    &req.images,
                )
            })
            .await?;
    }

    let message = format!("Successfully added a new {}!", kind.singular());
    session.flash(&state, FlashLevel::Success, &message).await;
    Ok(found(&format!("/{}/{}", kind.slug(), id)))
}

pub async fn show(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Path((kind_slug, id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let kind = parse_kind(&kind_slug)?;

    let data = {
        let id = id.clone();
        state
            .with_db(move |db| {
                let Some(row) = db.get_listing(kind, &id)? else {
                    return Ok(None);
                };
                let images = db.images_for_listing(&id)?;
                let reviews = db.reviews_for_listing(&id)?;
                Ok(Some((row, images, reviews)))
            })
            .await?
    };

    let Some((row, images, reviews)) = data else {
        let message = format!("Cannot find that {}!", kind.singular());
        return Ok(flash_and_redirect(
            &state,
            &session,
            FlashLevel::Error,
            &message,
            &format!("/{}", kind.slug()),
        )
        .await);
    };

    let listing = views::listing_detail_response(row, images, reviews);
    let flash = session.take_flash(&state).await;
    Ok(Json(ListingShowResponse {
        listing,
        current_user: session.current_user(),
        flash,
    })
    .into_response())
}

pub async fn edit_form(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Path((kind_slug, id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let kind = parse_kind(&kind_slug)?;

    let data = {
        let id = id.clone();
        state
            .with_db(move |db| {
                let Some(row) = db.get_listing(kind, &id)? else {
                    return Ok(None);
                };
                let images = db.images_for_listing(&id)?;
                Ok(Some((row, images)))
            })
            .await?
    };

    let Some((row, images)) = data else {
        let message = format!("Cannot find that {}!", kind.singular());
        return Ok(flash_and_redirect(
            &state,
            &session,
            FlashLevel::Error,
            &message,
            &format!("/{}", kind.slug()),
        )
        .await);
    };

    let flash = session.take_flash(&state).await;
    Ok(Json(ListingEditResponse {
        listing: views::listing_response(row, images),
        current_user: session.current_user(),
        flash,
    })
    .into_response())
}

pub async fn update(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Path((kind_slug, id)): Path<(String, String)>,
    Json(req): Json<UpdateListingRequest>,
) -> Result<Response, ApiError> {
    let kind = parse_kind(&kind_slug)?;
    validate::listing(&req.title, &req.description, &req.location, req.price, &req.images)?;

    let removed = {
        let id = id.clone();
        state
            .with_db(move |db| {
                db.update_listing(
                    kind,
                    &id,
                    &ListingPatch {
                        title: &req.title,
                        description: &req.description,
                        location: &req.location,
                        price: req.price,
                    },
                    &req.images,
                    &req.delete_images,
                )
            })
            .await?
    };

    let Some(removed) = removed else {
        let message = format!("Cannot find that {}!", kind.singular());
        return Ok(flash_and_redirect(
            &state,
            &session,
            FlashLevel::Error,
            &message,
            &format!("/{}", kind.slug()),
        )
        .await);
    };

    // Stored files go only after the row changes are committed.
    release_images(&state, &removed).await;

    let message = format!("Successfully updated the {}!", kind.singular());
    session.flash(&state, FlashLevel::Success, &message).await;
    Ok(found(&format!("/{}/{}", kind.slug(), id)))
}

pub async fn destroy(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Path((kind_slug, id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let kind = parse_kind(&kind_slug)?;

    let removed = {
        let id = id.clone();
        state
            .with_db(move |db| db.delete_listing(kind, &id))
            .await?
    };

    let Some(filenames) = removed else {
        let message = format!("Cannot find that {}!", kind.singular());
        return Ok(flash_and_redirect(
            &state,
            &session,
            FlashLevel::Error,
            &message,
            &format!("/{}", kind.slug()),
        )
        .await);
    };

    release_images(&state, &filenames).await;

    let message = format!("Successfully deleted the {}!", kind.singular());
    session.flash(&state, FlashLevel::Success, &message).await;
    Ok(found(&format!("/{}", kind.slug())))
}

/// Best effort: a failed release leaves an orphan in storage, never a
/// half-deleted listing.
pub(crate) async fn release_images(state: &AppState, filenames: &[String]) {
    for filename in filenames {
        if let Err(e) = state.images.release(filename).await {
            warn!("Failed to release stored image {}: {}", filename, e);
        }
    }
}
