use axum::{
    Extension, Json,
    extract::{Path, State},
    response::Response,
};
use uuid::Uuid;

use roost_types::api::CreateReviewRequest;
use roost_types::models::FlashLevel;

use crate::error::ApiError;
use crate::listings::parse_kind;
use crate::middleware::CurrentUser;
use crate::session::{SessionHandle, flash_and_redirect, found};
use crate::state::AppState;
use crate::validate;

pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Extension(user): Extension<CurrentUser>,
    Path((kind_slug, listing_id)): Path<(String, String)>,
    Json(req): Json<CreateReviewRequest>,
) -> Result<Response, ApiError> {
    let kind = parse_kind(&kind_slug)?;
    validate::review(&req)?;

    let review_id = Uuid::new_v4().to_string();
    let inserted = {
        let listing_id = listing_id.clone();
        let review_id = review_id.clone();
        state
            .with_db(move |db| {
                db.insert_review(kind, &listing_id, &review_id, &user.id, &req.body, req.rating)
            })
            .await?
    };

    if !inserted {
        let message = format!("Cannot find that {}!", kind.singular());
        return Ok(flash_and_redirect(
            &state,
            &session,
            FlashLevel::Error,
            &message,
            &format!("/{}", kind.slug()),
        )
        .await);
    }

    session.flash(&state, FlashLevel::Success, "Created new review!").await;
    Ok(found(&format!("/{}/{}", kind.slug(), listing_id)))
}

pub async fn destroy(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Path((kind_slug, listing_id, review_id)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let kind = parse_kind(&kind_slug)?;

    let deleted = {
        let listing_id = listing_id.clone();
        state
            .with_db(move |db| db.delete_review(&listing_id, &review_id))
            .await?
    };

    let show_url = format!("/{}/{}", kind.slug(), listing_id);
    if !deleted {
        return Ok(flash_and_redirect(
            &state,
            &session,
            FlashLevel::Error,
            "Cannot find that review!",
            &show_url,
        )
        .await);
    }

    session
        .flash(&state, FlashLevel::Success, "Successfully deleted review!")
        .await;
    Ok(found(&show_url))
}
