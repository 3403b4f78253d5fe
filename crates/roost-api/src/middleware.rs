use anyhow::anyhow;
use axum::extract::{Path, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use roost_types::models::{FlashLevel, ListingKind};

use crate::error::ApiError;
use crate::session::{SessionHandle, flash_and_redirect, found};
use crate::state::AppState;

/// The signed-in user, inserted by `require_auth` for everything behind it.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
}

/// Bounces anonymous traffic to the login page, remembering where it was
/// headed so a successful login can send it back.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(session) = req.extensions().get::<SessionHandle>().cloned() else {
        return ApiError::Internal(anyhow!("session middleware did not run")).into_response();
    };

    match &session.user {
        Some(user) => {
            let current = CurrentUser {
                id: user.id.clone(),
                username: user.username.clone(),
            };
            req.extensions_mut().insert(current);
            next.run(req).await
        }
        None => {
            let return_to = req
                .uri()
                .path_and_query()
                .map(|pq| pq.to_string())
                .unwrap_or_else(|| "/".to_string());
            let sid = session.id.clone();
            let stored = state
                .with_db(move |db| {
                    db.set_session_return_to(&sid, &return_to)?;
                    db.set_session_flash(
                        &sid,
                        FlashLevel::Error.as_str(),
                        "You must be signed in first!",
                    )
                })
                .await;
            if let Err(e) = stored {
                warn!("Failed to park return-to on session {}: {}", session.id, e);
            }
            found("/login")
        }
    }
}

/// Listing mutations are owner-only. Runs after `require_auth`. A missing
/// listing flashes and bounces to the index instead of a 404, same as the
/// rest of the browser flow.
pub async fn require_listing_owner(
    State(state): State<AppState>,
    Path((kind_slug, id)): Path<(String, String)>,
    req: Request,
    next: Next,
) -> Response {
    let Some(kind) = ListingKind::from_slug(&kind_slug) else {
        return ApiError::NotFound.into_response();
    };
    let Some(session) = req.extensions().get::<SessionHandle>().cloned() else {
        return ApiError::Internal(anyhow!("session middleware did not run")).into_response();
    };
    let Some(user) = req.extensions().get::<CurrentUser>().cloned() else {
        return ApiError::Internal(anyhow!("auth middleware did not run")).into_response();
    };

    let lookup = id.clone();
    let listing = match state.with_db(move |db| db.get_listing(kind, &lookup)).await {
        Ok(listing) => listing,
        Err(e) => return e.into_response(),
    };

    match listing {
        None => {
            let message = format!("Cannot find that {}!", kind.singular());
            flash_and_redirect(
                &state,
                &session,
                FlashLevel::Error,
                &message,
                &format!("/{}", kind.slug()),
            )
            .await
        }
        Some(row) if row.author_id != user.id => {
            flash_and_redirect(
                &state,
                &session,
                FlashLevel::Error,
                "You do not have the permission to do that!",
                &format!("/{}/{}", kind.slug(), id),
            )
            .await
        }
        Some(_) => next.run(req).await,
    }
}

/// Review deletion is author-only. Runs after `require_auth`.
pub async fn require_review_owner(
    State(state): State<AppState>,
    Path((kind_slug, listing_id, review_id)): Path<(String, String, String)>,
    req: Request,
    next: Next,
) -> Response {
    let Some(kind) = ListingKind::from_slug(&kind_slug) else {
        return ApiError::NotFound.into_response();
    };
    let Some(session) = req.extensions().get::<SessionHandle>().cloned() else {
        return ApiError::Internal(anyhow!("session middleware did not run")).into_response();
    };
    let Some(user) = req.extensions().get::<CurrentUser>().cloned() else {
        return ApiError::Internal(anyhow!("auth middleware did not run")).into_response();
    };

    // Scoped to the listing in the path: a review id that belongs to some
    // other listing is treated as missing, not as a grant.
    let (lookup_listing, lookup_review) = (listing_id.clone(), review_id.clone());
    let review = match state
        .with_db(move |db| db.get_review_for_listing(&lookup_listing, &lookup_review))
        .await
    {
        Ok(review) => review,
        Err(e) => return e.into_response(),
    };

    let show_url = format!("/{}/{}", kind.slug(), listing_id);
    match review {
        None => {
            flash_and_redirect(
                &state,
                &session,
                FlashLevel::Error,
                "Cannot find that review!",
                &show_url,
            )
            .await
        }
        Some(row) if row.author_id != user.id => {
            flash_and_redirect(
                &state,
                &session,
                FlashLevel::Error,
                "You do not have the permission to do that!",
                &show_url,
            )
            .await
        }
        Some(_) => next.run(req).await,
    }
}
