use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;
use uuid::Uuid;

use roost_types::api::SessionUserResponse;
use roost_types::models::{Flash, FlashLevel};

use crate::error::ApiError;
use crate::state::AppState;
use crate::views;

pub const SESSION_COOKIE: &str = "roost_sid";

/// The session attached to every request by `with_session`. Handlers pull it
/// out of request extensions to read the signed-in user and to flash.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: String,
    pub user: Option<SessionUser>,
}

#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
}

impl SessionHandle {
    pub fn current_user(&self) -> Option<SessionUserResponse> {
        self.user.as_ref().map(|user| SessionUserResponse {
            id: views::parse_uuid(&user.id, "user id"),
            username: user.username.clone(),
        })
    }

    /// Stores a one-shot notice for the next rendered page. Failures are
    /// logged rather than surfaced; the notice is cosmetic.
    pub async fn flash(&self, state: &AppState, level: FlashLevel, message: &str) {
        let sid = self.id.clone();
        let message = message.to_string();
        let stored = state
            .with_db(move |db| db.set_session_flash(&sid, level.as_str(), &message))
            .await;
        if let Err(e) = stored {
            warn!("Failed to store flash on session {}: {}", self.id, e);
        }
    }

    pub async fn take_flash(&self, state: &AppState) -> Option<Flash> {
        let sid = self.id.clone();
        match state.with_db(move |db| db.take_session_flash(&sid)).await {
            Ok(Some((level, message))) => {
                FlashLevel::from_str(&level).map(|level| Flash { level, message })
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to take flash on session {}: {}", self.id, e);
                None
            }
        }
    }
}

/// Loads the session named by the request cookie, minting a fresh anonymous
/// one when the cookie is absent, expired or forged. New sessions get their
/// cookie appended to the response on the way out.
pub async fn with_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let existing = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
        .map(|id| id.to_string());

    let (session, created) = match load_or_create(&state, existing).await {
        Ok(pair) => pair,
        Err(e) => return e.into_response(),
    };
    let session_id = session.id.clone();

    req.extensions_mut().insert(session);
    let mut response = next.run(req).await;

    if created {
        let max_age = state.session_ttl_days * 24 * 60 * 60;
        let cookie = format!(
            "{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age}"
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!("Session cookie not serializable: {}", e),
        }
    }

    response
}

async fn load_or_create(
    state: &AppState,
    existing: Option<String>,
) -> Result<(SessionHandle, bool), ApiError> {
    if let Some(id) = existing {
        let lookup = id.clone();
        let row = state.with_db(move |db| db.get_session(&lookup)).await?;
        if let Some(row) = row {
            let user = match (row.user_id, row.username) {
                (Some(user_id), Some(username)) => Some(SessionUser {
                    id: user_id,
                    username,
                }),
                _ => None,
            };
            return Ok((SessionHandle { id, user }, false));
        }
    }

    let id = Uuid::new_v4().to_string();
    let sid = id.clone();
    let ttl = state.session_ttl_days;
    state.with_db(move |db| db.create_session(&sid, ttl)).await?;
    Ok((SessionHandle { id, user: None }, true))
}

/// Plain 302 Found. axum's `Redirect` emits 303 or 307; the browser form
/// flows here expect the original semantics.
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(e) => {
            warn!("Redirect target not serializable: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn flash_and_redirect(
    state: &AppState,
    session: &SessionHandle,
    level: FlashLevel,
    message: &str,
    location: &str,
) -> Response {
    session.flash(state, level, message).await;
    found(location)
}
