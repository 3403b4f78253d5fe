use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::State,
    response::Response,
};
use uuid::Uuid;

use roost_types::api::{AuthPageResponse, HomeResponse, LoginRequest, RegisterRequest};
use roost_types::models::FlashLevel;

use crate::error::ApiError;
use crate::session::{SessionHandle, flash_and_redirect};
use crate::state::AppState;
use crate::validate;

pub async fn home(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
) -> Json<HomeResponse> {
    let flash = session.take_flash(&state).await;
    Json(HomeResponse {
        current_user: session.current_user(),
        flash,
    })
}

pub async fn register_form(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
) -> Json<AuthPageResponse> {
    Json(AuthPageResponse {
        flash: session.take_flash(&state).await,
    })
}

pub async fn login_form(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
) -> Json<AuthPageResponse> {
    Json(AuthPageResponse {
        flash: session.take_flash(&state).await,
    })
}

pub async fn register(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Json(req): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    validate::registration(&req)?;

    // Friendly duplicate check first; the UNIQUE constraints still backstop
    // races below.
    let (by_name, by_email) = {
        let username = req.username.clone();
        let email = req.email.clone();
        state
            .with_db(move |db| {
                Ok((
                    db.get_user_by_username(&username)?,
                    db.get_user_by_email(&email)?,
                ))
            })
            .await?
    };
    if by_name.is_some() || by_email.is_some() {
        return Ok(flash_and_redirect(
            &state,
            &session,
            FlashLevel::Error,
            "A user with that username or email already exists.",
            "/register",
        )
        .await);
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow!("password hashing failed: {}", e)))?
        .to_string();

    let user_id = Uuid::new_v4().to_string();

    let created = {
        let user_id = user_id.clone();
        state
            .with_db(move |db| db.create_user(&user_id, &req.username, &req.email, &password_hash))
            .await?
    };
    if !created {
        return Ok(flash_and_redirect(
            &state,
            &session,
            FlashLevel::Error,
            "A user with that username or email already exists.",
            "/register",
        )
        .await);
    }

    // Registering signs the new user in on the spot.
    {
        let sid = session.id.clone();
        state
            .with_db(move |db| db.set_session_user(&sid, Some(&user_id)))
            .await?;
    }

    Ok(flash_and_redirect(&state, &session, FlashLevel::Success, "Welcome!", "/").await)
}

pub async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let user = {
        let username = req.username.clone();
        state
            .with_db(move |db| db.get_user_by_username(&username))
            .await?
    };

    // One rejection message no matter which check failed.
    let Some(user) = user else {
        return Ok(flash_and_redirect(
            &state,
            &session,
            FlashLevel::Error,
            "Invalid username or password.",
            "/login",
        )
        .await);
    };

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(anyhow!("stored password hash unreadable: {}", e)))?;
    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Ok(flash_and_redirect(
            &state,
            &session,
            FlashLevel::Error,
            "Invalid username or password.",
            "/login",
        )
        .await);
    }

    let return_to = {
        let sid = session.id.clone();
        let user_id = user.id.clone();
        state
            .with_db(move |db| {
                db.set_session_user(&sid, Some(&user_id))?;
                db.take_session_return_to(&sid)
            })
            .await?
    };

    // Only same-site paths come back out of return_to.
    let target = match return_to {
        Some(url) if url.starts_with('/') => url,
        _ => "/".to_string(),
    };

    Ok(flash_and_redirect(&state, &session, FlashLevel::Success, "Welcome back!", &target).await)
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
) -> Result<Response, ApiError> {
    let sid = session.id.clone();
    state
        .with_db(move |db| db.set_session_user(&sid, None))
        .await?;

    Ok(flash_and_redirect(&state, &session, FlashLevel::Success, "Goodbye!", "/").await)
}
