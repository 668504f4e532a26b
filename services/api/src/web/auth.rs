//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for member registration, login, logout and
//! profile management.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Duration;
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use family_finance_core::domain::{NewMember, Role};
use family_finance_core::ports::StoreError;

use crate::web::rest::{current_member, MemberDto};
use crate::web::state::AppState;

const SESSION_DAYS: i64 = 30;

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub relationship: String,
    /// Optional role override. The first registered member becomes an admin
    /// regardless; later members default to MEMBER.
    pub role: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: String,
}

//=========================================================================================
// Session Helpers
//=========================================================================================

/// Creates a session row and returns the Set-Cookie value for it.
async fn open_session(
    state: &Arc<AppState>,
    member_id: Uuid,
) -> Result<String, (StatusCode, String)> {
    // 1. Generate auth session ID
    let auth_session_id = Uuid::new_v4().to_string();

    // 2. Set expiration (30 days)
    let expires_at = state.clock.now() + Duration::days(SESSION_DAYS);

    // 3. Create auth session in database
    state
        .store
        .create_auth_session(&auth_session_id, member_id, expires_at)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create session".to_string(),
            )
        })?;

    // 4. Create session cookie
    Ok(format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        auth_session_id,
        Duration::days(SESSION_DAYS).num_seconds()
    ))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new household member account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Member created successfully", body = MemberDto),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Validate the submitted fields
    let name = req.name.trim();
    if name.len() < 2 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Name must be at least 2 characters".to_string(),
        ));
    }
    if !req.email.contains('@') {
        return Err((
            StatusCode::BAD_REQUEST,
            "A valid email is required".to_string(),
        ));
    }
    if req.password.len() < 6 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters".to_string(),
        ));
    }
    if req.relationship.trim().len() < 2 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Relationship must be at least 2 characters".to_string(),
        ));
    }
    let requested_role = match req.role.as_deref() {
        Some(raw) => Some(Role::parse(raw).ok_or_else(|| {
            (StatusCode::BAD_REQUEST, format!("Unknown role '{}'", raw))
        })?),
        None => None,
    };

    // 2. The first registered member runs the household
    let existing = state.store.count_members().await.map_err(|e| {
        error!("Failed to count members: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to create member".to_string(),
        )
    })?;
    let role = requested_role.unwrap_or(if existing == 0 {
        Role::Admin
    } else {
        Role::Member
    });

    // 3. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to hash password".to_string(),
            )
        })?
        .to_string();

    // 4. Create the member; duplicate emails surface as a conflict
    let member = state
        .store
        .create_member(NewMember {
            name: name.to_string(),
            email: req.email.trim().to_lowercase(),
            relationship: req.relationship.trim().to_string(),
            role,
            can_delete: role == Role::Admin,
            hashed_password: password_hash,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => {
                (StatusCode::CONFLICT, "Email already registered".to_string())
            }
            other => {
                error!("Failed to create member: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to create member".to_string(),
                )
            }
        })?;

    // 5. Open a session so registration logs the member in
    let cookie = open_session(&state, member.id).await?;

    // 6. Return response with cookie
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(MemberDto::from_domain(member)),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = MemberDto),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Get credentials by email. Unknown emails and bad passwords share
    //    one message so the response does not reveal which part failed.
    let credentials = state
        .store
        .member_credentials_by_email(&req.email.trim().to_lowercase())
        .await
        .map_err(|e| {
            error!("Failed to load credentials: {:?}", e);
            (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            )
        })?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&credentials.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Authentication error".to_string(),
        )
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();

    if !valid {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Invalid email or password".to_string(),
        ));
    }

    // 3. Load the full member record for the response body
    let member = state
        .store
        .member_by_id(credentials.member_id)
        .await
        .map_err(|e| {
            error!("Failed to load member: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load member".to_string(),
            )
        })?;

    // 4. Open a session and return the cookie
    let cookie = open_session(&state, member.id).await?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(MemberDto::from_domain(member)),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Extract session cookie
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    // 2. Parse session ID from cookie
    let auth_session_id = cookie_header
        .split(';')
        .find_map(|c| {
            let c = c.trim();
            c.strip_prefix("session=")
        })
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    // 3. Delete auth session from database
    state
        .store
        .delete_auth_session(auth_session_id)
        .await
        .map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to logout".to_string(),
            )
        })?;

    // 4. Clear cookie
    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}

/// GET /auth/me - The member behind the current session
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "The authenticated member", body = MemberDto),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(member_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let member = current_member(&state, member_id).await?;
    Ok(Json(MemberDto::from_domain(member)))
}

/// PUT /auth/profile - Update the authenticated member's display name
#[utoipa::path(
    put,
    path = "/auth/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = MemberDto),
        (status = 400, description = "Invalid name"),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(member_id): Extension<Uuid>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Validate the new name
    let name = req.name.trim();
    if name.len() < 2 || name.len() > 100 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Name must be between 2 and 100 characters".to_string(),
        ));
    }

    // 2. Apply it to the member's own record
    let member = state
        .store
        .update_member_name(member_id, name)
        .await
        .map_err(|e| {
            error!("Failed to update profile: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update profile".to_string(),
            )
        })?;

    Ok(Json(MemberDto::from_domain(member)))
}
