//! Account handlers: registration, login and self-service profile.

use super::middleware::AuthUser;
use super::password::{MIN_PASSWORD_LEN, hash_in_pool, verify_in_pool};
use crate::server::state::AppState;
use crate::storage::{StorageError, normalize_email};
use crate::types::{User, UserId, UserProfile, UserRole, UserStatus};
use axum::{Json, extract::State, http::StatusCode};
use boothbook_core::environment::Clock;
use boothbook_web::{AppError, CorrelationId, WebResult};
use serde::{Deserialize, Serialize};

/// Registration form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Sign-in email
    pub email: String,
    /// Plaintext password
    pub password: String,
    /// Contact phone
    pub phone: String,
    /// Company
    pub company_name: String,
    /// Industry
    pub industry: String,
    /// Company size bucket
    pub company_size: String,
    /// Company address
    pub company_address: String,
    /// Requested role; only honoured when admin sign-up is enabled
    pub role: Option<UserRole>,
}

/// Login form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    /// Sign-in email
    pub email: String,
    /// Plaintext password
    pub password: String,
}

/// The account fields returned alongside a token
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    /// Account id
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Sign-in email
    pub email: String,
    /// Account role
    pub role: UserRole,
    /// Company
    pub company_name: String,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            role: user.role,
            company_name: user.company_name.clone(),
        }
    }
}

/// Response to register and login
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    /// Human message
    pub message: &'static str,
    /// Bearer token
    pub token: String,
    /// The signed-in account
    pub user: SessionUser,
}

/// Profile changes; absent fields are left as they are
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProfileRequest {
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
    /// Sign-in email
    pub email: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
    /// Company
    pub company_name: Option<String>,
    /// Industry
    pub industry: Option<String>,
    /// Company size bucket
    pub company_size: Option<String>,
    /// Company address
    pub company_address: Option<String>,
}

/// Response to a profile update
#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    /// Always true
    pub success: bool,
    /// The updated profile
    pub user: UserProfile,
}

/// Password change form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangePasswordRequest {
    /// Password in use
    pub current_password: String,
    /// Replacement password
    pub new_password: String,
}

/// Response with only a confirmation message
#[derive(Debug, Clone, Serialize)]
pub struct SuccessMessage {
    /// Always true
    pub success: bool,
    /// Human message
    pub message: &'static str,
}

fn issue_token(state: &AppState, user: &User) -> WebResult<String> {
    state
        .tokens
        .issue(user, state.clock.now())
        .map_err(|e| AppError::internal("Failed to issue token").with_source(e.into()))
}

/// Create an exhibitor account and sign it in.
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// ```
///
/// # Errors
///
/// - 400 if email or password is missing, the password is too short, or the
///   email is already registered
pub async fn register(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Json(request): Json<RegisterRequest>,
) -> WebResult<(StatusCode, Json<AuthResponse>)> {
    let email = normalize_email(&request.email);
    if email.is_empty() || request.password.is_empty() {
        return Err(AppError::bad_request("Email and password are required"));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }

    let role = match request.role {
        Some(UserRole::Admin) if state.config.auth.allow_admin_signup => UserRole::Admin,
        _ => UserRole::Exhibitor,
    };

    let password_hash = hash_in_pool(request.password.clone())
        .await
        .map_err(|e| AppError::internal("Failed to hash password").with_source(e.into()))?;

    let user = User {
        id: UserId::new(),
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        email,
        phone: request.phone,
        company_name: request.company_name,
        industry: request.industry,
        company_size: request.company_size,
        company_address: request.company_address,
        password_hash,
        role,
        status: UserStatus::Active,
        registration_date: state.clock.now(),
    };

    match state.repositories.users.insert(&user).await {
        Ok(()) => {},
        Err(StorageError::DuplicateEmail(_)) => {
            return Err(AppError::bad_request("User already exists with this email"));
        },
        Err(error) => return Err(error.into()),
    }

    tracing::info!(
        correlation_id = %correlation_id.0,
        user_id = %user.id,
        role = %user.role,
        "User registered"
    );

    let token = issue_token(&state, &user)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            token,
            user: SessionUser::from(&user),
        }),
    ))
}

/// Exchange email and password for a token.
///
/// # Errors
///
/// - 401 "Invalid credentials" for an unknown email or wrong password
/// - 400 "Account is suspended" for inactive accounts
pub async fn login(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Json(request): Json<LoginRequest>,
) -> WebResult<Json<AuthResponse>> {
    let user = state
        .repositories
        .users
        .find_by_email(&request.email)
        .await?;

    let user = match user {
        Some(user) => verify_in_pool(request.password.clone(), user.password_hash.clone())
            .await
            .then_some(user),
        None => None,
    };
    let Some(user) = user else {
        tracing::info!(correlation_id = %correlation_id.0, "Login failed");
        return Err(AppError::unauthorized("Invalid credentials"));
    };

    if user.status == UserStatus::Inactive {
        return Err(AppError::bad_request("Account is suspended"));
    }

    tracing::info!(correlation_id = %correlation_id.0, user_id = %user.id, "Login successful");

    let token = issue_token(&state, &user)?;
    Ok(Json(AuthResponse {
        message: "Login successful",
        token,
        user: SessionUser::from(&user),
    }))
}

/// The signed-in account's profile.
///
/// # Errors
///
/// Returns 404 if the account no longer exists.
pub async fn me(State(state): State<AppState>, user: AuthUser) -> WebResult<Json<UserProfile>> {
    let account = state
        .repositories
        .users
        .get(user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(Json(UserProfile::from(&account)))
}

/// Update the signed-in account's profile.
///
/// # Errors
///
/// - 404 if the account no longer exists
/// - 400 if the new email is empty or belongs to another account
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> WebResult<Json<ProfileResponse>> {
    let mut account = state
        .repositories
        .users
        .get(user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    if let Some(email) = request.email {
        let email = normalize_email(&email);
        if email.is_empty() {
            return Err(AppError::bad_request("Email cannot be empty"));
        }
        account.email = email;
    }
    let fields = [
        (request.first_name, &mut account.first_name),
        (request.last_name, &mut account.last_name),
        (request.phone, &mut account.phone),
        (request.company_name, &mut account.company_name),
        (request.industry, &mut account.industry),
        (request.company_size, &mut account.company_size),
        (request.company_address, &mut account.company_address),
    ];
    for (value, field) in fields {
        if let Some(value) = value {
            *field = value;
        }
    }

    match state.repositories.users.update(&account).await {
        Ok(()) => {},
        Err(StorageError::DuplicateEmail(_)) => {
            return Err(AppError::bad_request("Email is already in use"));
        },
        Err(error) => return Err(error.into()),
    }

    Ok(Json(ProfileResponse {
        success: true,
        user: UserProfile::from(&account),
    }))
}

/// Change the signed-in account's password.
///
/// # Errors
///
/// - 400 if a field is missing, the new password is too short, or the
///   current password is wrong
/// - 404 if the account no longer exists
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ChangePasswordRequest>,
) -> WebResult<Json<SuccessMessage>> {
    if request.current_password.is_empty() || request.new_password.is_empty() {
        return Err(AppError::bad_request(
            "Current and new password are required",
        ));
    }
    if request.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "New password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }

    let mut account = state
        .repositories
        .users
        .get(user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    if !verify_in_pool(request.current_password.clone(), account.password_hash.clone()).await {
        return Err(AppError::bad_request("Current password is incorrect"));
    }

    account.password_hash = hash_in_pool(request.new_password.clone())
        .await
        .map_err(|e| AppError::internal("Failed to hash password").with_source(e.into()))?;
    state
        .repositories
        .users
        .update(&account)
        .await?;

    tracing::info!(user_id = %account.id, "Password changed");

    Ok(Json(SuccessMessage {
        success: true,
        message: "Password updated successfully",
    }))
}
