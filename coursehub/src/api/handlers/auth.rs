//! HTTP handlers for registration and login.

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    api::models::{
        auth::{AuthResponse, LoginRequest, RegisterRequest},
        users::{CurrentUser, UserResponse},
    },
    auth::{password, session},
    db::{
        handlers::Users,
        models::users::UserCreateDBRequest,
    },
    errors::{Error, Result},
};

/// Register a new user account
#[utoipa::path(
    post,
    path = "/user/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input or email already registered"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<(StatusCode, Json<AuthResponse>)> {
    if !state.config.auth.allow_registration {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    register_account(&state, request, false).await
}

/// Register a new admin account
#[utoipa::path(
    post,
    path = "/admin/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "Admin registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input or email already registered"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn admin_register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    if !state.config.auth.allow_admin_registration {
        return Err(Error::BadRequest {
            message: "Admin registration is disabled".to_string(),
        });
    }

    register_account(&state, request, true).await
}

async fn register_account(state: &AppState, request: RegisterRequest, is_admin: bool) -> Result<(StatusCode, Json<AuthResponse>)> {
    if request.username.is_empty() || request.email.is_empty() || request.password.is_empty() || request.first_name.is_empty() {
        return Err(Error::BadRequest {
            message: "all fields are required".to_string(),
        });
    }

    if !request.email.contains('@') {
        return Err(Error::BadRequest {
            message: "invalid email address".to_string(),
        });
    }

    // Validate password length
    let password_config = &state.config.auth.password;
    if request.password.len() < password_config.min_length {
        return Err(Error::BadRequest {
            message: format!("Password must be at least {} characters", password_config.min_length),
        });
    }
    if request.password.len() > password_config.max_length {
        return Err(Error::BadRequest {
            message: format!("Password must be no more than {} characters", password_config.max_length),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut tx);

    // Check if user with this email already exists
    if user_repo.get_user_by_email(&request.email).await?.is_some() {
        return Err(Error::BadRequest {
            message: "An account with this email address already exists".to_string(),
        });
    }

    // Hash the password on a blocking thread to avoid blocking async runtime
    let password = request.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || password::hash_string(&password))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    let create_request = UserCreateDBRequest {
        username: request.username,
        email: request.email,
        password_hash,
        first_name: request.first_name,
        last_name: request.last_name,
        is_admin,
    };

    let created_user = user_repo.create(&create_request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let user_response = UserResponse::from(created_user);
    let current_user: CurrentUser = CurrentUser {
        id: user_response.id,
        username: user_response.username.clone(),
        email: user_response.email.clone(),
        is_admin: user_response.is_admin,
    };
    let token = session::create_session_token(&current_user, &state.config)?;

    let msg = if is_admin {
        "admin registered successfully"
    } else {
        "user registered successfully"
    };

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            msg: msg.to_string(),
            token,
            user: user_response,
        }),
    ))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/user/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Json<AuthResponse>> {
    login_account(&state, request, false).await
}

/// Admin login with email and password
#[utoipa::path(
    post,
    path = "/admin/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials or not an admin"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn admin_login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Json<AuthResponse>> {
    login_account(&state, request, true).await
}

async fn login_account(state: &AppState, request: LoginRequest, require_admin: bool) -> Result<Json<AuthResponse>> {
    let invalid_credentials = || Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    };

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    // Find user by email
    let user = user_repo.get_user_by_email(&request.email).await?.ok_or_else(invalid_credentials)?;

    // Verify password on a blocking thread to avoid blocking async runtime
    let password = request.password.clone();
    let hash = user.password_hash.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(invalid_credentials());
    }

    // The admin login route only mints tokens for admin accounts. A regular
    // account with valid credentials is still rejected with the generic
    // message to avoid leaking account type.
    if require_admin && !user.is_admin {
        return Err(invalid_credentials());
    }

    let user_response = UserResponse::from(user);
    let current_user = CurrentUser {
        id: user_response.id,
        username: user_response.username.clone(),
        email: user_response.email.clone(),
        is_admin: user_response.is_admin,
    };
    let token = session::create_session_token(&current_user, &state.config)?;

    let msg = if require_admin {
        "admin login successfully"
    } else {
        "user login successfully"
    };

    Ok(Json(AuthResponse {
        msg: msg.to_string(),
        token,
        user: user_response,
    }))
}
