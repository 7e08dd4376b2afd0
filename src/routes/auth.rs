/**
 * Authentication Routes
 * JWT-based dashboard authentication with login, verify, refresh, and logout
 */
use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{collections::HashMap, net::SocketAddr, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{self, models::User};
use crate::error::ApiError;

// ============================================================================
// Configuration
// ============================================================================

/// Secret shipped for local development only; production refuses it.
pub const INSECURE_DEFAULT_SECRET: &str = "default-jwt-secret-change-in-production";

lazy_static::lazy_static! {
    /// JWT secret key from environment
    pub static ref JWT_SECRET: String = std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| INSECURE_DEFAULT_SECRET.to_string());

    /// Admin email for the no-database login fallback
    pub static ref ADMIN_EMAIL: String = std::env::var("ADMIN_EMAIL")
        .unwrap_or_else(|_| "admin@example.com".to_string());

    /// Admin password hash for the no-database login fallback
    pub static ref ADMIN_PASSWORD_HASH: String = {
        if let Ok(hash) = std::env::var("ADMIN_HASH_PASSWORD") {
            hash
        } else {
            let plain = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
            hash(plain, DEFAULT_COST).unwrap_or_default()
        }
    };

    /// Refresh tokens issued while running without a database
    static ref REFRESH_TOKENS: Arc<RwLock<HashMap<String, RefreshTokenData>>> =
        Arc::new(RwLock::new(HashMap::new()));

    /// Rate limit storage (IP -> last request timestamp)
    static ref RATE_LIMIT: Arc<RwLock<HashMap<String, i64>>> =
        Arc::new(RwLock::new(HashMap::new()));
}

/// Access token expiry in minutes
const ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 15;

/// Refresh token expiry in days
const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 7;

/// Rate limit window in seconds for register/login, per IP
#[cfg_attr(test, allow(dead_code))]
const RATE_LIMIT_WINDOW_SECS: i64 = 5;

/// Failed logins before the account is locked
const MAX_LOGIN_ATTEMPTS: i32 = 5;

/// Lock duration after too many failed logins
const LOCKOUT_MINUTES: i64 = 15;

// ============================================================================
// Types
// ============================================================================

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,   // User ID
    pub email: String, // User email
    pub role: String,  // User role
    pub exp: i64,      // Expiry timestamp
    pub iat: i64,      // Issued at timestamp
}

#[derive(Debug, Clone)]
struct RefreshTokenData {
    user_id: String,
    email: String,
    role: String,
    expires_at: i64,
    revoked: bool,
}

/// User info returned to frontend
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
}

/// Authenticated dashboard session, taken from the bearer token.
///
/// Use as an extractor on every mutating route; a missing or invalid token
/// rejects the request with 401 before the handler runs.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub claims: Claims,
}

impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or(ApiError::Unauthorized("Authorization required"))?;
        let claims = verify_access_token(&token).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            ApiError::Unauthorized("Invalid or expired token")
        })?;
        Ok(AdminSession { claims })
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<UserInfo>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoginResponse {
    fn failure(status: StatusCode, error: &str) -> (StatusCode, Json<LoginResponse>) {
        (
            status,
            Json(LoginResponse {
                error: Some(error.to_string()),
                ..LoginResponse::default()
            }),
        )
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub user: Option<UserInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RegisterResponse {
    fn failure(status: StatusCode, error: &str) -> (StatusCode, Json<RegisterResponse>) {
        (
            status,
            Json(RegisterResponse {
                error: Some(error.to_string()),
                ..RegisterResponse::default()
            }),
        )
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub is_valid: bool,
    pub user: Option<UserInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Generate a random refresh token
fn generate_refresh_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 64)
}

/// SHA-256 of a refresh token; only the hash is stored.
fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Create access token
pub(crate) fn create_access_token(
    user_id: &str,
    email: &str,
    role: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::minutes(ACCESS_TOKEN_EXPIRY_MINUTES);

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
}

/// Verify and decode access token
pub fn verify_access_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Check rate limit for an IP, evicting expired entries on every call.
async fn check_rate_limit(ip: &str) -> bool {
    #[cfg(test)]
    {
        let _ = ip;
        true
    }

    #[cfg(not(test))]
    {
        let now = Utc::now().timestamp();
        let mut limits = RATE_LIMIT.write().await;
        limits.retain(|_, last| now - *last < RATE_LIMIT_WINDOW_SECS);

        if limits.contains_key(ip) {
            return false;
        }

        limits.insert(ip.to_string(), now);
        true
    }
}

/// bcrypt off the async executor.
async fn verify_password(password: String, password_hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify(&password, &password_hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

/// Issues an access/refresh token pair and records the refresh token.
async fn issue_tokens(user: &UserInfo) -> Result<(String, String), jsonwebtoken::errors::Error> {
    let access_token = create_access_token(&user.user_id, &user.email, &user.role)?;
    let refresh_token = generate_refresh_token();
    let token_hash = hash_refresh_token(&refresh_token);
    let expires_at = Utc::now() + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS);

    let persisted = match (db::get_pool(), Uuid::parse_str(&user.user_id)) {
        (Some(pool), Ok(user_id)) => {
            match sqlx::query(
                "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
            )
            .bind(user_id)
            .bind(&token_hash)
            .bind(expires_at)
            .execute(pool.as_ref())
            .await
            {
                Ok(_) => true,
                Err(e) => {
                    tracing::error!(error = %e, "failed to persist refresh token");
                    false
                }
            }
        }
        _ => false,
    };

    if !persisted {
        REFRESH_TOKENS.write().await.insert(
            token_hash,
            RefreshTokenData {
                user_id: user.user_id.clone(),
                email: user.email.clone(),
                role: user.role.clone(),
                expires_at: expires_at.timestamp(),
                revoked: false,
            },
        );
    }

    Ok((access_token, refresh_token))
}

async fn lookup_refresh_token(token_hash: &str) -> Option<RefreshTokenData> {
    if let Some(pool) = db::get_pool() {
        let row = sqlx::query_as::<_, (Uuid, String, String, chrono::DateTime<Utc>, bool)>(
            r#"SELECT u.id, u.email, u.role, rt.expires_at, rt.revoked
               FROM refresh_tokens rt
               JOIN users u ON u.id = rt.user_id
               WHERE rt.token_hash = $1"#,
        )
        .bind(token_hash)
        .fetch_optional(pool.as_ref())
        .await;

        match row {
            Ok(Some((user_id, email, role, expires_at, revoked))) => {
                return Some(RefreshTokenData {
                    user_id: user_id.to_string(),
                    email,
                    role,
                    expires_at: expires_at.timestamp(),
                    revoked,
                });
            }
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, "refresh token lookup failed"),
        }
    }
    REFRESH_TOKENS.read().await.get(token_hash).cloned()
}

async fn revoke_refresh_token(token_hash: &str) {
    if let Some(pool) = db::get_pool() {
        let _ = sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE token_hash = $1")
            .bind(token_hash)
            .execute(pool.as_ref())
            .await;
    }
    if let Some(data) = REFRESH_TOKENS.write().await.get_mut(token_hash) {
        data.revoked = true;
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/register
/// Register the first dashboard user (only works while no user exists)
pub async fn register(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<RegisterRequest>,
) -> impl IntoResponse {
    if !check_rate_limit(&addr.ip().to_string()).await {
        return RegisterResponse::failure(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests. Please try again later.",
        );
    }

    if payload.email.is_empty() || payload.password.is_empty() {
        return RegisterResponse::failure(
            StatusCode::BAD_REQUEST,
            "Email and password are required",
        );
    }
    if !payload.email.contains('@') {
        return RegisterResponse::failure(StatusCode::BAD_REQUEST, "Invalid email format");
    }
    if payload.password.len() < 8 {
        return RegisterResponse::failure(
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters long",
        );
    }

    let Some(pool) = db::get_pool() else {
        return RegisterResponse::failure(StatusCode::SERVICE_UNAVAILABLE, "Database not available");
    };

    let existing: (i64,) = match sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(count) => count,
        Err(e) => {
            tracing::error!(error = %e, "failed to count users");
            return RegisterResponse::failure(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };
    if existing.0 > 0 {
        return RegisterResponse::failure(
            StatusCode::FORBIDDEN,
            "Registration is closed. An account already exists.",
        );
    }

    let password = payload.password.clone();
    let password_hash = match tokio::task::spawn_blocking(move || hash(password, DEFAULT_COST)).await {
        Ok(Ok(h)) => h,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "failed to hash password");
            return RegisterResponse::failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process password",
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "password hashing task panicked");
            return RegisterResponse::failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process password",
            );
        }
    };

    match sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, name, role)
        VALUES ($1, $2, $3, 'admin')
        RETURNING id, email, password_hash, name, role, is_active, login_attempts,
                  locked_until, last_login_at, created_at
        "#,
    )
    .bind(payload.email.trim().to_lowercase())
    .bind(&password_hash)
    .bind(&payload.name)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(user) => {
            tracing::info!(email = %user.email, "dashboard user registered");
            (
                StatusCode::CREATED,
                Json(RegisterResponse {
                    success: true,
                    user: Some(UserInfo {
                        user_id: user.id.to_string(),
                        email: user.email,
                        name: user.name,
                        role: user.role,
                    }),
                    error: None,
                }),
            )
        }
        Err(e) if db::is_unique_violation(&e) => {
            RegisterResponse::failure(StatusCode::CONFLICT, "Email already registered")
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to create user");
            RegisterResponse::failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create account")
        }
    }
}

/// POST /api/auth/login
/// Authenticate user and return tokens
pub async fn login(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    let ip = addr.ip().to_string();

    if !check_rate_limit(&ip).await {
        return LoginResponse::failure(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests. Please try again later.",
        );
    }
    if payload.email.is_empty() || payload.password.is_empty() {
        return LoginResponse::failure(StatusCode::BAD_REQUEST, "Email and password are required");
    }
    if !payload.email.contains('@') {
        return LoginResponse::failure(StatusCode::BAD_REQUEST, "Invalid email format");
    }

    // Users table first; env-var credentials when running without a database.
    let user_info = match db::get_pool() {
        Some(pool) => {
            let row = sqlx::query_as::<_, User>(
                r#"SELECT id, email, password_hash, name, role, is_active, login_attempts,
                          locked_until, last_login_at, created_at
                   FROM users
                   WHERE LOWER(email) = LOWER($1)"#,
            )
            .bind(&payload.email)
            .fetch_optional(pool.as_ref())
            .await;

            let user = match row {
                Ok(Some(user)) => user,
                Ok(None) => {
                    tracing::warn!(email = %payload.email, "login attempt for unknown user");
                    return LoginResponse::failure(StatusCode::UNAUTHORIZED, "Invalid credentials");
                }
                Err(e) => {
                    tracing::error!(error = %e, "database error during login");
                    return LoginResponse::failure(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Authentication service temporarily unavailable.",
                    );
                }
            };

            if user.locked_until.is_some_and(|until| until > Utc::now()) {
                tracing::warn!(email = %user.email, "login attempt on locked account");
                return LoginResponse::failure(
                    StatusCode::UNAUTHORIZED,
                    "Account is temporarily locked. Try again later.",
                );
            }
            if !user.is_active {
                return LoginResponse::failure(StatusCode::FORBIDDEN, "Account is disabled.");
            }

            if !verify_password(payload.password.clone(), user.password_hash.clone()).await {
                let _ = sqlx::query(
                    r#"UPDATE users
                       SET login_attempts = login_attempts + 1,
                           locked_until = CASE WHEN login_attempts + 1 >= $2
                                               THEN now() + make_interval(mins => $3)
                                               ELSE locked_until END,
                           updated_at = now()
                       WHERE id = $1"#,
                )
                .bind(user.id)
                .bind(MAX_LOGIN_ATTEMPTS)
                .bind(LOCKOUT_MINUTES as i32)
                .execute(pool.as_ref())
                .await;
                tracing::warn!(email = %user.email, "failed login attempt");
                return LoginResponse::failure(StatusCode::UNAUTHORIZED, "Invalid credentials");
            }

            let _ = sqlx::query(
                r#"UPDATE users
                   SET last_login_at = now(), last_login_ip = $1, login_attempts = 0,
                       locked_until = NULL, updated_at = now()
                   WHERE id = $2"#,
            )
            .bind(&ip)
            .bind(user.id)
            .execute(pool.as_ref())
            .await;

            UserInfo {
                user_id: user.id.to_string(),
                email: user.email,
                name: user.name,
                role: user.role,
            }
        }
        None => {
            let email_matches = payload.email.to_lowercase() == ADMIN_EMAIL.to_lowercase();
            let password_ok =
                verify_password(payload.password.clone(), ADMIN_PASSWORD_HASH.clone()).await;
            if !email_matches || !password_ok {
                return LoginResponse::failure(StatusCode::UNAUTHORIZED, "Invalid credentials");
            }
            UserInfo {
                user_id: "admin-user-id".to_string(),
                email: payload.email.to_lowercase(),
                name: None,
                role: "admin".to_string(),
            }
        }
    };

    let (access_token, refresh_token) = match issue_tokens(&user_info).await {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::error!(error = %e, "failed to create access token");
            return LoginResponse::failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create token",
            );
        }
    };

    tracing::info!(email = %user_info.email, "successful login");

    (
        StatusCode::OK,
        Json(LoginResponse {
            success: true,
            user: Some(user_info),
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
            error: None,
        }),
    )
}

/// POST /api/auth/verify
/// Verify access token and return user info
pub async fn verify_token(headers: HeaderMap) -> impl IntoResponse {
    let Some(token) = extract_bearer_token(&headers) else {
        return Json(VerifyResponse {
            success: false,
            is_valid: false,
            user: None,
            error: Some("No authorization token provided".to_string()),
        });
    };

    match verify_access_token(&token) {
        Ok(claims) => Json(VerifyResponse {
            success: true,
            is_valid: true,
            user: Some(UserInfo {
                user_id: claims.sub,
                email: claims.email,
                name: None,
                role: claims.role,
            }),
            error: None,
        }),
        Err(e) => {
            tracing::debug!(error = %e, "token verification failed");
            Json(VerifyResponse {
                success: false,
                is_valid: false,
                user: None,
                error: Some("Invalid or expired token".to_string()),
            })
        }
    }
}

/// POST /api/auth/refresh
/// Exchange a refresh token for a new token pair (the old one is revoked)
pub async fn refresh(Json(payload): Json<RefreshRequest>) -> impl IntoResponse {
    let failure = |status: StatusCode, error: &str| {
        (
            status,
            Json(RefreshResponse {
                error: Some(error.to_string()),
                ..RefreshResponse::default()
            }),
        )
    };

    if payload.refresh_token.is_empty() {
        return failure(StatusCode::BAD_REQUEST, "Refresh token is required");
    }

    let token_hash = hash_refresh_token(&payload.refresh_token);
    let data = match lookup_refresh_token(&token_hash).await {
        Some(data) if !data.revoked && data.expires_at > Utc::now().timestamp() => data,
        _ => return failure(StatusCode::UNAUTHORIZED, "Invalid or expired refresh token"),
    };

    revoke_refresh_token(&token_hash).await;

    let user = UserInfo {
        user_id: data.user_id,
        email: data.email,
        name: None,
        role: data.role,
    };
    match issue_tokens(&user).await {
        Ok((access_token, refresh_token)) => (
            StatusCode::OK,
            Json(RefreshResponse {
                success: true,
                access_token: Some(access_token),
                refresh_token: Some(refresh_token),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "failed to create access token");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create token")
        }
    }
}

/// POST /api/auth/logout
/// Revoke the given refresh token, or every refresh token of the caller.
pub async fn logout(headers: HeaderMap, Json(payload): Json<LogoutRequest>) -> impl IntoResponse {
    if let Some(refresh_token) = payload.refresh_token {
        revoke_refresh_token(&hash_refresh_token(&refresh_token)).await;
    }

    let access_token = payload
        .access_token
        .or_else(|| extract_bearer_token(&headers));
    if let Some(claims) = access_token.and_then(|t| verify_access_token(&t).ok()) {
        if let (Some(pool), Ok(user_id)) = (db::get_pool(), Uuid::parse_str(&claims.sub)) {
            let _ = sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE user_id = $1")
                .bind(user_id)
                .execute(pool.as_ref())
                .await;
        }
        for data in REFRESH_TOKENS.write().await.values_mut() {
            if data.user_id == claims.sub {
                data.revoked = true;
            }
        }
    }

    // Logout is always idempotent
    (StatusCode::OK, Json(LogoutResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::{get, post};
    use axum::Router;
    use tower::ServiceExt;

    fn auth_router() -> Router {
        use axum::extract::connect_info::MockConnectInfo;
        Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/verify", post(verify_token))
            .route("/api/auth/refresh", post(refresh))
            .route("/api/auth/logout", post(logout))
            .route(
                "/protected",
                get(|session: AdminSession| async move { session.claims.email }),
            )
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 12345))))
    }

    async fn post_json(
        app: Router,
        uri: &str,
        json: &impl serde::Serialize,
    ) -> (StatusCode, axum::body::Bytes) {
        let body = Body::from(serde_json::to_vec(json).unwrap());
        let req = Request::post(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes)
    }

    #[test]
    fn test_verify_access_token_invalid_returns_err() {
        assert!(verify_access_token("invalid.jwt.token").is_err());
    }

    #[test]
    fn test_access_token_round_trip_claims() {
        let token = create_access_token("u-1", "ops@agency.test", "admin").unwrap();
        let claims = verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.role, "admin");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_refresh_token_hash_is_stable_hex() {
        let a = hash_refresh_token("abc");
        assert_eq!(a, hash_refresh_token("abc"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_refresh_token("abd"));
    }

    #[test]
    fn test_bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_none());
        headers.insert("authorization", "Bearer   ".parse().unwrap());
        assert!(extract_bearer_token(&headers).is_none());
        headers.insert("authorization", "Bearer abc".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_login_empty_email_returns_bad_request() {
        let (status, _) = post_json(
            auth_router(),
            "/api/auth/login",
            &LoginRequest {
                email: "".to_string(),
                password: "admin123".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_wrong_credentials_returns_unauthorized() {
        let (status, bytes) = post_json(
            auth_router(),
            "/api/auth/login",
            &LoginRequest {
                email: "admin@example.com".to_string(),
                password: "wrongpassword".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let body: LoginResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(!body.success);
        assert!(body.access_token.is_none());
    }

    #[tokio::test]
    async fn test_refresh_unknown_token_is_unauthorized() {
        let (status, _) = post_json(
            auth_router(),
            "/api/auth/refresh",
            &RefreshRequest {
                refresh_token: "not-issued".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_empty_token_returns_bad_request() {
        let (status, _) = post_json(
            auth_router(),
            "/api/auth/refresh",
            &RefreshRequest {
                refresh_token: "".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_issued_refresh_token_rotates_once() {
        let user = UserInfo {
            user_id: "admin-user-id".to_string(),
            email: "admin@example.com".to_string(),
            name: None,
            role: "admin".to_string(),
        };
        let (_, refresh_token) = issue_tokens(&user).await.unwrap();
        let request = RefreshRequest {
            refresh_token: refresh_token.clone(),
        };

        let (status, bytes) = post_json(auth_router(), "/api/auth/refresh", &request).await;
        assert_eq!(status, StatusCode::OK);
        let body: RefreshResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(body.success);
        assert_ne!(body.refresh_token.as_deref(), Some(refresh_token.as_str()));

        let (status, _) = post_json(auth_router(), "/api/auth/refresh", &request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_returns_success() {
        let (status, bytes) = post_json(
            auth_router(),
            "/api/auth/logout",
            &LogoutRequest {
                access_token: None,
                refresh_token: None,
            },
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: LogoutResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(body.success);
    }

    #[tokio::test]
    async fn test_admin_session_requires_valid_token() {
        let req = Request::get("/protected").body(Body::empty()).unwrap();
        let res = auth_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let req = Request::get("/protected")
            .header("authorization", "Bearer nope")
            .body(Body::empty())
            .unwrap();
        let res = auth_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let token = create_access_token("u-1", "ops@agency.test", "admin").unwrap();
        let req = Request::get("/protected")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let res = auth_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
