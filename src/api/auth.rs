/// Session endpoints: register, login, refresh and logout
use crate::{
    api::{extract::ValidatedJson, response::ApiResponse},
    auth::{AuthUser, ClientDevice},
    config::JwtConfig,
    context::AppContext,
    error::{ApiError, ApiResult},
    identity::{Credentials, TokenPair},
};
use axum::{extract::State, http::HeaderMap, routing::post, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use validator::Validate;

pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";
pub const REFRESH_TOKEN_HEADER: &str = "refreshToken";

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-tokens", post(refresh_tokens))
        .route("/logout", post(logout))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CredentialsRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "must be 8 to 128 characters"))]
    pub password: String,
}

impl From<CredentialsRequest> for Credentials {
    fn from(req: CredentialsRequest) -> Self {
        Credentials {
            email: req.email.trim().to_string(),
            password: req.password,
        }
    }
}

/// HTTP-only cookie carrying the refresh token; `max_age` 0 removes it
fn refresh_cookie(config: &JwtConfig, value: &str, max_age: i64) -> ApiResult<Cookie<'static>> {
    Cookie::parse(format!(
        "{}={}; HttpOnly; SameSite=Lax; Path={}; Domain={}; Max-Age={}",
        REFRESH_TOKEN_COOKIE,
        value,
        config.refresh_cookie_path,
        config.refresh_cookie_domain,
        max_age
    ))
    .map_err(|e| ApiError::Internal(format!("Failed to build refresh cookie: {}", e)))
}

fn with_refresh_cookie(jar: CookieJar, config: &JwtConfig, tokens: &TokenPair) -> ApiResult<CookieJar> {
    Ok(jar.add(refresh_cookie(config, &tokens.refresh_token, config.refresh_ttl)?))
}

/// Create an account and open a session
async fn register(
    State(ctx): State<AppContext>,
    ClientDevice(device): ClientDevice,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<CredentialsRequest>,
) -> ApiResult<(CookieJar, ApiResponse<TokenPair>)> {
    let tokens = ctx.identity.register(req.into(), device).await?;
    let jar = with_refresh_cookie(jar, &ctx.config.jwt, &tokens)?;

    Ok((jar, ApiResponse::created("user registered", tokens)))
}

async fn login(
    State(ctx): State<AppContext>,
    ClientDevice(device): ClientDevice,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<CredentialsRequest>,
) -> ApiResult<(CookieJar, ApiResponse<TokenPair>)> {
    let tokens = ctx.identity.login(req.into(), device).await?;
    let jar = with_refresh_cookie(jar, &ctx.config.jwt, &tokens)?;

    Ok((jar, ApiResponse::ok("user logged in", tokens)))
}

/// Rotate the refresh token taken from the cookie or the `refreshToken` header
async fn refresh_tokens(
    State(ctx): State<AppContext>,
    ClientDevice(device): ClientDevice,
    headers: HeaderMap,
    jar: CookieJar,
) -> ApiResult<(CookieJar, ApiResponse<TokenPair>)> {
    let refresh_token = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| {
            headers
                .get(REFRESH_TOKEN_HEADER)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        })
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::UserUnauthenticated)?;

    let tokens = ctx.identity.refresh(&refresh_token, device).await?;
    let jar = with_refresh_cookie(jar, &ctx.config.jwt, &tokens)?;

    Ok((jar, ApiResponse::ok("tokens refreshed", tokens)))
}

async fn logout(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    ClientDevice(device): ClientDevice,
    jar: CookieJar,
) -> ApiResult<(CookieJar, ApiResponse<()>)> {
    ctx.identity.logout(&auth.user_id, device).await?;
    let jar = jar.add(refresh_cookie(&ctx.config.jwt, "", 0)?);

    Ok((jar, ApiResponse::ok("user logged out", ())))
}
