/// Authentication extractors
use crate::{
    api::middleware::{client_ip_from_parts, extract_access_token, user_agent},
    context::AppContext,
    error::ApiError,
    identity::DeviceInfo,
};
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use std::net::SocketAddr;

/// Authenticated caller - extracts and verifies the access token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_access_token(&parts.headers, &parts.uri)
            .ok_or(ApiError::UserUnauthenticated)?;

        let claims = state.identity.verify_access_token(&token)?;

        tracing::Span::current().record("user_id", claims.user_id.as_str());

        Ok(AuthUser {
            user_id: claims.user_id,
        })
    }
}

/// Device description of the calling client
#[derive(Debug, Clone)]
pub struct ClientDevice(pub DeviceInfo);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ClientDevice {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = client_ip_from_parts(
            &parts.headers,
            parts.extensions.get::<ConnectInfo<SocketAddr>>(),
        )
        .map(|ip| ip.to_string())
        .unwrap_or_default();

        Ok(ClientDevice(DeviceInfo {
            user_agent: user_agent(&parts.headers),
            ip,
        }))
    }
}
