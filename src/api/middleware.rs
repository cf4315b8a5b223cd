/// Request inspection helpers: access tokens, client address, user agent,
/// request ids
use axum::{
    extract::{ConnectInfo, Request},
    http::{header, HeaderMap, HeaderValue, Uri},
};
use std::net::{IpAddr, SocketAddr};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const ACCESS_TOKEN_COOKIE: &str = "jwt";
pub const ACCESS_TOKEN_QUERY: &str = "jwt";

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Value of a cookie from the Cookie header
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn extract_query_param(uri: &Uri, name: &str) -> Option<String> {
    uri.query()?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Access token from the Authorization header, then `?jwt=`, then the `jwt`
/// cookie
pub fn extract_access_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    extract_bearer_token(headers)
        .or_else(|| extract_query_param(uri, ACCESS_TOKEN_QUERY))
        .or_else(|| extract_cookie(headers, ACCESS_TOKEN_COOKIE))
}

/// Client address: X-Forwarded-For, X-Real-IP, then the socket peer
pub fn client_ip_from_parts(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<IpAddr> {
    let forwarded: Option<IpAddr> = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse().ok());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    };

    forwarded
        .or_else(real_ip)
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip()))
}

pub fn client_ip(request: &Request) -> Option<IpAddr> {
    client_ip_from_parts(
        request.headers(),
        request.extensions().get::<ConnectInfo<SocketAddr>>(),
    )
}

pub fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// UUID v4 request ids for `SetRequestIdLayer`
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}
