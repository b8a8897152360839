//! Request extractors: caller identity and per-request base URL.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::HOST;
use axum::http::request::Parts;

use crate::state::AppState;

/// Header carrying the opaque caller identity, set by the authenticating
/// proxy in front of this service. Identity *extraction* is not this
/// service's business; the value is used only as an ownership comparison
/// key.
pub const USER_HEADER: &str = "x-wes-user";

/// The caller's identity. `None` means anonymous.
///
/// Never rejects: endpoints that require an identity enforce that
/// themselves (listing jobs does, polling a job does not).
pub struct CurrentUser(pub Option<String>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(String::from);
        Ok(CurrentUser(user))
    }
}

/// Base URL of the request, used only to build self-referential `id`,
/// `log`, and output `location` fields.
///
/// Derived from `x-forwarded-proto` + `Host`; falls back to the configured
/// public base URL when the request carries no usable host.
pub struct BaseUrl(pub String);

impl FromRequestParts<AppState> for BaseUrl {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let host = parts
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty());

        let base = match host {
            Some(host) => {
                let scheme = parts
                    .headers
                    .get("x-forwarded-proto")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("http");
                format!("{scheme}://{host}")
            }
            None => state.config.public_base_url.clone(),
        };

        Ok(BaseUrl(base))
    }
}
