//! How the client wants its answer, and the flash it carried back.

use crate::flash;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use std::collections::BTreeMap;

pub const REQUESTED_WITH_HEADER: &str = "X-Requested-With";

#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    /// `Accept` names a JSON media type.
    pub wants_json: bool,
    /// `X-Requested-With: XMLHttpRequest`; selects the `ajax/` view variants.
    pub ajax: bool,
    pub referer: Option<String>,
    /// Cookies sent with the request; responses add or expire flash entries on it.
    pub cookies: CookieJar,
    pub flash: BTreeMap<String, String>,
}

impl RequestContext {
    /// Where a failed form submission returns to.
    pub fn back_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.referer.as_deref().unwrap_or(fallback)
    }
}

fn accepts_json(accept: &str) -> bool {
    accept
        .split(',')
        .map(|part| part.split(';').next().unwrap_or("").trim())
        .any(|media| media.contains("/json") || media.contains("+json"))
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_str = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let wants_json = header_str(header::ACCEPT.as_str())
            .map(|accept| accepts_json(&accept))
            .unwrap_or(false);
        let ajax = header_str(REQUESTED_WITH_HEADER)
            .map(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
            .unwrap_or(false);
        let cookies = CookieJar::from_headers(&parts.headers);
        Ok(RequestContext {
            wants_json,
            ajax,
            referer: header_str(header::REFERER.as_str()),
            flash: flash::read(&cookies),
            cookies,
        })
    }
}
