//! One-shot flash messages carried in `flash.{key}` cookies between a redirect and the next
//! rendered page.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::collections::BTreeMap;

pub const SUCCESS: &str = "status.success";
pub const INFO: &str = "status.info";
pub const ERROR: &str = "status.error";
/// Validation errors as a JSON object `{ field: [messages] }`.
pub const ERRORS: &str = "errors";
/// Submitted scalar fields of a rejected form, as a JSON object.
pub const OLD: &str = "old";

const PREFIX: &str = "flash.";

fn cookie(key: &str, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(format!("{}{}", PREFIX, key), value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie
}

/// Flash entries sent back by the client.
pub fn read(jar: &CookieJar) -> BTreeMap<String, String> {
    jar.iter()
        .filter_map(|c| {
            c.name()
                .strip_prefix(PREFIX)
                .map(|key| (key.to_string(), c.value().to_string()))
        })
        .collect()
}

/// Expire the given flash entries once they have been shown.
pub fn clear<'a>(jar: CookieJar, keys: impl IntoIterator<Item = &'a String>) -> CookieJar {
    keys.into_iter().fold(jar, |jar, key| {
        let mut removal = Cookie::new(format!("{}{}", PREFIX, key), "");
        removal.set_path("/");
        jar.remove(removal)
    })
}

/// 302 to `location` carrying flash entries.
pub fn redirect(jar: CookieJar, location: &str, entries: &[(&str, String)]) -> Response {
    let jar = entries
        .iter()
        .fold(jar, |jar, (key, value)| jar.add(cookie(key, value.clone())));
    (StatusCode::FOUND, jar, [(header::LOCATION, location.to_string())]).into_response()
}
