//! One-shot notices carried across a redirect in a cookie.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Redirect, Response};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

pub const FLASH_COOKIE: &str = "snowfinch_flash";

/// The notice set by the previous response, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flash(pub Option<String>);

impl Flash {
    pub fn notice(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Clears the cookie on `response` if a notice was consumed.
    pub fn consume(&self, response: &mut Response) {
        if self.0.is_some() {
            let cleared = format!("{FLASH_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax");
            if let Ok(value) = HeaderValue::from_str(&cleared) {
                response.headers_mut().append(SET_COOKIE, value);
            }
        }
    }
}

fn read_flash(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix(FLASH_COOKIE)?.strip_prefix('='))
        .filter(|value| !value.is_empty())
        .find_map(|value| {
            let bytes = URL_SAFE_NO_PAD.decode(value).ok()?;
            String::from_utf8(bytes).ok()
        })
}

impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Flash(read_flash(&parts.headers)))
    }
}

/// `303 See Other` to `location`, showing `notice` on the next page.
pub fn redirect_with_notice(location: &str, notice: &str) -> Response {
    let mut response = Redirect::to(location).into_response();
    let cookie = format!(
        "{FLASH_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
        URL_SAFE_NO_PAD.encode(notice.as_bytes())
    );
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}
