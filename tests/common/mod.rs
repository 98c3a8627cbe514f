#![allow(dead_code)]

// Shared helpers for integration tests.
//
// These helpers intentionally use `tower_cookies::Cookie` parsing/encoding to match
// what the middleware emits in `Set-Cookie` and what browsers send back in `Cookie`.
use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use http::{HeaderMap, header};
use http_body_util::BodyExt as _;
use tower_cookies::Cookie;

use flag_cookie_session::{FlagCookieConfig, FlagSchema};

pub fn schema() -> Arc<FlagSchema> {
    // The schema used across the integration tests: one boolean, one enum.
    FlagSchema::builder()
        .boolean("preview_mode", false)
        .enumeration("region", ["DE", "FR", "IT"], "DE")
        .build()
}

pub async fn body_string(body: Body) -> String {
    // Collect an Axum body into a UTF-8 string for assertions.
    let bytes = body
        .collect()
        .await
        .expect("body collects successfully")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn get_flag_cookie(headers: &HeaderMap) -> Cookie<'static> {
    // Parse the `Set-Cookie` header into a `Cookie` structure.
    let set_cookie = headers
        .get(header::SET_COOKIE)
        .expect("response includes set-cookie header");
    let set_cookie = set_cookie
        .to_str()
        .expect("set-cookie header is valid utf-8");
    Cookie::parse_encoded(set_cookie)
        .expect("set-cookie parses successfully")
        .into_owned()
}

pub fn cookie_header_value(cookie: &Cookie<'_>) -> String {
    // Encode a cookie for use in a `Cookie` request header.
    cookie.encoded().to_string()
}

#[cfg(feature = "signed")]
pub fn make_signed_layer(
    config: FlagCookieConfig,
) -> (
    flag_cookie_session::Key,
    flag_cookie_session::FlagSessionManagerLayer<flag_cookie_session::SignedCookie>,
) {
    // Create a signed flag-cookie layer and return both the key and the layer for
    // tests that need to inspect/unsign cookie values.
    let key = flag_cookie_session::Key::generate();
    let layer = flag_cookie_session::FlagSessionManagerLayer::signed(schema(), key.clone())
        .with_config(config);
    (key, layer)
}

#[cfg(feature = "signed")]
pub fn unsealed_cookie_value(
    cookie: Cookie<'static>,
    key: &flag_cookie_session::Key,
    name: &str,
) -> String {
    // Given a signed `Set-Cookie` cookie, return the unsigned inner payload.
    use tower_cookies::cookie::CookieJar;

    let mut jar = CookieJar::new();
    jar.add_original(cookie);
    jar.signed(key)
        .get(name)
        .expect("signed jar returns flag cookie")
        .value()
        .to_string()
}

pub fn decode_payload(unsealed_value: &str) -> BTreeMap<String, serde_json::Value> {
    // Decode an unsigned cookie payload into the raw flag mapping.
    flag_cookie_session::format::decode_flags(unsealed_value)
        .expect("cookie payload decodes successfully")
}
