#![cfg(feature = "signed")]

mod common;

use axum::{Extension, Router, body::Body, routing::get};
use http::Request;
use time::Duration;
use tower::ServiceExt as _;

use flag_cookie_session::{FlagCookieConfig, FlagSession, SameSite};

fn routes() -> Router {
    Router::new().route(
        "/enable-preview",
        get(|Extension(session): Extension<FlagSession>| async move {
            session.set("preview_mode", true);
        }),
    )
}

async fn cookie_for_config(config: FlagCookieConfig) -> tower_cookies::Cookie<'static> {
    let (_key, layer) = common::make_signed_layer(config);
    let app = routes().layer(layer);

    let req = Request::builder()
        .uri("/enable-preview")
        .body(Body::empty())
        .expect("request builds successfully");
    let res = app.oneshot(req).await.expect("service call succeeds");

    common::get_flag_cookie(res.headers())
}

#[tokio::test]
async fn name_attribute() {
    let cookie = cookie_for_config(FlagCookieConfig::default().with_name("site.flags")).await;

    assert_eq!(cookie.name(), "site.flags");
}

#[tokio::test]
async fn http_only_attribute() {
    let cookie = cookie_for_config(FlagCookieConfig::default()).await;
    assert_eq!(cookie.http_only(), Some(true));

    let cookie = cookie_for_config(FlagCookieConfig::default().with_http_only(false)).await;
    assert_eq!(cookie.http_only(), None);
}

#[tokio::test]
async fn same_site_attribute() {
    let cookie = cookie_for_config(FlagCookieConfig::default()).await;
    assert_eq!(cookie.same_site(), Some(SameSite::Strict));

    let cookie = cookie_for_config(FlagCookieConfig::default().with_same_site(SameSite::Lax)).await;
    assert_eq!(cookie.same_site(), Some(SameSite::Lax));

    let cookie =
        cookie_for_config(FlagCookieConfig::default().with_same_site(SameSite::None)).await;
    assert_eq!(cookie.same_site(), Some(SameSite::None));
}

#[tokio::test]
async fn secure_attribute() {
    let cookie = cookie_for_config(FlagCookieConfig::default().with_secure(true)).await;
    assert_eq!(cookie.secure(), Some(true));

    let cookie = cookie_for_config(FlagCookieConfig::default().with_secure(false)).await;
    assert_eq!(cookie.secure(), None);
}

#[tokio::test]
async fn path_attribute() {
    let cookie = cookie_for_config(FlagCookieConfig::default().with_path("/admin")).await;

    assert_eq!(cookie.path(), Some("/admin"));
}

#[tokio::test]
async fn domain_attribute() {
    let cookie = cookie_for_config(FlagCookieConfig::default().with_domain("example.com")).await;

    assert_eq!(cookie.domain(), Some("example.com"));
}

#[tokio::test]
async fn max_age_attribute() {
    // Default: bounded lifetime of 30 days.
    let cookie = cookie_for_config(FlagCookieConfig::default()).await;
    assert_eq!(cookie.max_age(), Some(Duration::days(30)));

    let cookie =
        cookie_for_config(FlagCookieConfig::default().with_max_age(Duration::hours(2))).await;
    assert_eq!(cookie.max_age(), Some(Duration::hours(2)));

    // Without max-age the flag cookie lives for the browser session only.
    let cookie = cookie_for_config(FlagCookieConfig::default().without_max_age()).await;
    assert!(cookie.max_age().is_none());
}
