use std::net::SocketAddr;

use axum::{Extension, Router, routing::get};
use flag_cookie_session::{
    FlagCookieConfig, FlagSchema, FlagSession, FlagSessionManagerLayer, Key, SameSite,
};
use time::Duration;

async fn index(Extension(session): Extension<FlagSession>) -> String {
    let flags = session.flags();
    format!(
        "preview_mode={} region={}\n",
        flags.is_enabled("preview_mode"),
        flags.choice("region").unwrap_or("?"),
    )
}

async fn enable_preview(Extension(session): Extension<FlagSession>) -> &'static str {
    session.set("preview_mode", true);
    "preview enabled\n"
}

async fn reset(Extension(session): Extension<FlagSession>) -> &'static str {
    session.reset();
    "flags reset\n"
}

#[tokio::main]
async fn main() {
    let schema = FlagSchema::builder()
        .boolean("preview_mode", false)
        .enumeration("region", ["DE", "FR", "IT"], "DE")
        .build();

    let key = Key::generate();
    let flag_config = FlagCookieConfig::default()
        // Default: "flags"
        .with_name("flags")
        // Default: true
        .with_http_only(true)
        // Default: SameSite::Strict
        .with_same_site(SameSite::Strict)
        // Default: 30 days
        .with_max_age(Duration::days(7))
        // Default: true (set to false for local HTTP development)
        .with_secure(false)
        // Default: "/"
        .with_path("/")
        // Default: None
        .without_domain()
        // Default: 4096
        .with_max_cookie_bytes(4096)
        // Default: true
        .with_clear_on_decode_error(true);
    let flag_layer = FlagSessionManagerLayer::signed(schema, key).with_config(flag_config);

    let app = Router::new()
        .route("/", get(index))
        .route("/enable-preview", get(enable_preview))
        .route("/reset", get(reset))
        .layer(flag_layer);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("tcp listener binds successfully");
    let local_addr = listener.local_addr().expect("local address is available");
    println!("listening at http://{local_addr}");

    axum::serve(listener, app)
        .await
        .expect("server runs successfully");
}
