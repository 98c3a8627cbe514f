//! Tower middleware that decodes the flag cookie into request extensions and writes
//! staged flag changes back out as a `Set-Cookie`.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use http::{Request, Response};
use tower_cookies::{CookieManager, Cookies};
use tower_layer::Layer;
use tower_service::Service;

use crate::{
    config::FlagCookieConfig,
    controller::CookieController,
    schema::FlagSchema,
    session::{FlagSession, FlagSessionCodec},
};

#[derive(Debug, Clone)]
pub struct FlagSessionManagerLayer<C: CookieController> {
    codec: FlagSessionCodec<C>,
}

#[cfg(feature = "signed")]
impl FlagSessionManagerLayer<crate::SignedCookie> {
    /// A layer sealing the flag cookie with HMAC-signed values.
    #[must_use]
    pub fn signed(schema: std::sync::Arc<FlagSchema>, key: crate::Key) -> Self {
        Self::new(FlagSessionCodec::signed(schema, key))
    }
}

#[cfg(feature = "dangerous-plaintext")]
impl FlagSessionManagerLayer<crate::DangerousPlaintextCookie> {
    /// A layer with no tamper resistance. Testing and debugging only.
    #[must_use]
    pub fn dangerous_plaintext(schema: std::sync::Arc<FlagSchema>) -> Self {
        Self::new(FlagSessionCodec::dangerous_plaintext(schema))
    }
}

impl<C: CookieController> FlagSessionManagerLayer<C> {
    #[must_use]
    pub fn new(codec: FlagSessionCodec<C>) -> Self {
        Self { codec }
    }

    #[must_use]
    pub fn with_config(mut self, config: FlagCookieConfig) -> Self {
        self.codec = self.codec.with_config(config);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FlagSessionManager<S, C: CookieController> {
    inner: S,
    codec: FlagSessionCodec<C>,
}

impl<S, C: CookieController> Layer<S> for FlagSessionManagerLayer<C> {
    type Service = CookieManager<FlagSessionManager<S, C>>;

    fn layer(&self, inner: S) -> Self::Service {
        CookieManager::new(FlagSessionManager {
            inner,
            codec: self.codec.clone(),
        })
    }
}

impl<S, C: CookieController> FlagSessionManager<S, C> {
    fn remove_flag_cookie(codec: &FlagSessionCodec<C>, cookies: &Cookies) {
        let mut cookie = tower_cookies::Cookie::new(codec.config().name().to_owned(), "");
        codec.config().apply_removal_attributes(&mut cookie);
        cookies.remove(cookie);
    }
}

impl<ReqBody, ResBody, S, C> Service<Request<ReqBody>> for FlagSessionManager<S, C>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Default + Send,
    C: CookieController,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let codec = self.codec.clone();

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let cookies = match req.extensions().get::<Cookies>().cloned() {
                Some(cookies) => cookies,
                None => {
                    let mut res = Response::default();
                    *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
                    return Ok(res);
                }
            };

            let flag_cookie = cookies.get(codec.config().name());
            let current = match flag_cookie.as_ref() {
                None => codec.schema().defaulted(),
                Some(cookie) => match codec.try_decode(cookie.value()) {
                    Ok(flags) => flags,
                    Err(err) => {
                        tracing::warn!(err = %err, "flag cookie rejected, using defaults");
                        if codec.config().clear_on_decode_error {
                            Self::remove_flag_cookie(&codec, &cookies);
                        }
                        codec.schema().defaulted()
                    }
                },
            };

            let session = FlagSession::new(codec.schema().clone(), current);
            req.extensions_mut().insert(session.clone());

            let res = inner.call(req).await?;

            if session.is_cleared() {
                Self::remove_flag_cookie(&codec, &cookies);
                return Ok(res);
            }

            if let Some(staged) = session.staged_flags()
                && !res.status().is_server_error()
            {
                let value = codec.seal_flags(&staged);
                if value.len() > codec.config().max_cookie_bytes {
                    tracing::error!(
                        len = value.len(),
                        max = codec.config().max_cookie_bytes,
                        "flag cookie exceeds max_cookie_bytes, not written"
                    );
                } else {
                    cookies.add(codec.config().build_cookie(value));
                }
            }

            Ok(res)
        })
    }
}
