//! The request-level codec and the per-request session handle.

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use tower_cookies::Cookie;

use crate::config::FlagCookieConfig;
use crate::controller::CookieController;
use crate::error::Error;
use crate::format;
use crate::schema::{FlagSchema, FlagValue, SessionConfigFlags};

/// Parses flag cookies out of requests and serializes flag sets back into cookies.
///
/// The codec is pure: it holds only the read-only schema, the cookie config, and the
/// sealing controller, and is safe to share across request handlers.
#[derive(Debug, Clone)]
pub struct FlagSessionCodec<C: CookieController> {
    schema: Arc<FlagSchema>,
    config: FlagCookieConfig,
    controller: C,
}

#[cfg(feature = "signed")]
impl FlagSessionCodec<crate::SignedCookie> {
    /// A codec sealing flags with HMAC-signed cookies.
    pub fn signed(schema: Arc<FlagSchema>, key: crate::Key) -> Self {
        Self::new(schema, crate::SignedCookie::new(key))
    }
}

#[cfg(feature = "dangerous-plaintext")]
impl FlagSessionCodec<crate::DangerousPlaintextCookie> {
    /// A codec with no tamper resistance. Testing and debugging only.
    pub fn dangerous_plaintext(schema: Arc<FlagSchema>) -> Self {
        Self::new(schema, crate::DangerousPlaintextCookie)
    }
}

impl<C: CookieController> FlagSessionCodec<C> {
    pub fn new(schema: Arc<FlagSchema>, controller: C) -> Self {
        Self {
            schema,
            config: FlagCookieConfig::default(),
            controller,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: FlagCookieConfig) -> Self {
        self.config = config;
        self
    }

    pub fn schema(&self) -> &Arc<FlagSchema> {
        &self.schema
    }

    pub fn config(&self) -> &FlagCookieConfig {
        &self.config
    }

    /// Parse the flag set out of a raw `Cookie` request header.
    ///
    /// Never fails: a missing header, missing cookie, bad signature, or malformed
    /// payload all yield the all-defaults flag set.
    pub fn parse_request_header(&self, header: Option<&str>) -> SessionConfigFlags {
        let Some(header) = header.filter(|header| !header.is_empty()) else {
            return self.schema.defaulted();
        };

        let sealed = Cookie::split_parse_encoded(header)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == self.config.name)
            .map(|cookie| cookie.value().to_owned());

        self.flags_from_sealed(sealed.as_deref())
    }

    /// Parse the flag set out of an already-parsed cookie name/value mapping.
    ///
    /// Same degradation policy as [`Self::parse_request_header`].
    pub fn flags_from_cookie_map(&self, cookies: &HashMap<String, String>) -> SessionConfigFlags {
        self.flags_from_sealed(cookies.get(self.config.name.as_ref()).map(String::as_str))
    }

    /// Decode a sealed cookie value, surfacing the failure taxonomy instead of
    /// degrading to defaults. Useful for diagnostics and tests.
    pub fn try_decode(&self, sealed: &str) -> Result<SessionConfigFlags, Error> {
        let payload = self
            .controller
            .unseal(&self.config.name, sealed)
            .ok_or(Error::Verification)?;
        let raw = format::decode_flags(&payload)?;
        Ok(self.schema.defaulted_from_raw(&raw))
    }

    /// Serialize a flag set into a cookie carrying the configured attributes.
    ///
    /// The encoding is canonical: equal flag sets always produce byte-identical
    /// cookie values.
    pub fn cookie_for_flags(&self, flags: &SessionConfigFlags) -> Cookie<'static> {
        self.config.build_cookie(self.seal_flags(flags))
    }

    /// Serialize a flag set into a complete `Set-Cookie` header value.
    pub fn set_cookie_header(&self, flags: &SessionConfigFlags) -> String {
        self.cookie_for_flags(flags).encoded().to_string()
    }

    fn flags_from_sealed(&self, sealed: Option<&str>) -> SessionConfigFlags {
        match sealed {
            None => self.schema.defaulted(),
            Some(sealed) => match self.try_decode(sealed) {
                Ok(flags) => flags,
                Err(err) => {
                    tracing::warn!(err = %err, "flag cookie rejected, using defaults");
                    self.schema.defaulted()
                }
            },
        }
    }

    pub(crate) fn seal_flags(&self, flags: &SessionConfigFlags) -> String {
        let payload = match format::encode_flags(flags) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(err = %err, "flag encoding failed, writing defaults");
                format::encode_flags(&self.schema.defaulted()).unwrap_or_default()
            }
        };
        self.controller.seal(&self.config.name, payload)
    }
}

/// Per-request handle to the current flags, inserted into request extensions by
/// [`crate::FlagSessionManagerLayer`].
///
/// Reads see the staged flags if any, else the flags decoded from the request.
/// Staging always builds a fresh [`SessionConfigFlags`] through the schema; nothing
/// is mutated in place.
#[derive(Debug, Clone)]
pub struct FlagSession {
    inner: Arc<FlagSessionInner>,
}

#[derive(Debug)]
struct FlagSessionInner {
    schema: Arc<FlagSchema>,
    current: SessionConfigFlags,
    staged: Mutex<Option<SessionConfigFlags>>,
    cleared: AtomicBool,
}

impl FlagSession {
    pub(crate) fn new(schema: Arc<FlagSchema>, current: SessionConfigFlags) -> Self {
        Self {
            inner: Arc::new(FlagSessionInner {
                schema,
                current,
                staged: Mutex::new(None),
                cleared: AtomicBool::new(false),
            }),
        }
    }

    /// The effective flag set: staged changes if any, else the request's flags.
    pub fn flags(&self) -> SessionConfigFlags {
        self.staged_flags()
            .unwrap_or_else(|| self.inner.current.clone())
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.flags().is_enabled(name)
    }

    pub fn choice(&self, name: &str) -> Option<String> {
        self.flags().choice(name).map(str::to_owned)
    }

    pub fn get(&self, name: &str) -> Option<FlagValue> {
        self.flags().get(name).cloned()
    }

    /// Stage a single flag override. An unknown name or a value failing the flag's
    /// type/allowed-value check is ignored.
    pub fn set<V: Into<FlagValue>>(&self, name: &str, value: V) {
        let value = value.into();
        let accepted = self
            .inner
            .schema
            .kind(name)
            .is_some_and(|kind| kind.accepts(&value));
        if !accepted {
            tracing::warn!(flag = name, "ignoring invalid flag override");
            return;
        }

        let base = self.flags();
        let mut overrides: Vec<(&str, FlagValue)> = base
            .iter()
            .map(|(flag_name, flag_value)| (flag_name, flag_value.clone()))
            .collect();
        overrides.push((name, value));

        self.stage(self.inner.schema.defaulted_with(overrides));
    }

    /// Stage a complete flag set. The set is re-defaulted through the schema, so a
    /// set built against a different schema cannot smuggle values in.
    pub fn replace(&self, flags: &SessionConfigFlags) {
        let staged = self
            .inner
            .schema
            .defaulted_with(flags.iter().map(|(name, value)| (name, value.clone())));
        self.stage(staged);
    }

    /// Drop the cookie entirely; the next request starts from defaults.
    pub fn reset(&self) {
        if let Ok(mut guard) = self.inner.staged.lock() {
            *guard = None;
        }
        self.inner.cleared.store(true, Ordering::Release);
    }

    pub fn is_modified(&self) -> bool {
        self.staged_flags().is_some()
    }

    pub(crate) fn is_cleared(&self) -> bool {
        self.inner.cleared.load(Ordering::Acquire)
    }

    pub(crate) fn staged_flags(&self) -> Option<SessionConfigFlags> {
        if self.is_cleared() {
            return None;
        }
        self.inner
            .staged
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }

    fn stage(&self, flags: SessionConfigFlags) {
        if let Ok(mut guard) = self.inner.staged.lock() {
            *guard = Some(flags);
        }
        self.inner.cleared.store(false, Ordering::Release);
    }
}
