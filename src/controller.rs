use std::fmt::Debug;

#[cfg(feature = "signed")]
use tower_cookies::cookie::{Cookie, CookieJar};

/// Seals and unseals raw cookie values.
///
/// `seal` turns an encoded payload into the value actually written to the cookie;
/// `unseal` reverses it, returning `None` when the value fails integrity checks.
pub trait CookieController: Debug + Clone + Send + Sync + 'static {
    fn seal(&self, name: &str, payload: String) -> String;
    fn unseal(&self, name: &str, value: &str) -> Option<String>;
}

/// No tamper resistance at all. Testing and debugging only: a client can trivially
/// edit the cookie to flip any flag.
#[cfg(feature = "dangerous-plaintext")]
#[derive(Debug, Clone, Copy, Default)]
pub struct DangerousPlaintextCookie;

#[cfg(feature = "dangerous-plaintext")]
impl CookieController for DangerousPlaintextCookie {
    fn seal(&self, _name: &str, payload: String) -> String {
        payload
    }

    fn unseal(&self, _name: &str, value: &str) -> Option<String> {
        Some(value.to_owned())
    }
}

/// HMAC-signed cookie values via the cookie crate's signed jar.
///
/// Signing is deterministic, so equal payloads always seal to byte-identical
/// values. Verification is constant-time inside the jar.
#[cfg(feature = "signed")]
#[derive(Debug, Clone)]
pub struct SignedCookie {
    key: crate::Key,
}

#[cfg(feature = "signed")]
impl SignedCookie {
    pub fn new(key: crate::Key) -> Self {
        Self { key }
    }
}

#[cfg(feature = "signed")]
impl CookieController for SignedCookie {
    fn seal(&self, name: &str, payload: String) -> String {
        let mut jar = CookieJar::new();
        jar.signed_mut(&self.key)
            .add(Cookie::new(name.to_owned(), payload));
        // The jar contains exactly the cookie just added.
        jar.get(name)
            .map(|cookie| cookie.value().to_owned())
            .unwrap_or_default()
    }

    fn unseal(&self, name: &str, value: &str) -> Option<String> {
        let mut jar = CookieJar::new();
        jar.add_original(Cookie::new(name.to_owned(), value.to_owned()));
        jar.signed(&self.key)
            .get(name)
            .map(|cookie| cookie.value().to_owned())
    }
}

#[cfg(all(test, feature = "signed"))]
mod tests {
    use super::*;

    #[test]
    fn sealing_round_trips() {
        let controller = SignedCookie::new(crate::Key::generate());

        let sealed = controller.seal("flags", "payload".to_owned());
        assert_ne!(sealed, "payload");

        let unsealed = controller.unseal("flags", &sealed);
        assert_eq!(unsealed.as_deref(), Some("payload"));
    }

    #[test]
    fn sealing_is_deterministic() {
        let controller = SignedCookie::new(crate::Key::generate());

        let first = controller.seal("flags", "payload".to_owned());
        let second = controller.seal("flags", "payload".to_owned());

        assert_eq!(first, second);
    }

    #[test]
    fn unseal_rejects_other_keys() {
        let sealer = SignedCookie::new(crate::Key::generate());
        let verifier = SignedCookie::new(crate::Key::generate());

        let sealed = sealer.seal("flags", "payload".to_owned());

        assert!(verifier.unseal("flags", &sealed).is_none());
    }
}
