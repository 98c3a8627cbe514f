//! Helpers for encoding/decoding the flag cookie payload format.
//!
//! This is primarily useful for testing and debugging.
//!
//! Note: the on-wire format is versioned, but it is still considered an implementation
//! detail and may evolve. The payload carries no integrity protection of its own; the
//! signature lives one layer up in the [`crate::CookieController`].

use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::schema::SessionConfigFlags;

const VERSION: u8 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    v: u8,
    // BTreeMap keeps the serialized key order canonical, so the same logical flags
    // always produce byte-identical output and the signature is a function of
    // content only.
    flags: BTreeMap<String, serde_json::Value>,
}

/// Encode a flag set into the unsigned cookie payload.
pub fn encode_flags(flags: &SessionConfigFlags) -> Result<String, Error> {
    let envelope = Envelope {
        v: VERSION,
        flags: flags.to_raw(),
    };

    let bytes = serde_json::to_vec(&envelope).map_err(|err| Error::Encode(err.to_string()))?;

    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Decode an unsigned cookie payload into its raw key-value mapping.
///
/// The result is untrusted: callers validate it against the schema, which drops
/// unknown keys and re-defaults invalid values.
pub fn decode_flags(value: &str) -> Result<BTreeMap<String, serde_json::Value>, Error> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value.as_bytes())
        .map_err(|err| Error::Decode(err.to_string()))?;

    let envelope: Envelope =
        serde_json::from_slice(&bytes).map_err(|err| Error::Decode(err.to_string()))?;

    if envelope.v != VERSION {
        return Err(Error::UnsupportedVersion(envelope.v));
    }

    Ok(envelope.flags)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::schema::FlagSchema;

    fn schema() -> Arc<FlagSchema> {
        FlagSchema::builder()
            .boolean("preview_mode", false)
            .enumeration("region", ["DE", "FR", "IT"], "DE")
            .build()
    }

    #[test]
    fn payload_round_trips() {
        let schema = schema();
        let flags = schema.defaulted_with([("region", "FR".into())]);

        let encoded = encode_flags(&flags).expect("flags encode successfully");
        let raw = decode_flags(&encoded).expect("payload decodes successfully");

        assert_eq!(schema.defaulted_from_raw(&raw), flags);
    }

    #[test]
    fn encoding_is_canonical() {
        let schema = schema();
        let one_order = schema.defaulted_with([
            ("region", "IT".into()),
            ("preview_mode", true.into()),
        ]);
        let other_order = schema.defaulted_with([
            ("preview_mode", true.into()),
            ("region", "IT".into()),
        ]);

        let first = encode_flags(&one_order).expect("flags encode successfully");
        let second = encode_flags(&other_order).expect("flags encode successfully");

        assert_eq!(first, second);
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(matches!(
            decode_flags("%%not-base64%%"),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn rejects_invalid_json() {
        let encoded = URL_SAFE_NO_PAD.encode(b"not json at all");
        assert!(matches!(decode_flags(&encoded), Err(Error::Decode(_))));
    }

    #[test]
    fn rejects_unknown_version() {
        let encoded = URL_SAFE_NO_PAD.encode(br#"{"v":99,"flags":{}}"#);
        assert!(matches!(
            decode_flags(&encoded),
            Err(Error::UnsupportedVersion(99))
        ));
    }
}
