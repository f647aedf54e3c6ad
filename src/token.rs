//! Detached JWS codec: `base64url(header)..base64url(signature)`.
//!
//! The empty middle segment is structural. A token carrying an attached
//! payload is rejected here, before any key is touched, so a pre-signed body
//! can never be smuggled into verification.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

use crate::{
    error::{Error, Result},
    jws::JwsHeader,
};

const DETACHED_SEPARATOR: &str = "..";

/// Parsed `Tl-Signature` header value.
#[derive(Debug)]
pub(crate) struct ParsedTlSignature<'a> {
    pub(crate) header: JwsHeader,
    /// Header segment exactly as received; it is part of the signed message.
    pub(crate) header_b64: &'a str,
    pub(crate) signature: Vec<u8>,
}

pub(crate) fn encode_b64(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// JWS signing input: `header_b64.base64url(payload)`.
pub(crate) fn signing_input(header_b64: &str, payload: &[u8]) -> String {
    format!("{header_b64}.{}", encode_b64(payload))
}

/// Serialize `header` as the first token segment.
pub(crate) fn encode_header<T: serde::Serialize>(header: &T) -> Result<String> {
    let json = serde_json::to_vec(header)
        .map_err(|e| Error::signature(format!("header encode failed: {e}")))?;
    Ok(encode_b64(json))
}

/// Join an encoded header and raw signature into a detached token.
pub(crate) fn encode(header_b64: &str, signature: &[u8]) -> String {
    let mut jws = String::with_capacity(header_b64.len() + 2 + signature.len() * 4 / 3 + 4);
    jws.push_str(header_b64);
    jws.push_str(DETACHED_SEPARATOR);
    jws.push_str(&encode_b64(signature));
    jws
}

/// Parse a tl signature header value into `(header, header_base64, signature)`.
pub(crate) fn parse_tl_signature(tl_signature: &str) -> Result<ParsedTlSignature<'_>> {
    let mut parts = tl_signature.split(DETACHED_SEPARATOR);
    let (header_b64, signature_b64) = match (parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(signature), None) if !header.is_empty() && !signature.is_empty() => {
            (header, signature)
        }
        _ => return Err(Error::format("expected detached `<header>..<signature>`")),
    };

    let header_json = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|e| Error::format(format!("header base64 decode failed: {e}")))?;
    let header: JwsHeader = serde_json::from_slice(&header_json)
        .map_err(|e| Error::format(format!("header json decode failed: {e}")))?;

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|e| Error::format(format!("signature base64 decode failed: {e}")))?;

    Ok(ParsedTlSignature {
        header,
        header_b64,
        signature,
    })
}
