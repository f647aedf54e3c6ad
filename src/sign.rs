use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::{
    error::{Error, Result},
    es512,
    headers::Headers,
    jws::{ALG_ES512, JwsHeader},
    payload::build_v2_signing_payload,
    token,
};

/// Request description used to generate a `Tl-Signature` header value.
///
/// Assemble with a struct literal, usually starting from
/// [`crate::sign_with_pem`], then consume with [`Signer::sign`].
///
/// # Example
/// ```no_run
/// # fn main() -> Result<(), request_signing::Error> {
/// # let (kid, private_key, idempotency_key, body): (&str, &[u8], &[u8], &[u8]) = unimplemented!();
/// use request_signing::{Headers, Signer};
///
/// let tl_signature = Signer {
///     method: "POST",
///     path: "/payouts",
///     headers: Headers::new().with("Idempotency-Key", idempotency_key),
///     body,
///     ..request_signing::sign_with_pem(kid, private_key)
/// }
/// .sign()?;
/// # Ok(()) }
/// ```
#[derive(Clone)]
pub struct Signer<'a> {
    /// Signing key id, sent as the JWS `kid`.
    pub kid: &'a str,
    /// P-521 private key PEM.
    pub private_key: &'a [u8],
    /// Request method, defaults to `"POST"`.
    pub method: &'a str,
    /// Absolute request path starting with a leading `/`.
    pub path: &'a str,
    /// Headers to include in the signature, signed in insertion order.
    pub headers: Headers<'a>,
    /// Full request body. This **must** be identical to what is sent.
    pub body: &'a [u8],
    /// Optional JWS `jku` JSON Web Key URL. Set on webhook signatures.
    pub jku: Option<&'a str>,
}

impl Default for Signer<'_> {
    fn default() -> Self {
        Self {
            kid: "",
            private_key: &[],
            method: "POST",
            path: "",
            headers: Headers::new(),
            body: &[],
            jku: None,
        }
    }
}

/// Debug does not display key info.
impl fmt::Debug for Signer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("kid", &self.kid)
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct JwsHeaderV1<'a> {
    alg: &'a str,
    kid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    jku: Option<&'a str>,
}

impl Signer<'_> {
    /// Produce a JWS `Tl-Signature` v2 header value.
    pub fn sign(self) -> Result<String> {
        let private_key = es512::parse_private_key(self.private_key)?;
        self.sign_with(|message| private_key.sign(message))
    }

    /// Produce a JWS `Tl-Signature` v2 header value using a custom signing
    /// function, e.g. one backed by an HSM.
    ///
    /// `sign_fn` receives the JWS signing input and must return the raw
    /// 132-byte ES512 `R ‖ S` signature.
    pub fn sign_with(
        self,
        sign_fn: impl FnOnce(&[u8]) -> Result<Vec<u8>>,
    ) -> Result<String> {
        if !self.path.starts_with('/') {
            return Err(Error::invalid_argument(format!(
                "path `{}` must start with '/'",
                self.path
            )));
        }

        let jws_header = JwsHeader::new_v2(self.kid, &self.headers, self.jku);
        let header_b64 = token::encode_header(&jws_header)?;

        let signing_payload =
            build_v2_signing_payload(self.method, self.path, &self.headers, self.body, false);
        let signing_input = token::signing_input(&header_b64, &signing_payload);

        debug!(
            kid = self.kid,
            headers = self.headers.len(),
            "signing v2 request"
        );
        let signature = sign_fn(signing_input.as_bytes())?;
        Ok(token::encode(&header_b64, &signature))
    }

    /// Produce a JWS `Tl-Signature` v1 header value, signing just the request body.
    ///
    /// Any specified method, path & headers will be ignored.
    ///
    /// In general full request signing should be preferred, see [`Signer::sign`].
    pub fn sign_body_only(self) -> Result<String> {
        let private_key = es512::parse_private_key(self.private_key)?;

        let header_b64 = token::encode_header(&JwsHeaderV1 {
            alg: ALG_ES512,
            kid: self.kid,
            jku: self.jku,
        })?;
        let signing_input = token::signing_input(&header_b64, self.body);

        debug!(kid = self.kid, "signing v1 body-only request");
        let signature = private_key.sign(signing_input.as_bytes())?;
        Ok(token::encode(&header_b64, &signature))
    }
}
