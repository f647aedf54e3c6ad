use std::fmt;

use tracing::debug;

use crate::{
    error::{Error, Result},
    es512,
    headers::Headers,
    jws::ALG_ES512,
    payload::build_v2_signing_payload,
    token::{self, ParsedTlSignature},
};

/// Public key source for verification.
#[derive(Clone, Copy)]
pub enum PublicKey<'a> {
    /// Public key PEM.
    Pem(&'a [u8]),
    /// JWKS JSON document, the key is picked by the signature's `kid`.
    Jwks(&'a [u8]),
}

/// Debug does not display key info.
impl fmt::Debug for PublicKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pem(_) => f.write_str("Pem"),
            Self::Jwks(_) => f.write_str("Jwks"),
        }
    }
}

/// Received request description used to verify a `Tl-Signature` header value.
///
/// # Example
/// ```no_run
/// # fn main() -> Result<(), request_signing::Error> {
/// # let (public_key, idempotency_key, body, tl_signature): (&[u8], &[u8], &[u8], &str) = unimplemented!();
/// use request_signing::{Headers, Verifier};
///
/// Verifier {
///     method: "POST",
///     path: "/payouts",
///     headers: Headers::new()
///         .with("X-Whatever", b"aoitbeh")
///         .with("Idempotency-Key", idempotency_key),
///     required_headers: vec!["Idempotency-Key"],
///     body,
///     ..request_signing::verify_with_pem(public_key)
/// }
/// .verify(tl_signature)?;
/// # Ok(()) }
/// ```
#[derive(Clone, Default)]
pub struct Verifier<'a> {
    /// Verification key source. `None` fails with [`Error::InvalidKey`].
    pub public_key: Option<PublicKey<'a>>,
    /// Request method, e.g. `"POST"`.
    pub method: &'a str,
    /// Request path, e.g. `"/payouts"`. Must start with `/`.
    pub path: &'a str,
    /// Received request headers.
    ///
    /// All request headers may be added here, any not mentioned in the jws
    /// header `tl_headers` are ignored.
    pub headers: Headers<'a>,
    /// Full received request body.
    pub body: &'a [u8],
    /// Header names that must be included in the signature.
    pub required_headers: Vec<&'a str>,
    /// Whether v1 body-only signatures may pass. Default `false`.
    pub allow_v1: bool,
}

/// Debug does not display key info.
impl fmt::Debug for Verifier<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("public_key", &self.public_key)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("required_headers", &self.required_headers)
            .field("allow_v1", &self.allow_v1)
            .finish_non_exhaustive()
    }
}

impl Verifier<'_> {
    /// Verify the given `Tl-Signature` header value.
    ///
    /// Returns `Err(_)` if verification fails.
    pub fn verify(self, tl_signature: &str) -> Result<()> {
        self.check_path()?;
        let parsed = token::parse_tl_signature(tl_signature)?;

        let public_key = match self.public_key {
            Some(PublicKey::Pem(pem)) => es512::parse_public_key(pem)?,
            Some(PublicKey::Jwks(jwks)) => es512::find_key_in_jwks(&parsed.header.kid, jwks)?,
            None => {
                return Err(Error::invalid_key(
                    "no public key nor jwks supplied, verification is not possible",
                ));
            }
        };

        self.verify_parsed(&parsed, |payload, signature| {
            public_key.verify(payload, signature)
        })
    }

    /// Verify the given `Tl-Signature` header value using a custom
    /// verification function instead of [`Verifier::public_key`].
    ///
    /// `verify_fn` receives the reconstructed JWS signing input and the raw
    /// signature bytes. It may be called twice, see [`Verifier::verify`].
    pub fn verify_with(
        self,
        tl_signature: &str,
        verify_fn: impl FnMut(&[u8], &[u8]) -> Result<()>,
    ) -> Result<()> {
        self.check_path()?;
        let parsed = token::parse_tl_signature(tl_signature)?;
        self.verify_parsed(&parsed, verify_fn)
    }

    fn check_path(&self) -> Result<()> {
        if self.path.starts_with('/') {
            Ok(())
        } else {
            Err(Error::invalid_argument(format!(
                "path `{}` must start with '/'",
                self.path
            )))
        }
    }

    fn verify_parsed(
        &self,
        parsed: &ParsedTlSignature<'_>,
        mut verify_fn: impl FnMut(&[u8], &[u8]) -> Result<()>,
    ) -> Result<()> {
        let jws_header = &parsed.header;
        let signature = parsed.signature.as_slice();

        if jws_header.alg != ALG_ES512 {
            return Err(Error::signature(format!(
                "unexpected header alg `{}`",
                jws_header.alg
            )));
        }

        if jws_header.is_v1() {
            if !self.allow_v1 {
                debug!(kid = %jws_header.kid, "rejecting v1 signature");
                return Err(Error::signature("v1 signature not allowed"));
            }

            // v1 signature: body only
            let payload = token::signing_input(parsed.header_b64, self.body);
            return verify_fn(payload.as_bytes(), signature);
        }

        // check and order all declared headers
        let ordered_headers = jws_header.filter_headers(&self.headers)?;

        // fail if signature is missing a required header
        if let Some(header) = self
            .required_headers
            .iter()
            .find(|h| !ordered_headers.contains(h))
        {
            return Err(Error::signature(format!(
                "signature is missing required header `{header}`"
            )));
        }
        debug!(
            kid = %jws_header.kid,
            headers = ordered_headers.len(),
            "verifying v2 signature"
        );

        // reconstruct the payload as it would have been signed
        let signing_payload =
            build_v2_signing_payload(self.method, self.path, &ordered_headers, self.body, false);
        let payload = token::signing_input(parsed.header_b64, &signing_payload);

        verify_fn(payload.as_bytes(), signature).or_else(|err| {
            // try again with/without a single trailing slash
            let (path, add_slash) = match self.path.strip_suffix('/') {
                Some(trimmed) => (trimmed, false),
                None => (self.path, true),
            };
            debug!(add_slash, "retrying with trailing slash toggled");

            let signing_payload =
                build_v2_signing_payload(self.method, path, &ordered_headers, self.body, add_slash);
            let payload = token::signing_input(parsed.header_b64, &signing_payload);

            // use the original error if both fail
            verify_fn(payload.as_bytes(), signature).map_err(|_| err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::Signer;

    fn sign_stub(message: &[u8]) -> Result<Vec<u8>> {
        // deterministic fake signature: the message itself
        Ok(message.to_vec())
    }

    fn verify_stub(message: &[u8], signature: &[u8]) -> Result<()> {
        if message == signature {
            Ok(())
        } else {
            Err(Error::signature("signature validation failed"))
        }
    }

    fn signed(path: &str) -> String {
        Signer {
            kid: "kid",
            path,
            headers: Headers::new().with("X-A", b"1"),
            body: b"{}",
            ..Signer::default()
        }
        .sign_with(sign_stub)
        .unwrap()
    }

    #[test]
    fn retry_is_attempted_once_with_slash_toggled() {
        let tl_signature = signed("/foo/");
        let mut attempts = Vec::new();

        Verifier {
            method: "POST",
            path: "/foo",
            headers: Headers::new().with("x-a", b"1"),
            body: b"{}",
            ..Verifier::default()
        }
        .verify_with(&tl_signature, |message, signature| {
            attempts.push(message.to_vec());
            verify_stub(message, signature)
        })
        .unwrap();

        assert_eq!(attempts.len(), 2);
    }

    #[test]
    fn original_error_is_kept_when_retry_fails() {
        let tl_signature = signed("/bar");
        let mut calls = 0;

        let err = Verifier {
            method: "POST",
            path: "/foo",
            headers: Headers::new().with("X-A", b"1"),
            body: b"{}",
            ..Verifier::default()
        }
        .verify_with(&tl_signature, |_, _| {
            calls += 1;
            Err(Error::signature(format!("attempt {calls}")))
        })
        .unwrap_err();

        assert_eq!(calls, 2);
        assert!(matches!(err, Error::Signature(ref msg) if msg == "attempt 1"));
    }

    #[test]
    fn verifier_side_trailing_slash_is_stripped_on_retry() {
        let tl_signature = signed("/foo");
        Verifier {
            method: "POST",
            path: "/foo/",
            headers: Headers::new().with("X-A", b"1"),
            body: b"{}",
            ..Verifier::default()
        }
        .verify_with(&tl_signature, verify_stub)
        .unwrap();
    }

    #[test]
    fn missing_key_source_is_a_key_error() {
        let err = Verifier {
            method: "POST",
            path: "/foo",
            ..Verifier::default()
        }
        .verify(&signed("/foo"))
        .unwrap_err();

        assert!(matches!(err, Error::InvalidKey(_)));
    }

    #[test]
    fn relative_path_is_an_argument_error() {
        let err = Verifier {
            path: "foo",
            ..Verifier::default()
        }
        .verify_with(&signed("/foo"), verify_stub)
        .unwrap_err();

        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn unexpected_alg_is_rejected() {
        let header_b64 = token::encode_b64(
            r#"{"alg":"ES256","kid":"kid","tl_version":"2","tl_headers":""}"#,
        );
        let tl_signature = token::encode(&header_b64, b"sig");

        let err = Verifier {
            path: "/foo",
            ..Verifier::default()
        }
        .verify_with(&tl_signature, verify_stub)
        .unwrap_err();

        assert!(matches!(err, Error::Signature(ref msg) if msg.contains("ES256")));
    }
}
