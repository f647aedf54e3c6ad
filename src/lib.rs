//! Produce & verify `Tl-Signature` HTTP request signatures.
//!
//! A signature is a detached ES512 JWS binding the request method, path, an
//! ordered selection of headers and the body. The signed payload is never
//! sent: the verifier rebuilds it from the request it received.
//!
//! # Example
//! ```no_run
//! # fn main() -> Result<(), request_signing::Error> {
//! # let (kid, private_key, public_key, idempotency_key, body): (&str, &[u8], &[u8], &[u8], &[u8]) = unimplemented!();
//! use request_signing::{Headers, Signer, Verifier};
//!
//! // `Tl-Signature` value to send with the request.
//! let tl_signature = Signer {
//!     method: "POST",
//!     path: "/payouts",
//!     headers: Headers::new().with("Idempotency-Key", idempotency_key),
//!     body,
//!     ..request_signing::sign_with_pem(kid, private_key)
//! }
//! .sign()?;
//!
//! // On the receiving side.
//! Verifier {
//!     method: "POST",
//!     path: "/payouts",
//!     headers: Headers::new().with("Idempotency-Key", idempotency_key),
//!     required_headers: vec!["Idempotency-Key"],
//!     body,
//!     ..request_signing::verify_with_pem(public_key)
//! }
//! .verify(&tl_signature)?;
//! # Ok(()) }
//! ```
mod error;
pub mod es512;
mod headers;
mod jws;
mod payload;
mod sign;
mod token;
mod verify;

pub use error::{Error, Result};
pub use headers::Headers;
pub use jws::{JwsHeader, TlVersion};
pub use sign::Signer;
pub use verify::{PublicKey, Verifier};

/// Start a [`Signer`] using private key pem data & the key's `kid`.
pub fn sign_with_pem<'a>(kid: &'a str, private_key_pem: &'a [u8]) -> Signer<'a> {
    Signer {
        kid,
        private_key: private_key_pem,
        ..Signer::default()
    }
}

/// Start a [`Verifier`] using public key pem data.
pub fn verify_with_pem(public_key_pem: &[u8]) -> Verifier<'_> {
    Verifier {
        public_key: Some(PublicKey::Pem(public_key_pem)),
        ..Verifier::default()
    }
}

/// Start a [`Verifier`] using a JWKS JSON document.
///
/// The verification key is the entry matching the signature's `kid`.
pub fn verify_with_jwks(jwks: &[u8]) -> Verifier<'_> {
    Verifier {
        public_key: Some(PublicKey::Jwks(jwks)),
        ..Verifier::default()
    }
}

/// Extract [`JwsHeader`] info from a `Tl-Signature` header value.
///
/// This can then be used to pick a verification key using the `kid` or `jku`.
/// Nothing is verified.
pub fn extract_jws_header(tl_signature: &str) -> Result<JwsHeader> {
    Ok(token::parse_tl_signature(tl_signature)?.header)
}
