//! ES512 (ECDSA P-521 / SHA-512) keys & the raw sign/verify primitive.
//!
//! Signatures are the JWS fixed-width form: 66-byte big-endian `R` followed
//! by 66-byte big-endian `S`.

use std::fmt;

use josekit::jwk::JwkSet;
use josekit::jws::alg::ecdsa::{EcdsaJwsSigner, EcdsaJwsVerifier};
use josekit::jws::{ES512, JwsSigner, JwsVerifier};
use openssl::nid::Nid;
use openssl::pkey::PKey;

use crate::error::{Error, Result};

/// Raw ES512 signature length, `R ‖ S`.
pub const SIGNATURE_LEN: usize = 132;

/// Parsed P-521 private key.
pub struct SigningKey(EcdsaJwsSigner);

/// Parsed P-521 public key.
pub struct VerifyingKey(EcdsaJwsVerifier);

/// Debug does not display key info.
impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(ES512)")
    }
}

/// Debug does not display key info.
impl fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VerifyingKey(ES512)")
    }
}

/// Parse a P-521 private key from PKCS#8 or SEC1 PEM.
pub fn parse_private_key(pem: &[u8]) -> Result<SigningKey> {
    let curve = PKey::private_key_from_pem(pem)
        .and_then(|key| key.ec_key())
        .map_err(|e| Error::invalid_key(format!("ES512 private key: {e}")))?
        .group()
        .curve_name();
    require_p521(curve, "private")?;

    ES512
        .signer_from_pem(pem)
        .map(SigningKey)
        .map_err(|e| Error::invalid_key(format!("ES512 private key: {e}")))
}

/// Parse a P-521 public key from SPKI PEM.
pub fn parse_public_key(pem: &[u8]) -> Result<VerifyingKey> {
    let curve = PKey::public_key_from_pem(pem)
        .and_then(|key| key.ec_key())
        .map_err(|e| Error::invalid_key(format!("ES512 public key: {e}")))?
        .group()
        .curve_name();
    require_p521(curve, "public")?;

    ES512
        .verifier_from_pem(pem)
        .map(VerifyingKey)
        .map_err(|e| Error::invalid_key(format!("ES512 public key: {e}")))
}

// josekit builds an ECDSA key from any named curve, so the curve is checked first.
fn require_p521(curve: Option<Nid>, kind: &str) -> Result<()> {
    if curve == Some(Nid::SECP521R1) {
        Ok(())
    } else {
        Err(Error::invalid_key(format!(
            "ES512 {kind} key must be on curve P-521, got {}",
            curve.and_then(|nid| nid.short_name().ok()).unwrap_or("none")
        )))
    }
}

/// Read a JWKS document then find & parse the P-521 JWK for `kid`.
pub fn find_key_in_jwks(kid: &str, jwks: &[u8]) -> Result<VerifyingKey> {
    let jwks =
        JwkSet::from_bytes(jwks).map_err(|e| Error::invalid_key(format!("jwks parse: {e}")))?;

    let jwk = jwks
        .get(kid)
        .into_iter()
        .next()
        .ok_or_else(|| Error::invalid_key(format!("no jwk found for kid `{kid}`")))?;

    if jwk.key_type() != "EC" {
        return Err(Error::invalid_key(format!(
            "jwk `{kid}` has unsupported kty `{}`",
            jwk.key_type()
        )));
    }
    match jwk.curve() {
        Some("P-521") => {}
        other => {
            return Err(Error::invalid_key(format!(
                "jwk `{kid}` must be on curve P-521, got {}",
                other.unwrap_or("none")
            )));
        }
    }

    ES512
        .verifier_from_jwk(jwk)
        .map(VerifyingKey)
        .map_err(|e| Error::invalid_key(format!("jwk `{kid}`: {e}")))
}

impl SigningKey {
    /// Sign `message`, returning the 132-byte `R ‖ S` signature.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signature = self
            .0
            .sign(message)
            .map_err(|e| Error::signature(format!("ES512 sign: {e}")))?;

        if signature.len() != SIGNATURE_LEN {
            return Err(Error::signature(format!(
                "ES512 sign produced {} bytes, expected {SIGNATURE_LEN}",
                signature.len()
            )));
        }
        Ok(signature)
    }
}

impl VerifyingKey {
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        if signature.len() != SIGNATURE_LEN {
            return Err(Error::signature(format!(
                "unexpected ES512 signature length {}",
                signature.len()
            )));
        }
        self.0
            .verify(message, signature)
            .map_err(|_| Error::signature("signature validation failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_KEY: &[u8] = include_bytes!("../test-resources/ec512-private.pem");
    const PUBLIC_KEY: &[u8] = include_bytes!("../test-resources/ec512-public.pem");
    const P256_PRIVATE_KEY: &[u8] = include_bytes!("../test-resources/ec256-private.pem");
    const P256_PUBLIC_KEY: &[u8] = include_bytes!("../test-resources/ec256-public.pem");
    const JWKS: &[u8] = include_bytes!("../test-resources/jwks.json");
    const KID: &str = "45fc75cf-5649-4134-84b3-192c2c78e990";

    #[test]
    fn sign_then_verify() {
        let signing = parse_private_key(PRIVATE_KEY).unwrap();
        let verifying = parse_public_key(PUBLIC_KEY).unwrap();

        let signature = signing.sign(b"hello").unwrap();
        assert_eq!(signature.len(), SIGNATURE_LEN);

        verifying.verify(b"hello", &signature).unwrap();
        verifying.verify(b"hellO", &signature).unwrap_err();
    }

    #[test]
    fn wrong_curve_keys_are_rejected() {
        assert!(matches!(
            parse_private_key(P256_PRIVATE_KEY),
            Err(Error::InvalidKey(_))
        ));
        assert!(matches!(
            parse_public_key(P256_PUBLIC_KEY),
            Err(Error::InvalidKey(ref msg)) if msg.contains("P-521")
        ));
        assert!(matches!(
            parse_public_key(b"not a pem"),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn truncated_signature_is_rejected() {
        let signing = parse_private_key(PRIVATE_KEY).unwrap();
        let verifying = parse_public_key(PUBLIC_KEY).unwrap();
        let signature = signing.sign(b"hello").unwrap();

        let err = verifying.verify(b"hello", &signature[..131]).unwrap_err();
        assert!(matches!(err, Error::Signature(_)));
    }

    #[test]
    fn jwks_lookup_by_kid() {
        let signing = parse_private_key(PRIVATE_KEY).unwrap();
        let signature = signing.sign(b"hello").unwrap();

        find_key_in_jwks(KID, JWKS)
            .unwrap()
            .verify(b"hello", &signature)
            .unwrap();

        let err = find_key_in_jwks("unknown-kid", JWKS).unwrap_err();
        assert!(matches!(err, Error::InvalidKey(ref msg) if msg.contains("unknown-kid")));

        let err = find_key_in_jwks("a1b2c3d4-p256-key", JWKS).unwrap_err();
        assert!(matches!(err, Error::InvalidKey(ref msg) if msg.contains("P-521")));

        assert!(matches!(
            find_key_in_jwks(KID, b"{not json"),
            Err(Error::InvalidKey(_))
        ));
    }
}
