use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    error::{Error, Result},
    headers::Headers,
};

pub(crate) const ALG_ES512: &str = "ES512";

/// `Tl-Signature` JWS header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct JwsHeader {
    /// Algorithm, should be `ES512`.
    pub alg: String,
    /// Signing key id.
    pub kid: String,
    /// Signing scheme version. `None` implies v1, aka body-only signing.
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub tl_version: Option<TlVersion>,
    /// Comma separated ordered headers used in the signature.
    #[serde(default)]
    pub tl_headers: String,
    /// JSON Web Key URL. Set on webhook signatures to point at the signer's JWKS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jku: Option<String>,
}

/// Signing scheme version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TlVersion {
    /// Body-only signature.
    #[serde(rename = "1")]
    V1,
    /// Full request signature: method, path, headers & body.
    #[serde(rename = "2")]
    V2,
}

impl JwsHeader {
    pub(crate) fn new_v2(kid: &str, headers: &Headers<'_>, jku: Option<&str>) -> Self {
        let tl_headers = headers.names().fold(String::new(), |mut all, next| {
            if !all.is_empty() {
                all.push(',');
            }
            all.push_str(next);
            all
        });

        Self {
            alg: ALG_ES512.into(),
            kid: kid.into(),
            tl_version: Some(TlVersion::V2),
            tl_headers,
            jku: jku.map(Into::into),
        }
    }

    /// Whether this header describes a legacy body-only signature.
    pub fn is_v1(&self) -> bool {
        matches!(self.tl_version, None | Some(TlVersion::V1))
    }

    /// Declared signature header names, in signing order.
    ///
    /// An empty `tl_headers` yields no names.
    pub fn header_names(&self) -> impl Iterator<Item = &str> {
        self.tl_headers.split(',').filter(|h| !h.is_empty())
    }

    /// Filter & order `headers` to match the declared `tl_headers`.
    ///
    /// The result holds exactly the declared headers, in declared order and
    /// declared case. Returns an `Err(_)` if `headers` is missing any of them.
    pub(crate) fn filter_headers<'a>(&'a self, headers: &Headers<'a>) -> Result<Headers<'a>> {
        let mut ordered = Headers::new();
        for name in self.header_names() {
            let value = headers.get(name).ok_or_else(|| {
                Error::signature(format!("missing tl_header `{name}` declared in signature"))
            })?;
            ordered.insert(name, value);
        }
        Ok(ordered)
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<TlVersion>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some("1") => Ok(Some(TlVersion::V1)),
        Some("2") => Ok(Some(TlVersion::V2)),
        Some(other) => Err(serde::de::Error::custom(format!(
            "unsupported tl_version `{other}`"
        ))),
    }
}
