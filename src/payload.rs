use crate::headers::Headers;

/// Build the v2 signing payload.
///
/// ```txt
/// POST /test-signature
/// Idempotency-Key: 619410b3-b00c-406e-bb1b-2982f97edb8b
/// {"bar":123}
/// ```
///
/// Header values and body are copied verbatim. Values containing a newline
/// would be indistinguishable from a delimiter; callers must not sign those.
pub(crate) fn build_v2_signing_payload(
    method: &str,
    path: &str,
    headers: &Headers<'_>,
    body: &[u8],
    add_path_trailing_slash: bool,
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(method.len() + path.len() + body.len() + 64);
    payload.extend(method.to_ascii_uppercase().as_bytes());
    payload.push(b' ');
    payload.extend(path.as_bytes());
    if add_path_trailing_slash {
        payload.push(b'/');
    }
    payload.push(b'\n');
    for (name, value) in headers.iter() {
        payload.extend(name.as_bytes());
        payload.extend(b": ");
        payload.extend(value);
        payload.push(b'\n');
    }
    payload.extend(body);
    payload
}
