use std::{fs, path::PathBuf, str::FromStr};

use anyhow::{Context, Result, bail};
use clap::Parser;
use request_signing::{Headers, Signer};
use uuid::Uuid;

/// Generate a `Tl-Signature` header value for an HTTP request.
///
/// - Always signs an `Idempotency-Key` header (random UUID v4 unless given)
/// - Signs method, path, any `--header` values & the body (v2), or the body only (`--v1`)
/// - Outputs the signed headers, or a ready-to-run curl command
///
/// Nothing is sent over the network.
#[derive(Parser, Debug)]
#[command(name = "sign-request", version, about)]
struct Args {
    /// Signing key id (`kid`)
    #[arg(long)]
    kid: String,

    /// Path to the P-521 private key in PEM
    #[arg(long, value_name = "FILE")]
    private_key: PathBuf,

    /// HTTP method
    #[arg(long, default_value = "POST")]
    method: String,

    /// Absolute request path, e.g. /payouts
    #[arg(long)]
    path: String,

    /// Additional header to sign, "Name: Value". May be repeated.
    #[arg(long = "header", value_name = "NAME: VALUE")]
    headers: Vec<String>,

    /// Request body
    #[arg(long, conflicts_with = "body_file")]
    body: Option<String>,

    /// Path to request body file
    #[arg(long, value_name = "FILE")]
    body_file: Option<PathBuf>,

    /// Idempotency-Key value. Default: random UUID v4.
    #[arg(long)]
    idempotency_key: Option<String>,

    /// JWS `jku` JSON Web Key URL to embed
    #[arg(long)]
    jku: Option<String>,

    /// Produce a legacy v1 body-only signature
    #[arg(long, default_value_t = false)]
    v1: bool,

    /// Output format: headers or curl
    #[arg(long, default_value = "headers")]
    format: OutputFormat,

    /// Base URL used for curl output
    #[arg(long, default_value = "https://api.truelayer-sandbox.com")]
    base_url: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Headers,
    Curl,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "headers" => Ok(Self::Headers),
            "curl" => Ok(Self::Curl),
            _ => Err(format!("invalid format '{s}': use 'headers' or 'curl'")),
        }
    }
}

fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("invalid header format '{raw}': use 'Name: Value'");
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("invalid header format '{raw}': empty name");
    }
    Ok((name, value.trim()))
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn render_curl<V: AsRef<str>>(
    base_url: &str,
    method: &str,
    path: &str,
    headers: &[(&str, V)],
    body: &[u8],
) -> String {
    let mut out = format!(
        "curl -X {} {}",
        method.to_ascii_uppercase(),
        shell_quote(&format!("{}{}", base_url.trim_end_matches('/'), path))
    );
    for (name, value) in headers {
        out.push_str(" \\\n  -H ");
        out.push_str(&shell_quote(&format!("{name}: {}", value.as_ref())));
    }
    if !body.is_empty() {
        out.push_str(" \\\n  --data-binary ");
        out.push_str(&shell_quote(&String::from_utf8_lossy(body)));
    }
    out
}

/// Headers to sign: `Idempotency-Key` then each `--header`.
///
/// A repeated name keeps its first position & takes the last value, so what
/// is printed is exactly what is signed.
fn collect_signed_headers<'a>(
    idempotency_key: &'a str,
    raw: &'a [String],
) -> Result<Headers<'a>> {
    let mut headers = Headers::new().with("Idempotency-Key", idempotency_key.as_bytes());
    for raw in raw {
        let (name, value) = parse_header(raw)?;
        headers.insert(name, value.as_bytes());
    }
    Ok(headers)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let private_key = fs::read(&args.private_key)
        .with_context(|| format!("failed to read key file {}", args.private_key.display()))?;

    let body = match (&args.body, &args.body_file) {
        (Some(body), _) => body.clone().into_bytes(),
        (None, Some(file)) => fs::read(file)
            .with_context(|| format!("failed to read body file {}", file.display()))?,
        (None, None) => Vec::new(),
    };

    let idempotency_key = args
        .idempotency_key
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let signed_headers = collect_signed_headers(&idempotency_key, &args.headers)?;

    let signer = Signer {
        method: &args.method,
        path: &args.path,
        headers: signed_headers.clone(),
        body: &body,
        jku: args.jku.as_deref(),
        ..request_signing::sign_with_pem(&args.kid, &private_key)
    };
    let tl_signature = if args.v1 {
        signer.sign_body_only()
    } else {
        signer.sign()
    }
    .context("failed to sign request")?;

    let mut out_headers: Vec<(&str, String)> = signed_headers
        .iter()
        .map(|(name, value)| (name, String::from_utf8_lossy(value).into_owned()))
        .collect();
    out_headers.push(("Tl-Signature", tl_signature));

    match args.format {
        OutputFormat::Headers => {
            for (name, value) in &out_headers {
                println!("{name}: {value}");
            }
        }
        OutputFormat::Curl => println!(
            "{}",
            render_curl(&args.base_url, &args.method, &args.path, &out_headers, &body)
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_argument_is_split_on_first_colon() {
        assert_eq!(
            parse_header("X-Time: 2021-11-29T11:42:55Z").unwrap(),
            ("X-Time", "2021-11-29T11:42:55Z")
        );
        parse_header("no-colon").unwrap_err();
        parse_header(": value").unwrap_err();
    }

    #[test]
    fn repeated_header_is_signed_and_printed_once() {
        let raw = vec![
            "Idempotency-Key: chosen".to_string(),
            "X-Extra: 1".to_string(),
            "x-extra: 2".to_string(),
        ];
        let headers = collect_signed_headers("generated", &raw).unwrap();

        let collected: Vec<_> = headers.iter().collect();
        assert_eq!(
            collected,
            vec![
                ("Idempotency-Key", &b"chosen"[..]),
                ("X-Extra", &b"2"[..]),
            ]
        );
    }

    #[test]
    fn curl_output_quotes_arguments() {
        let curl = render_curl(
            "https://api.example.com/",
            "post",
            "/payouts",
            &[("Tl-Signature", "abc..def")],
            b"{\"it's\":1}",
        );

        assert_eq!(
            curl,
            "curl -X POST 'https://api.example.com/payouts' \\\n  \
             -H 'Tl-Signature: abc..def' \\\n  \
             --data-binary '{\"it'\\''s\":1}'"
        );
    }

    #[test]
    fn output_format_parses_case_insensitively() {
        assert_eq!("CURL".parse::<OutputFormat>(), Ok(OutputFormat::Curl));
        "json".parse::<OutputFormat>().unwrap_err();
    }
}
