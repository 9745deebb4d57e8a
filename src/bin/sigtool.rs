//! `sigtool` — a small developer aid for interactively diffing a signed
//! request against AWS's published golden vectors. Reads credentials from
//! the environment, a request description from CLI flags, signs it with
//! one of the registered schemes, and prints the result. Not part of the
//! signing core's public contract.

use std::io::Read;

use aws_request_signer::credentials::{AuthToken, Credentials};
use aws_request_signer::registry::{construct_signer, SignerParams};
use aws_request_signer::request::SignableRequest;
use clap::Parser;

/// Sign an HTTP request and print the result, for diffing against AWS's
/// published test vectors.
#[derive(Parser, Debug)]
#[command(name = "sigtool")]
struct Args {
    /// Signature scheme: v2, v3, v4, v4-query, s3v4, s3v4-query, bearer.
    #[arg(long, default_value = "v4")]
    scheme: String,

    /// HTTP method.
    #[arg(long, default_value = "GET")]
    method: String,

    /// Full request URL, including query string.
    #[arg(long)]
    url: String,

    /// Service name (e.g. `iam`, `s3`) — ignored for v2/v3/bearer.
    #[arg(long, default_value = "execute-api")]
    service: String,

    /// Region name — ignored for v2/v3/bearer.
    #[arg(long, default_value = "us-east-1")]
    region: String,

    /// Extra headers, `Name: value`, repeatable.
    #[arg(long = "header")]
    headers: Vec<String>,

    /// Path to a file whose bytes become the request body.
    #[arg(long)]
    body_file: Option<String>,

    /// `X-Amz-Expires` for query-string presigning variants.
    #[arg(long, default_value_t = 3600)]
    expires: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let url = url::Url::parse(&args.url)?;
    let method: http::Method = args.method.parse()?;
    let mut request = SignableRequest::new(method, url);

    if request.header("host").is_none() {
        let host = aws_request_signer::util::host_from_url(&request.url);
        request.set_header("Host", host);
    }
    for raw in &args.headers {
        let (name, value) = raw
            .split_once(':')
            .ok_or("expected --header in 'Name: value' form")?;
        request.set_header(name.trim(), value.trim());
    }
    if let Some(path) = &args.body_file {
        let mut bytes = Vec::new();
        std::fs::File::open(path)?.read_to_end(&mut bytes)?;
        request.body = aws_request_signer::request::Payload::Bytes(bytes);
    }

    sign(&args, &mut request)?;

    println!("Method:  {}", request.method);
    println!("URL:     {}", request.url);
    for (name, value) in request.headers.iter() {
        println!("Header:  {}: {}", name, value.to_str().unwrap_or("<binary>"));
    }

    Ok(())
}

fn sign(args: &Args, request: &mut SignableRequest) -> Result<(), Box<dyn std::error::Error>> {
    let access_key = std::env::var("AWS_ACCESS_KEY_ID").unwrap_or_else(|_| "AKIDEXAMPLE".to_string());
    let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY")
        .unwrap_or_else(|_| "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string());
    let mut credentials = Credentials::new(access_key, secret_key);
    if let Ok(token) = std::env::var("AWS_SESSION_TOKEN") {
        credentials = credentials.with_session_token(token);
    }
    let auth_token = std::env::var("AWS_BEARER_TOKEN")
        .ok()
        .map(AuthToken::new)
        .or_else(|| (args.scheme == "bearer").then(|| AuthToken::new("example-token")));

    let params = SignerParams {
        credentials: Some(credentials),
        auth_token,
        service_name: args.service.clone(),
        region_name: args.region.clone(),
        expires: Some(args.expires),
        ..Default::default()
    };
    let signer = construct_signer(&args.scheme, params)?;
    signer.add_auth(request)?;
    Ok(())
}
