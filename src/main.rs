// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! simplereq CLI
//!
//! Fetch a URL, or show how a URL would be routed, using the current
//! environment's proxy and CA bundle settings.

use std::env;
use std::process::ExitCode;

use anyhow::Context;
use reqwest::Method;
use simplereq::{Client, RequestOptions, TlsSetting};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("simplereq=info".parse().unwrap()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let insecure = args.iter().skip(2).any(|a| a == "-k" || a == "--insecure");
    let target = args.iter().skip(2).find(|a| !a.starts_with('-'));

    match args[1].as_str() {
        "fetch" => {
            let Some(url) = target else {
                eprintln!("Usage: simplereq fetch <url> [--insecure]");
                return ExitCode::from(1);
            };
            report(fetch_url(url, insecure).await)
        }
        "resolve" => {
            let Some(url) = target else {
                eprintln!("Usage: simplereq resolve <url> [--insecure]");
                return ExitCode::from(1);
            };
            report(resolve_url(url, insecure))
        }
        "--help" | "-h" | "help" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "--version" | "-v" | "version" => {
            println!("simplereq {}", simplereq::VERSION);
            ExitCode::SUCCESS
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"simplereq - requests-style HTTP client

USAGE:
    simplereq <COMMAND> [OPTIONS]

COMMANDS:
    fetch <url>     Fetch a URL and print status, headers and body
    resolve <url>   Show the proxy and TLS settings a request would use
    help            Show this help message
    version         Show version information

OPTIONS:
    -k, --insecure  Do not verify TLS certificates

ENVIRONMENT:
    http_proxy, https_proxy, no_proxy (and uppercase forms)
    REQUESTS_CA_BUNDLE, CURL_CA_BUNDLE
    RUST_LOG        Log filter, e.g. simplereq=debug

EXAMPLES:
    simplereq fetch https://example.com
    no_proxy=.internal simplereq resolve http://api.internal/health
"#
    );
}

fn report(result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn options(insecure: bool) -> RequestOptions {
    if insecure {
        RequestOptions::new().verify(false)
    } else {
        RequestOptions::new()
    }
}

async fn fetch_url(url: &str, insecure: bool) -> anyhow::Result<()> {
    let client = Client::new();
    let response = client
        .get(url, options(insecure))
        .await
        .with_context(|| format!("request to {} failed", url))?;

    println!("{} {}", response.status(), response.url());
    println!("via: {}", response.request_info().proxy);
    for (name, value) in response.headers() {
        println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
    println!();

    let body = response.text_lossy().await.context("reading response body")?;
    println!("{}", body);

    client.close().await;
    Ok(())
}

fn resolve_url(url: &str, insecure: bool) -> anyhow::Result<()> {
    let client = Client::new();
    let prepared = client
        .prepare(Method::GET, url, &options(insecure))
        .with_context(|| format!("cannot resolve {}", url))?;

    println!("URL:     {}", prepared.url);
    println!("Proxy:   {}", prepared.proxy);
    match &prepared.tls {
        TlsSetting::Config(config) => {
            println!("Verify:  {:?}", config.verify_mode);
            println!("Roots:   {:?}", config.trust_roots);
            if let Some(identity) = &config.client_identity {
                println!("Client:  {:?}", identity);
            }
        }
        TlsSetting::Override(ssl) => println!("TLS:     {:?}", ssl),
    }
    Ok(())
}
