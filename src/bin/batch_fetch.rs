//! batch-fetch: 在一次并发分发中抓取多个 URL
//!
//! Usage:
//!   batch-fetch [--config <yaml>] [-X <method>] [-H 'Name: value'] [-d <body>] <url>...
//!
//! Every URL is sent in the same batch; the records are printed as a JSON array
//! in argument order.

use anyhow::{anyhow, bail, Context};
use batch_dispatch::{Dispatcher, HttpConfig, Method, RequestDescriptor};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    method: Method,
    headers: Vec<(String, String)>,
    body: Option<String>,
    urls: Vec<String>,
}

fn main() {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&argv) {
        Ok(Some(args)) => args,
        Ok(None) => return,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(args)) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"batch-fetch: fetch several URLs in one concurrent dispatch

USAGE:
    batch-fetch [OPTIONS] <URL>...

OPTIONS:
    --config <path>         YAML file with HTTP transport settings
    -X, --request <method>  HTTP method for every URL (default: GET)
    -H, --header <header>   Extra header, 'Name: value' (repeatable)
    -d, --data <body>       Request body for every URL
    -V, --version           Show version information
    -h, --help              Show this help message

ENVIRONMENT:
    DISPATCH_HTTP_TIMEOUT_SECS, DISPATCH_PROXY_URL, DISPATCH_USER_AGENT, ...
    RUST_LOG                Log filter (default: warn)"#
    );
}

fn parse_args(argv: &[String]) -> anyhow::Result<Option<Args>> {
    let mut args = Args::default();
    let mut iter = argv.iter();

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{flag} requires a value"))
        };
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(None);
            }
            "-V" | "--version" => {
                println!("batch-fetch {}", env!("CARGO_PKG_VERSION"));
                return Ok(None);
            }
            "--config" => args.config = Some(PathBuf::from(value(arg)?)),
            "-X" | "--request" => args.method = value(arg)?.parse()?,
            "-H" | "--header" => {
                let raw = value(arg)?;
                let (name, val) = raw
                    .split_once(':')
                    .ok_or_else(|| anyhow!("header must look like 'Name: value', got {raw:?}"))?;
                args.headers
                    .push((name.trim().to_string(), val.trim().to_string()));
            }
            "-d" | "--data" => args.body = Some(value(arg)?),
            flag if flag.starts_with('-') && flag.len() > 1 => bail!("unknown option: {flag}"),
            url => args.urls.push(url.to_string()),
        }
    }

    if args.urls.is_empty() {
        bail!("at least one URL is required");
    }
    Ok(Some(args))
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => HttpConfig::from_path(path)
            .with_context(|| format!("loading {}", path.display()))?
            .with_env_overrides(),
        None => HttpConfig::from_env(),
    };

    let dispatcher = Dispatcher::builder().http_config(config).build()?;

    let requests = args
        .urls
        .iter()
        .map(|url| {
            let mut request = RequestDescriptor::new(args.method, url.as_str());
            for (name, value) in &args.headers {
                request = request.header(name, value.clone());
            }
            if let Some(body) = &args.body {
                request = request.body(body.clone());
            }
            request
        })
        .collect();

    let records = dispatcher.fetch_all(requests).await?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_flags_and_urls() {
        let args = parse_args(&argv(&[
            "-X",
            "post",
            "-H",
            "X-Trace: abc",
            "-d",
            "{}",
            "https://x/1",
            "https://x/2",
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(args.method, Method::Post);
        assert_eq!(args.headers, vec![("X-Trace".to_string(), "abc".to_string())]);
        assert_eq!(args.body.as_deref(), Some("{}"));
        assert_eq!(args.urls, vec!["https://x/1", "https://x/2"]);
    }

    #[test]
    fn requires_a_url() {
        assert!(parse_args(&argv(&["-X", "GET"])).is_err());
    }

    #[test]
    fn rejects_unknown_flags_and_bad_headers() {
        assert!(parse_args(&argv(&["--nope", "https://x/1"])).is_err());
        assert!(parse_args(&argv(&["-H", "no-colon", "https://x/1"])).is_err());
        assert!(parse_args(&argv(&["-X"])).is_err());
    }
}
