// Copyright 2024 the dnswhy project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The dnswhy command line program

// BINARY WARNINGS
#![warn(
    clippy::default_trait_access,
    clippy::dbg_macro,
    clippy::unimplemented,
    missing_copy_implementations,
    missing_docs,
    non_snake_case,
    non_upper_case_globals,
    rust_2018_idioms,
    unreachable_pub
)]

use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::error::ErrorKind as ClapErrorKind;
use clap::{Args, Parser, Subcommand};
use hickory_proto::rr::RecordType;
use tracing::metadata::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dnswhy::client::{Client, ClientOptions, TransportMode};
use dnswhy::diagnose::OutcomeKind;
use dnswhy::ladder::{self, LadderConfig};
use dnswhy::model::TraceResult;
use dnswhy::tracer::{Tracer, TracerConfig};
use dnswhy::{output, resolvers};

/// Trace DNS delegation and explain resolution failures.
#[derive(Debug, Parser)]
#[command(
    name = "dnswhy",
    version,
    about = "Trace DNS delegation and explain resolution failures.",
    args_conflicts_with_subcommands = true
)]
struct Opts {
    /// Command to execute; without one, the resolver ladder runs.
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    ladder: LadderOpts,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolver ladder trace (default).
    Ladder(LadderOpts),
    /// Authoritative delegation trace (root -> TLD -> authoritative).
    Trace(TraceOpts),
    /// Print version.
    Version,
}

/// Flags shared by both engines.
#[derive(Debug, Args)]
struct CommonOpts {
    /// Fully qualified domain name.
    fqdn: Option<String>,

    /// Record type to query.
    #[arg(value_parser = parse_rrtype, default_value = "A")]
    rrtype: RecordType,

    /// Set the DNSSEC DO bit on outgoing queries.
    #[arg(long)]
    dnssec: bool,

    /// Transport to use for queries: udp, tcp, or auto.
    #[arg(long, value_parser = parse_transport, default_value = "auto")]
    transport: TransportMode,

    /// Time budget per query, e.g. 2s or 500ms.
    #[arg(long, value_parser = parse_duration, default_value = "2s")]
    max_time: Duration,

    /// Output format: pretty or json.
    #[arg(long, value_parser = parse_output, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output; the tracer records every per-server response.
    #[arg(long)]
    verbose: bool,

    /// Enable debug logging (includes raw DNS messages).
    #[arg(long)]
    debug: bool,
}

/// Resolver ladder trace (default).
#[derive(Debug, Args)]
struct LadderOpts {
    #[command(flatten)]
    common: CommonOpts,

    /// Resolver IPs to query (repeatable). If not set, uses system resolvers.
    #[arg(long = "resolver")]
    resolvers: Vec<String>,
}

/// Authoritative delegation trace.
#[derive(Debug, Args)]
struct TraceOpts {
    #[command(flatten)]
    common: CommonOpts,

    /// Maximum delegation hops.
    #[arg(long, default_value_t = 32)]
    max_hops: usize,

    /// Parallel queries per hop.
    #[arg(long, default_value_t = 6)]
    parallelism: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Pretty,
    Json,
}

fn parse_rrtype(value: &str) -> Result<RecordType, String> {
    const SUPPORTED: [&str; 9] = ["A", "AAAA", "CNAME", "TXT", "MX", "NS", "SOA", "SRV", "PTR"];
    let upper = value.to_ascii_uppercase();
    if !SUPPORTED.contains(&upper.as_str()) {
        return Err(format!(
            "unsupported rrtype: {value} (expected one of {})",
            SUPPORTED.join(", ")
        ));
    }
    RecordType::from_str(&upper).map_err(|error| error.to_string())
}

fn parse_transport(value: &str) -> Result<TransportMode, String> {
    TransportMode::from_str(value).map_err(|error| error.to_string())
}

fn parse_output(value: &str) -> Result<OutputFormat, String> {
    match value {
        "pretty" => Ok(OutputFormat::Pretty),
        "json" => Ok(OutputFormat::Json),
        other => Err(format!("unsupported output format: {other}")),
    }
}

/// Parse durations of the `2s` / `500ms` / `1m` shape; a bare number means
/// seconds.
fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let (number, unit) = match value.find(|c: char| c.is_ascii_alphabetic()) {
        Some(index) => value.split_at(index),
        None => (value, "s"),
    };
    let number: f64 = number
        .parse()
        .map_err(|_| format!("invalid duration: {value}"))?;
    if number < 0.0 || !number.is_finite() {
        return Err(format!("invalid duration: {value}"));
    }
    let seconds = match unit {
        "ms" => number / 1_000.0,
        "s" => number,
        "m" => number * 60.0,
        other => return Err(format!("invalid duration unit: {other}")),
    };
    Ok(Duration::from_secs_f64(seconds))
}

/// Configure the tracing subscriber; `RUST_LOG` extends the defaults.
fn logger(verbose: bool, debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else if verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    let mut directives = vec![format!(
        "dnswhy={}",
        level.to_string().to_lowercase()
    )];
    let environment = env::var("RUST_LOG").unwrap_or_default();
    if !environment.is_empty() {
        directives.push(environment);
    }

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::OFF.into())
        .parse(directives.join(","))
        .expect("failed to configure tracing/logging");

    let formatter = tracing_subscriber::fmt::layer().compact();

    tracing_subscriber::registry()
        .with(formatter)
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(error) => {
            let code = match error.kind() {
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = error.print();
            return ExitCode::from(code);
        }
    };

    let code = match opts.command {
        Some(Command::Version) => {
            println!("dnswhy {}", env!("CARGO_PKG_VERSION"));
            0
        }
        Some(Command::Trace(trace_opts)) => run_trace(trace_opts).await,
        Some(Command::Ladder(ladder_opts)) => run_ladder(ladder_opts).await,
        None => run_ladder(opts.ladder).await,
    };
    ExitCode::from(code)
}

async fn run_ladder(opts: LadderOpts) -> u8 {
    let common = opts.common;
    logger(common.verbose, common.debug);
    let Some(fqdn) = common.fqdn.as_deref() else {
        eprintln!("missing required <FQDN> argument");
        return 1;
    };

    let client = Client::new(ClientOptions {
        dnssec: common.dnssec,
        mode: common.transport,
        ..ClientOptions::default()
    });

    let resolvers = if opts.resolvers.is_empty() {
        match resolvers::default_resolver_chain() {
            Ok(resolvers) => resolvers,
            Err(error) => {
                eprintln!("{error}");
                return 1;
            }
        }
    } else {
        opts.resolvers
    };

    let config = LadderConfig {
        timeout: common.max_time,
    };
    match ladder::run(&client, &resolvers, fqdn, common.rrtype, config).await {
        Ok(result) => render(&result, common.output),
        Err(error) => {
            eprintln!("{error}");
            1
        }
    }
}

async fn run_trace(opts: TraceOpts) -> u8 {
    let common = opts.common;
    logger(common.verbose, common.debug);
    let Some(fqdn) = common.fqdn.as_deref() else {
        eprintln!("missing required <FQDN> argument");
        return 1;
    };

    let client = Arc::new(Client::new(ClientOptions {
        dnssec: common.dnssec,
        mode: common.transport,
        ..ClientOptions::default()
    }));

    let tracer = Tracer::new(
        client,
        TracerConfig {
            max_hops: opts.max_hops,
            max_time: common.max_time,
            parallelism: opts.parallelism,
            verbose: common.verbose || common.debug,
        },
    );

    match tracer.trace(fqdn, common.rrtype).await {
        Ok(result) => render(&result, common.output),
        Err(error) => {
            eprintln!("{error}");
            1
        }
    }
}

fn render(result: &TraceResult, format: OutputFormat) -> u8 {
    match format {
        OutputFormat::Json => match output::render_json(result) {
            Ok(document) => println!("{document}"),
            Err(error) => {
                eprintln!("{error}");
                return 1;
            }
        },
        OutputFormat::Pretty => println!("{}", output::render_pretty(result)),
    }

    if result.diagnosis.classification == OutcomeKind::Success {
        0
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_parse_with_units() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert!(parse_duration("2h").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("-1s").is_err());
    }

    #[test]
    fn rrtype_parsing_is_restricted() {
        assert_eq!(parse_rrtype("a").unwrap(), RecordType::A);
        assert_eq!(parse_rrtype("AAAA").unwrap(), RecordType::AAAA);
        assert!(parse_rrtype("DNSKEY").is_err());
    }

    #[test]
    fn cli_parses_default_and_subcommands() {
        let opts = Opts::try_parse_from(["dnswhy", "example.com", "AAAA"]).unwrap();
        assert!(opts.command.is_none());
        assert_eq!(opts.ladder.common.fqdn.as_deref(), Some("example.com"));
        assert_eq!(opts.ladder.common.rrtype, RecordType::AAAA);

        let opts = Opts::try_parse_from([
            "dnswhy",
            "trace",
            "example.com",
            "--max-hops",
            "4",
            "--parallelism",
            "2",
        ])
        .unwrap();
        match opts.command {
            Some(Command::Trace(trace_opts)) => {
                assert_eq!(trace_opts.max_hops, 4);
                assert_eq!(trace_opts.parallelism, 2);
                assert_eq!(trace_opts.common.rrtype, RecordType::A);
            }
            other => panic!("expected trace subcommand, got {other:?}"),
        }

        let opts = Opts::try_parse_from([
            "dnswhy",
            "ladder",
            "example.com",
            "--resolver",
            "1.1.1.1",
            "--resolver",
            "8.8.8.8",
        ])
        .unwrap();
        match opts.command {
            Some(Command::Ladder(ladder_opts)) => {
                assert_eq!(ladder_opts.resolvers.len(), 2);
            }
            other => panic!("expected ladder subcommand, got {other:?}"),
        }
    }
}
