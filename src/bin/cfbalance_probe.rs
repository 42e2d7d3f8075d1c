//! cfbalance-probe - run one selection against the statistics daemon
//!
//! Usage:
//!   cfbalance-probe [--config <path>] [--json] [--trace]
//!
//! Without `--config`, settings come from CFBALANCE_HOST / CFBALANCE_PORT /
//! CFBALANCE_TIMEOUT_MS. Exit status is non-zero when no target was selected.

use anyhow::{bail, Context};
use cfbalance::telemetry::{CompositeTraceSink, DebugLog, LogTraceSink};
use cfbalance::{BalancerConfig, Selector};
use std::sync::Arc;

struct Args {
    config: Option<String>,
    json: bool,
    trace: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        config: None,
        json: false,
        trace: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                args.config = Some(it.next().context("--config needs a path")?);
            }
            "--json" => args.json = true,
            "--trace" => args.trace = true,
            "help" | "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "version" | "--version" | "-V" => {
                println!("cfbalance-probe {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            other => bail!("Unknown argument: {other}"),
        }
    }
    Ok(args)
}

fn print_usage() {
    println!(
        r#"cfbalance-probe - ask the statistics daemon which node should serve next

USAGE:
    cfbalance-probe [OPTIONS]

OPTIONS:
    -c, --config <path>     YAML config file
    --json                  Print the scored pool snapshot as JSON
    --trace                 Print the debug trace buffer after the run
    -h, --help              Show this help message

ENVIRONMENT:
    CFBALANCE_HOST          Daemon host (default localhost)
    CFBALANCE_PORT          Daemon port (default 44444)
    CFBALANCE_TIMEOUT_MS    Read timeout in ms (default 1000)
    RUST_LOG                Log filter"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => BalancerConfig::from_yaml_file(path)?,
        None => BalancerConfig::from_env()?,
    };

    let debug_log = Arc::new(DebugLog::default());
    let sink = CompositeTraceSink::new()
        .add_sink(debug_log.clone())
        .add_sink(Arc::new(LogTraceSink));
    let selector = Selector::builder()
        .config(config)
        .trace_sink(Arc::new(sink))
        .build()?;

    let outcome = if args.json {
        match selector.snapshot().await {
            Ok(snapshot) => {
                let decision = snapshot.decide(selector.policy());
                let report = serde_json::json!({
                    "snapshot": snapshot,
                    "target": decision.as_ref().ok(),
                    "error": decision.as_ref().err().map(|e| e.to_string()),
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
                decision.map(|_| ())
            }
            Err(e) => Err(e),
        }
    } else {
        selector.select_target().await.map(|target| println!("{}", target))
    };

    if args.trace {
        eprintln!("{}", debug_log.render(true));
    }

    outcome.context("no target selected")?;
    Ok(())
}
