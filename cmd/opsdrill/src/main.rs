// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! opsdrill binary entry point.
//!
//! The single place where errors become process exit codes: every drill
//! error class maps to a stable non-zero code, and a passing run prints
//! a final `PASS` line and exits 0.

mod cli;

use std::sync::Arc;

use clap::Parser;

use cli::{Cli, Command, ReportFormat, RunOptions, TargetOptions, VersionCheckOptions};
use opsdrill_core::{DrillConfig, DrillError, NodeName, Result};
use opsdrill_drill::DrillRunner;
use opsdrill_inject::{CommandChannel, LocalChannel, SshChannel};
use opsdrill_probe::{EndpointProber, ReachabilityChain, VersionVerifier};

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    let code = match runtime.block_on(execute(cli.command)) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "drill command failed");
            eprintln!("error: {e}");
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn execute(command: Command) -> Result<()> {
    match command {
        Command::Run(options) => run_drill(options).await,
        Command::Probe(options) => probe(options).await,
        Command::VersionCheck(options) => version_check(options).await,
    }
}

fn channel_for(node: NodeName, ssh: Option<&String>, config: &DrillConfig) -> Arc<dyn CommandChannel> {
    match ssh {
        Some(destination) => Arc::new(SshChannel::new(
            node,
            destination.clone(),
            config.timing.connect_timeout,
        )),
        None => Arc::new(LocalChannel::new(node)),
    }
}

async fn run_drill(options: RunOptions) -> Result<()> {
    let config = options.resolve()?;

    let dependency_channel = channel_for(config.dependency.node, options.ssh_db.as_ref(), &config);
    let target_channel = channel_for(config.target.node, options.ssh_app.as_ref(), &config);

    let runner = DrillRunner::new(config, dependency_channel, target_channel)?;
    let outcome = runner.run().await;

    match options.report {
        ReportFormat::Text => print!("{}", outcome.report.render()),
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&outcome.report)
                .map_err(|e| DrillError::http(format!("report serialization failed: {e}")))?;
            println!("{json}");
        }
    }

    match outcome.error {
        None => Ok(()),
        Some(error) => Err(error),
    }
}

async fn probe(options: TargetOptions) -> Result<()> {
    let config = options.resolve()?;

    let chain = ReachabilityChain::standard(&config.timing);
    let provider = chain
        .verify(&config.target.host, config.target.port)
        .await?;
    println!("transport {} reachable (via {provider})", config.target.addr());

    let prober = EndpointProber::new(
        &config.target,
        config.endpoints.clone(),
        &config.timing,
        config.readiness_contract,
    )?;
    let (liveness, readiness) = prober.snapshot().await;
    for record in [&liveness, &readiness] {
        let observed = record
            .observed
            .map_or_else(|| "no response".to_string(), |c| c.to_string());
        println!("{} {} ({}ms)", record.endpoint, observed, record.latency_ms);
    }
    Ok(())
}

async fn version_check(options: VersionCheckOptions) -> Result<()> {
    let config = options.target.resolve()?;

    let verifier = VersionVerifier::new(
        &config.target,
        &config.endpoints.version_path,
        &config.timing,
        options.expect_service.clone(),
    )?;
    let info = verifier.verify().await?;

    println!(
        "service '{}' version {} ({})",
        info.service,
        info.version,
        info.env.as_deref().unwrap_or("unknown env"),
    );
    println!("PASS");
    Ok(())
}
