//! Run command - execute conformance features against an in-process engine.

use anyhow::{Result, bail};
use clap::Args;
use tracing::{info, warn};
use vigil_config::VigilConfig;
use vigil_engine::{Engine, EngineConfig, LocalNetwork};
use vigil_harness::{Feature, Harness, HarnessConfig, Outcome, RunSummary};
use vigil_types::{Capabilities, Capability};

use super::Context;

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Only run features whose name contains one of these patterns
    #[arg(short, long)]
    pub filter: Vec<String>,

    /// Features run at the same time (overrides config)
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Run the engine without update support
    #[arg(long)]
    pub no_updates: bool,

    /// Skip the post-run replay check
    #[arg(long)]
    pub no_replay: bool,
}

/// Run the run command.
pub async fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let features = select_features(&args.filter)?;
    if features.is_empty() {
        bail!("No features match {:?}", args.filter);
    }

    let (engine_config, harness_config) = resolve(&loaded.config, &args);
    let engine = Engine::new(engine_config);

    // Activities that dial the configured endpoint reach this engine.
    let network = LocalNetwork::new();
    network.register(harness_config.connection.endpoint.clone(), &engine);

    let harness = Harness::new(engine, harness_config);
    let cancel = harness.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling features in flight");
            cancel.cancel();
        }
    });

    let summary = harness.run(features).await;
    info!(
        connections_opened = network.connections_opened(),
        "Run complete"
    );

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, ctx.verbose);
    }

    if !summary.success() {
        bail!("{} feature(s) failed", summary.failed());
    }
    Ok(())
}

fn select_features(filters: &[String]) -> Result<Vec<Feature>> {
    let all = vigil_features::all()?;
    if filters.is_empty() {
        return Ok(all);
    }
    Ok(all
        .into_iter()
        .filter(|f| filters.iter().any(|p| f.name().contains(p.as_str())))
        .collect())
}

fn resolve(config: &VigilConfig, args: &RunArgs) -> (EngineConfig, HarnessConfig) {
    let client = config.client();
    let harness = config.harness();
    let engine = config.engine();

    let mut capabilities = Capabilities::all();
    if !engine.updates_enabled || args.no_updates {
        capabilities = capabilities.without(Capability::Updates);
    }

    let engine_config = EngineConfig {
        namespace: client.namespace.clone(),
        capabilities,
        workflow_task_poll_limit: engine.workflow_task_poll_limit,
    };
    let harness_config = HarnessConfig {
        task_queue_prefix: harness.task_queue_prefix.clone(),
        concurrency: args.concurrency.unwrap_or(harness.concurrency).max(1),
        feature_timeout: harness.feature_timeout(),
        execution_timeout: harness.execution_timeout(),
        replay_check: harness.replay_check && !args.no_replay,
        connection: client.connection_material(),
    };
    (engine_config, harness_config)
}

fn print_summary(summary: &RunSummary, verbose: bool) {
    for report in &summary.reports {
        let status = match &report.outcome {
            Outcome::Passed => "PASS",
            Outcome::Failed { .. } => "FAIL",
            Outcome::Skipped { .. } => "SKIP",
        };
        println!("{status}  {:<24} {:>6}ms", report.name, report.duration_ms);
        match &report.outcome {
            Outcome::Failed { error } => println!("      {error}"),
            Outcome::Skipped { reason } => println!("      {reason}"),
            Outcome::Passed if verbose => println!("      task queue: {}", report.task_queue),
            Outcome::Passed => {}
        }
    }
    println!();
    println!("{summary}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RunArgs {
        RunArgs {
            filter: Vec::new(),
            concurrency: None,
            no_updates: false,
            no_replay: false,
        }
    }

    #[test]
    fn test_resolve_defaults() {
        let (engine, harness) = resolve(&VigilConfig::default(), &args());
        assert_eq!(engine.namespace, "default");
        assert!(engine.capabilities.supports(Capability::Updates));
        assert_eq!(harness.concurrency, 4);
        assert!(harness.replay_check);
        assert_eq!(harness.connection.endpoint, "localhost:7233");
    }

    #[test]
    fn test_flags_override_config() {
        let args = RunArgs {
            concurrency: Some(1),
            no_updates: true,
            no_replay: true,
            ..args()
        };
        let (engine, harness) = resolve(&VigilConfig::default(), &args);
        assert!(!engine.capabilities.supports(Capability::Updates));
        assert_eq!(harness.concurrency, 1);
        assert!(!harness.replay_check);
    }

    #[test]
    fn test_select_features() {
        assert_eq!(select_features(&[]).unwrap().len(), 6);
        let updates = select_features(&["update/".to_string()]).unwrap();
        assert_eq!(updates.len(), 3);
        let two = select_features(&["signal/basic".into(), "binary".into()]).unwrap();
        assert_eq!(two.len(), 2);
    }
}
