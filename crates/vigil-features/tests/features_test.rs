//! Runs every scenario against the in-process engine.

use vigil_engine::{Engine, EngineConfig, LocalNetwork};
use vigil_harness::{Harness, HarnessConfig, Outcome};
use vigil_types::{Capabilities, Capability};

fn harness(config: EngineConfig) -> (Harness, Engine, LocalNetwork) {
    let engine = Engine::new(config);
    let harness_config = HarnessConfig::default();
    let network = LocalNetwork::new();
    network.register(harness_config.connection.endpoint.clone(), &engine);
    (Harness::new(engine.clone(), harness_config), engine, network)
}

#[tokio::test]
async fn test_all_features_pass() {
    let (harness, engine, network) = harness(EngineConfig::default());
    let summary = harness.run(vigil_features::all().unwrap()).await;

    for report in &summary.reports {
        assert!(
            report.outcome.is_passed(),
            "{} did not pass: {}",
            report.name,
            report.outcome
        );
    }
    assert_eq!(summary.passed(), 6);
    // The self-update activity dialled once and released its connection.
    assert_eq!(network.connections_opened(), 1);
    assert_eq!(network.live_connections(), 0);
    assert_eq!(engine.run_count(), 6);
}

#[tokio::test]
async fn test_update_features_skip_without_updates() {
    let (harness, engine, network) = harness(EngineConfig {
        capabilities: Capabilities::all().without(Capability::Updates),
        ..Default::default()
    });
    let summary = harness.run(vigil_features::all().unwrap()).await;

    assert!(summary.success(), "{summary}");
    assert_eq!(summary.skipped(), 3);
    assert_eq!(summary.passed(), 3);
    for name in ["update/basic", "update/basic_async", "update/self"] {
        let report = summary.report(name).unwrap();
        assert_eq!(
            report.outcome,
            Outcome::Skipped {
                reason: "server does not support updates".into()
            }
        );
    }
    assert_eq!(network.connections_opened(), 0);
    // Skipped scenarios never reach the engine.
    assert_eq!(engine.run_count(), 3);
}

#[tokio::test]
async fn test_filtered_run() {
    let (harness, _engine, _network) = harness(EngineConfig::default());
    let summary = harness
        .run(vigil_features::matching("signal/").unwrap())
        .await;
    assert_eq!(summary.total(), 2);
    assert!(summary.success(), "{summary}");
}
