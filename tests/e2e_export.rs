//! Export sinks: JSON and DOT round-trips through a full pipeline run,
//! plus the CSV table provider when the `csv` feature is on.

use netviz::export::{export_dot, export_json};
use netviz::{Column, EstimatorConfig, Pipeline, PipelineConfig, TableSlice};
use pretty_assertions::assert_eq;

fn run_fixture() -> netviz::Network {
    let table = TableSlice::new(vec![
        Column::new("a", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]),
        Column::new("b", vec![2.0, 1.0, 4.0, 3.0, 6.0, 5.0, 8.0, 7.0]),
        Column::new("c", vec![1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0]),
    ])
    .unwrap();
    Pipeline::new(PipelineConfig {
        estimator: EstimatorConfig::Threshold { cutoff: 0.5 },
        layout_seed: Some(9),
        ..Default::default()
    })
    .run(&table, &["a", "b", "c"])
    .unwrap()
}

#[test]
fn test_json_export_covers_the_whole_network() {
    let network = run_fixture();
    let mut buf = Vec::new();
    export_json(&network, &mut buf).unwrap();

    let doc: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    let nodes = doc["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 3);
    for node in nodes {
        assert!(node["x"].is_f64() || node["x"].is_i64());
        assert!(node["score"].as_f64().unwrap() >= 0.0);
    }
    assert_eq!(doc["edges"].as_array().unwrap().len(), network.graph.edge_count());
}

#[test]
fn test_json_export_carries_degradation_warning() {
    let table = TableSlice::new(vec![
        Column::new("a", vec![1.0, 2.0, 3.0, 4.0]),
        Column::new("b", vec![4.0, 3.0, 1.0, 2.0]),
    ])
    .unwrap();
    let network = Pipeline::new(PipelineConfig {
        estimator: EstimatorConfig::Regularized {
            sparsity_penalty: 1.0,
            gamma: 0.2,
            tuning_ratio: 0.05,
            refit: true,
            deadline_ms: Some(0),
        },
        layout_seed: Some(1),
        ..Default::default()
    })
    .run(&table, &["a", "b"])
    .unwrap();
    assert!(network.warning.is_some());

    let mut buf = Vec::new();
    export_json(&network, &mut buf).unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    assert!(doc["warning"]["reason"].is_string());
}

#[test]
fn test_dot_export_pins_positions() {
    let network = run_fixture();
    let mut buf = Vec::new();
    export_dot(&network, &mut buf).unwrap();

    let text = String::from_utf8(buf).unwrap();
    assert!(text.starts_with("graph network {"));
    for node in network.graph.nodes() {
        assert!(text.contains(&format!("\"{node}\"")));
    }
    assert!(text.contains("pos=\""));
    assert!(text.contains(" -- "));
}

#[test]
fn test_network_round_trips_through_serde() {
    let network = run_fixture();
    let json = serde_json::to_string(&network).unwrap();
    let back: netviz::Network = serde_json::from_str(&json).unwrap();
    assert_eq!(back, network);
}

#[cfg(feature = "csv")]
mod csv_provider {
    use super::*;
    use netviz::loader::load_csv;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
id,stress,fatigue,focus
p1,3.0,4.0,2.0
p2,1.0,2.0,4.0
p3,4.0,5.0,1.0
p4,2.0,2.5,3.0
";

    #[test]
    fn test_csv_to_network() {
        let table = load_csv(SAMPLE.as_bytes()).unwrap();
        let network = Pipeline::new(PipelineConfig {
            layout_seed: Some(2),
            ..Default::default()
        })
        .run(&table, &["stress", "fatigue", "focus"])
        .unwrap();
        assert_eq!(network.graph.node_count(), 3);
        assert_eq!(network.layout.len(), 3);
    }
}
