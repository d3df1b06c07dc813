//! Serde round-trip tests for parameters and model summaries.
//!
//! Run with: `cargo test --features serde`

#![cfg(feature = "serde")]

use ddp_core::{Batch, ClusterHistory, DdpMeans, DdpParams, Euclidean, ModelSummary};

// ─── helpers ─────────────────────────────────────────────────────────────────

fn committed_model() -> DdpMeans<Euclidean> {
    let batch = Batch::from_points(&[[0.0, 0.0], [0.2, 0.0], [6.0, 6.0]]).unwrap();
    let mut model = DdpMeans::new(batch, DdpParams::new(1.0, 0.1, 0.5)).unwrap();
    for _ in 0..20 {
        model.update_labels().unwrap();
        model.update_centers().unwrap();
        if model.has_converged() {
            break;
        }
    }
    model.update_state().unwrap();
    model
}

// ─── tests ───────────────────────────────────────────────────────────────────

#[test]
fn test_params_json_round_trip() {
    let params = DdpParams::new(4.0, 0.25, 0.5);
    let json = serde_json::to_string(&params).unwrap();
    assert!(json.contains("\"lambda\":4.0"));

    let back: DdpParams = serde_json::from_str(&json).unwrap();
    assert_eq!(back, params);
}

#[test]
fn test_history_json_round_trip() {
    let history = ClusterHistory { age: 3, weight: 1.75 };
    let json = serde_json::to_string(&history).unwrap();
    assert_eq!(json, r#"{"age":3,"weight":1.75}"#);
    let back: ClusterHistory = serde_json::from_str(&json).unwrap();
    assert_eq!(back, history);
}

#[test]
fn test_summary_json_round_trip() {
    let model = committed_model();
    let summary = ModelSummary::from_model(&model);
    assert_eq!(summary.cluster_count(), 2);
    assert!(summary.cost.is_finite() && summary.prev_cost.is_finite());

    let json = serde_json::to_string_pretty(&summary).unwrap();
    let back: ModelSummary = serde_json::from_str(&json).unwrap();
    assert_eq!(back, summary);
    assert_eq!(back.metric, "euclidean");
    assert_eq!(back.find_cluster(0).unwrap().count, 2);
}

#[test]
fn test_summary_after_swap_marks_new_clusters() {
    let mut model = committed_model();
    model
        .next_time_step(Batch::from_points(&[[-9.0, 4.0]]).unwrap())
        .unwrap();
    model.update_labels().unwrap();
    model.update_centers().unwrap();

    let summary = ModelSummary::from_model(&model);
    let json = serde_json::to_value(&summary).unwrap();
    let clusters = json["clusters"].as_array().unwrap();
    assert_eq!(clusters.len(), 3);
    assert!(clusters[2]["history"].is_null());
    assert_eq!(clusters[0]["history"]["age"], 1);
}
