//! Property tests for the bookkeeping every step must preserve.
//!
//! Random batch streams in the unit square are driven through the full
//! label/center/commit loop; the properties are checked after every pass.

use ddp_core::{Batch, Choice, DdpMeans, DdpParams, Euclidean, Spherical};
use proptest::prelude::*;

// ─── generators ──────────────────────────────────────────────────────────────

fn arb_points() -> impl Strategy<Value = Vec<Vec<f64>>> {
    prop::collection::vec(prop::collection::vec(-1.0f64..1.0, 2), 0..24)
}

fn arb_stream() -> impl Strategy<Value = Vec<Vec<Vec<f64>>>> {
    prop::collection::vec(arb_points(), 1..5)
}

fn arb_params() -> impl Strategy<Value = DdpParams> {
    (0.05f64..2.0, 0.0f64..0.5, 0.0f64..1.0)
        .prop_map(|(lambda, q, tau)| DdpParams::new(lambda, q, tau))
}

fn to_batch(points: &[Vec<f64>]) -> Batch {
    if points.is_empty() {
        Batch::empty(2).unwrap()
    } else {
        Batch::from_points(points).unwrap()
    }
}

// ─── properties ──────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_counts_cover_batch_and_k_never_shrinks(
        stream in arb_stream(),
        params in arb_params(),
    ) {
        let mut model: DdpMeans<Euclidean> = DdpMeans::new(to_batch(&stream[0]), params).unwrap();
        let mut last_k = 0usize;

        for (t, points) in stream.iter().enumerate() {
            if t > 0 {
                model.next_time_step(to_batch(points)).unwrap();
            }
            for _ in 0..50 {
                model.update_labels().unwrap();

                let k = model.cluster_count();
                prop_assert!(k >= last_k);
                last_k = k;
                prop_assert_eq!(model.counts().iter().sum::<usize>(), points.len());
                for label in model.labels() {
                    prop_assert!(matches!(label, Some(j) if *j < k));
                }

                let counts = model.counts().to_vec();
                model.update_centers().unwrap();
                prop_assert_eq!(model.counts(), &counts[..]);
                prop_assert_eq!(model.cluster_count(), k);

                if model.has_converged() {
                    break;
                }
            }
            model.update_state().unwrap();

            prop_assert_eq!(model.committed_cluster_count(), model.cluster_count());
            for k in 0..model.cluster_count() {
                let h = model.history(k).unwrap();
                prop_assert!(h.age >= 1);
                prop_assert!(h.weight.is_finite());
            }
        }
    }

    #[test]
    fn prop_far_point_spawns_at_itself(
        stream in arb_stream(),
        params in arb_params(),
        far in prop::collection::vec(500.0f64..1000.0, 2),
    ) {
        let mut model: DdpMeans<Euclidean> = DdpMeans::new(to_batch(&stream[0]), params).unwrap();
        for (t, points) in stream.iter().enumerate() {
            if t > 0 {
                model.next_time_step(to_batch(points)).unwrap();
            }
            for _ in 0..50 {
                model.update_labels().unwrap();
                model.update_centers().unwrap();
                if model.has_converged() {
                    break;
                }
            }
            model.update_state().unwrap();
        }

        let k = model.cluster_count();
        prop_assert_eq!(model.closest_cluster(&far).unwrap().0, Choice::NewCluster);

        model.next_time_step(Batch::from_points(&[far.clone()]).unwrap()).unwrap();
        model.update_labels().unwrap();
        prop_assert_eq!(model.cluster_count(), k + 1);
        prop_assert_eq!(model.labels(), &[Some(k)][..]);
        prop_assert_eq!(model.centroid(k).unwrap(), &far[..]);
    }

    #[test]
    fn prop_spherical_centroids_stay_unit_length(
        points in prop::collection::vec(prop::collection::vec(0.1f64..1.0, 3), 1..16),
        lambda in 0.5f64..0.99,
    ) {
        let batch = Batch::from_points(&points).unwrap();
        let mut model: DdpMeans<Spherical> =
            DdpMeans::new(batch, DdpParams::new(lambda, 0.0, 1.0)).unwrap();
        for _ in 0..50 {
            model.update_labels().unwrap();
            model.update_centers().unwrap();
            if model.has_converged() {
                break;
            }
        }
        // Spawned clusters sit at their raw seed point until they are recomputed.
        for k in (0..model.cluster_count()).filter(|&k| model.counts()[k] > 0) {
            let c = model.centroid(k).unwrap();
            let norm = c.iter().map(|x| x * x).sum::<f64>().sqrt();
            prop_assert!((norm - 1.0).abs() < 1e-6, "cluster {} norm {}", k, norm);
        }
    }
}
