//! # Drifting Blobs
//!
//! Streams ten batches of 2-D points through a Dynamic DP-means model:
//!
//! - blob A drifts steadily to the right,
//! - blob B vanishes for three batches and then reappears near where it left,
//! - blob C shows up halfway through.
//!
//! Watch cluster 0 follow A, cluster 1 go dormant and come back with the same
//! index, and cluster 2 open for C.
//!
//! Run with: `cargo run --example drift`

use ddp_core::{Batch, DdpMeans, DdpParams, Euclidean, ModelSummary};

// ── Deterministic jitter ─────────────────────────────────────────────────────

struct XorShift(u64);

impl XorShift {
    /// Uniform in [-0.5, 0.5).
    fn next(&mut self) -> f64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 >> 11) as f64 / (1u64 << 53) as f64 - 0.5
    }
}

fn blob(rng: &mut XorShift, center: [f64; 2], spread: f64, n: usize, out: &mut Vec<[f64; 2]>) {
    for _ in 0..n {
        out.push([
            center[0] + spread * rng.next(),
            center[1] + spread * rng.next(),
        ]);
    }
}

fn batch_at(rng: &mut XorShift, t: usize) -> Batch {
    let mut points = Vec::new();
    blob(rng, [t as f64 * 0.4, 0.0], 0.6, 12, &mut points);
    if !(3..6).contains(&t) {
        blob(rng, [0.0, 6.0], 0.6, 8, &mut points);
    }
    if t >= 5 {
        blob(rng, [-6.0, -4.0], 0.6, 10, &mut points);
    }
    Batch::from_points(&points).unwrap_or_else(|e| panic!("batch {t}: {e}"))
}

// ── Display helpers ──────────────────────────────────────────────────────────

fn bar(v: f64, max: f64) -> String {
    let filled = ((v / max).clamp(0.0, 1.0) * 20.0).round() as usize;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(20 - filled))
}

fn report(summary: &ModelSummary) {
    println!(
        "  t={:<2} K={} active={} cost={:.3}",
        summary.time_step,
        summary.cluster_count(),
        summary.active_count(),
        summary.cost
    );
    for c in &summary.clusters {
        let (age, weight) = c
            .history
            .map(|h| (h.age, h.weight))
            .unwrap_or((0, 0.0));
        println!(
            "    #{} ({:>6.2}, {:>6.2}) n={:<3} age={} w={:>6.2} {}",
            c.id,
            c.centroid[0],
            c.centroid[1],
            c.count,
            age,
            weight,
            bar(weight, 30.0),
        );
    }
    println!();
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() {
    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  Dynamic DP-means: drifting, vanishing, and new blobs    ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");

    let mut rng = XorShift(0x9e37_79b9_7f4a_7c15);
    let params = DdpParams::new(4.0, 0.5, 0.2);
    let mut model: DdpMeans<Euclidean> =
        DdpMeans::new(batch_at(&mut rng, 0), params).unwrap_or_else(|e| panic!("{e}"));

    for t in 0..10 {
        if t > 0 {
            model
                .next_time_step(batch_at(&mut rng, t))
                .unwrap_or_else(|e| panic!("next_time_step: {e}"));
        }

        let mut passes = 0;
        loop {
            model.update_labels().unwrap_or_else(|e| panic!("{e}"));
            model.update_centers().unwrap_or_else(|e| panic!("{e}"));
            passes += 1;
            if model.has_converged() || passes == 100 {
                break;
            }
        }
        model.update_state().unwrap_or_else(|e| panic!("{e}"));

        println!("▶  batch {t}: {} points, {passes} passes", model.batch().len());
        report(&ModelSummary::from_model(&model));
    }
}
