use std::time::Instant;

use crate::matcher::Matcher;
use crate::model::Target;
use crate::scan::{apply_default_selection, retain_active, sort_targets};

fn p95_ms(samples: &mut [f64]) -> f64 {
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let last = samples.len().saturating_sub(1);
    let idx = ((last as f64) * 0.95).round() as usize;
    samples[idx.min(last)]
}

fn fixture() -> Vec<Target> {
    (0..10_000)
        .map(|i| match i % 3 {
            0 => Target::process(
                &format!("worker_{i:05}"),
                &format!("Worker {i}"),
                format!("PID: {i}"),
            ),
            1 => Target::service(
                &format!("svc_{i:05}"),
                &format!("Service {i} Update Agent"),
                "Status: Running".to_string(),
                i % 2 == 0,
            ),
            _ => Target::scheduled_task(
                &format!("\\Vendor\\Task_{i:05}"),
                "Status: Ready".to_string(),
                i % 5 == 0,
            ),
        })
        .collect()
}

#[test]
fn match_filter_and_order_p95_under_150ms() {
    let base = fixture();
    let matcher = Matcher::compile(r#"update "worker_0" task_1"#).unwrap();

    let run = || {
        let mut targets: Vec<Target> = base
            .iter()
            .filter(|t| matcher.is_match(&format!("{} {}", t.name, t.display_name)))
            .cloned()
            .collect();
        retain_active(&mut targets);
        sort_targets(&mut targets);
        apply_default_selection(&mut targets);
        targets.len()
    };

    for _ in 0..5 {
        let _ = run();
    }

    let mut samples = Vec::with_capacity(40);
    for _ in 0..40 {
        let start = Instant::now();
        let _ = run();
        samples.push(start.elapsed().as_secs_f64() * 1000.0);
    }

    let p95 = p95_ms(&mut samples);
    assert!(p95 <= 150.0, "p95 too high: {p95:.3}ms (budget 150.0ms)");
}
