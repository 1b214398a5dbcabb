//! Provider call metrics

use std::future::Future;
use std::time::Instant;

use coach_core::Result;

/// Await a provider call, recording its latency and any failure by kind
pub(crate) async fn timed<T, Fut>(capability: &'static str, call: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let result = call.await;

    metrics::histogram!("coach_provider_latency_seconds", "capability" => capability)
        .record(started.elapsed().as_secs_f64());
    if let Err(e) = &result {
        metrics::counter!(
            "coach_provider_errors_total",
            "capability" => capability,
            "kind" => e.kind()
        )
        .increment(1);
    }
    result
}
