use crate::model::{CtrBenchmark, PositionBucket, QueryMetric};
use std::collections::HashMap;

pub const DEFAULT_LOOKBACK_DAYS: u32 = 90;
pub const DEFAULT_MIN_IMPRESSIONS: u64 = 10;

/// Industry-default {min, expected} CTR per bucket, used when a bucket has
/// no samples. `max` is derived as expected * 1.5.
const STATIC_DEFAULTS: [(PositionBucket, f64, f64); 4] = [
    (PositionBucket::TopThree, 0.03, 0.20),
    (PositionBucket::FourToEight, 0.02, 0.10),
    (PositionBucket::NineToFifteen, 0.01, 0.05),
    (PositionBucket::SixteenPlus, 0.005, 0.02),
];

/// The full static fallback set, `sample_size = 0` on every bucket so
/// callers can tell assumed baselines from measured ones.
pub fn static_benchmarks() -> Vec<CtrBenchmark> {
    STATIC_DEFAULTS
        .iter()
        .map(|&(position_range, min, expected)| CtrBenchmark {
            position_range,
            min,
            expected,
            max: expected * 1.5,
            sample_size: 0,
        })
        .collect()
}

/// Derive CTR percentile baselines per position bucket from historical
/// metrics. Queries below `min_impressions` are too noisy to inform the
/// baseline and are skipped. Buckets without samples fall back to the static
/// defaults.
pub fn compute_benchmarks(metrics: &[QueryMetric], min_impressions: u64) -> Vec<CtrBenchmark> {
    let mut ctrs_by_bucket: HashMap<PositionBucket, Vec<f64>> = HashMap::new();

    for metric in metrics {
        if metric.impressions < min_impressions {
            continue;
        }
        ctrs_by_bucket
            .entry(PositionBucket::for_position(metric.position))
            .or_default()
            .push(metric.ctr);
    }

    PositionBucket::all()
        .iter()
        .map(|&bucket| match ctrs_by_bucket.get_mut(&bucket) {
            Some(ctrs) if !ctrs.is_empty() => {
                ctrs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                CtrBenchmark {
                    position_range: bucket,
                    min: percentile(ctrs, 0.10),
                    expected: percentile(ctrs, 0.50),
                    max: percentile(ctrs, 0.90),
                    sample_size: ctrs.len(),
                }
            }
            _ => {
                tracing::debug!(bucket = %bucket, "no samples, using static default benchmark");
                static_default(bucket)
            }
        })
        .collect()
}

/// Find the benchmark covering an average position. Falls back to the static
/// default when the bucket is absent from the supplied set.
pub fn benchmark_for_position(benchmarks: &[CtrBenchmark], position: f64) -> CtrBenchmark {
    let bucket = PositionBucket::for_position(position);
    benchmarks
        .iter()
        .find(|benchmark| benchmark.position_range == bucket)
        .cloned()
        .unwrap_or_else(|| static_default(bucket))
}

fn static_default(bucket: PositionBucket) -> CtrBenchmark {
    let (min, expected) = STATIC_DEFAULTS
        .iter()
        .find(|(b, _, _)| *b == bucket)
        .map(|&(_, min, expected)| (min, expected))
        // STATIC_DEFAULTS covers every bucket variant.
        .unwrap_or((0.005, 0.02));
    CtrBenchmark {
        position_range: bucket,
        min,
        expected,
        max: expected * 1.5,
        sample_size: 0,
    }
}

/// Percentile by linear interpolation over sorted values.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let fraction = rank - lower as f64;
    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}
