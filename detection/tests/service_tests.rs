mod mocks;

use chrono::{NaiveDate, Utc};
use common::config::Config;
use detection::keywords::KeywordsConfig;
use detection::model::{DateRange, DetectionError, RiskLevel, Severity};
use detection::semantic::SemanticMatcher;
use detection::service::DetectionService;
use mocks::{MockAnalytics, search_row};
use std::sync::{Arc, Mutex};

fn test_config() -> Config {
    serde_yml::from_str(
        r#"
analytics:
  base_url: "https://analytics.example.com/v1/"
  site_url: "https://benefits.example.gov"
  api_token: "test-token"
  page_delay_ms: 0
detection:
  similarity_threshold: 0.8
"#,
    )
    .expect("test config parses")
}

fn service_with(analytics: MockAnalytics) -> DetectionService {
    DetectionService::new(
        Arc::new(analytics),
        Arc::new(SemanticMatcher::disabled()),
        KeywordsConfig::default(),
        &test_config(),
    )
}

fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
    DateRange {
        start: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
        end: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
    }
}

#[tokio::test]
async fn detect_scams_flags_and_summarizes() {
    common::init_test_tracing();
    let mut analytics = MockAnalytics::new();
    analytics.expect_query().returning(|_| {
        Ok(vec![
            search_row("gift card payment to tax agency", 120, 2, 3.0),
            search_row("benefit office opening hours", 400, 80, 1.5),
            search_row("pension contribution rates", 250, 30, 4.0),
        ])
    });

    let report = service_with(analytics)
        .detect_scams(range((2026, 8, 1), (2026, 8, 28)))
        .await
        .expect("analysis should succeed");

    assert_eq!(report.flagged_terms.len(), 1);
    let flagged = &report.flagged_terms[0];
    assert_eq!(flagged.query, "gift card payment to tax agency");
    assert_eq!(flagged.severity, Severity::Critical);
    assert_eq!(report.summary.critical, 1);
    assert_eq!(report.summary.total, 1);
}

#[tokio::test]
async fn invalid_date_range_is_a_validation_error() {
    let analytics = MockAnalytics::new();
    let error = service_with(analytics)
        .detect_scams(range((2026, 8, 28), (2026, 8, 1)))
        .await
        .expect_err("reversed range must fail validation");
    assert!(matches!(error, DetectionError::InvalidDateRange(_)));
}

#[tokio::test]
async fn source_failure_degrades_to_empty_report() {
    let mut analytics = MockAnalytics::new();
    analytics
        .expect_query()
        .returning(|_| Err("analytics unavailable".into()));

    let report = service_with(analytics)
        .detect_scams(range((2026, 8, 1), (2026, 8, 28)))
        .await
        .expect("source failure is a warning, not an error");
    assert!(report.flagged_terms.is_empty());
    assert_eq!(report.summary.total, 0);
}

#[tokio::test]
async fn emerging_threats_ranks_suspicious_new_queries() {
    let mut analytics = MockAnalytics::new();
    // The benchmark lookback is the only long request; the current period is
    // the short window ending today, the previous period the one before it.
    analytics.expect_query().returning(|request| {
        let span = (request.end_date - request.start_date).num_days();
        if span > 30 {
            return Ok((0..30)
                .map(|i| search_row(&format!("historical query {i}"), 200, 40, 2.0))
                .collect());
        }
        if (Utc::now().date_naive() - request.end_date).num_days() <= 1 {
            Ok(vec![
                search_row("irs gift card payment urgent", 150, 1, 2.0),
                search_row("benefit office address", 80, 20, 1.8),
            ])
        } else {
            Ok(vec![search_row("benefit office address", 75, 19, 1.8)])
        }
    });

    let report = service_with(analytics)
        .get_emerging_threats(7, 1)
        .await
        .expect("analysis should succeed");

    assert_eq!(report.threats.len(), 1);
    let threat = &report.threats[0];
    assert_eq!(threat.query, "irs gift card payment urgent");
    assert!(threat.is_new);
    assert!(threat.ctr_anomaly.is_anomalous);
    assert!(
        threat.matched_patterns.iter().any(|p| p.contains("urgency")),
        "patterns: {:?}",
        threat.matched_patterns
    );
    assert!(matches!(
        threat.risk_level,
        RiskLevel::High | RiskLevel::Critical
    ));
    assert_eq!(report.pagination.page, 1);
    assert_eq!(report.summary.total, 1);
}

#[tokio::test]
async fn comparison_windows_cover_equal_adjacent_date_spans() {
    let requests: Arc<Mutex<Vec<(NaiveDate, NaiveDate)>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&requests);
    let mut analytics = MockAnalytics::new();
    analytics.expect_query().returning(move |request| {
        recorded
            .lock()
            .unwrap()
            .push((request.start_date, request.end_date));
        Ok(Vec::new())
    });

    service_with(analytics)
        .get_emerging_threats(7, 1)
        .await
        .expect("analysis should succeed");

    // Date bounds are inclusive; ignore the long benchmark lookback request.
    let requests = requests.lock().unwrap();
    let windows: Vec<(NaiveDate, NaiveDate)> = requests
        .iter()
        .copied()
        .filter(|(start, end)| (*end - *start).num_days() < 30)
        .collect();
    assert_eq!(windows.len(), 2);
    for (start, end) in &windows {
        assert_eq!((*end - *start).num_days() + 1, 7, "window {start}..{end}");
    }
    let earliest = windows.iter().map(|(start, _)| *start).min().unwrap();
    let latest = windows.iter().map(|(_, end)| *end).max().unwrap();
    assert_eq!((latest - earliest).num_days() + 1, 14);
}

#[tokio::test]
async fn zero_day_window_is_rejected() {
    let analytics = MockAnalytics::new();
    let error = service_with(analytics)
        .get_emerging_threats(0, 1)
        .await
        .expect_err("zero-day window is invalid");
    assert!(matches!(error, DetectionError::InvalidDateRange(_)));
}

#[tokio::test]
async fn benchmarks_are_cached_between_calls() {
    let mut analytics = MockAnalytics::new();
    analytics.expect_query().times(1).returning(|_| {
        Ok((0..20)
            .map(|i| search_row(&format!("historical query {i}"), 100, 15, 2.0))
            .collect())
    });

    let service = service_with(analytics);
    let first = service.calculate_benchmarks(90, 10).await;
    let second = service.calculate_benchmarks(90, 10).await;

    assert_eq!(first, second);
    let top = first
        .iter()
        .find(|b| b.position_range.to_string() == "1-3")
        .unwrap();
    assert_eq!(top.sample_size, 20);
}

#[tokio::test]
async fn benchmark_fetch_failure_falls_back_to_static_defaults() {
    let mut analytics = MockAnalytics::new();
    analytics
        .expect_query()
        .returning(|_| Err("quota exceeded".into()));

    let service = service_with(analytics);
    let benchmarks = service.calculate_benchmarks(90, 10).await;
    assert_eq!(benchmarks.len(), 4);
    for benchmark in &benchmarks {
        assert_eq!(benchmark.sample_size, 0);
        assert!(benchmark.min <= benchmark.expected && benchmark.expected <= benchmark.max);
    }
}
