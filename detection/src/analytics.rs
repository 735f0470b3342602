use crate::model::{DetectionError, GenericError, QueryMetric};
use async_trait::async_trait;
use chrono::NaiveDate;
use common::config::AnalyticsConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// One page request against the analytics source.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQueryRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub dimensions: Vec<String>,
    pub row_limit: u32,
    pub start_row: u32,
}

/// One analytics row, already aggregated by its primary dimension key.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchRow {
    pub keys: Vec<String>,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}

impl SearchRow {
    /// Lift a row into a per-query metric; the query key is normalized to
    /// trimmed lowercase so duplicate spellings aggregate together.
    pub fn into_metric(self) -> QueryMetric {
        let query = self
            .keys
            .first()
            .map(|key| key.trim().to_lowercase())
            .unwrap_or_default();
        QueryMetric {
            query,
            impressions: self.impressions,
            clicks: self.clicks,
            ctr: self.ctr,
            position: self.position,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchQueryResponse {
    #[serde(default)]
    rows: Vec<SearchRow>,
}

/// Read-only search analytics collaborator.
#[async_trait]
pub trait AnalyticsSource: Send + Sync {
    async fn query(&self, request: SearchQueryRequest) -> Result<Vec<SearchRow>, GenericError>;
}

/// Production client for the search analytics API.
pub struct SearchAnalyticsClient {
    client: reqwest::Client,
    query_url: Url,
    page_delay: Duration,
    row_limit: u32,
}

impl SearchAnalyticsClient {
    /// Build the client and verify credentials with a probe request.
    /// Authentication failure here is the one fatal startup condition; every
    /// later failure degrades into partial results.
    pub async fn connect(config: &AnalyticsConfig) -> Result<Self, DetectionError> {
        let client = Self::new(config)
            .map_err(|error| DetectionError::AuthenticationFailed(error.to_string()))?;

        let probe = SearchQueryRequest {
            start_date: chrono::Utc::now().date_naive(),
            end_date: chrono::Utc::now().date_naive(),
            dimensions: vec!["query".to_string()],
            row_limit: 1,
            start_row: 0,
        };
        client
            .query(probe)
            .await
            .map_err(|error| DetectionError::AuthenticationFailed(error.to_string()))?;

        tracing::info!("authenticated against search analytics source");
        Ok(client)
    }

    pub fn new(config: &AnalyticsConfig) -> Result<Self, GenericError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let mut auth =
            reqwest::header::HeaderValue::from_str(&format!("Bearer {}", config.api_token))?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .default_headers(headers)
            .build()?;

        let base = Url::parse(&config.base_url)?;
        let query_url = base.join(&format!(
            "sites/{}/searchAnalytics/query",
            urlencode(&config.site_url)
        ))?;

        Ok(Self {
            client,
            query_url,
            page_delay: Duration::from_millis(config.page_delay_ms),
            row_limit: config.row_limit,
        })
    }

    pub fn row_limit(&self) -> u32 {
        self.row_limit
    }

    pub fn page_delay(&self) -> Duration {
        self.page_delay
    }
}

#[async_trait]
impl AnalyticsSource for SearchAnalyticsClient {
    async fn query(&self, request: SearchQueryRequest) -> Result<Vec<SearchRow>, GenericError> {
        let response = self
            .client
            .post(self.query_url.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<SearchQueryResponse>()
            .await?;
        Ok(response.rows)
    }
}

/// Fetch every row for a date range by walking pages with a cooperative
/// delay between sequential calls; the source is rate limited, so this is a
/// throttle rather than a concurrency primitive. Stops on the first short
/// page.
pub async fn fetch_all_rows(
    source: &dyn AnalyticsSource,
    start_date: NaiveDate,
    end_date: NaiveDate,
    row_limit: u32,
    page_delay: Duration,
) -> Result<Vec<SearchRow>, GenericError> {
    let row_limit = row_limit.max(1);
    let mut rows = Vec::new();
    let mut start_row = 0u32;

    loop {
        let request = SearchQueryRequest {
            start_date,
            end_date,
            dimensions: vec!["query".to_string()],
            row_limit,
            start_row,
        };
        let page = source.query(request).await?;
        let page_len = page.len();
        rows.extend(page);
        tracing::debug!(start_row, page_len, "fetched analytics page");

        if page_len < row_limit as usize {
            break;
        }
        start_row += row_limit;
        tokio::time::sleep(page_delay).await;
    }

    Ok(rows)
}

fn urlencode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_normalizes_query_key() {
        let row = SearchRow {
            keys: vec!["  Gift Card IRS ".to_string()],
            clicks: 3,
            impressions: 120,
            ctr: 0.025,
            position: 4.2,
        };
        let metric = row.into_metric();
        assert_eq!(metric.query, "gift card irs");
        assert_eq!(metric.impressions, 120);
    }

    #[test]
    fn site_url_is_percent_encoded() {
        assert_eq!(
            urlencode("https://benefits.example.gov/"),
            "https%3A%2F%2Fbenefits.example.gov%2F"
        );
    }
}
