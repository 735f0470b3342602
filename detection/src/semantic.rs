use crate::cache::TtlCache;
use crate::model::{GenericError, Severity};
use async_trait::async_trait;
use common::config::EmbeddingConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use url::Url;

/// Practical ceiling on texts per embed call.
pub const EMBED_BATCH_LIMIT: usize = 2048;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GenericError>;
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Batch embedding client for an HTTP embedding backend.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    endpoint: Url,
    model: String,
}

impl HttpEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, GenericError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let endpoint = Url::parse(&config.endpoint)?;
        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GenericError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(EMBED_BATCH_LIMIT) {
            let request = EmbedRequest {
                model: &self.model,
                input: chunk,
            };
            let response = self
                .client
                .post(self.endpoint.clone())
                .json(&request)
                .send()
                .await?
                .error_for_status()?
                .json::<EmbedResponse>()
                .await?;
            if response.embeddings.len() != chunk.len() {
                return Err(format!(
                    "embedding backend returned {} vectors for {} texts",
                    response.embeddings.len(),
                    chunk.len()
                )
                .into());
            }
            vectors.extend(response.embeddings);
        }
        Ok(vectors)
    }
}

/// A reference scam-indicative phrase used as a similarity target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedPhrase {
    pub text: String,
    pub category: String,
    pub severity: Severity,
}

#[derive(Debug, Clone)]
struct EmbeddedSeed {
    seed: SeedPhrase,
    embedding: Vec<f32>,
}

/// Best semantic match for a query against the seed corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticMatch {
    pub phrase: String,
    pub category: String,
    pub severity: Severity,
    pub similarity: f64,
}

/// Fixed reference corpus of scam-indicative phrases. Seeds rarely change,
/// so their embeddings are cached with a long TTL.
pub fn seed_corpus() -> Vec<SeedPhrase> {
    fn seed(text: &str, category: &str, severity: Severity) -> SeedPhrase {
        SeedPhrase {
            text: text.to_string(),
            category: category.to_string(),
            severity,
        }
    }

    vec![
        seed("pay irs with gift cards", "payment_scam", Severity::Critical),
        seed("tax agency asking for itunes cards", "payment_scam", Severity::Critical),
        seed("send bitcoin to unfreeze benefits", "payment_scam", Severity::Critical),
        seed("wire transfer to claim tax refund", "payment_scam", Severity::Critical),
        seed("social security number suspended call", "threat_scam", Severity::Critical),
        seed("arrest warrant for unpaid taxes", "threat_scam", Severity::Critical),
        seed("legal action benefits fraud notice", "threat_scam", Severity::High),
        seed("unclaimed stimulus check waiting", "fake_benefits", Severity::High),
        seed("expired benefits reactivate now", "fake_benefits", Severity::High),
        seed("government owes you money claim", "fake_benefits", Severity::High),
        seed("free government grant money", "fake_benefits", Severity::Medium),
        seed("secret benefit program nobody knows", "fake_benefits", Severity::Medium),
        seed("verify bank details for refund", "phishing", Severity::High),
        seed("confirm identity to release payment", "phishing", Severity::High),
        seed("benefit card locked click here", "phishing", Severity::High),
    ]
}

/// Embedding-based matcher against the seed scam corpus.
///
/// Two states: `NotReady` (no backend configured, or seeds not yet embedded)
/// and `Ready`. Every operation is total; in `NotReady` it degrades to empty
/// results rather than erroring, so callers never special-case backend
/// absence beyond the `ready()` predicate.
pub struct SemanticMatcher {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    seeds: Vec<SeedPhrase>,
    seed_cache: TtlCache<&'static str, Arc<Vec<EmbeddedSeed>>>,
    ready: AtomicBool,
}

impl SemanticMatcher {
    pub fn new(provider: Option<Arc<dyn EmbeddingProvider>>, seed_ttl: Duration) -> Self {
        Self {
            provider,
            seeds: seed_corpus(),
            seed_cache: TtlCache::new(seed_ttl),
            ready: AtomicBool::new(false),
        }
    }

    pub fn with_seeds(
        provider: Option<Arc<dyn EmbeddingProvider>>,
        seeds: Vec<SeedPhrase>,
        seed_ttl: Duration,
    ) -> Self {
        Self {
            provider,
            seeds,
            seed_cache: TtlCache::new(seed_ttl),
            ready: AtomicBool::new(false),
        }
    }

    /// Disabled matcher, permanently `NotReady`.
    pub fn disabled() -> Self {
        Self::new(None, Duration::from_secs(60 * 60 * 24))
    }

    pub fn seeds(&self) -> &[SeedPhrase] {
        &self.seeds
    }

    /// True once a backend is configured and the seed corpus has been
    /// embedded at least once.
    pub fn ready(&self) -> bool {
        self.provider.is_some() && self.ready.load(Ordering::Relaxed)
    }

    pub async fn find_best_match(&self, query: &str, threshold: f64) -> Option<SemanticMatch> {
        let queries = [query.to_string()];
        self.analyze_batch(&queries, threshold)
            .await
            .into_iter()
            .next()
            .flatten()
    }

    /// Best per-query match for a batch, `None` for queries below the
    /// threshold. Returns all-`None` results while `NotReady`.
    pub async fn analyze_batch(
        &self,
        queries: &[String],
        threshold: f64,
    ) -> Vec<Option<SemanticMatch>> {
        if queries.is_empty() {
            return Vec::new();
        }
        let Some(provider) = &self.provider else {
            return vec![None; queries.len()];
        };

        let seeds = match self.embedded_seeds(provider).await {
            Some(seeds) => seeds,
            None => return vec![None; queries.len()],
        };

        let query_vectors = match provider.embed(queries).await {
            Ok(vectors) if vectors.len() == queries.len() => vectors,
            Ok(vectors) => {
                tracing::warn!(
                    expected = queries.len(),
                    received = vectors.len(),
                    "embedding backend returned wrong vector count, skipping semantic analysis"
                );
                return vec![None; queries.len()];
            }
            Err(error) => {
                tracing::warn!(%error, "query embedding failed, skipping semantic analysis");
                return vec![None; queries.len()];
            }
        };

        query_vectors
            .iter()
            .map(|vector| best_match(vector, &seeds, threshold))
            .collect()
    }

    async fn embedded_seeds(
        &self,
        provider: &Arc<dyn EmbeddingProvider>,
    ) -> Option<Arc<Vec<EmbeddedSeed>>> {
        let provider = Arc::clone(provider);
        let seeds = self.seeds.clone();
        let result = self
            .seed_cache
            .get_or_compute("seed-corpus", move || async move {
                let texts: Vec<String> = seeds.iter().map(|seed| seed.text.clone()).collect();
                let vectors = provider.embed(&texts).await?;
                if vectors.len() != seeds.len() {
                    return Err(format!(
                        "seed embedding count mismatch: {} != {}",
                        vectors.len(),
                        seeds.len()
                    )
                    .into());
                }
                let embedded = seeds
                    .into_iter()
                    .zip(vectors)
                    .map(|(seed, embedding)| EmbeddedSeed { seed, embedding })
                    .collect::<Vec<_>>();
                Ok(Arc::new(embedded))
            })
            .await;

        match result {
            Ok(embedded) => {
                self.ready.store(true, Ordering::Relaxed);
                Some(embedded)
            }
            Err(error) => {
                self.ready.store(false, Ordering::Relaxed);
                tracing::warn!(%error, "seed corpus embedding failed, matcher not ready");
                None
            }
        }
    }
}

fn best_match(
    query_vector: &[f32],
    seeds: &[EmbeddedSeed],
    threshold: f64,
) -> Option<SemanticMatch> {
    let mut best: Option<SemanticMatch> = None;
    for embedded in seeds {
        let similarity = cosine_similarity(query_vector, &embedded.embedding);
        if similarity < threshold {
            continue;
        }
        if best
            .as_ref()
            .is_none_or(|current| similarity > current.similarity)
        {
            best = Some(SemanticMatch {
                phrase: embedded.seed.text.clone(),
                category: embedded.seed.category.clone(),
                severity: embedded.seed.severity,
                similarity,
            });
        }
    }
    best
}

/// Cosine similarity over f32 vectors; zero-norm inputs compare as 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x as f64 * y as f64;
        norm_a += x as f64 * x as f64;
        norm_b += y as f64 * y as f64;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
