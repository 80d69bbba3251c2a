use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use unicode_segmentation::UnicodeSegmentation;

pub const DEFAULT_DIMENSION: usize = 384;
const DEFAULT_HTTP_MODEL: &str = "text-embedding-3-small";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Turns text into fixed-dimension vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier stored in snapshots; vectors from different ids never mix.
    fn model_id(&self) -> &str;

    fn dimension(&self) -> usize;

    /// Embed every text or fail. Output order matches input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| VectorStoreError::embedding("Empty embedding result"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    /// Local feature hashing. No network access.
    #[default]
    Hashing,
    /// OpenAI-compatible `/embeddings` endpoint.
    Http,
}

impl EmbeddingMode {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hashing" => Ok(Self::Hashing),
            "http" => Ok(Self::Http),
            other => Err(VectorStoreError::EmbeddingError(format!(
                "Unsupported FILE_AGENT_EMBEDDING_MODE '{other}' (expected 'hashing' or 'http')"
            ))),
        }
    }
}

/// Embedder selection as it appears in the agent configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub mode: EmbeddingMode,
    pub model: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub dimension: usize,
    pub timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::Hashing,
            model: DEFAULT_HTTP_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            dimension: DEFAULT_DIMENSION,
            timeout_ms: 30_000,
        }
    }
}

impl EmbeddingConfig {
    pub fn build(&self) -> Result<Arc<dyn Embedder>> {
        if self.dimension == 0 {
            return Err(VectorStoreError::Other(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        match self.mode {
            EmbeddingMode::Hashing => Ok(Arc::new(HashingEmbedder::new(self.dimension))),
            EmbeddingMode::Http => {
                let api_key = env::var(&self.api_key_env)
                    .ok()
                    .filter(|key| !key.trim().is_empty());
                if api_key.is_none() {
                    log::warn!(
                        "{} is not set; calling {} without credentials",
                        self.api_key_env,
                        self.base_url
                    );
                }
                let embedder = HttpEmbedder::new(HttpEmbedderConfig {
                    base_url: self.base_url.clone(),
                    model: self.model.clone(),
                    api_key,
                    dimension: self.dimension,
                    timeout: Duration::from_millis(self.timeout_ms),
                })?;
                Ok(Arc::new(embedder))
            }
        }
    }
}

/// Deterministic bag-of-words embedder.
///
/// Each lower-cased word is hashed with FNV-1a into one of `dimension` buckets with a
/// hash-derived sign, then the vector is L2-normalized. Texts that share words get a
/// positive cosine similarity, which is enough for keyword-grade retrieval offline.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_id: String,
}

impl HashingEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            model_id: format!("hashing-v1-{}", dimension.max(1)),
        }
    }

    #[must_use]
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();
        for word in lowered.unicode_words() {
            let hash = fnv1a_64(word.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vec[bucket] += sign;
        }
        normalize(&mut vec);
        vec
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dimension: usize,
    pub timeout: Duration,
}

/// Client for an OpenAI-compatible embeddings endpoint.
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    config: HttpEmbedderConfig,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
    /// Asks the service to shorten vectors to the configured dimension.
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(config: HttpEmbedderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| VectorStoreError::embedding(format!("Failed to build HTTP client: {e}")))?;
        let endpoint = format!("{}/embeddings", config.base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    fn request_body<'a>(&'a self, texts: &'a [String]) -> EmbeddingsRequest<'a> {
        EmbeddingsRequest {
            model: &self.config.model,
            input: texts,
            dimensions: self.config.dimension,
        }
    }

    fn order_items(&self, mut items: Vec<EmbeddingItem>, expected: usize) -> Result<Vec<Vec<f32>>> {
        items.sort_by_key(|item| item.index);
        if items.len() != expected
            || items.iter().enumerate().any(|(pos, item)| pos != item.index)
        {
            return Err(VectorStoreError::embedding(format!(
                "Embedding service returned {} items for {expected} inputs",
                items.len()
            )));
        }
        items
            .into_iter()
            .map(|item| {
                if item.embedding.len() == self.config.dimension {
                    Ok(item.embedding)
                } else {
                    Err(VectorStoreError::InvalidDimension {
                        expected: self.config.dimension,
                        actual: item.embedding.len(),
                    })
                }
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_id(&self) -> &str {
        &self.config.model
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self.client.post(&self.endpoint).json(&self.request_body(texts));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| VectorStoreError::embedding(format!("Embedding request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VectorStoreError::embedding(format!(
                "Embedding service returned {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }
        let parsed: EmbeddingsResponse = response.json().await.map_err(|e| {
            VectorStoreError::embedding(format!("Invalid embedding response: {e}"))
        })?;

        log::debug!("Embedded {} texts via {}", texts.len(), self.endpoint);
        self.order_items(parsed.data, texts.len())
    }
}

#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
