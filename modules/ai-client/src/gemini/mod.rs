mod types;

use crate::error::{ClientError, ClientResult};
use crate::schema::StructuredOutput;
use tracing::warn;
use types::{
    BatchEmbedRequest, BatchEmbedResponse, Content, EmbedRequest, EmbedResponse,
    GenerateRequest, GenerateResponse, GenerationConfig,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
const DEFAULT_EMBEDDING_DIM: usize = 768;

/// A thin wrapper around Gemini's `generateContent` and `embedContent`
/// REST endpoints. Mirrors the shape of a conventional provider client:
/// `new`/`from_env` constructors, `with_*` builders, and convenience
/// methods (`extract`, `chat_completion`, `embed`, `embed_batch`).
#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    model: String,
    embedding_model: String,
    base_url: String,
    http: reqwest::Client,
}

impl Gemini {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_env(model: impl Into<String>) -> ClientResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ClientError::MissingApiKey("GEMINI_API_KEY".to_string()))?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.base_url, model, method, self.api_key
        )
    }

    /// Type-safe structured-output extraction: `responseMimeType` forced to
    /// JSON with a `responseSchema` derived from `T`, matching the
    /// `response_mime_type`/`response_schema` pairing the original
    /// Python precompute used against the same API.
    pub async fn extract<T: StructuredOutput>(
        &self,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> ClientResult<T> {
        let text = self
            .generate(
                Some(system_prompt.into()),
                user_prompt.into(),
                0.0,
                Some(T::response_schema()),
            )
            .await?;

        serde_json::from_str(&text).map_err(|e| {
            ClientError::ContractViolation(format!(
                "could not parse structured response as {}: {e}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Plain-text chat completion, temperature 0 (deterministic-leaning).
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> ClientResult<String> {
        self.generate(Some(system.into()), user.into(), 0.0, None)
            .await
    }

    async fn generate(
        &self,
        system: Option<String>,
        user: String,
        temperature: f32,
        response_schema: Option<serde_json::Value>,
    ) -> ClientResult<String> {
        let request = GenerateRequest {
            contents: vec![Content::text(Some("user"), user)],
            system_instruction: system.map(|s| Content::text(None, s)),
            generation_config: Some(GenerationConfig {
                temperature,
                response_mime_type: response_schema
                    .is_some()
                    .then(|| "application/json".to_string()),
                response_schema,
            }),
        };

        let url = self.endpoint(&self.model, "generateContent");
        let resp = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::Upstream(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Upstream(format!("Gemini returned {status}: {body}")));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| ClientError::Upstream(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ClientError::EmptyResponse);
        }

        Ok(text)
    }

    /// Embed a single piece of text.
    pub async fn embed(&self, text: impl Into<String>) -> ClientResult<Vec<f32>> {
        let request = EmbedRequest {
            model: format!("models/{}", self.embedding_model),
            content: Content::text(None, text.into()),
        };

        let url = self.endpoint(&self.embedding_model, "embedContent");
        let resp = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::Upstream(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Upstream(format!("Gemini embed returned {status}: {body}")));
        }

        let parsed: EmbedResponse = resp
            .json()
            .await
            .map_err(|e| ClientError::Upstream(e.to_string()))?;

        Ok(parsed.embedding.values)
    }

    /// Embed a batch of texts in a single call. Caller is responsible for
    /// chunking to the provider's batch-size limit (the Embedder component
    /// chunks at 100, see `newsscope-pipeline::embedder`).
    pub async fn embed_batch(&self, texts: Vec<String>) -> ClientResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let requests = texts
            .into_iter()
            .map(|t| EmbedRequest {
                model: format!("models/{}", self.embedding_model),
                content: Content::text(None, t),
            })
            .collect();

        let url = self.endpoint(&self.embedding_model, "batchEmbedContents");
        let resp = self
            .http
            .post(&url)
            .json(&BatchEmbedRequest { requests })
            .send()
            .await
            .map_err(|e| ClientError::Upstream(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Upstream(format!("Gemini batchEmbed returned {status}: {body}")));
        }

        let parsed: BatchEmbedResponse = resp
            .json()
            .await
            .map_err(|e| ClientError::Upstream(e.to_string()))?;

        let embeddings: Vec<Vec<f32>> = parsed.embeddings.into_iter().map(|e| e.values).collect();

        for (i, v) in embeddings.iter().enumerate() {
            if v.len() != DEFAULT_EMBEDDING_DIM {
                warn!(index = i, dim = v.len(), "embedding dimension mismatch");
            }
        }

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_new_sets_defaults() {
        let client = Gemini::new("key", "gemini-2.5-flash");
        assert_eq!(client.model(), "gemini-2.5-flash");
        assert_eq!(client.embedding_model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn gemini_with_base_url_overrides() {
        let client = Gemini::new("key", "gemini-2.5-flash").with_base_url("http://localhost:1234");
        assert_eq!(client.base_url, "http://localhost:1234");
    }

    #[test]
    fn endpoint_includes_key_and_method() {
        let client = Gemini::new("secret", "gemini-2.5-flash");
        let endpoint = client.endpoint("gemini-2.5-flash", "generateContent");
        assert!(endpoint.contains("key=secret"));
        assert!(endpoint.contains(":generateContent"));
    }
}
