//! Exa search and answer client
//!
//! Implements both the search and question-answering capabilities against
//! the Exa HTTP API.
//!
//! # Examples
//!
//! ```no_run
//! use carehero_discovery::ExaClient;
//!
//! let client = ExaClient::from_env("EXA_API_KEY").expect("key set");
//! ```

use crate::error::SearchError;
use async_trait::async_trait;
use carehero_domain::{Answer, CapabilityError, QuestionAnswerer, SearchHit, SearchProvider};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Exa API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.exa.ai";

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Exa API client
pub struct ExaClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct Contents {
    text: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    num_results: usize,
    contents: Contents,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: Option<String>,
    url: String,
    #[serde(default)]
    text: Option<String>,
}

impl From<SearchResult> for SearchHit {
    fn from(result: SearchResult) -> Self {
        SearchHit {
            title: result.title.unwrap_or_default(),
            url: result.url,
            text: result.text.unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct AnswerRequest<'a> {
    query: &'a str,
    text: bool,
}

#[derive(Deserialize)]
struct AnswerResponse {
    #[serde(default)]
    answer: serde_json::Value,
}

impl AnswerResponse {
    /// `answer` is usually a string but may be structured
    fn text(self) -> String {
        match self.answer {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl ExaClient {
    /// Create a client with an explicit API key
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create a client reading the API key from `var`
    pub fn from_env(var: &str) -> Result<Self, SearchError> {
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(SearchError::MissingApiKey(var.to_string())),
        }
    }

    /// Point the client at a different endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, SearchError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SearchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<R>().await?)
    }

    /// Run a search with page text contents
    pub async fn search_hits(&self, query: &str, num_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let body = SearchRequest {
            query,
            num_results,
            contents: Contents { text: true },
        };
        let response: SearchResponse = self.post("/search", &body).await?;
        debug!(results = response.results.len(), "Exa search returned");
        Ok(response.results.into_iter().map(SearchHit::from).collect())
    }

    /// Ask a question and return the answer text
    pub async fn answer_text(&self, question: &str) -> Result<String, SearchError> {
        let body = AnswerRequest {
            query: question,
            text: false,
        };
        let response: AnswerResponse = self.post("/answer", &body).await?;
        Ok(response.text())
    }
}

#[async_trait]
impl SearchProvider for ExaClient {
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<SearchHit>, CapabilityError> {
        Ok(self.search_hits(query, num_results).await?)
    }
}

#[async_trait]
impl QuestionAnswerer for ExaClient {
    async fn answer(&self, question: &str) -> Result<Answer, CapabilityError> {
        let answer_text = self.answer_text(question).await?;
        Ok(Answer { answer_text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_shape() {
        let body = SearchRequest {
            query: "clinics near 94110",
            num_results: 15,
            contents: Contents { text: true },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["numResults"], 15);
        assert_eq!(json["contents"]["text"], true);
    }

    #[test]
    fn test_search_response_parsing() {
        let raw = r#"{"results": [
            {"title": "SF General", "url": "https://zsfg.org", "text": "Hours..."},
            {"url": "https://untitled.org"}
        ], "requestId": "abc"}"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        let hits: Vec<SearchHit> = parsed.results.into_iter().map(SearchHit::from).collect();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "SF General");
        assert_eq!(hits[1].title, "");
        assert_eq!(hits[1].text, "");
    }

    #[test]
    fn test_answer_response_parsing() {
        let parsed: AnswerResponse =
            serde_json::from_str(r#"{"answer": "Yes, they accept Aetna.", "citations": []}"#).unwrap();
        assert_eq!(parsed.text(), "Yes, they accept Aetna.");

        let parsed: AnswerResponse = serde_json::from_str(r#"{"citations": []}"#).unwrap();
        assert_eq!(parsed.text(), "");
    }

    #[test]
    fn test_from_env_missing_key() {
        let err = ExaClient::from_env("CAREHERO_TEST_EXA_KEY_THAT_IS_NOT_SET").err().unwrap();
        assert!(matches!(err, SearchError::MissingApiKey(_)));
    }

    #[test]
    fn test_with_base_url_trims_slash() {
        let client = ExaClient::new("key").with_base_url("http://localhost:9000/");
        assert_eq!(client.base_url, "http://localhost:9000");
    }

    #[tokio::test]
    #[ignore] // Requires EXA_API_KEY and network access
    async fn test_live_search() {
        let client = ExaClient::from_env("EXA_API_KEY").unwrap();
        let hits = client.search_hits("urgent care near 94110 site:.org", 3).await.unwrap();
        assert!(!hits.is_empty());
    }
}
