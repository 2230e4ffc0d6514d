// ===============================
// src/news.rs
// ===============================
//
// News search (NewsAPI /v2/everything) + LLM summary (Gemini generateContent).
// `financial_news()` is the tool-level entry point: it never fails, errors
// come back as a readable string.
//

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use crate::domain::Article;
use crate::services::{NewsProvider, ServiceError, Summarizer};

const NEWSAPI_BASE: &str = "https://newsapi.org";
const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com";

// ---- NewsAPI payload ----
#[derive(Debug, Deserialize)]
struct NewsEnvelope {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<NewsArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsArticle {
    title: Option<String>,
    description: Option<String>,
    published_at: Option<String>,
}

pub struct NewsApiClient {
    http: reqwest::Client,
    base: String,
    api_key: Option<String>,
}

impl NewsApiClient {
    pub fn new(api_key: Option<String>) -> Self {
        if api_key.is_none() {
            warn!("NEWS_API_KEY missing, news client left uninitialized");
        }
        Self { http: reqwest::Client::new(), base: NEWSAPI_BASE.to_string(), api_key }
    }
}

#[async_trait]
impl NewsProvider for NewsApiClient {
    async fn search_articles(&self, query: &str, language: &str, sort: &str, page_size: u32) -> Result<Vec<Article>, ServiceError> {
        let key = self.api_key.as_deref().ok_or(ServiceError::NotInitialized("News"))?;
        let page_size = page_size.to_string();
        let url = Url::parse_with_params(
            &format!("{}/v2/everything", self.base),
            &[("q", query), ("language", language), ("sortBy", sort), ("pageSize", page_size.as_str())],
        )
        .map_err(|e| ServiceError::Decode(e.to_string()))?;

        let rsp = self.http.get(url).header("X-Api-Key", key).send().await?;
        let code = rsp.status().as_u16();
        let env = rsp.json::<NewsEnvelope>().await?;
        if env.status != "ok" {
            return Err(ServiceError::Status { code, body: env.message.unwrap_or(env.status) });
        }
        Ok(env
            .articles
            .into_iter()
            .filter_map(|a| {
                Some(Article { title: a.title?, description: a.description, published_at: a.published_at })
            })
            .collect())
    }
}

// ---- Gemini payload ----
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate { content: Option<Content> }

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part { text: Option<String> }

fn first_text(rsp: GenerateResponse) -> Option<String> {
    let text: String = rsp
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() { None } else { Some(text) }
}

pub struct GeminiSummarizer {
    http: reqwest::Client,
    base: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
}

impl GeminiSummarizer {
    pub fn new(api_key: Option<String>, model: &str) -> Self {
        if api_key.is_none() {
            warn!("GEMINI_API_KEY missing, LLM client left uninitialized");
        }
        Self {
            http: reqwest::Client::new(),
            base: GEMINI_BASE.to_string(),
            model: model.to_string(),
            api_key,
            temperature: 0.0,
        }
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, prompt: &str) -> Result<String, ServiceError> {
        let key = self.api_key.as_deref().ok_or(ServiceError::NotInitialized("LLM"))?;
        let url = format!("{}/v1beta/models/{}:generateContent", self.base, self.model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": self.temperature },
        });
        let rsp = self.http.post(url).header("x-goog-api-key", key).json(&body).send().await?;
        if !rsp.status().is_success() {
            let code = rsp.status().as_u16();
            let body = rsp.text().await.unwrap_or_default();
            return Err(ServiceError::Status { code, body });
        }
        let parsed = rsp.json::<GenerateResponse>().await?;
        first_text(parsed).ok_or_else(|| ServiceError::Decode("empty completion".to_string()))
    }
}

pub fn summary_prompt(company: &str, articles: &[Article]) -> String {
    let joined = articles
        .iter()
        .map(|a| format!("Title: {}\nContent: {}", a.title, a.description.as_deref().unwrap_or("")))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Summarize these news articles about {company} and provide:\n\
         1. Overall sentiment (Positive/Neutral/Negative)\n\
         2. Key themes or topics\n\
         3. Potential market impact\n\n\
         Articles:\n{joined}\n\n\
         Keep the summary concise and focused on trading implications."
    )
}

async fn try_financial_news(company: &str, news: &dyn NewsProvider, llm: &dyn Summarizer) -> Result<String, ServiceError> {
    let articles = news.search_articles(company, "en", "publishedAt", 5).await?;
    if articles.is_empty() {
        return Ok(format!("No recent news found for {company}."));
    }
    info!(%company, articles = articles.len(), "summarizing news");
    llm.summarize(&summary_prompt(company, &articles)).await
}

/// Latest news for `company`, summarized for trading. Errors become text.
pub async fn financial_news(company: &str, news: &dyn NewsProvider, llm: &dyn Summarizer) -> String {
    match try_financial_news(company, news, llm).await {
        Ok(s) => s,
        Err(e) => {
            warn!(%company, %e, "news summary failed");
            format!("Error getting news: {e}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedNews(Vec<Article>);

    #[async_trait]
    impl NewsProvider for FixedNews {
        async fn search_articles(&self, _q: &str, _l: &str, _s: &str, n: u32) -> Result<Vec<Article>, ServiceError> {
            Ok(self.0.iter().take(n as usize).cloned().collect())
        }
    }

    struct EchoLlm;

    #[async_trait]
    impl Summarizer for EchoLlm {
        async fn summarize(&self, prompt: &str) -> Result<String, ServiceError> {
            Ok(format!("SUMMARY[{}]", prompt.len()))
        }
    }

    fn article(title: &str) -> Article {
        Article { title: title.into(), description: Some("desc".into()), published_at: None }
    }

    #[tokio::test]
    async fn no_articles_message() {
        let out = financial_news("Acme", &FixedNews(vec![]), &EchoLlm).await;
        assert_eq!(out, "No recent news found for Acme.");
    }

    #[tokio::test]
    async fn summary_goes_through_llm() {
        let out = financial_news("Acme", &FixedNews(vec![article("up"), article("down")]), &EchoLlm).await;
        assert!(out.starts_with("SUMMARY["));
    }

    #[tokio::test]
    async fn missing_keys_render_as_error_text() {
        let out = financial_news("Acme", &NewsApiClient::new(None), &GeminiSummarizer::new(None, "m")).await;
        assert_eq!(out, "Error getting news: News client not initialized");
        let out = financial_news("Acme", &FixedNews(vec![article("x")]), &GeminiSummarizer::new(None, "m")).await;
        assert_eq!(out, "Error getting news: LLM client not initialized");
    }

    #[test]
    fn prompt_lists_articles() {
        let p = summary_prompt("Acme", &[article("Beat earnings")]);
        assert!(p.contains("about Acme"));
        assert!(p.contains("Title: Beat earnings\nContent: desc"));
    }

    #[test]
    fn gemini_text_is_joined() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]}}]}"#;
        let rsp: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(first_text(rsp).as_deref(), Some("Hello world"));
        let rsp: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(first_text(rsp).is_none());
    }
}
