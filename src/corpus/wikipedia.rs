use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{Document, DocumentSource};
use crate::core::config::CorpusConfig;
use crate::rag::RagError;

/// Pulls plain-text page extracts from the MediaWiki API.
pub struct WikipediaSource {
    base_url: String,
    max_documents: usize,
    max_chars: usize,
    client: Client,
}

impl WikipediaSource {
    pub fn new(config: &CorpusConfig) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("wikichat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(RagError::source)?;

        Ok(Self {
            base_url: config
                .base_url
                .replace("{lang}", &config.language)
                .trim_end_matches('/')
                .to_string(),
            max_documents: config.max_documents.max(1),
            max_chars: config.max_chars_per_document,
            client,
        })
    }

    fn api_url(&self) -> String {
        format!("{}/w/api.php", self.base_url)
    }

    fn page_url(&self, title: &str) -> String {
        format!("{}/wiki/{}", self.base_url, title.replace(' ', "_"))
    }

    async fn get_json(&self, params: &[(&str, &str)]) -> Result<Value, RagError> {
        let response = self
            .client
            .get(self.api_url())
            .query(params)
            .send()
            .await
            .map_err(RagError::source)?;

        if !response.status().is_success() {
            return Err(RagError::Source(format!(
                "Wikipedia request failed: {}",
                response.status()
            )));
        }

        response.json().await.map_err(RagError::source)
    }

    async fn search_titles(&self, topic: &str) -> Result<Vec<String>, RagError> {
        let limit = self.max_documents.to_string();
        let payload = self
            .get_json(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", topic),
                ("srlimit", limit.as_str()),
                ("format", "json"),
            ])
            .await?;

        let titles = payload
            .pointer("/query/search")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("title").and_then(|t| t.as_str()))
                    .map(str::to_string)
                    .take(self.max_documents)
                    .collect()
            })
            .unwrap_or_default();

        Ok(titles)
    }

    async fn fetch_extract(&self, title: &str) -> Result<Option<Document>, RagError> {
        let payload = self
            .get_json(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
                ("format", "json"),
            ])
            .await?;

        let Some(pages) = payload.pointer("/query/pages").and_then(|v| v.as_object()) else {
            return Ok(None);
        };

        for (page_id, page) in pages {
            let Some(extract) = page.get("extract").and_then(|v| v.as_str()) else {
                continue;
            };
            if extract.trim().is_empty() {
                continue;
            }
            let resolved_title = page
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or(title)
                .to_string();
            let text: String = extract.chars().take(self.max_chars).collect();

            return Ok(Some(Document {
                id: format!("wiki-{}", page_id),
                source: self.page_url(&resolved_title),
                title: resolved_title,
                text,
            }));
        }

        Ok(None)
    }
}

#[async_trait]
impl DocumentSource for WikipediaSource {
    fn name(&self) -> &str {
        "wikipedia"
    }

    async fn fetch(&self, topic: &str) -> Result<Vec<Document>, RagError> {
        let titles = self.search_titles(topic).await?;
        tracing::debug!("Wikipedia search for '{}' returned {:?}", topic, titles);

        let mut documents = Vec::with_capacity(titles.len());
        for title in &titles {
            if let Some(document) = self.fetch_extract(title).await? {
                documents.push(document);
            }
        }

        if documents.is_empty() {
            return Err(RagError::Source(format!(
                "no Wikipedia content found for '{}'",
                topic
            )));
        }

        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source_for(server: &MockServer, max_chars: usize) -> WikipediaSource {
        WikipediaSource::new(&CorpusConfig {
            base_url: server.uri(),
            max_documents: 2,
            max_chars_per_document: max_chars,
            ..CorpusConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetch_searches_then_loads_extracts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("list", "search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": { "search": [ { "title": "Roman Empire" } ] }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("prop", "extracts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": { "pages": { "25507": {
                    "pageid": 25507,
                    "title": "Roman Empire",
                    "extract": "Rome was founded in 753 BC. The empire followed much later."
                } } }
            })))
            .mount(&server)
            .await;

        let docs = source_for(&server, 27).fetch("Roman Empire").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "wiki-25507");
        assert_eq!(docs[0].text, "Rome was founded in 753 BC.");
        assert!(docs[0].source.ends_with("/wiki/Roman_Empire"));
    }

    #[tokio::test]
    async fn empty_search_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": { "search": [] }
            })))
            .mount(&server)
            .await;

        let err = source_for(&server, 100).fetch("Nothing").await.unwrap_err();
        assert!(matches!(err, RagError::Source(_)));
    }
}
