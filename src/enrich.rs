//! Best-effort AI metadata for a note: a title, a short summary and a few tags.
//!
//! Every failure collapses to `None`. Callers treat that as "nothing to add".

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::model::config::AppConfig;
use crate::model::store::normalize_tag;

const MAX_TAGS: usize = 5;
const MAX_SUMMARY_WORDS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Enrichment {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint returned {0}")]
    Status(reqwest::StatusCode),
    #[error("response had no candidate text")]
    EmptyResponse,
    #[error("candidate text is not valid metadata: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct EnrichClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_input_chars: usize,
}

impl EnrichClient {
    /// `None` when enrichment is disabled or no API key is set.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        if !config.ai.enabled {
            tracing::info!("ai enrichment disabled in config");
            return None;
        }
        let Some(api_key) = config.api_key() else {
            tracing::info!(
                "ai enrichment unavailable: {} is not set",
                config.ai.api_key_env
            );
            return None;
        };

        Some(Self {
            http: reqwest::blocking::Client::new(),
            endpoint: config.ai.endpoint.trim_end_matches('/').to_string(),
            model: config.ai.model.clone(),
            api_key,
            max_input_chars: config.ai.max_input_chars,
        })
    }

    /// Blocking; run off the UI thread.
    pub fn enrich(&self, content: &str) -> Option<Enrichment> {
        let input = truncate_chars(content, self.max_input_chars);
        if input.trim().is_empty() {
            return None;
        }

        match self.request(input) {
            Ok(enrichment) => Some(enrichment),
            Err(err) => {
                tracing::warn!("ai enrichment failed: {err}");
                None
            }
        }
    }

    fn request(&self, input: &str) -> Result<Enrichment, EnrichError> {
        let url = format!("{}/{}:generateContent", self.endpoint, self.model);
        let body = request_body(input);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichError::Status(status));
        }

        let payload: GenerateResponse = response.json()?;
        parse_candidate(payload)
    }
}

fn request_body(input: &str) -> serde_json::Value {
    let prompt = format!(
        "Analyze the following note. Return a concise title, a summary of at most \
         {MAX_SUMMARY_WORDS} words, and up to {MAX_TAGS} lowercase single-word tags.\n\n\
         Note:\n{input}"
    );

    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING" },
                    "summary": { "type": "STRING" },
                    "tags": { "type": "ARRAY", "items": { "type": "STRING" } }
                },
                "required": ["title", "summary", "tags"]
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

fn parse_candidate(payload: GenerateResponse) -> Result<Enrichment, EnrichError> {
    let text: String = payload
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .filter(|text: &String| !text.trim().is_empty())
        .ok_or(EnrichError::EmptyResponse)?;

    let raw: Enrichment = serde_json::from_str(strip_code_fence(&text))?;
    Ok(clamp(raw))
}

/// Models sometimes wrap JSON in a markdown fence despite the mime type.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn clamp(raw: Enrichment) -> Enrichment {
    let summary = raw
        .summary
        .split_whitespace()
        .take(MAX_SUMMARY_WORDS)
        .collect::<Vec<_>>()
        .join(" ");

    let mut tags: Vec<String> = Vec::new();
    for tag in raw.tags.iter().filter_map(|tag| normalize_tag(tag)) {
        if tags.contains(&tag) {
            continue;
        }
        tags.push(tag);
        if tags.len() == MAX_TAGS {
            break;
        }
    }

    Enrichment {
        title: raw.title.trim().to_string(),
        summary,
        tags,
    }
}

/// First `max` characters of `text`, on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with(text: &str) -> GenerateResponse {
        GenerateResponse {
            candidates: vec![Candidate {
                content: Some(CandidateContent {
                    parts: vec![Part {
                        text: Some(text.to_string()),
                    }],
                }),
            }],
        }
    }

    #[test]
    fn parses_structured_candidate() {
        let payload = response_with(
            r#"{"title":"Groceries","summary":"Milk and eggs.","tags":["Food","errand"]}"#,
        );
        let enrichment = parse_candidate(payload).unwrap();
        assert_eq!(enrichment.title, "Groceries");
        assert_eq!(enrichment.summary, "Milk and eggs.");
        assert_eq!(enrichment.tags, vec!["food", "errand"]);
    }

    #[test]
    fn fenced_json_is_accepted() {
        let payload = response_with("```json\n{\"title\":\"T\",\"summary\":\"S\",\"tags\":[]}\n```");
        assert_eq!(parse_candidate(payload).unwrap().title, "T");
    }

    #[test]
    fn garbage_and_empty_responses_are_errors() {
        assert!(matches!(
            parse_candidate(response_with("not json")),
            Err(EnrichError::Parse(_))
        ));
        assert!(matches!(
            parse_candidate(GenerateResponse { candidates: vec![] }),
            Err(EnrichError::EmptyResponse)
        ));
    }

    #[test]
    fn results_are_clamped() {
        let long_summary = vec!["word"; 30].join(" ");
        let raw = Enrichment {
            title: "  t ".to_string(),
            summary: long_summary,
            tags: ["a", "B", "a", "two words", "c", "d", "e", "f"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
        };
        let clamped = clamp(raw);
        assert_eq!(clamped.title, "t");
        assert_eq!(clamped.summary.split_whitespace().count(), MAX_SUMMARY_WORDS);
        assert_eq!(clamped.tags, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn invalid_tags_do_not_use_up_the_limit() {
        let raw = Enrichment {
            tags: ["Q&A", "c++", "#Rust", "to do", "ok-1", "a", "b", "c", "d"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            ..Enrichment::default()
        };
        assert_eq!(clamp(raw).tags, vec!["rust", "ok-1", "a", "b", "c"]);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 5000), "hi");
    }

    #[test]
    fn request_embeds_truncated_input() {
        let body = request_body("Buy milk");
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.ends_with("Buy milk"));
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn disabled_config_yields_no_client() {
        let mut config = AppConfig::defaults().unwrap();
        config.ai.enabled = false;
        assert!(EnrichClient::from_config(&config).is_none());
    }
}
