// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod memory;

pub use memory::MemoryStore;

use anyhow::{Context, Result, anyhow, bail};
use quotebook_app::{FilterBucket, Quote, QuoteFormInput};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// The remote quote store as seen by the client: a filtered list read and
/// a create that echoes back the stored quote.
pub trait QuoteStore {
    fn list_quotes(&self, bucket: FilterBucket) -> Result<Vec<Quote>>;
    fn create_quote(&self, input: &QuoteFormInput) -> Result<Quote>;
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("server.base_url must not be empty");
        }
        let base_url = Url::parse(trimmed)
            .with_context(|| format!("server.base_url {trimmed:?} is not a valid URL"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!(
                "server.base_url {trimmed:?} must use http or https, got {:?}",
                base_url.scheme()
            );
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn quotes_url(&self, bucket: FilterBucket) -> Result<Url> {
        let mut url = self.endpoint("api/quotes")?;
        url.query_pairs_mut().append_pair("max_age", bucket.as_str());
        Ok(url)
    }

    pub fn create_url(&self) -> Result<Url> {
        self.endpoint("api/quote")
    }

    /// Cheapest request the store answers; used by `--check`.
    pub fn ping(&self) -> Result<()> {
        self.list_quotes(FilterBucket::All).map(|_| ())
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let base = format!("{}/{path}", self.base_url());
        Url::parse(&base).with_context(|| format!("build request URL {base:?}"))
    }
}

impl QuoteStore for Client {
    fn list_quotes(&self, bucket: FilterBucket) -> Result<Vec<Quote>> {
        let url = self.quotes_url(bucket)?;
        tracing::debug!(%url, "GET quotes");
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|error| connection_error(self.base_url(), self.timeout, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        response.json().context("decode quote list")
    }

    fn create_quote(&self, input: &QuoteFormInput) -> Result<Quote> {
        let url = self.create_url()?;
        tracing::debug!(%url, name = %input.name, "POST quote");
        let response = self
            .http
            .post(url)
            .form(&[
                ("name", input.name.as_str()),
                ("message", input.message.as_str()),
            ])
            .send()
            .map_err(|error| connection_error(self.base_url(), self.timeout, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        response.json().context("decode created quote")
    }
}

fn connection_error(base_url: &str, timeout: Duration, error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!(
            "quote store at {} did not answer within {}ms",
            base_url,
            timeout.as_millis()
        );
    }
    anyhow!(
        "cannot reach quote store at {} -- is the server running? ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<DetailEnvelope>(body)
        && let Some(detail) = parsed.detail.and_then(Detail::into_message)
    {
        return anyhow!("server error ({}): {}", status.as_u16(), detail);
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() < 100 && !trimmed.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), trimmed);
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct DetailEnvelope {
    detail: Option<Detail>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Detail {
    Text(String),
    Fields(Vec<FieldDetail>),
}

impl Detail {
    fn into_message(self) -> Option<String> {
        let message = match self {
            Self::Text(text) => text,
            Self::Fields(fields) => fields
                .into_iter()
                .map(|field| match field.loc.last() {
                    Some(serde_json::Value::String(name)) => format!("{name}: {}", field.msg),
                    _ => field.msg,
                })
                .collect::<Vec<_>>()
                .join("; "),
        };
        (!message.is_empty()).then_some(message)
    }
}

#[derive(Debug, Deserialize)]
struct FieldDetail {
    #[serde(default)]
    loc: Vec<serde_json::Value>,
    msg: String,
}

#[cfg(test)]
mod tests {
    use super::{Client, clean_error_response};
    use anyhow::Result;
    use quotebook_app::FilterBucket;
    use reqwest::StatusCode;
    use std::time::Duration;

    #[test]
    fn new_rejects_empty_and_non_http_urls() {
        let empty = Client::new("  ", Duration::from_secs(1)).expect_err("empty URL");
        assert!(empty.to_string().contains("must not be empty"));

        let ftp = Client::new("ftp://example.com", Duration::from_secs(1)).expect_err("ftp URL");
        assert!(ftp.to_string().contains("http or https"));

        let junk = Client::new("not a url", Duration::from_secs(1)).expect_err("junk URL");
        assert!(junk.to_string().contains("not a valid URL"));
    }

    #[test]
    fn urls_keep_base_path_and_encode_bucket() -> Result<()> {
        let client = Client::new("http://localhost:8000/quotebook//", Duration::from_secs(1))?;
        assert_eq!(client.base_url(), "http://localhost:8000/quotebook");
        assert_eq!(
            client.quotes_url(FilterBucket::Month)?.as_str(),
            "http://localhost:8000/quotebook/api/quotes?max_age=month"
        );
        assert_eq!(
            client.create_url()?.as_str(),
            "http://localhost:8000/quotebook/api/quote"
        );
        Ok(())
    }

    #[test]
    fn error_body_prefers_detail_text() {
        let error = clean_error_response(StatusCode::NOT_FOUND, r#"{"detail":"Not Found"}"#);
        assert_eq!(error.to_string(), "server error (404): Not Found");
    }

    #[test]
    fn error_body_flattens_field_details() {
        let body = r#"{"detail":[{"loc":["body","name"],"msg":"Field required","type":"missing"}]}"#;
        let error = clean_error_response(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert_eq!(error.to_string(), "server error (422): name: Field required");
    }

    #[test]
    fn error_body_falls_back_to_plain_text_or_status() {
        let plain = clean_error_response(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(plain.to_string(), "server error (502): upstream down");

        let html = clean_error_response(StatusCode::INTERNAL_SERVER_ERROR, &"x".repeat(200));
        assert_eq!(html.to_string(), "server returned 500");
    }
}
