// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use quotebook_app::{Quote, parse_quote_time};
use std::thread::{self, JoinHandle};
use time::PrimitiveDateTime;
use tiny_http::{Header, Response, Server};

/// Parses a store-format timestamp; panics on malformed fixtures.
pub fn ts(raw: &str) -> PrimitiveDateTime {
    parse_quote_time(raw).unwrap_or_else(|error| panic!("bad fixture timestamp {raw:?}: {error}"))
}

pub fn quote(name: &str, message: &str, time: &str) -> Quote {
    Quote {
        name: name.to_owned(),
        message: message.to_owned(),
        time: ts(time),
    }
}

pub fn quotes_json(quotes: &[Quote]) -> String {
    serde_json::to_string(quotes).unwrap_or_else(|error| panic!("encode fixture quotes: {error}"))
}

pub fn quote_json(quote: &Quote) -> String {
    serde_json::to_string(quote).unwrap_or_else(|error| panic!("encode fixture quote: {error}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannedResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl CannedResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.into(),
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub content_type: Option<String>,
    pub body: String,
}

/// Single-use HTTP server on an ephemeral port. Answers one request per
/// canned response, in order, then stops and hands back what it saw.
pub struct MockStore {
    base_url: String,
    handle: JoinHandle<Result<Vec<RecordedRequest>>>,
}

impl MockStore {
    pub fn start(responses: Vec<CannedResponse>) -> Result<Self> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let base_url = format!("http://{}", server.server_addr());

        let handle = thread::spawn(move || {
            let mut seen = Vec::with_capacity(responses.len());
            for canned in responses {
                let mut request = server.recv().context("receive mock request")?;
                let mut body = String::new();
                request
                    .as_reader()
                    .read_to_string(&mut body)
                    .context("read mock request body")?;
                seen.push(RecordedRequest {
                    method: request.method().as_str().to_owned(),
                    url: request.url().to_owned(),
                    content_type: request
                        .headers()
                        .iter()
                        .find(|header| header.field.equiv("Content-Type"))
                        .map(|header| header.value.as_str().to_owned()),
                    body,
                });

                let header = Header::from_bytes("Content-Type", canned.content_type)
                    .map_err(|()| anyhow!("invalid content type {:?}", canned.content_type))?;
                let response = Response::from_string(canned.body)
                    .with_status_code(canned.status)
                    .with_header(header);
                request.respond(response).context("send mock response")?;
            }
            Ok(seen)
        });

        Ok(Self { base_url, handle })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn finish(self) -> Result<Vec<RecordedRequest>> {
        self.handle
            .join()
            .map_err(|_| anyhow!("mock server thread panicked"))?
    }
}
