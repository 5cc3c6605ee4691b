//! REST transport for the catalog metadata service
//!
//! Each proposal becomes one `POST {server}/aspects?action=ingestProposal`.

use super::{CatalogChannel, CatalogTransport, EmitHandle, TransportError, WriteResponse};
use crate::config::EmitterConfig;
use crate::error::SyncError;
use crate::proposal::Proposal;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const INGEST_PATH: &str = "/aspects?action=ingestProposal";
const PROTOCOL_HEADER: &str = "x-restli-protocol-version";
const PROTOCOL_VERSION: &str = "2.0.0";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const JSON_CONTENT: &str = "application/json";
const JSON_PATCH_CONTENT: &str = "application/json-patch+json";

#[derive(Debug, Serialize)]
struct IngestRequest<'a> {
    proposal: WireProposal<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireProposal<'a> {
    entity_type: &'static str,
    entity_urn: &'a str,
    change_type: crate::proposal::ChangeType,
    aspect_name: &'static str,
    aspect: WireAspect,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireAspect {
    /// The aspect document, itself JSON-encoded
    value: String,
    content_type: &'static str,
}

fn encode(proposal: &Proposal) -> Result<String, TransportError> {
    let value = proposal
        .aspect()
        .wire_value()
        .map_err(|e| TransportError::Submission(format!("Failed to encode aspect: {}", e)))?;

    let request = IngestRequest {
        proposal: WireProposal {
            entity_type: proposal.entity_kind().as_str(),
            entity_urn: proposal.entity_urn().as_str(),
            change_type: proposal.change_type(),
            aspect_name: proposal.aspect_name(),
            aspect: WireAspect {
                value: value.to_string(),
                content_type: if proposal.is_patch() {
                    JSON_PATCH_CONTENT
                } else {
                    JSON_CONTENT
                },
            },
        },
    };

    serde_json::to_string(&request)
        .map_err(|e| TransportError::Submission(format!("Failed to encode proposal: {}", e)))
}

/// Transport against the catalog's REST API
#[derive(Debug, Clone)]
pub struct RestEmitter {
    server: String,
    token: Option<String>,
}

impl RestEmitter {
    pub fn new(server: impl Into<String>, token: Option<String>) -> Self {
        Self {
            server: server.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Build from configuration, rejecting servers that are not http(s) URLs
    pub fn from_config(config: &EmitterConfig) -> Result<Self, SyncError> {
        let url = url::Url::parse(&config.server)
            .map_err(|e| SyncError::Config(format!("Invalid catalog server '{}': {}", config.server, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SyncError::Config(format!(
                "Unsupported catalog server scheme: {}",
                url.scheme()
            )));
        }
        Ok(Self::new(url.as_str(), config.token.clone()))
    }

    fn default_headers(&self) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT));
        headers.insert(PROTOCOL_HEADER, HeaderValue::from_static(PROTOCOL_VERSION));

        if let Some(token) = self.token.as_deref() {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| TransportError::ChannelUnavailable(format!("Invalid token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

#[async_trait]
impl CatalogTransport for RestEmitter {
    fn endpoint(&self) -> &str {
        &self.server
    }

    async fn open(&self) -> Result<Box<dyn CatalogChannel>, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .default_headers(self.default_headers()?)
            .build()
            .map_err(|e| {
                TransportError::ChannelUnavailable(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Box::new(RestChannel {
            client,
            url: format!("{}{}", self.server, INGEST_PATH),
        }))
    }
}

struct RestChannel {
    client: reqwest::Client,
    url: String,
}

impl CatalogChannel for RestChannel {
    fn submit(&self, proposal: Arc<Proposal>) -> Result<EmitHandle, TransportError> {
        let body = encode(&proposal)?;
        let request = self.client.post(&self.url).body(body);

        Ok(EmitHandle::spawn(async move {
            let response = request
                .send()
                .await
                .map_err(|e| TransportError::Io(e.to_string()))?;

            let status = response.status();
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Failed to read catalog response body for {}: {}", proposal, e);
                    String::new()
                }
            };
            if !status.is_success() {
                return Err(TransportError::Rejected {
                    status: status.as_u16(),
                    body,
                });
            }

            debug!("Catalog accepted {} ({})", proposal, status);
            Ok(WriteResponse {
                status: status.as_u16(),
                body,
            })
        }))
    }

    fn close(self: Box<Self>) -> Result<(), TransportError> {
        // Dropping the client releases its pooled connections
        Ok(())
    }
}
