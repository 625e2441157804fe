// Pinecone vector index client
// Control plane calls go to the controller URL; data plane calls go to each
// index's own host, resolved once and cached


use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::{
    IndexRecord, Metric, QueryMatch, QueryRequest, QueryResult, RecordMetadata,
    VectorIndexClient,
};
use crate::config::PineconeConfig;
use crate::{Result, SearchError};

const API_VERSION: &str = "2024-07";

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    name: String,
    #[serde(default)]
    host: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: u32,
    metric: Metric,
    spec: IndexSpec<'a>,
}

#[derive(Debug, Serialize)]
struct IndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
}

#[derive(Debug, Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<PineconeMatch>,
}

#[derive(Debug, Deserialize)]
struct PineconeMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    values: Vec<f32>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

/// Client for the Pinecone REST API
#[derive(Debug)]
pub struct PineconeClient {
    controller_url: Url,
    api_key: String,
    cloud: String,
    region: String,
    agent: ureq::Agent,
    hosts: Mutex<HashMap<String, Url>>,
}

impl PineconeClient {
    #[inline]
    pub fn new(config: &PineconeConfig, api_key: String) -> AnyResult<Self> {
        let controller_url = Url::parse(&config.controller_url)
            .with_context(|| format!("Invalid Pinecone URL: {}", config.controller_url))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();

        Ok(Self {
            controller_url,
            api_key,
            cloud: config.cloud.clone(),
            region: config.region.clone(),
            agent,
            hosts: Mutex::new(HashMap::new()),
        })
    }

    fn get_json<T: DeserializeOwned>(&self, url: &Url) -> AnyResult<T> {
        debug!("GET {}", url);
        let body = self
            .agent
            .get(url.as_str())
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .with_context(|| format!("Request to {url} failed"))?;

        serde_json::from_str(&body).with_context(|| format!("Failed to parse response from {url}"))
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(&self, url: &Url, body: &B) -> AnyResult<T> {
        debug!("POST {}", url);
        let request_json = serde_json::to_string(body).context("Failed to serialize request")?;
        let response = self
            .agent
            .post(url.as_str())
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .with_context(|| format!("Request to {url} failed"))?;

        serde_json::from_str(&response)
            .with_context(|| format!("Failed to parse response from {url}"))
    }

    fn controller_endpoint(&self, path: &str) -> AnyResult<Url> {
        self.controller_url
            .join(path)
            .with_context(|| format!("Failed to build URL for {path}"))
    }

    fn remember_host(&self, name: &str, host: &str) {
        match parse_host(host) {
            Ok(url) => {
                if let Ok(mut hosts) = self.hosts.lock() {
                    hosts.insert(name.to_string(), url);
                }
            }
            Err(e) => warn!("Ignoring unusable host for index '{}': {:#}", name, e),
        }
    }

    /// Data plane URL of an index
    fn index_host(&self, name: &str) -> AnyResult<Url> {
        if let Some(url) = self.hosts.lock().ok().and_then(|h| h.get(name).cloned()) {
            return Ok(url);
        }

        let url = self.controller_endpoint(&format!("/indexes/{name}"))?;
        let description: IndexDescription = self.get_json(&url)?;
        let host = description
            .host
            .filter(|h| !h.is_empty())
            .with_context(|| format!("Index '{name}' has no host yet"))?;

        self.remember_host(&description.name, &host);
        parse_host(&host)
    }

    fn data_endpoint(&self, index_name: &str, path: &str) -> AnyResult<Url> {
        self.index_host(index_name)?
            .join(path)
            .with_context(|| format!("Failed to build URL for {path}"))
    }

    fn list_blocking(&self) -> AnyResult<HashSet<String>> {
        let url = self.controller_endpoint("/indexes")?;
        let list: IndexList = self.get_json(&url)?;

        let mut names = HashSet::with_capacity(list.indexes.len());
        for index in list.indexes {
            if let Some(host) = index.host.as_deref().filter(|h| !h.is_empty()) {
                self.remember_host(&index.name, host);
            }
            names.insert(index.name);
        }
        Ok(names)
    }

    fn create_blocking(&self, name: &str, dimension: u32, metric: Metric) -> AnyResult<()> {
        let url = self.controller_endpoint("/indexes")?;
        let body = CreateIndexRequest {
            name,
            dimension,
            metric,
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: &self.cloud,
                    region: &self.region,
                },
            },
        };

        match self.post_json::<_, IndexDescription>(&url, &body) {
            Ok(description) => {
                if let Some(host) = description.host.as_deref().filter(|h| !h.is_empty()) {
                    self.remember_host(name, host);
                }
                Ok(())
            }
            Err(e) if is_conflict(&e) => {
                warn!("Index '{}' was created concurrently", name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn upsert_blocking(&self, index_name: &str, records: &[IndexRecord]) -> AnyResult<usize> {
        let url = self.data_endpoint(index_name, "/vectors/upsert")?;
        let body = UpsertRequest {
            vectors: records
                .iter()
                .map(|record| UpsertVector {
                    id: &record.id,
                    values: &record.vector,
                    metadata: record.metadata.to_flat_map(),
                })
                .collect(),
        };

        let response: UpsertResponse = self.post_json(&url, &body)?;
        Ok(response.upserted_count)
    }

    fn query_blocking(&self, index_name: &str, request: QueryRequest<'_>) -> AnyResult<QueryResult> {
        let url = self.data_endpoint(index_name, "/query")?;
        let body = QueryBody {
            vector: request.vector,
            top_k: request.top_k,
            include_metadata: request.include_metadata,
            include_values: request.include_values,
        };

        let response: QueryResponse = self.post_json(&url, &body)?;
        let matches = response
            .matches
            .into_iter()
            .map(|m| {
                let metadata = match m.metadata {
                    Some(map) if request.include_metadata => {
                        Some(RecordMetadata::from_flat_map(map)?)
                    }
                    _ => None,
                };
                Ok(QueryMatch {
                    id: m.id,
                    score: m.score,
                    values: request.include_values.then_some(m.values),
                    metadata,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(QueryResult { matches })
    }
}

fn parse_host(host: &str) -> AnyResult<Url> {
    if host.starts_with("http://") || host.starts_with("https://") {
        Url::parse(host).with_context(|| format!("Invalid index host: {host}"))
    } else {
        Url::parse(&format!("https://{host}")).with_context(|| format!("Invalid index host: {host}"))
    }
}

fn is_conflict(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<ureq::Error>(), Some(ureq::Error::StatusCode(409))))
}

fn service_error(error: &anyhow::Error) -> SearchError {
    SearchError::IndexService(format!("{error:#}"))
}

#[async_trait]
impl VectorIndexClient for PineconeClient {
    async fn list_index_names(&self) -> Result<HashSet<String>> {
        self.list_blocking().map_err(|e| service_error(&e))
    }

    async fn create_index(&self, name: &str, dimension: u32, metric: Metric) -> Result<()> {
        self.create_blocking(name, dimension, metric)
            .map_err(|e| service_error(&e))?;
        info!("Requested Pinecone index '{}' ({} dimensions)", name, dimension);
        Ok(())
    }

    async fn upsert(&self, index_name: &str, records: &[IndexRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let upserted = self
            .upsert_blocking(index_name, records)
            .map_err(|e| service_error(&e))?;
        debug!("Pinecone accepted {} of {} records", upserted, records.len());
        Ok(())
    }

    async fn query(&self, index_name: &str, request: QueryRequest<'_>) -> Result<QueryResult> {
        self.query_blocking(index_name, request)
            .map_err(|e| service_error(&e))
    }
}
