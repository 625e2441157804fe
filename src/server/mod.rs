//! Route server
//!
//! A thin request boundary over the pipelines. Requests arrive as
//! newline-delimited JSON and each one gets exactly one JSON line back, so
//! the same loop serves stdio in production and byte buffers in tests.


use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::pipeline::SearchService;
use crate::{Result, SearchError};

pub const SETUP_ROUTE: &str = "setup";
pub const READ_ROUTE: &str = "read";

const STATUS_OK: u16 = 200;
const STATUS_BAD_REQUEST: u16 = 400;
const STATUS_NOT_FOUND: u16 = 404;

#[derive(Debug, Clone, Deserialize)]
pub struct RouteRequest {
    #[serde(default)]
    pub id: Option<Value>,
    pub route: String,
    #[serde(default)]
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    pub id: Value,
    pub status: u16,
    pub body: Value,
}

impl RouteResponse {
    fn ok(id: Option<Value>, body: Value) -> Self {
        Self {
            id: id.unwrap_or(Value::Null),
            status: STATUS_OK,
            body,
        }
    }

    fn failure(id: Option<Value>, status: u16, message: &str) -> Self {
        Self {
            id: id.unwrap_or(Value::Null),
            status,
            body: json!({ "error": message }),
        }
    }
}

/// Handles the body of one route
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn handle(&self, body: Option<Value>) -> Result<Value>;
}

/// Ensures the index and ingests the documents directory
pub struct SetupRoute {
    service: Arc<SearchService>,
}

impl SetupRoute {
    #[inline]
    pub fn new(service: Arc<SearchService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl RouteHandler for SetupRoute {
    async fn handle(&self, _body: Option<Value>) -> Result<Value> {
        let summary = self.service.setup().await?;
        let data = serde_json::to_value(summary).map_err(anyhow::Error::from)?;
        Ok(json!({ "data": data }))
    }
}

/// Answers a question: `"question"` or `{"question": "..."}`
pub struct ReadRoute {
    service: Arc<SearchService>,
}

impl ReadRoute {
    #[inline]
    pub fn new(service: Arc<SearchService>) -> Self {
        Self { service }
    }
}

/// Pull a non-empty question out of a request body
#[inline]
pub fn extract_question(body: Option<&Value>) -> Result<&str> {
    let question = match body {
        Some(Value::String(question)) => Some(question.as_str()),
        Some(Value::Object(fields)) => fields.get("question").and_then(Value::as_str),
        _ => None,
    };

    question
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| SearchError::BadRequest("A non-empty question is required".to_string()))
}

#[async_trait]
impl RouteHandler for ReadRoute {
    async fn handle(&self, body: Option<Value>) -> Result<Value> {
        let question = extract_question(body.as_ref())?;
        let answer = self.service.ask(question).await?;
        Ok(json!({ "answer": answer }))
    }
}

/// Dispatches route requests to registered handlers
#[derive(Default)]
pub struct RouteServer {
    routes: HashMap<String, Box<dyn RouteHandler>>,
}

impl RouteServer {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Server exposing the setup and read routes of one service
    #[inline]
    pub fn for_service(service: &Arc<SearchService>) -> Self {
        let mut server = Self::new();
        server.register(SETUP_ROUTE, SetupRoute::new(Arc::clone(service)));
        server.register(READ_ROUTE, ReadRoute::new(Arc::clone(service)));
        server
    }

    #[inline]
    pub fn register<H>(&mut self, route: &str, handler: H)
    where
        H: RouteHandler + 'static,
    {
        self.routes.insert(route.to_string(), Box::new(handler));
        debug!("Registered route: {}", route);
    }

    /// Run one request through its handler
    pub async fn dispatch(&self, request: RouteRequest) -> RouteResponse {
        let Some(handler) = self.routes.get(&request.route) else {
            warn!("Unknown route: {}", request.route);
            return RouteResponse::failure(
                request.id,
                STATUS_NOT_FOUND,
                &format!("Unknown route: {}", request.route),
            );
        };

        debug!("Handling route: {}", request.route);
        match handler.handle(request.body).await {
            Ok(body) => RouteResponse::ok(request.id, body),
            Err(e) => {
                error!("Route '{}' failed: {}", request.route, e);
                RouteResponse::failure(request.id, e.status_code(), &e.to_string())
            }
        }
    }

    /// Parse and dispatch a single request line
    pub async fn handle_line(&self, line: &str) -> RouteResponse {
        match serde_json::from_str::<RouteRequest>(line) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                RouteResponse::failure(None, STATUS_BAD_REQUEST, &format!("Invalid request: {e}"))
            }
        }
    }

    /// Serve requests from `reader` until EOF, writing responses to `writer`
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> AnyResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                info!("EOF reached, closing connection");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let response = self.handle_line(trimmed).await;
            let mut output = serde_json::to_string(&response)?;
            output.push('\n');
            writer.write_all(output.as_bytes()).await?;
            writer.flush().await?;
        }

        Ok(())
    }

    /// Serve requests on stdin/stdout
    #[inline]
    pub async fn serve_stdio(&self) -> AnyResult<()> {
        info!("Starting route server on stdio");
        self.serve(BufReader::new(io::stdin()), io::stdout()).await
    }
}
