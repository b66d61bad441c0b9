use super::config::ConnectionConfig;
use super::protocol::{ResultCollector, StatementPage};
use super::QueryEngine;
use crate::core::{EngineError, EngineResult};
use crate::result::QueryResult;
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

const HEADER_USER: &str = "X-Trino-User";
const HEADER_CATALOG: &str = "X-Trino-Catalog";
const HEADER_SCHEMA: &str = "X-Trino-Schema";
const HEADER_SOURCE: &str = "X-Trino-Source";

/// Attempts per request while the coordinator answers 502/503/504.
const MAX_BUSY_ATTEMPTS: u32 = 5;
const BUSY_BACKOFF: Duration = Duration::from_millis(100);

/// [`QueryEngine`] speaking the Trino client REST protocol.
pub struct TrinoClient {
    http: reqwest::Client,
    config: ConnectionConfig,
}

impl TrinoClient {
    pub fn new(config: ConnectionConfig) -> EngineResult<Self> {
        config.validate().map_err(EngineError::Config)?;

        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| EngineError::Config(e.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(HEADER_USER, &self.config.user);
        match &self.config.password {
            Some(password) => request.basic_auth(&self.config.user, Some(password)),
            None => request,
        }
    }

    /// Submit `sql` and poll until the last page. `pending` always holds the
    /// URI of the page not yet fetched so an abandoned statement can be cancelled.
    async fn run(&self, sql: &str, pending: &mut Option<String>) -> EngineResult<QueryResult> {
        let url = format!("{}/v1/statement", self.config.base_url());
        let submit = self
            .authorize(self.http.post(url))
            .header(HEADER_CATALOG, &self.config.catalog)
            .header(HEADER_SCHEMA, &self.config.schema)
            .header(HEADER_SOURCE, &self.config.source)
            .body(sql.to_string());

        let mut page = self.fetch(submit).await?;
        if let Some(id) = &page.id {
            debug!(query_id = %id, "statement accepted");
        }

        let mut collector = ResultCollector::new();
        loop {
            let next = collector.absorb(page)?;
            *pending = next.clone();
            match next {
                Some(uri) => page = self.fetch(self.authorize(self.http.get(&uri))).await?,
                None => break,
            }
        }

        Ok(collector.finish())
    }

    async fn fetch(&self, request: RequestBuilder) -> EngineResult<StatementPage> {
        let mut request = request;
        let mut attempt = 1;
        let response = loop {
            let retry = request.try_clone();
            let response = request
                .send()
                .await
                .map_err(|e| EngineError::Unavailable(e.to_string()))?;

            let status = response.status();
            let busy = matches!(
                status,
                StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
            );
            match retry {
                Some(next) if busy && attempt < MAX_BUSY_ATTEMPTS => {
                    debug!(%status, attempt, "coordinator busy, retrying");
                    tokio::time::sleep(BUSY_BACKOFF * attempt).await;
                    attempt += 1;
                    request = next;
                }
                _ => break response,
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = format!("HTTP {}: {}", status, body.trim());
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    EngineError::Unavailable(format!("authentication rejected ({})", detail))
                }
                s if s.is_server_error() => EngineError::Unavailable(detail),
                _ => EngineError::Protocol(detail),
            });
        }

        response
            .json::<StatementPage>()
            .await
            .map_err(|e| EngineError::Protocol(format!("invalid statement response: {}", e)))
    }

    async fn cancel(&self, uri: &str) {
        match self.authorize(self.http.delete(uri)).send().await {
            Ok(_) => debug!(uri, "cancelled abandoned statement"),
            Err(err) => warn!(uri, error = %err, "failed to cancel abandoned statement"),
        }
    }
}

#[async_trait]
impl QueryEngine for TrinoClient {
    async fn execute(&self, sql: &str) -> EngineResult<QueryResult> {
        debug!(statement = %sql, "executing statement");
        let mut pending = None;

        let Some(limit) = self.config.query_timeout else {
            return self.run(sql, &mut pending).await;
        };

        let outcome = tokio::time::timeout(limit, self.run(sql, &mut pending)).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                if let Some(uri) = pending {
                    self.cancel(&uri).await;
                }
                Err(EngineError::Timeout(limit))
            }
        }
    }
}
