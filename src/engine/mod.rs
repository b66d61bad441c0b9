//! The query engine seam.
//!
//! Everything in the crate talks to the engine through [`QueryEngine`]: the
//! control-table store reads and writes policies with it, the operation
//! executor issues maintenance statements with it. [`TrinoClient`] is the
//! production implementation; tests plug in scripted engines.

pub mod config;
pub mod protocol;
pub mod trino;

use crate::core::EngineResult;
use crate::result::QueryResult;
use async_trait::async_trait;
use std::sync::Arc;

pub use config::ConnectionConfig;
pub use trino::TrinoClient;

/// Executes one SQL statement to completion.
///
/// Implementations return the full result set, or an [`EngineError`](crate::core::EngineError)
/// describing why the statement did not complete.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn execute(&self, sql: &str) -> EngineResult<QueryResult>;
}

#[async_trait]
impl<T: QueryEngine + ?Sized> QueryEngine for Arc<T> {
    async fn execute(&self, sql: &str) -> EngineResult<QueryResult> {
        (**self).execute(sql).await
    }
}
