//! Operation executor
//!
//! Runs one [`DueOperation`] as one statement and hands back the outcome as a
//! value. Engine errors, timeouts and unusable table names all end up as an
//! [`OperationFailure`]; nothing escapes this boundary as a fault, so callers
//! can move on to the next operation or table.

pub mod statements;

use crate::core::{DueOperation, OperationFailure};
use crate::engine::QueryEngine;
use std::time::Instant;
use tracing::{info, warn};

pub struct OperationExecutor<E> {
    engine: E,
}

impl<E: QueryEngine> OperationExecutor<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub async fn execute(
        &self,
        table_name: &str,
        operation: &DueOperation,
    ) -> Result<(), OperationFailure> {
        let kind = operation.kind();
        let statement = statements::render(table_name, operation).map_err(|reason| {
            warn!(table = %table_name, operation = %kind, %reason, "statement not issued");
            OperationFailure::Misconfigured(reason)
        })?;

        info!(table = %table_name, operation = %kind, "running {}", operation);
        let started = Instant::now();

        match self.engine.execute(&statement).await {
            Ok(_) => {
                info!(
                    table = %table_name,
                    operation = %kind,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "{} completed",
                    kind
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    table = %table_name,
                    operation = %kind,
                    error = %err,
                    "{} failed",
                    kind
                );
                Err(OperationFailure::Remote(err))
            }
        }
    }
}
