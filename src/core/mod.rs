pub mod error;
pub mod policy;
pub mod types;
pub mod value;

pub use error::{EngineError, EngineResult, OperationFailure, StoreError, StoreResult};
pub use policy::{DueOperation, MaintenancePolicy, OperationKind, ScheduleField};
pub use types::{Column, Row};
pub use value::{DataType, Value};
