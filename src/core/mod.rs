pub mod error;
pub mod types;
pub mod value;

pub use error::{ErrorCategory, OrmError, Result};
pub use types::{Column, DataType, Row};
pub use value::Value;
