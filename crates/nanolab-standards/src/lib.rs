#![deny(unsafe_code)]

pub mod error;
pub mod registry;
pub mod store;

pub use crate::error::{Result, StandardsError};
pub use crate::registry::{PROCEDURES_KEY, SchemaRegistry};
pub use crate::store::{FileParameterStore, MemoryParameterStore, ParameterStore};
