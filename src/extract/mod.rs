//! Read-only analyses over one dataflow's process group in the flow export.

pub mod concurrency;
pub mod secrets;
pub mod transform_props;

pub use concurrency::{HTTP_PROCESSOR_CLASSES, ProcessorConcurrency, find_non_unit_concurrency};
pub use secrets::{DefinitionCache, SecretResolver};
pub use transform_props::TransformProperties;
