//! Legacy block graph -> new block graph.

pub mod catalog;
pub mod concurrency;
pub mod context;
pub mod core;
pub mod expander;
pub mod populate;
pub mod type_table;

pub use catalog::{ConfigCatalog, DefaultsCatalog};
pub use context::TransformContext;
pub use self::core::{FALLBACK_CRON, POSITION_STEP, Translator, schedule_cron};
pub use expander::{Expander, PlannedBlock, Segment, TransformPart};
pub use type_table::TypeTable;
