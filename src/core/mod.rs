//! Extract, transform and load stages of the monthly dashboard run

pub mod dashboard;
pub mod detail;
pub mod dynamic_range;
pub mod extractor;
pub mod normalize;
pub mod ordering;
pub mod pipeline;
pub mod resolver;
pub mod roster;
pub mod transform;

pub use dashboard::{DashboardEngine, DashboardStats, MonthPhase, RowKind};
pub use dynamic_range::RangeDynamicizer;
pub use ordering::{ProductCodeOrder, DEFAULT_PRODUCT_ORDER};
pub use pipeline::{process, run, LoadedInputs, RunReport};
pub use resolver::{ProductMaster, ProductResolver};
