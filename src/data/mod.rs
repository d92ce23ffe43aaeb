pub mod dataset;
pub mod export;
pub mod import;
pub mod summary;
pub mod value;

pub use dataset::{flatten, Dataset};
pub use export::ExportFormat;
pub use summary::{summarize, ColumnKind, ColumnSummary, Summary};
pub use value::Value;
