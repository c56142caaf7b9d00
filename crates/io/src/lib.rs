// File I/O: tabular sources into assignment rows and conflict rules

pub mod assignments;
pub mod conflicts;
pub mod dataset;
pub mod error;
pub mod table;

pub use assignments::{AssignmentColumns, AssignmentTable};
pub use conflicts::{ConflictMarkers, ConflictTable};
pub use dataset::{load_dataset, Dataset, LoadOptions};
pub use error::LoadError;
pub use table::{read_tables, Table};
