pub mod dataset;
pub mod progress;

pub use dataset::{CsvDatasetWriter, DatasetWriter};
pub use progress::ProgressStore;
