//! Output sinks: labeled dataset rows, alert lines and the verdict journal.

mod alerts;
mod dataset;
mod journal;

pub use alerts::AlertSink;
pub use dataset::{read_dataset, DatasetRow, DatasetWriter};
pub use journal::{AlertStore, JournalEntry};
