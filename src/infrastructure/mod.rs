pub mod dataset_writer;
pub mod record_source;
pub mod report_writer;

pub use dataset_writer::CsvDatasetWriter;
pub use record_source::{CsvRecordSource, JsonRecordSource, load_records};
pub use report_writer::JsonReportWriter;
