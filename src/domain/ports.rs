use crate::application::pipeline::PipelineOutput;
use crate::domain::market::RawRecord;
use anyhow::Result;

/// Source of raw, untyped table rows
pub trait RecordSource {
    fn read_records(&self) -> Result<Vec<RawRecord>>;
}

/// Destination for the cleaned dataset and its derived columns
pub trait DatasetSink {
    fn write_dataset(&self, output: &PipelineOutput) -> Result<()>;
}
