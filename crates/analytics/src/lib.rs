pub mod exporter;
pub mod recorder;

pub use exporter::ClickHouseExporter;
pub use recorder::OutcomeRecorder;
