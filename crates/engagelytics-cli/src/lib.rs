pub mod export;
pub mod ingest;
pub mod pipeline;
pub mod plot;
pub mod report;
