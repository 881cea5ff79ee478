//! Pipeline stages that talk to the provider: season ingestion, serving-time
//! inference and the front-end facing service.

pub mod ingest;
pub mod inference;
pub mod service;
