pub mod app;
pub mod events;
pub mod ingest;
pub mod logging;
pub mod office;
pub mod ui;
