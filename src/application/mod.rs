pub mod worker;

pub use worker::IngestWorker;
