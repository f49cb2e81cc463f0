//! Processor client adapters.

mod http_client;

pub use http_client::HttpProcessorClient;
