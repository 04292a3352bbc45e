pub mod client;
pub mod config;
pub mod reading_store;

pub use client::MongoClient;
pub use config::MongoConfig;
pub use reading_store::MongoReadingStore;
