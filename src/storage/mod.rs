// Storage - Persistence layer (RocksDB)
// Principle: Parameter writes are atomic, reads are reproducible

pub mod db;
pub mod params_store;

pub use db::*;
pub use params_store::*;
