//! Input/output helpers.
//!
//! - results table read/write (`table`)
//! - counts table and annotation ingest (`ingest`)
//! - results file discovery (`discover`)
//! - curve JSON export (`curve`)
//! - Tmix summary CSV (`export`)

pub mod curve;
pub mod discover;
pub mod export;
pub mod ingest;
pub mod table;

pub use curve::*;
pub use discover::*;
pub use export::*;
pub use ingest::*;
pub use table::*;
