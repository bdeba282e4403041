pub mod config;
pub mod error;
pub mod formats;
pub mod interval_tree;
pub mod reader;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use reader::{AccessMode, OrderedRecordReader, ReaderOptions};
pub use types::{Format, GenomeInterval};
