//! External prediction process
//!
//! The process gets the request as one JSON command-line argument and must
//! print exactly one JSON object to stdout, then exit 0.

mod process;

pub use process::{parse_single_object, PredictionRunner};
