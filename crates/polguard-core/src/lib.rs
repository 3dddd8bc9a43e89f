//! polguard core
//!
//! Types shared by the classifier and server crates:
//! - the error type and result alias
//! - the closed set of model kinds served by the endpoint
//! - the thresholded prediction produced for every request

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ModelKind, ParseModelKindError, Prediction};
