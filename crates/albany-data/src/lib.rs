#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/albany/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod returns;
pub mod yahoo;

// Re-export main types
pub use error::{DataError, Result};
pub use returns::{ReturnSeries, log_returns};
pub use yahoo::{YahooQuoteProvider, assemble_price_frame};
