//! Building blocks for [`clap`]-driven configs.
//!
//! They can easily be re-used using `#[clap(flatten)]`.
pub mod cache;
pub mod logging;
pub mod refresh;
pub mod tokio;
