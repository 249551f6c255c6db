//! Progress streaming
//!
//! - [`types`] - the progress event vocabulary
//! - [`bus`] - per-task pub/sub with replay for late joiners
//! - [`sse`] - Server-Sent Events framing for the web layer

pub mod bus;
pub mod sse;
pub mod types;

pub use bus::{ProgressBus, Subscription};
pub use types::{ProgressEvent, ProgressEventKind};
