//! Client for the RHQ Metrics REST service.
//!
//! [`MetricsClient::get`] reads a series over a time window and
//! [`MetricsClient::post`] appends data points. Both return immediately with
//! a [`Completion`] that can be awaited, and optionally report the same
//! outcome to a callback.

pub mod client;
pub mod completion;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod window;

pub use client::{GetArgs, MetricsClient};
pub use completion::{Callback, Completion};
pub use config::{ClientConfig, StatusPolicy};
pub use error::{MetricsError, Result};
pub use models::{DataPoint, QueryOptions, WriteBatch};
pub use window::{Clock, FixedClock, SystemClock, TimeWindow};
