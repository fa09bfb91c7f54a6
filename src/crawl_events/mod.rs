//! Event system for tracking and reporting run progress
//!
//! The scheduler talks to an [`EventSink`]. [`CrawlEventBus`] is the sink to
//! use when several consumers want the same stream.

pub mod bus;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod sink;
pub mod streaming;
pub mod types;

pub use bus::CrawlEventBus;
pub use config::{BackpressureMode, EventBusConfig};
pub use errors::EventBusError;
pub use metrics::{EventBusMetrics, MetricsSnapshot};
pub use sink::{EventSink, LogSink, NoOpSink};
pub use streaming::{FilteredReceiver, kinds};
pub use types::{CrawlEvent, PageProcessedMetadata, ShutdownReason};
