//! Broadcast event bus for crawl events
//!
//! Any number of subscribers, optional filtering, metrics and a shared
//! shutdown signal. Publishing is synchronous and never blocks, so the bus
//! doubles as the scheduler's [`EventSink`](super::sink::EventSink).

// Core struct and constructors
mod core;

// Functionality implementations
mod impls;
mod publishing;
mod shutdown;
mod subscription;

pub use core::CrawlEventBus;
