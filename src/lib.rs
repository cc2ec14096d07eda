//! # Fingerprint Audit
//!
//! Verifies that every file in a result directory traces back, by content,
//! to a file in a source directory, and that renaming kept the name.
//!
//! ## Core Philosophy
//! - **Content decides** - files are matched by fingerprint, never by name
//! - **Never modify** - the engine only reads both directories
//! - **Explain every verdict** - each record says why it got its status
//!
//! ## Architecture
//! - `core` - Scanning, fingerprinting, worker pools and comparison
//! - `events` - Event-driven progress reporting
//! - `error` - Error types with path context
//!
//! ## Example
//! ```rust,ignore
//! use fingerprint_audit::core::pipeline::CompareWorker;
//! use fingerprint_audit::events::Event;
//!
//! let worker = CompareWorker::builder()
//!     .source_dir("./originals")
//!     .result_dir("./renamed")
//!     .build()?;
//! let (handle, events) = worker.spawn()?;
//! for event in events.iter() {
//!     if let Event::Done(report) = event {
//!         println!("{} issues", report.counts.issues());
//!     }
//! }
//! handle.join();
//! ```

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{AuditError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. Logs go to
/// stderr so stdout stays free for reports and the worker protocol.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
