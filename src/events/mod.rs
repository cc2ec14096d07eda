//! # Events Module
//!
//! The ordered event stream a comparison run reports through.
//!
//! ## Design
//! The background worker is the single producer. Any caller (CLI, GUI, test)
//! consumes the stream and reacts; nothing in the worker touches caller state.
//!
//! ## Example
//! ```rust,ignore
//! let (handle, events) = CompareWorker::builder()
//!     .source_dir(source)
//!     .result_dir(result)
//!     .build()?
//!     .spawn()?;
//!
//! for event in events.iter() {
//!     match event {
//!         Event::Progress(p) => println!("{}: {}/{}", p.stage, p.done, p.total),
//!         Event::Done(report) => println!("{} records", report.records.len()),
//!         _ => {}
//!     }
//! }
//! handle.join();
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use crossbeam_channel::RecvTimeoutError;
pub use types::*;
