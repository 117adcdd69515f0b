//! Yamdl Core Runtime
//!
//! Host-environment primitives shared by every animated component in Yamdl:
//!
//! - **Clock**: monotonic time source, in seconds
//! - **Frame requests**: "run this before the next repaint", with a fixed-rate fallback
//! - **Visibility**: foreground/background signal from the host
//! - **Listeners**: typed notification registries (`update`, `resolve`, `finish`)
//!
//! Everything here is single-threaded. Handles are `Rc`-based and are expected to
//! live on the UI thread that drives the frame loop.
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use yamdl_core::{FrameQueue, FrameSource};
//!
//! let frames = FrameQueue::new();
//! let ran = Rc::new(Cell::new(0));
//!
//! let counter = ran.clone();
//! frames.request_frame(Box::new(move || counter.set(counter.get() + 1)));
//! assert_eq!(ran.get(), 0);
//!
//! // The host calls dispatch() once per display refresh
//! frames.dispatch();
//! assert_eq!(ran.get(), 1);
//! ```

pub mod events;
pub mod host;

pub use events::{Emitter, ListenerId};
pub use host::{
    Clock, FrameCallback, FrameQueue, FrameSource, ManualClock, MonotonicClock, Visibility,
    FALLBACK_FRAME_INTERVAL,
};
