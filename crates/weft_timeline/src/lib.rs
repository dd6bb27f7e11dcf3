//! weft timeline
//!
//! Gantt layout of a rebuilt forest. Leaf-level units become lanes; the
//! layout maps their times onto columns under a zoom and scroll, computes
//! axis ticks and the candlestick cursor of the selected lane. Nothing here
//! draws; the TUI and CLI render the geometry.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod candle;
pub mod error;
pub mod lane;
pub mod layout;
pub mod ticks;
pub mod viewport;
pub mod window;

pub use candle::{Candlestick, Label, candlestick};
pub use error::TimelineError;
pub use lane::{Lane, collect_lanes};
pub use layout::{Bar, Timeline, TimelineLayout};
pub use ticks::{Tick, round_tick_offset, tick_count, ticks};
pub use viewport::Viewport;
pub use window::TimeWindow;
