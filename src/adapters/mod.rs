//! Port implementations.
//!
//! `live` talks to Google APIs over HTTP, `recording` wraps a live adapter and
//! logs each call to a cassette, and `replaying` answers from a cassette.

pub mod live;
pub mod recording;
pub mod replaying;
