//! Live adapters that call Google APIs over HTTP.

pub mod gcs;
pub mod gemini;
pub mod vertex;
