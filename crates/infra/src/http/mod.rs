//! HTTP transport over reqwest

mod client;

pub use client::{HttpTransport, HttpTransportBuilder};
