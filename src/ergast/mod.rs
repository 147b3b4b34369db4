//! Formula 1 data from the Ergast-compatible results API.
//!
//! The client fetches JSON payloads, [`parse`] reshapes them into tables, and
//! [`tools`] exposes each query as a data tool the model can call.

mod client;
pub mod parse;
pub mod tools;

pub use client::ErgastClient;
pub use tools::{ergast_tools, ErgastTool, ErgastToolHandler};
