#![forbid(unsafe_code)]

//! bindstore demo library.
//!
//! Exposes the demo's view model and argument parsing so the binary stays a
//! thin driver and the pieces can be tested directly.

pub mod cli;
pub mod trader;
