#![forbid(unsafe_code)]

//! Headless driver for the stockview inventory screen.

pub mod cli;
pub mod frame;
pub mod session;
