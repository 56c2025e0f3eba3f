#![doc = include_str!("../README.md")]

mod bytes;
mod error;

pub mod archive;
pub mod device;
pub mod framing;
pub mod layout;
pub mod pipeline;
pub mod points;
pub mod report;
pub mod settings;
pub mod tracking;

pub use error::{Error, Result};
