//! Data models shared by the storage and API crates.

mod file;
mod upload;

pub use file::*;
pub use upload::*;
