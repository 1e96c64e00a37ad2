mod buffer;
mod client;
mod proof;
mod task;

pub use buffer::*;
pub use client::*;
pub use proof::*;
pub use task::*;
