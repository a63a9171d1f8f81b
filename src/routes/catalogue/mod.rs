mod cached;
mod get;

pub use cached::*;
pub use get::*;
