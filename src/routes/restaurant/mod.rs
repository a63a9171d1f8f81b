mod dashboard;
mod edit;
mod menu;
mod stats;

pub use dashboard::*;
pub use edit::*;
pub use menu::*;
pub use stats::*;
