pub mod file;
pub mod task;

pub use file::*;
pub use task::*;
