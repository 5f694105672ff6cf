mod segment;
mod types;

pub use segment::*;
pub use types::*;
