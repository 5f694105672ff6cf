mod archive;
mod logging;
mod watch;

pub use archive::*;
pub use logging::*;
pub use watch::*;
