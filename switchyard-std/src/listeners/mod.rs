//! Standard event listeners.

mod filter;
mod logging;

pub use filter::FilterListener;
pub use logging::LoggingListener;
