//! CLI-facing helpers: report rendering, failure statistics, and Ctrl-C
//! handling for live follow mode.

pub mod report;
pub mod shutdown;
pub mod statistics;

// Re-export public API
pub use report::{format_age, render_report};
pub use shutdown::cancel_on_ctrl_c;
pub use statistics::print_failure_statistics;
