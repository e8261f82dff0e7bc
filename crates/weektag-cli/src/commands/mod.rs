pub mod config;
pub mod fetch;
pub mod status;

pub use fetch::{run_fetch, FetchOverrides};
pub use status::show_status;
