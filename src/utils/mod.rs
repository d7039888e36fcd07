pub mod temp_files;

pub use temp_files::{cleanup_files, RequestFiles};
