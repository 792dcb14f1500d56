pub mod toml_loader;

pub use toml_loader::{load_jobs, load_profile, parse_jobs, parse_profile};
