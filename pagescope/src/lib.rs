pub mod commands;
pub mod handlers;

pub use handlers::{AppConfig, expand_path, load_urls_from_file, parse_url_line};
