pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod invalidation;
pub mod logger;
pub mod paginator;
pub mod post_index;
pub mod render_cache;
pub mod scanner;
pub mod server;
pub mod transform;
pub mod view;
pub mod watcher;

mod test_data;
