pub mod app;
pub mod config;
pub mod debounce;
pub mod draft;
pub mod errors;
pub mod handlers;
pub mod kv;
pub mod models;
pub mod state;
pub mod stats;
pub mod storage;

pub use app::router;
pub use config::AppConfig;
pub use state::AppState;
pub use storage::load_data;
