pub mod config;
pub mod error;
pub mod schema;
pub mod sessions;
pub mod store;
pub mod tracker;
pub mod users;

pub use config::{Config, DATA_DIR_ENV, default_base_dir, resolve_base_dir};
pub use error::{Result, StoreError};
pub use sessions::SessionCounter;
pub use store::Store;
pub use tracker::Tracker;
pub use users::UserStats;
