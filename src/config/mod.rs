//! # Configuration
//!
//! Settings are layered, later sources winning:
//! built-in defaults, `config/default.toml`, `config/{RUN_ENV}.toml`,
//! `APP__SECTION__KEY` variables and finally the short overrides
//! (`SERVER_PORT`, `STORE_BACKEND`, `DATABASE_URL`, `JWT_SECRET`).
//! A `.env` file is read first when present.
//!
//! ```rust,ignore
//! use realtime_hub::config::{Settings, StoreBackend};
//!
//! let settings = Settings::load()?;
//! if settings.store.backend == StoreBackend::Postgres {
//!     println!("store at {}", settings.database.url);
//! }
//! ```

mod settings;

pub use settings::*;
