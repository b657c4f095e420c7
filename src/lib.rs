//! Twitch Hype Train viewer.
//!
//! Logs a broadcaster in through the [implicit grant flow](https://dev.twitch.tv/docs/authentication/getting-tokens-oauth/#implicit-grant-flow),
//! then shows the current Hype Train of the channel and its records.
//!
//! Every request goes through a caller-supplied client function, the same seam `twitch_oauth2`
//! uses. With the `surf_client` feature (default) that is `twitch_oauth2::client::surf_http_client`,
//! with `reqwest_client` it is `twitch_oauth2::client::reqwest_http_client`.
//!
//! ```rust, no_run
//! # #[cfg(feature = "surf_client")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use twitch_hype_train::{render::TextReport, App, Config, MemoryStorage};
//!
//! let mut app = App::new(
//!     twitch_oauth2::client::surf_http_client,
//!     MemoryStorage::new(),
//!     Config::from_env()?,
//! );
//! let grant = app.authorize(None, |url| println!("Please visit\n{}", url))?;
//! futures::executor::block_on(app.complete_login(grant));
//! print!("{}", TextReport(app.screen()));
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "surf_client"))]
//! # fn main() {}
//! ```
pub mod api;
pub mod app;
pub mod auth;
pub mod callback;
pub mod config;
pub mod helix;
pub mod model;
pub mod render;
pub mod storage;
pub mod theme;
pub mod view;

pub use api::{ApiError, HypeTrainApi};
pub use app::{App, AppError};
pub use auth::{AuthError, LoginError, TwitchAuth};
pub use callback::{CallbackError, ImplicitGrant, ImplicitGrantHook};
pub use config::{Config, ConfigError};
pub use helix::HelixError;
pub use storage::{DiskStorage, MemoryStorage, Storage, StorageError};
pub use theme::Theme;
pub use view::Screen;
