//! Application refresh
//!
//! Runs a full bootstrap over a [`Container`](crate::registry::Container).
//!
//! # Refresh Steps
//!
//! ```text
//! 1. Definition and module registration
//!    ↓
//! 2. Registry mutation        ← to a fixed point
//!    ↓
//! 3. Factory customization
//!    ↓
//! 4. Instance hook registration
//!    ↓
//! 5. Singleton pre-instantiation (configurable)
//!    ↓
//! 6. `context-refreshed` published to detected listeners
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use meshestra_bootstrap::prelude::*;
//!
//! let app = Application::builder()
//!     .module::<AppModule>()
//!     .external_hook(ExternalHook::mutator("scanner", ComponentScanner::new("app")))
//!     .config(BootstrapConfig::from_env()?)
//!     .build()?;
//!
//! let users = app.resolve::<UserService>("userService")?;
//! println!("{}", app.report().to_json()?);
//! ```

mod application;
mod report;

pub use application::{Application, ApplicationBuilder};
pub use report::BootstrapReport;
