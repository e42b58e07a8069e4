//! Core engine for a framework-agnostic, page-driven browser E2E test
//! harness.
//!
//! This crate owns three tightly coupled subsystems:
//!
//! - a **hosting supervisor** ([`hosting`]) that launches and supervises an
//!   external web application under a chosen strategy;
//! - a **verification engine** ([`verify`]) that polls driver-observable
//!   state with wait-before-assert semantics;
//! - a **fluent page/element model** ([`page`]) that lets user-defined page
//!   types expose named elements and route actions through an abstract
//!   driver.
//!
//! The actual browser automation backend is deliberately not implemented
//! here — see [`driver::Driver`] — nor is a CLI, a config file format, or a
//! reporting surface. A caller supplies a `Driver` implementation and wires
//! the pieces together starting from [`options::OptionsBuilder`]:
//!
//! ```no_run
//! # async fn run() -> fluent_harness_core::Result<()> {
//! use fluent_harness_core::options::OptionsBuilder;
//! use url::Url;
//!
//! let mut app = OptionsBuilder::new()
//!     .use_external_server(Url::parse("http://localhost:5000").unwrap())?
//!     .build()?;
//!
//! app.start().await?;
//! app.dispose().await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod driver;
pub mod error;
pub mod hosting;
pub mod options;
pub mod page;
pub mod verify;

#[cfg(test)]
pub(crate) mod testing;

pub use app::App;
pub use error::{Error, Result};
