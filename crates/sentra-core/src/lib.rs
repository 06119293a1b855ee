//! Sentra Core — domain models, repository trait definitions, the shared
//! error taxonomy, and the interfaces of external collaborators (mailer,
//! clock).
//!
//! This crate performs no I/O. Everything stateful lives behind the
//! repository traits in [`repository`].

pub mod clock;
pub mod error;
pub mod mailer;
pub mod models;
pub mod repository;

pub use clock::{Clock, SystemClock};
pub use error::{SentraError, SentraResult};
pub use mailer::Mailer;
