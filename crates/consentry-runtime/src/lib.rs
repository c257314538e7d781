//! Consent runtime — banner state machine and the per-page consent session.
//!
//! A [`ConsentSession`] is what page markup talks to: it evaluates stored
//! consent on load, drives the banner, and routes visitor decisions through
//! the consent engine.

pub mod banner;
pub mod registry;
pub mod session;

pub use banner::{Banner, BannerState};
pub use registry::SessionRegistry;
pub use session::ConsentSession;
