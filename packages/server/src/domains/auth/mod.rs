//! Auth domain. Anonymous cookie sessions, used only to scope history.

pub mod session;

pub use session::{Session, SessionStore, SESSION_COOKIE, SESSION_TTL};
