// Business domains.

pub mod analysis;
pub mod auth;
