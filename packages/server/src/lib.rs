// Political Bias Analyzer - API Core
//
// This crate provides the backend API for analyzing the political lean of
// public URLs. A URL is classified (article, video, social post), its text
// extracted, and the text scored into a Left/Center/Right verdict by an
// external model. Jobs move through a Pending -> Running -> terminal
// lifecycle over both a blocking endpoint and an async job queue.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
