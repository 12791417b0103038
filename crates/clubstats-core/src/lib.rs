// Library root: club data model, stat aggregation, leaderboards, and the
// store/auth/photo boundaries the dashboard app is built on.

pub mod auth;
pub mod config;
pub mod db;
pub mod model;
pub mod photos;
pub mod profile;
pub mod ranking;
pub mod scoring;
pub mod store;
