//! E-Election - campus election backend
//!
//! Students log in with their NIM, cast one anonymous ballot per period
//! and admins manage candidates, voting access and vote logs.

pub mod api;
pub mod config;
pub mod crypto;
pub mod db;
pub mod models;
pub mod services;
