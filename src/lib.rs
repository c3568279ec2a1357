//! Two standalone web-security demonstrations behind one axum server:
//! a Content-Security-Policy violation report sink and a CSRF token guard.

pub mod app;
pub mod cli;
pub mod config;
pub mod csp;
pub mod csrf;
pub mod logging;
pub mod session;
pub mod state;
pub mod web;
