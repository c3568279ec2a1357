//! HTTP surface: the CSP report sink and the CSRF-protected endpoints.

pub mod csp_report;
pub mod error;
pub mod middleware;
pub mod pages;
pub mod protected;
pub mod routes;

pub use routes::*;
