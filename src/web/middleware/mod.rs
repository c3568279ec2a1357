//! Tower middleware shared by the web routes.

pub mod request_id;
pub mod security_headers;
pub mod session;
