//! Failsafe mechanisms: per-domain admission control and 429 retry

mod admission;
mod retry;

pub use admission::{AdmissionController, DEFAULT_DOMAIN, domain_of};
pub use retry::parse_retry_after;
