//! Wire contract between manager and site.
//!
//! Requests arrive as signed JSON envelopes; rejections leave as
//! structured errors with an HTTP status mapping and rate-limit headers.

mod request;
mod response;

pub use request::SignedRequest;
pub use response::{rate_limit_headers, Rejection};
