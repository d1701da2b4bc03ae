//! Onboard Review Client Library
//!
//! This library provides the client side of the onboarding code-review
//! service: a typed REST client, the auth session store, the usage-limit
//! tracker and the feedback-resolution view-model.

pub mod api;
pub mod config;
pub mod error;
pub mod feedback;
pub mod logging;
pub mod metrics;
pub mod session;
pub mod storage;
pub mod usage;

pub use error::{ClientError, Result};
