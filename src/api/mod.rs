//! Review Service REST API
//!
//! - **Types** (`types`): request bodies, response envelope, accounts, reviews
//! - **Client** (`client`): reqwest-based client for every endpoint

pub mod client;
pub mod types;

pub use client::ApiClient;
pub use types::{
    ApiEnvelope, AuthPayload, NewReview, NewSubmission, RegisterRequest, Review, Role, User,
};
