//! Upstream HTTP clients: the trophy auth API, the trophy data API and the
//! collection-tracking API, plus the credential lifecycle built on the auth API.

pub mod bangumi;
pub mod http;
pub mod psn;
pub mod psn_auth;
pub mod token_manager;
