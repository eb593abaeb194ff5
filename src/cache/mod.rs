pub mod credential;
pub mod response_cache;
pub mod store;
