//! Request modes composed from caches, credentials, the fetch pool and the normalizers.

pub mod bangumi;
pub mod psn;
