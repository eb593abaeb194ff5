pub mod envelope;
pub mod params;
pub mod routes;
pub mod server;
