pub mod coerce;
pub mod collection;
pub mod trophy;
