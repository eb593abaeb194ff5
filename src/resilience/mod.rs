pub mod bounded_pool;
