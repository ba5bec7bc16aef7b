pub mod batch;
pub mod config;
pub mod export;
pub mod formula;
pub mod gaql;
pub mod ratelimit;
