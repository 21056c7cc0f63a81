pub mod cache;
pub mod cached_fetch;
pub mod scrape;
pub mod single_flight;
