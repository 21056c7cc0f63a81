pub mod apify;
pub mod http;
pub mod places;
