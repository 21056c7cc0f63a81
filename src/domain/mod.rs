pub mod error;
pub mod model;
pub mod normalize;
pub mod platform;
pub mod traits;
