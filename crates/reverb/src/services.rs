//! reverb 服务实现

pub mod api;
pub mod embed;

pub use api::ReverbApi;
pub use embed::{DEFAULT_TEMPLATE, EmbeddedListings};
