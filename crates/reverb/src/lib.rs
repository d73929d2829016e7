//! reverb 商品列表嵌入
//!
//! 通过 REST 接口获取商品列表, 以模板渲染后嵌入 HTML 页面的容器中.

pub mod error;
pub mod models;
pub mod services;
pub mod traits;
pub mod utils;

pub use error::*;
