//! reverb 数据模型

pub mod embed;
pub mod options;

pub use embed::*;
pub use options::*;
