//! reverb 接口抽象

pub mod api;
