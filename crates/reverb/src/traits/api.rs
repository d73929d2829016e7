//! 商品列表接口

use serde_json::Value;

use crate::{error::*, models::QueryOptions};

/// 商品列表接口
///
/// 每个方法对应一个 GET 端点, 返回解析后的 JSON 响应.
/// 嵌入器只依赖该接口, 可替换为任意后端.
pub trait ListingsApi {
    /// 搜索商品, 默认 `condition=all`
    fn search_listings(&self, options: &QueryOptions) -> ApiResult<Value>;

    /// 联盟商品池, 总是 `sort=random`
    fn search_affiliate(&self, options: &QueryOptions) -> ApiResult<Value>;

    /// 精选列表
    fn handpicked(&self, name: &str, options: &QueryOptions) -> ApiResult<Value>;

    /// 商品合集
    fn collection(&self, name: &str, options: &QueryOptions) -> ApiResult<Value>;

    /// 价格指南
    fn search_priceguide(&self, options: &QueryOptions) -> ApiResult<Value>;

    /// 文章相关商品
    fn listings_related_to_article(&self, slug: &str, options: &QueryOptions)
    -> ApiResult<Value>;
}
