//! 嵌入容器类型

use strum_macros::{AsRefStr, Display, EnumIter};

/// 嵌入容器类型
///
/// 按声明顺序处理, 每种类型由 `data-reverb-embed-*` 属性标记.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum EmbedKind {
    Affiliate,
    Listings,
    Handpicked,
    Collection,
    RelatedListings,
}

impl EmbedKind {
    /// 标记属性名
    pub fn attribute(&self) -> String {
        format!("data-reverb-embed-{self}")
    }

    /// 选中容器的 CSS 选择器
    pub fn selector(&self) -> String {
        format!("[{}]", self.attribute())
    }

    /// 主参数的属性名 (不含 `data-` 前缀)
    pub fn argument(&self) -> Option<&'static str> {
        match self {
            Self::Affiliate | Self::Listings => None,
            Self::Handpicked | Self::Collection => Some("reverb-collection-name"),
            Self::RelatedListings => Some("article-slug"),
        }
    }
}

#[test]
#[cfg(test)]
fn test_embed_kind() {
    use strum::IntoEnumIterator;

    let attributes = EmbedKind::iter()
        .map(|kind| kind.attribute())
        .collect::<Vec<_>>();
    assert_eq!(attributes, [
        "data-reverb-embed-affiliate",
        "data-reverb-embed-listings",
        "data-reverb-embed-handpicked",
        "data-reverb-embed-collection",
        "data-reverb-embed-related-listings",
    ]);
    assert_eq!(EmbedKind::RelatedListings.argument(), Some("article-slug"));
}
