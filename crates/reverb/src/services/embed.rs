//! 商品列表嵌入
//!
//! 分两步处理页面: 先以 scraper 解析页面, 收集全部嵌入容器并请求, 渲染;
//! 再以 lol_html 流式改写页面, 将渲染结果追加到各容器末尾.

use std::collections::HashMap;

use log::{debug, warn};
use lol_html::{RewriteStrSettings, element, html_content::ContentType, rewrite_str};
use reverb_template::TemplateSettings;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Value, json};
use strum::IntoEnumIterator;

use crate::{
    error::*,
    models::{ApiOptions, EmbedKind, QueryOptions},
    services::api::ReverbApi,
    traits::api::ListingsApi,
    utils::*,
};

/// 默认商品列表模板
pub const DEFAULT_TEMPLATE: &str = "\
<ul class='reverb-embedded-listings clearfix'> \
  <% $.each(listings, function (index, listing) { %> \
  <li class='reverb-embedded-listing'> \
    <a class='reverb-listing-embed' href='<%= listing._links.web.href %>'> \
      <img src='<%= listing.photos[0]._links.small_crop.href %>'></img> \
      <div class='reverb-embedded-listing-info'> \
      <span class='reverb-embedded-listing-title'><%= listing.title %></span> \
      <span class='reverb-embedded-listing-price'> \
        <%= listing.price.symbol %> \
        <%= listing.price.amount %> \
      </span> \
      </div> \
    </a> \
  </li> \
  <%})%> \
</ul>";

/// 查询参数属性前缀 (驼峰形式)
const SEARCH_PREFIX: &str = "reverbSearch";

/// 联盟 id 属性
const AFFILIATE_ATTRIBUTE: &str = "data-reverb-aid";

/// 模板选择器属性
const TEMPLATE_ATTRIBUTE: &str = "data-template";

/// 嵌入容器
#[derive(Debug, Clone, PartialEq, Eq)]
struct Container {
    kind: EmbedKind,
    argument: Option<String>,
    query: QueryOptions,
    template: Option<String>,
}

/// 商品列表嵌入器
pub struct EmbeddedListings<A: ListingsApi> {
    api: A,
    settings: TemplateSettings,
}

impl EmbeddedListings<ReverbApi> {
    /// 以接口配置创建嵌入器
    pub fn from_options(options: &ApiOptions) -> ApiResult<Self> {
        Ok(Self::new(ReverbApi::new(options)?))
    }
}

impl<A: ListingsApi> EmbeddedListings<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            settings: TemplateSettings::default(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// 处理页面中的全部嵌入容器
    ///
    /// 返回改写后的页面与失败容器的错误. 失败的容器保持原样.
    pub fn init(&self, page: &str) -> Result<(String, Vec<EmbedError>)> {
        let containers = scan(page)?;
        debug!("found {} embed containers", containers.len());

        let mut rendered = HashMap::new();
        let mut errors = Vec::new();
        let mut counters = HashMap::<EmbedKind, usize>::new();

        for container in &containers {
            let counter = counters.entry(container.kind).or_default();
            let index = *counter;
            *counter += 1;

            match self.embed(container) {
                Ok(html) => {
                    rendered.insert((container.kind, index), html);
                }
                Err(error) => {
                    warn!("embed {} #{index} failed: {error}", container.kind);
                    errors.push(EmbedError {
                        kind: container.kind,
                        index,
                        error,
                    });
                }
            }
        }

        Ok((rewrite(page, &rendered)?, errors))
    }

    /// 请求并渲染单个容器
    fn embed(&self, container: &Container) -> Result<String> {
        let argument = || {
            container
                .argument
                .as_deref()
                .ok_or(Error::MissingArgument(container.kind.argument().unwrap_or_default()))
        };
        let query = &container.query;

        let response = match container.kind {
            EmbedKind::Affiliate => self.api.search_affiliate(query)?,
            EmbedKind::Listings => self.api.search_listings(query)?,
            EmbedKind::Handpicked => self.api.handpicked(argument()?, query)?,
            EmbedKind::Collection => self.api.collection(argument()?, query)?,
            EmbedKind::RelatedListings => {
                self.api.listings_related_to_article(argument()?, query)?
            }
        };

        let template = container.template.as_deref().unwrap_or(DEFAULT_TEMPLATE);
        let data = json!({
            "listings": response.get("listings").cloned().unwrap_or(Value::Null),
        });
        Ok(reverb_template::render(template, &data, &self.settings)?)
    }
}

/// 按类型顺序收集页面中的嵌入容器
fn scan(page: &str) -> Result<Vec<Container>> {
    let document = Html::parse_document(page);
    let mut containers = Vec::new();

    for kind in EmbedKind::iter() {
        // 容器自身缺少主参数时, 取页面中第一个带有该参数的元素
        let fallback = match kind.argument() {
            Some(name) => document
                .select(&parse_selector(&format!("[data-{name}]"))?)
                .next()
                .and_then(|el| el.value().attr(&format!("data-{name}")))
                .map(str::to_string),
            None => None,
        };

        for el in document.select(&parse_selector(&kind.selector())?) {
            let argument = kind
                .argument()
                .and_then(|name| el.value().attr(&format!("data-{name}")))
                .map(str::to_string)
                .or_else(|| fallback.clone());

            containers.push(Container {
                kind,
                argument,
                query: query_options(el),
                template: template(&document, el),
            });
        }
    }

    Ok(containers)
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| Error::Selector(format!("{selector}: {e}")))
}

/// 提取容器的查询参数
///
/// `data-reverb-search-price-max="500"` 转为 `price_max=500`.
fn query_options(el: ElementRef) -> QueryOptions {
    let mut options = el
        .value()
        .attrs()
        .filter_map(|(name, value)| {
            let key = camel_case(name.strip_prefix("data-")?);
            let param = key.strip_prefix(SEARCH_PREFIX)?;
            Some((snake_case(param), value.to_string()))
        })
        .collect::<QueryOptions>();

    if let Some(aid) = el.value().attr(AFFILIATE_ATTRIBUTE).filter(|aid| !aid.is_empty()) {
        options.insert("_aid".to_string(), aid.to_string());
    }
    options
}

/// 读取容器指定的模板, 未指定或未找到时返回 None
fn template(document: &Html, el: ElementRef) -> Option<String> {
    let selector = el.value().attr(TEMPLATE_ATTRIBUTE)?;

    let template = match Selector::parse(selector) {
        Ok(parsed) => document.select(&parsed).next().map(|el| match el.value().name() {
            // 脚本内容为原始文本, 不做转义
            "script" | "style" => el.text().collect(),
            _ => el.inner_html(),
        }),
        Err(_) => None,
    };
    if template.is_none() {
        warn!("template `{selector}` not found, using default template");
    }
    template
}

/// 将渲染结果追加到对应容器末尾
fn rewrite(page: &str, rendered: &HashMap<(EmbedKind, usize), String>) -> Result<String> {
    let handlers = EmbedKind::iter()
        .map(|kind| {
            let mut index = 0;
            element!(kind.selector(), move |el| {
                if let Some(html) = rendered.get(&(kind, index)) {
                    el.append(html, ContentType::Html);
                }
                index += 1;
                Ok(())
            })
        })
        .collect();

    Ok(rewrite_str(
        page,
        RewriteStrSettings {
            element_content_handlers: handlers,
            ..Default::default()
        },
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan() {
        let page = r##"
            <div data-reverb-collection-name="first"></div>
            <div data-reverb-embed-collection data-reverb-search-per-page="3"
                 data-reverb-aid="aff" data-template="#tpl"></div>
            <div data-reverb-embed-listings data-reverb-search-price-max="500"
                 data-reverb-search-query="strat" data-template="#missing"></div>
            <script id="tpl" type="text/template"><%= listings.length %></script>
        "##;

        let containers = scan(page).unwrap();
        assert_eq!(containers.len(), 2);

        assert_eq!(containers[0].kind, EmbedKind::Listings);
        assert_eq!(containers[0].query["price_max"], "500");
        assert_eq!(containers[0].query["query"], "strat");
        assert_eq!(containers[0].template, None);

        assert_eq!(containers[1].kind, EmbedKind::Collection);
        assert_eq!(containers[1].argument.as_deref(), Some("first"));
        assert_eq!(containers[1].query["per_page"], "3");
        assert_eq!(containers[1].query["_aid"], "aff");
        assert_eq!(
            containers[1].template.as_deref(),
            Some("<%= listings.length %>")
        );
    }

    #[test]
    fn test_template() {
        let page = r##"
            <script id="raw" type="text/template"><% if (a < b && c) { %>&amp;<% } %></script>
            <div id="markup"><b>x</b> &amp; y</div>
            <div data-template="#raw"></div>
            <div data-template="#markup"></div>
        "##;
        let document = Html::parse_document(page);
        let containers = document
            .select(&parse_selector("[data-template]").unwrap())
            .map(|el| template(&document, el))
            .collect::<Vec<_>>();

        assert_eq!(containers[0].as_deref(), Some("<% if (a < b && c) { %>&amp;<% } %>"));
        assert_eq!(containers[1].as_deref(), Some("<b>x</b> &amp; y"));
    }

    #[test]
    fn test_rewrite() {
        let page = "<div data-reverb-embed-listings>a</div><p data-reverb-embed-listings></p>";
        let rendered = HashMap::from([((EmbedKind::Listings, 1), "<b>x</b>".to_string())]);

        assert_eq!(
            rewrite(page, &rendered).unwrap(),
            "<div data-reverb-embed-listings>a</div><p data-reverb-embed-listings><b>x</b></p>"
        );
    }
}
