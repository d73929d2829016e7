//! 测试 REST 接口客户端

use mockito::{Matcher, Server};
use reverb::{
    ApiErrorKind,
    models::{ApiOptionsBuilder, QueryOptions},
    services::ReverbApi,
    traits::api::ListingsApi,
};
use serde_json::json;

fn new_api(server: &Server, token: Option<&str>) -> ReverbApi {
    let mut builder = ApiOptionsBuilder::default();
    // 不带末尾 `/`, 由客户端补全
    builder.base_url(format!("{}/api", server.url()));
    if let Some(token) = token {
        builder.api_token(token);
    }
    ReverbApi::new(&builder.build().unwrap()).unwrap()
}

fn query(pairs: &[(&str, &str)]) -> QueryOptions {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn encoded(key: &str, value: &str) -> Matcher {
    Matcher::UrlEncoded(key.to_string(), value.to_string())
}

//////////////// test ////////////////

#[test]
fn test_base_url() {
    let server = Server::new();
    let api = new_api(&server, None);

    assert_eq!(api.base_url(), format!("{}/api/", server.url()));
}

#[test]
fn test_search_listings() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/listings")
        .match_query(Matcher::AllOf(vec![
            encoded("condition", "all"),
            encoded("query", "strat"),
        ]))
        .match_header("x-auth-token", "secret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"listings": [{"title": "Strat"}]}"#)
        .create();

    let api = new_api(&server, Some("secret"));
    let response = api.search_listings(&query(&[("query", "strat")])).unwrap();

    mock.assert();
    assert_eq!(response, json!({"listings": [{"title": "Strat"}]}));
}

#[test]
fn test_search_listings_condition_override() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/listings")
        .match_query(encoded("condition", "used"))
        .match_header("x-auth-token", Matcher::Missing)
        .with_body("{}")
        .create();

    let api = new_api(&server, None);
    api.search_listings(&query(&[("condition", "used")])).unwrap();

    mock.assert();
}

#[test]
fn test_search_affiliate() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/collections/affiliate-product-pool")
        .match_query(Matcher::AllOf(vec![
            encoded("sort", "random"),
            encoded("_aid", "aff"),
        ]))
        .with_body("{}")
        .create();

    let api = new_api(&server, None);
    api.search_affiliate(&query(&[("sort", "price"), ("_aid", "aff")]))
        .unwrap();

    mock.assert();
}

#[test]
fn test_endpoints() {
    let mut server = Server::new();
    let mocks = [
        "/api/handpicked/deals",
        "/api/collections/80s-strats",
        "/api/priceguide",
        "/api/articles/my-article/related-listings",
    ]
    .map(|path| {
        server
            .mock("GET", path)
            .match_query(encoded("per_page", "3"))
            .with_body("{}")
            .create()
    });

    let api = new_api(&server, None);
    let options = query(&[("per_page", "3")]);
    api.handpicked("deals", &options).unwrap();
    api.collection("80s-strats", &options).unwrap();
    api.search_priceguide(&options).unwrap();
    api.listings_related_to_article("my-article", &options)
        .unwrap();

    for mock in mocks {
        mock.assert();
    }
}

#[test]
fn test_errors() {
    let mut server = Server::new();
    let _missing = server
        .mock("GET", "/api/collections/missing")
        .with_status(404)
        .create();
    let _broken = server
        .mock("GET", "/api/priceguide")
        .with_body("not json")
        .create();

    let api = new_api(&server, None);

    let error = api.collection("missing", &QueryOptions::new()).unwrap_err();
    assert_eq!(error.url, format!("{}/api/collections/missing", server.url()));
    assert!(matches!(error.error, ApiErrorKind::Status(status) if status.as_u16() == 404));

    let error = api.search_priceguide(&QueryOptions::new()).unwrap_err();
    assert!(matches!(error.error, ApiErrorKind::SerdeJson(_)));
}
