use std::collections::HashSet;

use axum::http::Method;
use axum::http::StatusCode;
use serde_json::json;

use crate::tests::helper;

#[tokio::test]
async fn test_list_links_paginated() {
    let mut test_app = helper::setup_test_app().await;
    let app = &mut test_app.app;

    let mut created = HashSet::new();
    for i in 0..7 {
        created.insert(helper::shorten(app, &format!("https://example.com/{i}"), None).await);
    }

    let access_token = helper::login(app).await;

    let mut listed = Vec::new();
    for page in 1..=3 {
        let (status_code, body) = helper::list_links(app, &access_token, page, 3).await;
        assert_eq!(StatusCode::OK, status_code);
        assert_eq!(7, body["total"].as_u64().unwrap());
        assert_eq!(3, body["pages"].as_u64().unwrap());
        assert_eq!(u64::from(page), body["page"].as_u64().unwrap());

        for link in body["items"].as_array().unwrap() {
            listed.push(link["short_token"].as_str().unwrap().to_string());
        }
    }

    // no overlap, nothing missing
    assert_eq!(7, listed.len());
    assert_eq!(created, listed.into_iter().collect::<HashSet<_>>());

    // past the end
    let (status_code, body) = helper::list_links(app, &access_token, 4, 3).await;
    assert_eq!(StatusCode::OK, status_code);
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_links_invalid_page() {
    let mut test_app = helper::setup_test_app().await;
    let app = &mut test_app.app;

    let access_token = helper::login(app).await;

    let (status_code, body) = helper::list_links(app, &access_token, 1, 0).await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("Invalid per_page", helper::get_error_message(&body));

    let (status_code, body) = helper::list_links(app, &access_token, 0, 20).await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("Invalid page", helper::get_error_message(&body));

    let (status_code, body) = helper::admin(
        app,
        &access_token,
        Method::GET,
        "/admin/links?page=first",
        None,
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("Invalid query parameter", helper::get_error_message(&body));

    // capped
    let (status_code, body) = helper::list_links(app, &access_token, 1, 1000).await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(100, body["per_page"].as_u64().unwrap());
}

#[tokio::test]
async fn test_delete_link() {
    let mut test_app = helper::setup_test_app().await;

    let short_token = helper::shorten(&mut test_app.app, "https://example.com/a", None).await;
    let other_token = helper::shorten(&mut test_app.app, "https://example.com/b", None).await;

    helper::root(&mut test_app.app, &short_token, Some(helper::BROWSER)).await;
    test_app.settle().await;

    let app = &mut test_app.app;
    let access_token = helper::login(app).await;

    let short_url = format!("https://sni.pr/{short_token}");
    let (status_code, body) = helper::delete_link(app, &access_token, &short_url).await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!("URL deleted successfully", helper::get_message(&body));

    // gone for good
    let (status_code, _, _) = helper::root(app, &short_token, None).await;
    assert_eq!(StatusCode::NOT_FOUND, status_code);

    let (status_code, body) = helper::link_details(app, &access_token, &short_token).await;
    assert_eq!(StatusCode::NOT_FOUND, status_code);
    assert_eq!("URL not found", helper::get_error_message(&body));

    let (status_code, body) = helper::delete_link(app, &access_token, &short_url).await;
    assert_eq!(StatusCode::NOT_FOUND, status_code);
    assert_eq!("URL not found", helper::get_error_message(&body));

    // the other one survived
    let (status_code, _, _) = helper::root(app, &other_token, None).await;
    assert_eq!(StatusCode::FOUND, status_code);
}

#[tokio::test]
async fn test_delete_link_missing_short_url() {
    let mut test_app = helper::setup_test_app().await;
    let app = &mut test_app.app;

    let access_token = helper::login(app).await;

    let (status_code, body) =
        helper::admin(app, &access_token, Method::DELETE, "/admin/links", None).await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("Missing short URL", helper::get_error_message(&body));

    let (status_code, body) = helper::admin(
        app,
        &access_token,
        Method::DELETE,
        "/admin/links",
        Some(json!({ "short_url": "" })),
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("Missing short URL", helper::get_error_message(&body));
}

#[tokio::test]
async fn test_delete_all_links() {
    let mut test_app = helper::setup_test_app().await;
    let app = &mut test_app.app;

    let short_token = helper::shorten(app, "https://example.com/a", None).await;
    helper::shorten(app, "https://example.com/b", None).await;

    let access_token = helper::login(app).await;

    let (status_code, body) = helper::admin(
        app,
        &access_token,
        Method::DELETE,
        "/admin/links?bulk=TRUE",
        None,
    )
    .await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!("All URLs deleted successfully", helper::get_message(&body));

    let (_, body) = helper::list_links(app, &access_token, 1, 20).await;
    assert_eq!(0, body["total"].as_u64().unwrap());

    let (status_code, _, _) = helper::root(app, &short_token, None).await;
    assert_eq!(StatusCode::NOT_FOUND, status_code);
}

#[tokio::test]
async fn test_link_details() {
    let mut test_app = helper::setup_test_app().await;
    let app = &mut test_app.app;

    let short_token = helper::shorten(app, "https://example.com/a", Some("MXc=")).await;

    let access_token = helper::login(app).await;

    let (status_code, body) = helper::link_details(app, &access_token, &short_token).await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(short_token, body["short_token"].as_str().unwrap());
    assert_eq!("https://example.com/a", body["original_url"].as_str().unwrap());
    assert_eq!("10.0.0.1", body["submitter_ip"].as_str().unwrap());
    assert!(body["expires_at"].is_string());
    assert_eq!(0, body["safe_view_count"].as_i64().unwrap());
    assert!(body["recent_views"].as_array().unwrap().is_empty());

    let (status_code, body) = helper::link_details(app, &access_token, "abc123").await;
    assert_eq!(StatusCode::NOT_FOUND, status_code);
    assert_eq!("URL not found", helper::get_error_message(&body));
}
