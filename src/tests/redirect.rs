use axum::http::StatusCode;

use crate::tests::helper;

#[tokio::test]
async fn test_redirect() {
    let mut test_app = helper::setup_test_app().await;
    let app = &mut test_app.app;

    let short_token = helper::shorten(app, "https://example.com/a", None).await;

    let (status_code, location, _) =
        helper::root(app, &short_token, Some(helper::BROWSER)).await;
    assert_eq!(StatusCode::FOUND, status_code);
    assert_eq!(Some("https://example.com/a".to_string()), location);
}

#[tokio::test]
async fn test_redirect_keeps_url_intact() {
    let mut test_app = helper::setup_test_app().await;
    let app = &mut test_app.app;

    let url = "https://example.com/some/path?query=value&other=1#fragment";
    let short_token = helper::shorten(app, url, None).await;

    let (status_code, location, _) = helper::root(app, &short_token, None).await;
    assert_eq!(StatusCode::FOUND, status_code);
    assert_eq!(Some(url.to_string()), location);
}

#[tokio::test]
async fn test_redirect_to_url_as_submitted() {
    let mut test_app = helper::setup_test_app().await;
    let app = &mut test_app.app;

    for url in [
        "https://example.com",
        "https://EXAMPLE.com/A",
        "https://example.com:443/x",
        "https://example.com/a/../b",
    ] {
        let short_token = helper::shorten(app, url, None).await;

        let (status_code, location, _) = helper::root(app, &short_token, None).await;
        assert_eq!(StatusCode::FOUND, status_code);
        assert_eq!(Some(url.to_string()), location);
    }

    // surrounding whitespace is not part of the URL
    let short_token = helper::shorten(app, "  https://example.com/b  ", None).await;
    let (_, location, _) = helper::root(app, &short_token, None).await;
    assert_eq!(Some("https://example.com/b".to_string()), location);
}

#[tokio::test]
async fn test_redirect_unknown_token() {
    let mut test_app = helper::setup_test_app().await;
    let app = &mut test_app.app;

    let (status_code, location, body) = helper::root(app, "abc123", None).await;
    assert_eq!(StatusCode::NOT_FOUND, status_code);
    assert_eq!(None, location);
    assert_eq!(r#"{"error":"URL not found"}"#, body);

    // can never be a token
    let (status_code, location, _) = helper::root(app, "not-a-token", None).await;
    assert_eq!(StatusCode::NOT_FOUND, status_code);
    assert_eq!(None, location);

    let (status_code, _, _) = helper::root(app, "%20", None).await;
    assert_eq!(StatusCode::NOT_FOUND, status_code);

    // nothing nested
    let (status_code, _, body) = helper::root(app, "abc/123", None).await;
    assert_eq!(StatusCode::NOT_FOUND, status_code);
    assert_eq!(r#"{"error":"URL not found"}"#, body);
}

#[tokio::test]
async fn test_redirect_records_views() {
    let mut test_app = helper::setup_test_app().await;

    let short_token = helper::shorten(&mut test_app.app, "https://example.com/a", None).await;

    helper::root(&mut test_app.app, &short_token, Some(helper::BROWSER)).await;
    helper::root(&mut test_app.app, &short_token, Some(helper::BROWSER)).await;
    helper::root(&mut test_app.app, &short_token, Some("Googlebot/2.1")).await;
    helper::root(&mut test_app.app, &short_token, None).await;

    test_app.settle().await;

    let access_token = helper::login(&mut test_app.app).await;
    let (status_code, body) =
        helper::link_details(&mut test_app.app, &access_token, &short_token).await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(2, body["safe_view_count"].as_i64().unwrap());
    assert_eq!(2, body["unsafe_view_count"].as_i64().unwrap());

    let recent_views = body["recent_views"].as_array().unwrap();
    assert_eq!(4, recent_views.len());
    assert!(
        recent_views
            .iter()
            .all(|view| view["client_ip"].as_str() == Some("10.0.0.1"))
    );
}
