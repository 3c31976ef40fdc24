use axum::http::StatusCode;

use crate::tests::helper;

#[tokio::test]
async fn test_invalid_json() {
    let mut test_app = helper::setup_test_app().await;
    let app = &mut test_app.app;

    // wrong data
    let body = r#"{"url":5}"#;
    let (status_code, body) = helper::maybe_shorten_with_raw_body(app, body, true).await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("Data error", helper::get_error_message(&body));
    assert!(body["description"].is_string());

    // syntax error
    let body = r#"{"}"#;
    let (status_code, body) = helper::maybe_shorten_with_raw_body(app, body, true).await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("JSON syntax error", helper::get_error_message(&body));
    assert_eq!(
        "EOF while parsing a string at line 1 column 3",
        body["description"].as_str().unwrap()
    );

    // valid but empty
    let body = r"{}";
    let (status_code, body) = helper::maybe_shorten_with_raw_body(app, body, true).await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!(
        "Missing url, captcha or invalid expiry",
        helper::get_error_message(&body)
    );

    // missing content type
    let body = r"{}";
    let (status_code, body) = helper::maybe_shorten_with_raw_body(app, body, false).await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!(
        "Missing `application/json` content type",
        helper::get_error_message(&body)
    );
}
