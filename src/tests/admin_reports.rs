use axum::Router;
use axum::http::Method;
use axum::http::StatusCode;
use serde_json::json;

use crate::tests::helper;

/// Report a fresh link twice, returns the admin token and the report IDs
async fn setup_reports(app: &mut Router) -> (String, Vec<String>) {
    let short_token = helper::shorten(app, "https://example.com/spam", None).await;

    for _ in 0..2 {
        let (status_code, _) =
            helper::maybe_report(app, Some(&short_token), Some(helper::VALID_CAPTCHA)).await;
        assert_eq!(StatusCode::OK, status_code);
    }

    let access_token = helper::login(app).await;

    let (_, body) = helper::list_reports(app, &access_token).await;
    let report_ids = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|report| report["id"].as_str().unwrap().to_string())
        .collect();

    (access_token, report_ids)
}

#[tokio::test]
async fn test_delete_report() {
    let mut test_app = helper::setup_test_app().await;
    let app = &mut test_app.app;

    let (access_token, report_ids) = setup_reports(app).await;
    assert_eq!(2, report_ids.len());

    // by body
    let (status_code, body) = helper::admin(
        app,
        &access_token,
        Method::DELETE,
        "/admin/reports",
        Some(json!({ "report_id": report_ids[0] })),
    )
    .await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!("Report deleted successfully", helper::get_message(&body));

    // by query
    let uri = format!("/admin/reports?report_id={}", report_ids[1]);
    let (status_code, _) = helper::admin(app, &access_token, Method::DELETE, &uri, None).await;
    assert_eq!(StatusCode::OK, status_code);

    // twice
    let (status_code, body) = helper::admin(app, &access_token, Method::DELETE, &uri, None).await;
    assert_eq!(StatusCode::NOT_FOUND, status_code);
    assert_eq!("Report not found", helper::get_error_message(&body));

    let (_, body) = helper::list_reports(app, &access_token).await;
    assert_eq!(0, body["total"].as_u64().unwrap());
}

#[tokio::test]
async fn test_delete_report_invalid_id() {
    let mut test_app = helper::setup_test_app().await;
    let app = &mut test_app.app;

    let (access_token, _) = setup_reports(app).await;

    let (status_code, body) =
        helper::admin(app, &access_token, Method::DELETE, "/admin/reports", None).await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("Missing report ID", helper::get_error_message(&body));

    let (status_code, body) = helper::admin(
        app,
        &access_token,
        Method::DELETE,
        "/admin/reports?report_id=42",
        None,
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("Invalid report ID", helper::get_error_message(&body));

    // untouched
    let (_, body) = helper::list_reports(app, &access_token).await;
    assert_eq!(2, body["total"].as_u64().unwrap());
}

#[tokio::test]
async fn test_delete_all_reports() {
    let mut test_app = helper::setup_test_app().await;
    let app = &mut test_app.app;

    let (access_token, _) = setup_reports(app).await;

    let (status_code, body) = helper::admin(
        app,
        &access_token,
        Method::DELETE,
        "/admin/reports/bulk",
        None,
    )
    .await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(
        "All reports deleted successfully",
        helper::get_message(&body)
    );

    let (_, body) = helper::list_reports(app, &access_token).await;
    assert_eq!(0, body["total"].as_u64().unwrap());
}
