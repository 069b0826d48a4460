//! Responses the shell synthesizes when neither cache nor network can answer.

use axum::http::StatusCode;
use serde_json::json;

use super::fetch::FetchResponse;

pub const OFFLINE_MESSAGE: &str = "You are offline. Please check your network connection.";

const OFFLINE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Offline - VEXUM Attendance</title>
  <style>
    body {
      font-family: 'Noto Sans JP', sans-serif;
      display: flex;
      justify-content: center;
      align-items: center;
      min-height: 100vh;
      background: #f9fafb;
      color: #1f2937;
      text-align: center;
      padding: 1rem;
    }
    .offline-message { max-width: 400px; }
    h1 { color: #0ea5e9; font-size: 2rem; margin-bottom: 1rem; }
    p { font-size: 1rem; line-height: 1.6; color: #6b7280; }
  </style>
</head>
<body>
  <div class="offline-message">
    <h1>Offline</h1>
    <p>You are currently offline.<br>Please check your network connection.</p>
    <p style="margin-top: 2rem;"><a href="/" style="color: #0ea5e9;">Reload</a></p>
  </div>
</body>
</html>
"#;

/// 503 JSON body for a failed attendance service call.
pub fn offline_service_response() -> FetchResponse {
    let body = json!({ "ok": false, "message": OFFLINE_MESSAGE }).to_string();
    FetchResponse::synthetic(StatusCode::SERVICE_UNAVAILABLE, "application/json", body)
}

/// 503 HTML page standing in for an unreachable static resource.
pub fn offline_page_response() -> FetchResponse {
    FetchResponse::synthetic(StatusCode::SERVICE_UNAVAILABLE, "text/html", OFFLINE_PAGE)
}
