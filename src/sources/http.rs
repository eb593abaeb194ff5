use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::UpstreamError;
use crate::observability::metrics::get_metrics;
use crate::utils::constants::truncate_diagnostic;

/// Send `request` and decode the body as JSON.
///
/// 401 maps to `Unauthorized`, any other non-2xx to `Status` with a truncated
/// body. A 2xx body carrying a top-level `error` object is `Rejected`.
pub async fn fetch_json(
    request: RequestBuilder,
    upstream: &'static str,
    endpoint: &'static str,
) -> Result<Value, UpstreamError> {
    let metrics = get_metrics().await;
    metrics.upstream_requests.with_label_values(&[upstream, endpoint]).inc();
    let timer = metrics.upstream_duration.with_label_values(&[upstream]).start_timer();

    let result = send_and_decode(request).await;
    timer.observe_duration();

    if let Err(err) = &result {
        warn!(upstream, endpoint, reason = err.reason(), "upstream call failed: {}", err);
        metrics.upstream_failures.with_label_values(&[upstream, err.reason()]).inc();
    } else {
        debug!(upstream, endpoint, "upstream call ok");
    }
    result
}

async fn send_and_decode(request: RequestBuilder) -> Result<Value, UpstreamError> {
    let response = request.send().await?;
    let response = check_status(response).await?;
    let body = response.text().await?;
    let value: Value = serde_json::from_str(&body)
        .map_err(|e| UpstreamError::InvalidJson(truncate_diagnostic(&format!("{e}: {body}"))))?;

    if let Some(error) = value.get("error").filter(|e| e.is_object()) {
        return Err(UpstreamError::Rejected(truncate_diagnostic(&error.to_string())));
    }
    Ok(value)
}

/// Pass 2xx responses through, turn everything else into an `UpstreamError`.
pub async fn check_status(response: Response) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == http::StatusCode::UNAUTHORIZED {
        return Err(UpstreamError::Unauthorized);
    }
    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::Status {
        status: status.as_u16(),
        body: truncate_diagnostic(&body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use serde_json::json;

    fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("reqwest client")
    }

    #[tokio::test]
    async fn decodes_json_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ok");
                then.status(200).json_body(json!({"value": 1}));
            })
            .await;

        let got = fetch_json(client().get(server.url("/ok")), "test", "ok").await.unwrap();
        assert_eq!(got["value"], 1);
    }

    #[tokio::test]
    async fn maps_statuses_and_bodies() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/401");
                then.status(401).body("nope");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/503");
                then.status(503).body("x".repeat(2000));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/html");
                then.status(200).body("<html>");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rejected");
                then.status(200).json_body(json!({"error": {"code": 2240526, "message": "bad"}}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/error-string");
                then.status(200).json_body(json!({"error": "just a field"}));
            })
            .await;

        let c = client();
        assert_eq!(
            fetch_json(c.get(server.url("/401")), "test", "t").await,
            Err(UpstreamError::Unauthorized)
        );
        match fetch_json(c.get(server.url("/503")), "test", "t").await {
            Err(UpstreamError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body.len(), 500);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            fetch_json(c.get(server.url("/html")), "test", "t").await,
            Err(UpstreamError::InvalidJson(_))
        ));
        assert!(matches!(
            fetch_json(c.get(server.url("/rejected")), "test", "t").await,
            Err(UpstreamError::Rejected(_))
        ));
        assert!(fetch_json(c.get(server.url("/error-string")), "test", "t").await.is_ok());
    }
}
