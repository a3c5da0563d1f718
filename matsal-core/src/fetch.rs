//! Retrying HTTP fetch used by all upstream adapters.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::ports::PortError;

/// Statuses retried by default: timeouts and transient server failures.
pub const DEFAULT_RETRY_ON: [u16; 6] = [408, 500, 502, 503, 504, 524];

/// When and how often a request is repeated.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts before giving up.
    pub max_attempts: u32,
    /// Base wait between attempts; attempt `n` waits `n * backoff`.
    pub backoff: Duration,
    /// Response statuses that trigger another attempt.
    pub retry_on: Vec<StatusCode>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(250),
            retry_on: DEFAULT_RETRY_ON
                .iter()
                .filter_map(|code| StatusCode::from_u16(*code).ok())
                .collect(),
        }
    }
}

impl RetryPolicy {
    /// Default policy with a different attempt count and backoff.
    #[must_use]
    pub fn with_attempts(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
            ..Self::default()
        }
    }
}

/// Send a request, repeating it while the response status is in `policy.retry_on`.
///
/// Any other status, including 404, is returned as-is. Transport failures are
/// not retried.
///
/// # Errors
///
/// Returns [`PortError::RetriesExhausted`] when every attempt was answered with a
/// retryable status, and [`PortError::Network`] when the request could not be sent.
pub async fn send_with_retry(
    request: RequestBuilder,
    policy: &RetryPolicy,
) -> Result<Response, PortError> {
    let mut attempts = 0;

    while attempts < policy.max_attempts {
        attempts += 1;

        let attempt = request
            .try_clone()
            .ok_or_else(|| PortError::Internal("request body cannot be replayed".to_owned()))?;

        let response = attempt.send().await?;
        let status = response.status();
        debug!(url = %response.url(), %status, attempt = attempts, "upstream response");

        if !policy.retry_on.contains(&status) {
            return Ok(response);
        }

        if attempts == policy.max_attempts {
            warn!(url = %response.url(), %status, attempts, "giving up on upstream request");
            break;
        }

        let wait = policy.backoff * attempts;
        warn!(url = %response.url(), %status, ?wait, "retrying upstream request");
        sleep(wait).await;
    }

    Err(PortError::RetriesExhausted { attempts })
}

/// Send a request with retries and decode a successful JSON response.
///
/// # Errors
///
/// Returns a [`PortError`] on exhausted retries, non-success statuses, or
/// bodies that do not decode into `T`.
pub async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    policy: &RetryPolicy,
) -> Result<T, PortError> {
    decode_json(send_with_retry(request, policy).await?).await
}

/// Decode a JSON response, rejecting non-success statuses.
///
/// # Errors
///
/// Returns [`PortError::Network`] for non-success statuses and [`PortError::Parse`]
/// for bodies that do not decode into `T`.
pub async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, PortError> {
    response
        .error_for_status()?
        .json()
        .await
        .map_err(decode_error)
}

/// Send a request with retries and return a successful response body as text.
///
/// # Errors
///
/// Returns a [`PortError`] on exhausted retries or non-success statuses.
pub async fn fetch_text(request: RequestBuilder, policy: &RetryPolicy) -> Result<String, PortError> {
    Ok(send_with_retry(request, policy)
        .await?
        .error_for_status()?
        .text()
        .await?)
}

fn decode_error(err: reqwest::Error) -> PortError {
    if err.is_decode() {
        PortError::Parse(err.to_string())
    } else {
        PortError::Network(err)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use reqwest::Client;
    use serde::Deserialize;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::ports::ErrorKind;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::with_attempts(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let err = send_with_retry(
            Client::new().get(format!("{}/flaky", server.uri())),
            &fast_policy(),
        )
        .await
        .expect_err("retries exhausted");

        assert!(
            matches!(err, PortError::RetriesExhausted { attempts: 3 }),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn no_wait_after_the_last_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;
        let policy = RetryPolicy::with_attempts(2, Duration::from_millis(400));

        let started = Instant::now();
        let err = send_with_retry(Client::new().get(server.uri()), &policy)
            .await
            .expect_err("retries exhausted");

        assert_eq!(err.kind(), ErrorKind::Upstream, "unexpected error: {err}");
        // One 400 ms wait between the two attempts; a trailing wait would add 800 ms.
        assert!(
            started.elapsed() < Duration::from_millis(1100),
            "took {:?}",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn does_not_retry_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let response = send_with_retry(
            Client::new().get(format!("{}/gone", server.uri())),
            &fast_policy(),
        )
        .await
        .expect("404 is returned as-is");

        assert_eq!(response.status(), StatusCode::NOT_FOUND, "status preserved");
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        #[derive(Deserialize)]
        struct Payload {
            value: String,
        }

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/meal"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/meal"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"value":"Tacos"}"#, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let payload: Payload = fetch_json(
            Client::new().get(format!("{}/meal", server.uri())),
            &fast_policy(),
        )
        .await
        .expect("second attempt succeeds");

        assert_eq!(payload.value, "Tacos", "decoded body");
    }

    #[tokio::test]
    async fn undecodable_json_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html>nope</html>", "application/json"))
            .mount(&server)
            .await;

        let err = fetch_json::<Vec<u32>>(Client::new().get(server.uri()), &fast_policy())
            .await
            .expect_err("not json");

        assert_eq!(err.kind(), ErrorKind::Parse, "unexpected error: {err}");
    }
}
