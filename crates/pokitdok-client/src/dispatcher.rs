//! Authenticated request dispatch
//!
//! One call, one round trip: resolve the URL under `{base}/api/{version}`,
//! attach the bearer token, send, and decode. Nothing is retried. A request
//! that carries a file is always sent as a multipart POST, whatever verb the
//! caller asked for.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};

use pokitdok_auth::TokenSource;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Url};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::metrics;
use crate::response::{ApiBody, ApiResponse};

/// Multipart field name for uploaded files.
const FILE_FIELD: &str = "file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }

    fn method(self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Put => Method::PUT,
            Verb::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Verb::Get),
            "POST" => Ok(Verb::Post),
            "PUT" => Ok(Verb::Put),
            "DELETE" => Ok(Verb::Delete),
            other => Err(Error::InvalidRequest(format!(
                "unsupported HTTP verb: {other}"
            ))),
        }
    }
}

/// Sends requests for one client instance.
///
/// The status of the most recent response is mirrored in `last_status_code`.
/// Each `ApiResponse` also carries its own status; prefer that when calls run
/// concurrently, since the mirror only holds whichever call finished last.
pub struct Dispatcher {
    http: reqwest::Client,
    api_url: String,
    timeout: Duration,
    user_agent: String,
    tokens: Arc<dyn TokenSource>,
    last_status: AtomicU16,
}

impl Dispatcher {
    pub fn new(
        http: reqwest::Client,
        api_url: impl Into<String>,
        timeout: Duration,
        user_agent: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        let api_url: String = api_url.into();
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            timeout,
            user_agent: user_agent.into(),
            tokens,
            last_status: AtomicU16::new(0),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Full URL for an endpoint path. A single leading `/` is ignored.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        let path = endpoint.strip_prefix('/').unwrap_or(endpoint);
        format!("{}/{}", self.api_url, path)
    }

    /// Status of the most recent response, if any call has completed.
    pub fn last_status_code(&self) -> Option<u16> {
        match self.last_status.load(Ordering::Relaxed) {
            0 => None,
            status => Some(status),
        }
    }

    /// Send one request and decode the response.
    ///
    /// GET and DELETE encode `params` (a JSON object, or null) as the query
    /// string; POST and PUT send it as the JSON body. With `file`, `params`
    /// is ignored and the file is posted as multipart form data.
    #[instrument(skip_all, fields(verb = %verb, endpoint = %endpoint))]
    pub async fn send(
        &self,
        endpoint: &str,
        verb: Verb,
        params: &Value,
        file: Option<&Path>,
    ) -> Result<ApiResponse> {
        let url = self.endpoint_url(endpoint);

        let (request, sent_verb) = match file {
            Some(path) => {
                if verb != Verb::Post {
                    debug!(requested = %verb, "file upload sent as POST");
                }
                (self.multipart_request(&url, path).await?, Verb::Post)
            }
            None => (self.body_request(&url, verb, params)?, verb),
        };

        let request = request
            .bearer_auth(self.tokens.bearer_token())
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .timeout(self.timeout);

        let started = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_transport_error(metrics::transport_error_type(&e));
                warn!(error = %e, "request failed before a response arrived");
                return Err(Error::transport(&e));
            }
        };

        let status = response.status().as_u16();
        self.last_status.store(status, Ordering::Relaxed);

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                metrics::record_transport_error(metrics::transport_error_type(&e));
                warn!(error = %e, status, "failed to read response body");
                return Err(Error::transport(&e));
            }
        };
        metrics::record_request(status, sent_verb.as_str(), started.elapsed().as_secs_f64());
        debug!(status, bytes = bytes.len(), "response received");

        let body = ApiBody::decode(sent_verb, status, &bytes)?;
        Ok(ApiResponse { status, body })
    }

    fn body_request(&self, url: &str, verb: Verb, params: &Value) -> Result<RequestBuilder> {
        match verb {
            Verb::Get | Verb::Delete => {
                let url = with_query(url, params)?;
                Ok(self.http.request(verb.method(), url))
            }
            Verb::Post | Verb::Put => {
                let request = self.http.request(verb.method(), url);
                Ok(match params {
                    Value::Null => request.json(&serde_json::json!({})),
                    body => request.json(body),
                })
            }
        }
    }

    async fn multipart_request(&self, url: &str, path: &Path) -> Result<RequestBuilder> {
        let contents = tokio::fs::read(path)
            .await
            .map_err(|e| Error::Upload(format!("reading {}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| FILE_FIELD.to_string());

        let part = Part::bytes(contents).file_name(file_name);
        let form = Form::new().part(FILE_FIELD, part);
        Ok(self.http.post(url).multipart(form))
    }
}

/// Append a JSON object's entries to `url` as query pairs.
///
/// Strings are sent verbatim, arrays repeat the key once per element, and
/// nested objects are sent as compact JSON. Null values are skipped.
fn with_query(url: &str, params: &Value) -> Result<Url> {
    let mut url =
        Url::parse(url).map_err(|e| Error::InvalidRequest(format!("invalid URL {url}: {e}")))?;

    let map = match params {
        Value::Null => return Ok(url),
        Value::Object(map) if map.is_empty() => return Ok(url),
        Value::Object(map) => map,
        other => {
            return Err(Error::InvalidRequest(format!(
                "query parameters must be a JSON object, got {other}"
            )));
        }
    };

    {
        let mut query = url.query_pairs_mut();
        for (key, value) in map {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        query.append_pair(key, &query_value(item));
                    }
                }
                other => {
                    query.append_pair(key, &query_value(other));
                }
            }
        }
    }
    Ok(url)
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::io::Write;
    use tokio::net::TcpListener;

    struct FixedToken(&'static str);

    impl TokenSource for FixedToken {
        fn bearer_token(&self) -> String {
            self.0.to_string()
        }
    }

    fn dispatcher(base: &str) -> Dispatcher {
        Dispatcher::new(
            reqwest::Client::new(),
            format!("{base}/api/v4"),
            Duration::from_secs(5),
            "pokitdok-rust-test",
            Arc::new(FixedToken("tok-123")),
        )
    }

    /// Upstream that echoes the request as JSON, except for a few paths with
    /// fixed answers used by the decoding tests.
    async fn start_echo_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let app = axum::Router::new()
            .route(
                "/api/v4/gone",
                axum::routing::delete(|| async { StatusCode::NO_CONTENT }),
            )
            .route(
                "/api/v4/kept",
                axum::routing::delete(|| async { StatusCode::OK }),
            )
            .route(
                "/api/v4/html",
                axum::routing::get(|| async { (StatusCode::OK, "<html>maintenance</html>") }),
            )
            .route(
                "/api/v4/missing",
                axum::routing::get(|| async {
                    (
                        StatusCode::NOT_FOUND,
                        axum::Json(json!({"meta": {}, "data": {"errors": {"query": "not found"}}})),
                    )
                }),
            )
            .route(
                "/api/v4/slow",
                axum::routing::get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    axum::Json(json!({}))
                }),
            )
            .fallback(|request: axum::http::Request<Body>| async move {
                let mut headers = serde_json::Map::new();
                for (name, value) in request.headers() {
                    headers.insert(
                        name.to_string(),
                        Value::String(value.to_str().unwrap_or("").to_string()),
                    );
                }
                let method = request.method().to_string();
                let path = request.uri().path().to_string();
                let query = request.uri().query().unwrap_or("").to_string();
                let body = axum::body::to_bytes(request.into_body(), 10 * 1024 * 1024)
                    .await
                    .unwrap();
                axum::Json(json!({
                    "method": method,
                    "path": path,
                    "query": query,
                    "headers": headers,
                    "body": String::from_utf8_lossy(&body),
                }))
            });

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        url
    }

    #[test]
    fn leading_slash_does_not_change_url() {
        let d = dispatcher("https://platform.pokitdok.com");
        assert_eq!(d.endpoint_url("/claims/"), d.endpoint_url("claims/"));
        assert_eq!(
            d.endpoint_url("/claims/"),
            "https://platform.pokitdok.com/api/v4/claims/"
        );
    }

    #[test]
    fn only_one_leading_slash_is_stripped() {
        let d = dispatcher("https://platform.pokitdok.com");
        assert_eq!(
            d.endpoint_url("//x"),
            "https://platform.pokitdok.com/api/v4//x"
        );
    }

    #[test]
    fn verb_parses_case_insensitively() {
        assert_eq!("get".parse::<Verb>().unwrap(), Verb::Get);
        assert_eq!("Delete".parse::<Verb>().unwrap(), Verb::Delete);
        assert!("PATCH".parse::<Verb>().is_err());
    }

    #[test]
    fn query_encodes_scalars_arrays_and_skips_null() {
        let url = with_query(
            "https://h/api/v4/providers/",
            &json!({"zipcode": "29307", "radius": 10, "specialty": null, "tags": ["a", "b"]}),
        )
        .unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("zipcode".into(), "29307".into())));
        assert!(pairs.contains(&("radius".into(), "10".into())));
        assert!(pairs.contains(&("tags".into(), "a".into())));
        assert!(pairs.contains(&("tags".into(), "b".into())));
        assert!(!pairs.iter().any(|(k, _)| k == "specialty"));
    }

    #[test]
    fn query_rejects_non_object_params() {
        let result = with_query("https://h/x", &json!("bare"));
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn bearer_token_and_user_agent_are_attached() {
        let base = start_echo_server().await;
        let d = dispatcher(&base);
        let response = d.send("providers/", Verb::Get, &Value::Null, None).await.unwrap();

        let body = response.json().unwrap();
        assert_eq!(body["headers"]["authorization"], "Bearer tok-123");
        assert_eq!(body["headers"]["user-agent"], "pokitdok-rust-test");
        assert_eq!(body["path"], "/api/v4/providers/");
    }

    #[tokio::test]
    async fn slash_variants_reach_the_same_path() {
        let base = start_echo_server().await;
        let d = dispatcher(&base);
        let with = d.send("/plans/", Verb::Get, &Value::Null, None).await.unwrap();
        let without = d.send("plans/", Verb::Get, &Value::Null, None).await.unwrap();
        assert_eq!(with.json().unwrap()["path"], without.json().unwrap()["path"]);
    }

    #[tokio::test]
    async fn get_params_become_query_string() {
        let base = start_echo_server().await;
        let d = dispatcher(&base);
        let response = d
            .send("providers/", Verb::Get, &json!({"npi": "1467560003"}), None)
            .await
            .unwrap();
        let body = response.json().unwrap();
        assert_eq!(body["method"], "GET");
        assert_eq!(body["query"], "npi=1467560003");
        assert_eq!(body["body"], "");
    }

    #[tokio::test]
    async fn post_and_put_send_json_bodies() {
        let base = start_echo_server().await;
        let d = dispatcher(&base);

        let post = d
            .send("claims/", Verb::Post, &json!({"trading_partner_id": "MOCKPAYER"}), None)
            .await
            .unwrap();
        let body = post.json().unwrap();
        assert_eq!(body["method"], "POST");
        assert_eq!(body["headers"]["content-type"], "application/json");
        let sent: Value = serde_json::from_str(body["body"].as_str().unwrap()).unwrap();
        assert_eq!(sent, json!({"trading_partner_id": "MOCKPAYER"}));

        let put = d
            .send("activities/abc", Verb::Put, &json!({"transition": "cancel"}), None)
            .await
            .unwrap();
        assert_eq!(put.json().unwrap()["method"], "PUT");
    }

    #[tokio::test]
    async fn null_post_params_send_empty_object() {
        let base = start_echo_server().await;
        let d = dispatcher(&base);
        let response = d.send("claims/", Verb::Post, &Value::Null, None).await.unwrap();
        assert_eq!(response.json().unwrap()["body"], "{}");
    }

    #[tokio::test]
    async fn file_upload_forces_multipart_post() {
        let base = start_echo_server().await;
        let d = dispatcher(&base);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"ISA*00*          *00*~").unwrap();

        let response = d
            .send("claims/convert", Verb::Get, &json!({"ignored": true}), Some(file.path()))
            .await
            .unwrap();
        let body = response.json().unwrap();
        assert_eq!(body["method"], "POST", "file uploads must be sent as POST");
        assert!(
            body["headers"]["content-type"]
                .as_str()
                .unwrap()
                .starts_with("multipart/form-data"),
            "got: {}",
            body["headers"]["content-type"]
        );
        let sent = body["body"].as_str().unwrap();
        assert!(sent.contains("name=\"file\""));
        assert!(sent.contains("ISA*00*"));
        assert_eq!(body["query"], "");
    }

    #[tokio::test]
    async fn missing_upload_file_is_upload_error() {
        let d = dispatcher("http://127.0.0.1:1");
        let result = d
            .send(
                "claims/convert",
                Verb::Post,
                &Value::Null,
                Some(Path::new("/nonexistent/claims.837")),
            )
            .await;
        assert!(matches!(result, Err(Error::Upload(_))));
        assert_eq!(d.last_status_code(), None);
    }

    #[tokio::test]
    async fn delete_204_is_true() {
        let base = start_echo_server().await;
        let d = dispatcher(&base);
        let response = d.send("gone", Verb::Delete, &Value::Null, None).await.unwrap();
        assert_eq!(response.status, 204);
        assert_eq!(response.deleted(), Some(true));
    }

    #[tokio::test]
    async fn delete_empty_200_is_false() {
        let base = start_echo_server().await;
        let d = dispatcher(&base);
        let response = d.send("kept", Verb::Delete, &Value::Null, None).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.deleted(), Some(false));
    }

    #[tokio::test]
    async fn delete_with_json_body_returns_json() {
        let base = start_echo_server().await;
        let d = dispatcher(&base);
        let response = d
            .send("schedule/appointments/x", Verb::Delete, &Value::Null, None)
            .await
            .unwrap();
        assert_eq!(response.deleted(), None);
        assert_eq!(response.json().unwrap()["method"], "DELETE");
    }

    #[tokio::test]
    async fn non_json_get_body_is_decode_error() {
        let base = start_echo_server().await;
        let d = dispatcher(&base);
        let result = d.send("html", Verb::Get, &Value::Null, None).await;
        assert!(matches!(result, Err(Error::Decode { status: 200, .. })));
        assert_eq!(d.last_status_code(), Some(200));
    }

    #[tokio::test]
    async fn error_status_with_json_is_returned_as_data() {
        let base = start_echo_server().await;
        let d = dispatcher(&base);
        let response = d.send("missing", Verb::Get, &Value::Null, None).await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.errors().unwrap()["query"], "not found");
    }

    #[tokio::test]
    async fn last_status_tracks_each_call() {
        let base = start_echo_server().await;
        let d = dispatcher(&base);
        assert_eq!(d.last_status_code(), None);

        let first = d.send("missing", Verb::Get, &Value::Null, None).await.unwrap();
        assert_eq!(d.last_status_code(), Some(first.status));

        let second = d.send("gone", Verb::Delete, &Value::Null, None).await.unwrap();
        assert_eq!(d.last_status_code(), Some(second.status));
        assert_eq!(second.status, 204);
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let d = dispatcher("http://127.0.0.1:1");
        let result = d.send("providers/", Verb::Get, &Value::Null, None).await;
        assert!(matches!(result, Err(Error::Transport { timeout: false, .. })));
        assert_eq!(d.last_status_code(), None);
    }

    #[tokio::test]
    async fn request_timeout_is_enforced() {
        let base = start_echo_server().await;
        let d = Dispatcher::new(
            reqwest::Client::new(),
            format!("{base}/api/v4"),
            Duration::from_millis(200),
            "pokitdok-rust-test",
            Arc::new(FixedToken("tok")),
        );
        let result = d.send("slow", Verb::Get, &Value::Null, None).await;
        let err = result.unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got: {err}");
    }
}
