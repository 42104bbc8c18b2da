//! Postmark API client implementation.

use crate::casing::KeyTranslator;
use crate::config::{ClientConfig, DEFAULT_API_URL};
use crate::models::{BounceQuery, DeliveryStats};
use crate::retry::RetryPolicy;
use crate::transport::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A response record with keys in local casing.
pub type LocalRecord = Map<String, Value>;

const SERVER_TOKEN_HEADER: &str = "X-Postmark-Server-Token";
const USER_AGENT_VALUE: &str = concat!("postmark-client-rs/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum length of a response body quoted in errors and logs.
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Async client for the Postmark server API.
///
/// Every verb translates payload keys to the wire casing, sends the request
/// through the configured [`Transport`], retries transient failures per the
/// [`RetryPolicy`], and translates the response back to local casing.
///
/// The client holds no mutable state and is meant to be shared behind an
/// [`Arc`]; see [`crate::registry`] for the process-wide default.
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    api_token: String,
    base_url: String,
    retry: RetryPolicy,
    keys: KeyTranslator,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a builder for configuring the client.
    pub fn builder(api_token: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder::new(api_token)
    }

    /// Create a client with default settings for the given server token.
    ///
    /// # Examples
    /// ```no_run
    /// # use postmark_client::ApiClient;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), postmark_client::Error> {
    /// let client = ApiClient::new("server-token")?;
    /// let tags = client.get_bounced_tags().await?;
    /// println!("{tags:?}");
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        ApiClientBuilder::new(api_token).build()
    }

    /// Create a client from ambient configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        ApiClientBuilder::new(config.api_token.clone())
            .base_url(config.api_url.clone())
            .timeout(config.timeout())
            .retry_policy(config.retry_policy())
            .build()
    }

    /// API root every request path is joined to, without a trailing `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Policy applied to transient failures.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Translator used for payloads and responses.
    pub fn key_translator(&self) -> &KeyTranslator {
        &self.keys
    }

    /// Fetch a single bounce record.
    ///
    /// `GET /bounces/{id}`
    ///
    /// # Examples
    /// ```no_run
    /// # use postmark_client::ApiClient;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), postmark_client::Error> {
    /// let client = ApiClient::new("server-token")?;
    /// let record = client.get_bounce(42).await?;
    /// println!("{:?}", record.get("message_id"));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_bounce(&self, id: u64) -> Result<LocalRecord> {
        let response = self
            .request(HttpMethod::Get, &format!("bounces/{id}"), &[], None)
            .await?;
        into_record(response)
    }

    /// List bounce records matching `query`, in the order the service returns
    /// them.
    ///
    /// `GET /bounces`
    ///
    /// # Examples
    /// ```no_run
    /// # use postmark_client::{ApiClient, BounceQuery, BounceType};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), postmark_client::Error> {
    /// let client = ApiClient::new("server-token")?;
    /// let query = BounceQuery::new().bounce_type(BounceType::HardBounce).count(10);
    /// for record in client.get_bounces(&query).await? {
    ///     println!("{:?}", record.get("email"));
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_bounces(&self, query: &BounceQuery) -> Result<Vec<LocalRecord>> {
        let response = self
            .request(HttpMethod::Get, "bounces", &query.to_query(), None)
            .await?;

        let items = match response {
            Value::Array(items) => items,
            Value::Object(mut page) => match page.remove("bounces") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(Error::Deserialization(
                        "bounce list response has no Bounces array".to_string(),
                    ));
                }
            },
            other => {
                return Err(Error::Deserialization(format!(
                    "expected a bounce list, got {other}"
                )));
            }
        };

        items.into_iter().map(into_record).collect()
    }

    /// List the tags that have bounced messages.
    ///
    /// `GET /bounces/tags`
    pub async fn get_bounced_tags(&self) -> Result<Vec<String>> {
        let response = self
            .request(HttpMethod::Get, "bounces/tags", &[], None)
            .await?;
        serde_json::from_value(response).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Fetch the raw SMTP dump of a bounced message.
    ///
    /// The dump text is returned exactly as the service sent it. An empty
    /// string means the dump is no longer available.
    ///
    /// `GET /bounces/{id}/dump`
    ///
    /// # Examples
    /// ```no_run
    /// # use postmark_client::ApiClient;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), postmark_client::Error> {
    /// let client = ApiClient::new("server-token")?;
    /// let dump = client.dump_bounce(42).await?;
    /// if dump.is_empty() {
    ///     println!("dump expired");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn dump_bounce(&self, id: u64) -> Result<String> {
        let request = self.build_request(HttpMethod::Get, &format!("bounces/{id}/dump"), &[], None)?;
        let response = self.execute(request).await?;

        response
            .get("Body")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Deserialization("dump response has no Body".to_string()))
    }

    /// Reactivate the recipient of a bounce and return the updated record.
    ///
    /// `PUT /bounces/{id}/activate`
    ///
    /// # Examples
    /// ```no_run
    /// # use postmark_client::ApiClient;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), postmark_client::Error> {
    /// let client = ApiClient::new("server-token")?;
    /// let record = client.activate_bounce(42).await?;
    /// assert_eq!(record.get("inactive"), Some(&serde_json::Value::Bool(false)));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn activate_bounce(&self, id: u64) -> Result<LocalRecord> {
        let response = self
            .request(HttpMethod::Put, &format!("bounces/{id}/activate"), &[], None)
            .await?;

        match response {
            Value::Object(mut body) => match body.remove("bounce") {
                Some(bounce) => into_record(bounce),
                None => Err(Error::Deserialization(
                    "activate response has no Bounce record".to_string(),
                )),
            },
            other => Err(Error::Deserialization(format!(
                "expected an object, got {other}"
            ))),
        }
    }

    /// Fetch bounce totals per type for the server.
    ///
    /// `GET /deliverystats`
    pub async fn get_delivery_stats(&self) -> Result<DeliveryStats> {
        let response = self
            .request(HttpMethod::Get, "deliverystats", &[], None)
            .await?;
        serde_json::from_value(response).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Send an arbitrary request to the API.
    ///
    /// `payload` keys are translated to wire casing before sending; the
    /// response keys are translated back to local casing. Query parameters
    /// are sent as given.
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(&str, String)],
        payload: Option<&Value>,
    ) -> Result<Value> {
        let request = self.build_request(method, path, query, payload)?;
        let response = self.execute(request).await?;
        Ok(self.keys.to_local(&response))
    }

    fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(&str, String)],
        payload: Option<&Value>,
    ) -> Result<HttpRequest> {
        let mut url = reqwest::Url::parse(&format!(
            "{}/{}",
            self.base_url,
            path.trim_start_matches('/')
        ))
        .map_err(|e| Error::Configuration(format!("invalid request URL: {e}")))?;

        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));
        }

        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            (SERVER_TOKEN_HEADER.to_string(), self.api_token.clone()),
        ];

        let body = match payload {
            Some(payload) => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                let wire = self.keys.to_wire(payload);
                Some(serde_json::to_string(&wire).map_err(|e| Error::Serialization(e.to_string()))?)
            }
            None => None,
        };

        Ok(HttpRequest {
            method,
            url: url.into(),
            headers,
            body,
        })
    }

    /// Run `request` until it succeeds, fails permanently, or the retry
    /// policy is exhausted. Returns the wire JSON body.
    async fn execute(&self, request: HttpRequest) -> Result<Value> {
        let mut attempt = 1;
        loop {
            tracing::debug!(attempt, "{} {}", request.method, request.url);

            let outcome = match self.transport.send(request.clone()).await {
                Ok(response) => parse_response(response),
                Err(err) => Err(Error::Transport(err)),
            };

            match outcome {
                Ok(body) => return Ok(body),
                Err(err) if err.is_transient() && self.retry.allows_retry(attempt) => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        ?delay,
                        "{} {} failed, retrying: {}",
                        request.method,
                        request.url,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(attempt, "{} {} failed: {}", request.method, request.url, err);
                    return Err(err);
                }
            }
        }
    }
}

/// Turn a completed exchange into wire JSON or a classified error.
fn parse_response(response: HttpResponse) -> Result<Value> {
    if !response.is_success() {
        return Err(error_for_status(response.status, &response.body));
    }

    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&response.body).map_err(|e| {
        Error::Deserialization(format!(
            "{e} in body {}",
            sanitize_for_log(&response.body)
        ))
    })
}

/// Map a non-success status to an [`Error`], reading the service's
/// `{"ErrorCode": .., "Message": ..}` body when present.
fn error_for_status(status: u16, body: &str) -> Error {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error_code = parsed
        .as_ref()
        .and_then(|v| v.get("ErrorCode"))
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("Message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP {status}")
            } else {
                sanitize_for_log(body)
            }
        });

    match status {
        401 | 403 => Error::Authentication { status, message },
        404 => Error::NotFound { message },
        422 => Error::InvalidRequest {
            error_code,
            message,
        },
        429 => Error::RateLimited { message },
        500..=599 => Error::Service { status, message },
        _ => Error::UnexpectedStatus { status, message },
    }
}

fn into_record(value: Value) -> Result<LocalRecord> {
    match value {
        Value::Object(record) => Ok(record),
        other => Err(Error::Deserialization(format!(
            "expected a record, got {other}"
        ))),
    }
}

/// Truncate a body and drop control characters before quoting it.
fn sanitize_for_log(body: &str) -> String {
    let truncated: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
    let truncated = if truncated.len() < body.len() {
        format!("{truncated}... [truncated, {} bytes total]", body.len())
    } else {
        truncated
    };
    truncated.replace(char::is_control, "")
}

/// Builder for configuring an [`ApiClient`].
///
/// Start with [`ApiClient::builder`] to override defaults.
pub struct ApiClientBuilder {
    api_token: String,
    base_url: String,
    timeout: Duration,
    proxy: Option<String>,
    user_agent: String,
    retry: RetryPolicy,
    keys: KeyTranslator,
    transport: Option<Arc<dyn Transport>>,
}

impl fmt::Debug for ApiClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClientBuilder")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("proxy", &self.proxy)
            .field("user_agent", &self.user_agent)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ApiClientBuilder {
    /// Create a new builder with default settings.
    ///
    /// Defaults:
    /// - `https://api.postmarkapp.com`
    /// - 60 second timeout, no proxy
    /// - [`RetryPolicy::default`]
    /// - [`KeyTranslator::default`]
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            proxy: None,
            user_agent: USER_AGENT_VALUE.to_string(),
            retry: RetryPolicy::default(),
            keys: KeyTranslator::default(),
            transport: None,
        }
    }

    /// Override the API endpoint. Useful for testing.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Per-request timeout of the default transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a proxy URL (e.g., "http://127.0.0.1:8080") for the default
    /// transport.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Override the default user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Override how transient failures are retried.
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the key translator.
    pub fn key_translator(mut self, keys: KeyTranslator) -> Self {
        self.keys = keys;
        self
    }

    /// Teach the key translator one more abbreviation.
    pub fn abbreviation(mut self, local: impl Into<String>, wire: impl Into<String>) -> Self {
        self.keys = self.keys.with_abbreviation(local, wire);
        self
    }

    /// Use a custom transport instead of the reqwest-backed default.
    ///
    /// `timeout`, `proxy` and `user_agent` are ignored when a transport is
    /// supplied.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client.
    ///
    /// Fails with [`Error::Configuration`] when the base URL does not parse
    /// or the token cannot be sent as a header value.
    pub fn build(self) -> Result<ApiClient> {
        let base_url = self.base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url)
            .map_err(|e| Error::Configuration(format!("invalid base URL {base_url:?}: {e}")))?;
        reqwest::header::HeaderValue::from_str(&self.api_token).map_err(|_| {
            Error::Configuration(format!(
                "{SERVER_TOKEN_HEADER} value contains characters not allowed in a header"
            ))
        })?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                ReqwestTransport::build(self.timeout, &self.user_agent, self.proxy.as_deref())
                    .map_err(|e| Error::Configuration(e.to_string()))?,
            ),
        };

        Ok(ApiClient {
            transport,
            api_token: self.api_token,
            base_url,
            retry: self.retry,
            keys: self.keys,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::transport::TransportError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Transport that replays canned replies and records what it was sent.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedTransport {
        replies: Mutex<VecDeque<std::result::Result<HttpResponse, TransportError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub(crate) fn reply(&self, status: u16, body: Value) {
            self.replies.lock().unwrap().push_back(Ok(HttpResponse {
                status,
                body: body.to_string(),
            }));
        }

        pub(crate) fn reply_raw(&self, status: u16, body: &str) {
            self.replies.lock().unwrap().push_back(Ok(HttpResponse {
                status,
                body: body.to_string(),
            }));
        }

        pub(crate) fn fail(&self, error: TransportError) {
            self.replies.lock().unwrap().push_back(Err(error));
        }

        pub(crate) fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            request: HttpRequest,
        ) -> std::result::Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::connect("no scripted reply")))
        }
    }

    pub(crate) fn client_with(transport: Arc<ScriptedTransport>, attempts: u32) -> ApiClient {
        ApiClient::builder("server-token")
            .base_url("https://api.example.test/")
            .retry_policy(RetryPolicy::fixed(attempts, Duration::ZERO))
            .transport(transport)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn get_bounce_translates_keys_and_sends_token() {
        let transport = ScriptedTransport::new();
        transport.reply(200, json!({"ID": 42, "MessageID": "abc", "Type": "HardBounce"}));
        let client = client_with(transport.clone(), 3);

        let record = client.get_bounce(42).await.unwrap();
        assert_eq!(record["id"], 42);
        assert_eq!(record["message_id"], "abc");
        assert_eq!(record["type"], "HardBounce");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(requests[0].url, "https://api.example.test/bounces/42");
        assert!(
            requests[0]
                .headers
                .contains(&(SERVER_TOKEN_HEADER.to_string(), "server-token".to_string()))
        );
        assert!(requests[0].body.is_none());
    }

    #[tokio::test]
    async fn payload_is_sent_in_wire_casing() {
        let transport = ScriptedTransport::new();
        transport.reply(200, json!({"ErrorCode": 0, "Message": "OK"}));
        let client = client_with(transport.clone(), 1);

        let response = client
            .request(
                HttpMethod::Post,
                "/email",
                &[],
                Some(&json!({"html_body": "<b>hi</b>", "track_opens": true})),
            )
            .await
            .unwrap();
        assert_eq!(response, json!({"error_code": 0, "message": "OK"}));

        let request = &transport.requests()[0];
        assert_eq!(request.url, "https://api.example.test/email");
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"HTMLBody": "<b>hi</b>", "TrackOpens": true}));
        assert!(
            request
                .headers
                .contains(&("Content-Type".to_string(), "application/json".to_string()))
        );
    }

    #[tokio::test]
    async fn query_parameters_are_encoded() {
        let transport = ScriptedTransport::new();
        transport.reply(200, json!({"TotalCount": 0, "Bounces": []}));
        let client = client_with(transport.clone(), 1);

        let bounces = client
            .get_bounces(&BounceQuery::new().count(5).email_filter("a b@example.com"))
            .await
            .unwrap();
        assert!(bounces.is_empty());
        assert_eq!(
            transport.requests()[0].url,
            "https://api.example.test/bounces?count=5&offset=0&emailFilter=a+b%40example.com"
        );
    }

    #[tokio::test]
    async fn transport_failures_then_success_returns_result() {
        let transport = ScriptedTransport::new();
        transport.fail(TransportError::connect("refused"));
        transport.fail(TransportError::timeout("slow"));
        transport.reply(200, json!(["tag1", "tag2"]));
        let client = client_with(transport.clone(), 3);

        let tags = client.get_bounced_tags().await.unwrap();
        assert_eq!(tags, vec!["tag1", "tag2"]);
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn exhausted_attempts_surface_transport_error() {
        let transport = ScriptedTransport::new();
        for _ in 0..3 {
            transport.fail(TransportError::timeout("slow"));
        }
        transport.reply(200, json!([]));
        let client = client_with(transport.clone(), 3);

        let err = client.get_bounced_tags().await.unwrap_err();
        assert!(err.is_timeout(), "unexpected error: {err}");
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let transport = ScriptedTransport::new();
        transport.reply(404, json!({"ErrorCode": 701, "Message": "Bounce not found"}));
        let client = client_with(transport.clone(), 5);

        let err = client.get_bounce(7).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { ref message } if message == "Bounce not found"));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn authentication_failure_is_not_retried() {
        let transport = ScriptedTransport::new();
        transport.reply(
            401,
            json!({"ErrorCode": 10, "Message": "No Account or Server API tokens were supplied"}),
        );
        let client = client_with(transport.clone(), 5);

        let err = client.get_bounce(1).await.unwrap_err();
        assert!(matches!(err, Error::Authentication { status: 401, .. }));
        assert!(err.to_string().contains("No Account or Server API tokens"));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn validation_error_carries_error_code() {
        let transport = ScriptedTransport::new();
        transport.reply(422, json!({"ErrorCode": 406, "Message": "Inactive recipient"}));
        let client = client_with(transport.clone(), 5);

        let err = client.activate_bounce(1).await.unwrap_err();
        match err {
            Error::InvalidRequest {
                error_code,
                message,
            } => {
                assert_eq!(error_code, 406);
                assert_eq!(message, "Inactive recipient");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn server_errors_are_retried_up_to_the_ceiling() {
        let transport = ScriptedTransport::new();
        for _ in 0..4 {
            transport.reply_raw(503, "upstream unavailable");
        }
        let client = client_with(transport.clone(), 4);

        let err = client.get_bounce(1).await.unwrap_err();
        assert!(matches!(err, Error::Service { status: 503, ref message } if message == "upstream unavailable"));
        assert_eq!(transport.requests().len(), 4);
    }

    #[tokio::test]
    async fn malformed_body_is_not_retried() {
        let transport = ScriptedTransport::new();
        transport.reply_raw(200, "<html>not json</html>");
        let client = client_with(transport.clone(), 3);

        let err = client.get_bounce(1).await.unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn dump_body_is_returned_verbatim() {
        let transport = ScriptedTransport::new();
        let raw = "Return-Path: <>\r\nMessageID: keep-as-is\r\n";
        transport.reply(200, json!({ "Body": raw }));
        let client = client_with(transport.clone(), 1);

        assert_eq!(client.dump_bounce(9).await.unwrap(), raw);
        assert_eq!(
            transport.requests()[0].url,
            "https://api.example.test/bounces/9/dump"
        );
    }

    #[tokio::test]
    async fn activate_returns_nested_bounce_record() {
        let transport = ScriptedTransport::new();
        transport.reply(
            200,
            json!({"Message": "OK", "Bounce": {"ID": 3, "Inactive": false, "CanActivate": true}}),
        );
        let client = client_with(transport.clone(), 1);

        let record = client.activate_bounce(3).await.unwrap();
        assert_eq!(record["id"], 3);
        assert_eq!(record["inactive"], false);
        assert_eq!(transport.requests()[0].method, HttpMethod::Put);
    }

    #[tokio::test]
    async fn delivery_stats_are_typed() {
        let transport = ScriptedTransport::new();
        transport.reply(
            200,
            json!({
                "InactiveMails": 192,
                "Bounces": [
                    {"Name": "All", "Count": 253},
                    {"Type": "HardBounce", "Name": "Hard bounce", "Count": 195}
                ]
            }),
        );
        let client = client_with(transport.clone(), 1);

        let stats = client.get_delivery_stats().await.unwrap();
        assert_eq!(stats.inactive_mails, 192);
        assert_eq!(stats.bounces.len(), 2);
        assert_eq!(stats.bounces[0].kind, None);
        assert_eq!(stats.bounces[1].kind.as_deref(), Some("HardBounce"));
        assert_eq!(stats.bounces[1].count, 195);
    }

    #[test]
    fn invalid_base_url_is_a_configuration_error() {
        let err = ApiClient::builder("token")
            .base_url("not a url")
            .transport(ScriptedTransport::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn token_with_line_break_is_a_configuration_error() {
        let err = ApiClient::builder("bad\ntoken")
            .transport(ScriptedTransport::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(ref msg) if msg.contains(SERVER_TOKEN_HEADER)));
        assert!(!err.to_string().contains("bad"));
    }

    #[tokio::test]
    async fn request_build_failures_are_not_retried() {
        let transport = ScriptedTransport::new();
        transport.fail(TransportError::request("builder error"));
        transport.reply(200, json!(["tag1"]));
        let client = client_with(transport.clone(), 4);

        let err = client.get_bounced_tags().await.unwrap_err();
        assert!(!err.is_transient());
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn forbidden_is_not_retried() {
        let transport = ScriptedTransport::new();
        transport.reply(403, json!({"ErrorCode": 10, "Message": "Access denied"}));
        let client = client_with(transport.clone(), 5);

        let err = client.get_bounce(1).await.unwrap_err();
        assert!(matches!(err, Error::Authentication { status: 403, ref message } if message == "Access denied"));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn rate_limited_is_retried_up_to_the_ceiling() {
        let transport = ScriptedTransport::new();
        for _ in 0..3 {
            transport.reply(429, json!({"ErrorCode": 429, "Message": "Rate limit exceeded"}));
        }
        let client = client_with(transport.clone(), 3);

        let err = client.get_bounced_tags().await.unwrap_err();
        assert!(matches!(err, Error::RateLimited { ref message } if message == "Rate limit exceeded"));
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn rate_limited_then_success_returns_result() {
        let transport = ScriptedTransport::new();
        transport.reply(429, json!({"ErrorCode": 429, "Message": "Rate limit exceeded"}));
        transport.reply(200, json!(["tag1"]));
        let client = client_with(transport.clone(), 3);

        assert_eq!(client.get_bounced_tags().await.unwrap(), vec!["tag1"]);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn other_client_errors_are_sent_once() {
        let transport = ScriptedTransport::new();
        transport.reply(409, json!({"ErrorCode": 0, "Message": "Conflict"}));
        let client = client_with(transport.clone(), 5);

        let err = client.activate_bounce(1).await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedStatus { status: 409, ref message } if message == "Conflict"));
        assert_eq!(err.status(), Some(409));
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn debug_output_hides_token() {
        let client = client_with(ScriptedTransport::new(), 1);
        let debug = format!("{client:?}");
        assert!(debug.contains("api.example.test"));
        assert!(!debug.contains("server-token"));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(sanitized.ends_with("[truncated, 500 bytes total]"));
        assert_eq!(sanitize_for_log("line\nbreak"), "linebreak");
    }
}
