use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use thiserror::Error;
use tracing::debug;

/// Application-level code the service uses to mark a successful answer
pub const SUCCESS_STATUS_CODE: f64 = 200.0;

/// Reasons an answer could not be obtained from the query service.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The request never completed (connection refused, reset, DNS failure...)
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server replied with an HTTP error and no readable body
    #[error("query service returned HTTP {0}")]
    HttpStatus(StatusCode),

    /// The body was readable but `status_code` was not the success code
    #[error("query service rejected the query (status_code: {status_code:?})")]
    Rejected { status_code: Option<Number> },

    /// Success code without an answer attached
    #[error("query service response has no answer")]
    MissingAnswer,

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Anything that can turn a question into an answer
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn query(&self, question: &str) -> Result<String, QueryError>;
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    user: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse {
    status_code: Option<Number>,
    response: Option<String>,
}

/// Extract the answer from a query service response body.
///
/// `status_code` is compared numerically, so `200` and `200.0` both count as
/// success.
pub fn decode_answer(body: &[u8]) -> Result<String, QueryError> {
    let parsed: QueryResponse = serde_json::from_slice(body)?;

    let succeeded = parsed
        .status_code
        .as_ref()
        .and_then(Number::as_f64)
        .is_some_and(|code| code == SUCCESS_STATUS_CODE);
    if !succeeded {
        return Err(QueryError::Rejected {
            status_code: parsed.status_code,
        });
    }

    parsed.response.ok_or(QueryError::MissingAnswer)
}

/// HTTP client for the remote query-processing service
#[derive(Clone)]
pub struct QueryClient {
    client: Client,
    endpoint: String,
    user: String,
}

impl QueryClient {
    pub fn new(endpoint: &str, user: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
            user: user.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl QueryService for QueryClient {
    async fn query(&self, question: &str) -> Result<String, QueryError> {
        let request = QueryRequest {
            query: question,
            user: &self.user,
        };

        debug!(endpoint = %self.endpoint, "sending query");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        debug!(%status, bytes = body.len(), "query service replied");

        // The service reports failures in the body, so read it even on HTTP errors
        match decode_answer(&body) {
            Err(QueryError::Decode(_)) if !status.is_success() => Err(QueryError::HttpStatus(status)),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Accept one connection, reply with the given status line and body,
    /// and hand back the raw request that was received.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let reply = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });

        (format!("http://{}/process_query", addr), handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let content_length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&buf).into_owned()
    }

    fn rejected_with(err: &QueryError, expected: i64) -> bool {
        match err {
            QueryError::Rejected { status_code: Some(code) } => code.as_i64() == Some(expected),
            _ => false,
        }
    }

    fn request_body(raw: &str) -> serde_json::Value {
        let body = raw.split("\r\n\r\n").nth(1).unwrap_or_default();
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_decode_success() {
        let answer = decode_answer(br#"{"status_code": 200, "response": "A"}"#).unwrap();
        assert_eq!(answer, "A");
    }

    #[test]
    fn test_decode_rejected_status() {
        let err = decode_answer(br#"{"status_code": 500}"#).unwrap_err();
        assert!(rejected_with(&err, 500));
    }

    #[test]
    fn test_decode_float_success_code() {
        let answer = decode_answer(br#"{"status_code": 200.0, "response": "A"}"#).unwrap();
        assert_eq!(answer, "A");

        let err = decode_answer(br#"{"status_code": 200.5, "response": "A"}"#).unwrap_err();
        assert!(matches!(err, QueryError::Rejected { .. }));
    }

    #[test]
    fn test_decode_string_code_is_not_success() {
        let err = decode_answer(br#"{"status_code": "200", "response": "A"}"#).unwrap_err();
        assert!(matches!(err, QueryError::Decode(_)));
    }

    #[test]
    fn test_decode_missing_status_is_rejected() {
        let err = decode_answer(br#"{"response": "A"}"#).unwrap_err();
        assert!(matches!(err, QueryError::Rejected { status_code: None }));
    }

    #[test]
    fn test_decode_missing_answer() {
        let err = decode_answer(br#"{"status_code": 200}"#).unwrap_err();
        assert!(matches!(err, QueryError::MissingAnswer));
    }

    #[test]
    fn test_decode_malformed_body() {
        let err = decode_answer(b"<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, QueryError::Decode(_)));
    }

    #[tokio::test]
    async fn test_query_sends_question_and_user() {
        let (endpoint, server) = serve_once("200 OK", r#"{"status_code": 200, "response": "42"}"#).await;
        let client = QueryClient::new(&endpoint, "user");

        let answer = client.query("What is the answer?").await.unwrap();
        assert_eq!(answer, "42");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /process_query"));
        assert!(raw.to_lowercase().contains("content-type: application/json"));

        let body = request_body(&raw);
        assert_eq!(body["query"], "What is the answer?");
        assert_eq!(body["user"], "user");
        assert_eq!(body.as_object().map(|o| o.len()), Some(2));
    }

    #[tokio::test]
    async fn test_query_reads_body_on_http_error() {
        let (endpoint, _server) =
            serve_once("500 Internal Server Error", r#"{"status_code": 500}"#).await;
        let client = QueryClient::new(&endpoint, "user");

        let err = client.query("Q").await.unwrap_err();
        assert!(rejected_with(&err, 500));
    }

    #[tokio::test]
    async fn test_query_http_error_without_json() {
        let (endpoint, _server) = serve_once("502 Bad Gateway", "upstream down").await;
        let client = QueryClient::new(&endpoint, "user");

        let err = client.query("Q").await.unwrap_err();
        assert!(matches!(err, QueryError::HttpStatus(StatusCode::BAD_GATEWAY)));
    }

    #[tokio::test]
    async fn test_query_connection_refused() {
        // Bind then drop to get a port nobody is listening on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = QueryClient::new(&format!("http://{}/process_query", addr), "user");
        let err = client.query("Q").await.unwrap_err();
        assert!(matches!(err, QueryError::Transport(_)));
    }
}
