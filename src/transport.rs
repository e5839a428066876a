// src/transport.rs

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

pub const SUBMISSION_TIMEOUT: Duration = Duration::from_secs(20);
pub const RUNTIMES_TIMEOUT: Duration = Duration::from_secs(10);

/// Any HTTP response, whatever its status.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Value,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response (timeout, refused connection, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct TransportFailure(pub String);

impl std::fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type Headers = Vec<(String, String)>;

/// The HTTP seam the execution pipeline talks through.
pub trait HttpTransport: Send + Sync {
    fn post_json(
        &self,
        url: &str,
        headers: &Headers,
        body: &Value,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<HttpReply, TransportFailure>> + Send;

    fn get_json(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<HttpReply, TransportFailure>> + Send;
}

/// `HttpTransport` backed by a shared `reqwest::Client`.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn into_reply(resp: reqwest::Response) -> Result<HttpReply, TransportFailure> {
        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| TransportFailure(e.to_string()))?;
        // Bodies that are not JSON are kept verbatim as a string value.
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(HttpReply { status, body })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &Headers,
        body: &Value,
        timeout: Duration,
    ) -> Result<HttpReply, TransportFailure> {
        let mut request = self.client.post(url).timeout(timeout).json(body);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let resp = request
            .send()
            .await
            .map_err(|e| TransportFailure(e.to_string()))?;
        Self::into_reply(resp).await
    }

    async fn get_json(&self, url: &str, timeout: Duration) -> Result<HttpReply, TransportFailure> {
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TransportFailure(e.to_string()))?;
        Self::into_reply(resp).await
    }
}

/// Scripted transport for tests: replies are handed out in call order and
/// every request is recorded.
#[cfg(test)]
pub mod fake {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Recorded {
        pub method: &'static str,
        pub url: String,
        pub headers: Headers,
        pub body: Option<Value>,
    }

    #[derive(Default)]
    pub struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<HttpReply, TransportFailure>>>,
        calls: Mutex<Vec<Recorded>>,
    }

    impl ScriptedTransport {
        pub fn new(replies: Vec<Result<HttpReply, TransportFailure>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn reply(status: u16, body: Value) -> Result<HttpReply, TransportFailure> {
            Ok(HttpReply { status, body })
        }

        pub fn fail(detail: &str) -> Result<HttpReply, TransportFailure> {
            Err(TransportFailure(detail.to_string()))
        }

        pub fn calls(&self) -> Vec<Recorded> {
            self.calls.lock().unwrap().clone()
        }

        fn next(&self) -> Result<HttpReply, TransportFailure> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportFailure("no scripted reply".to_string())))
        }
    }

    impl HttpTransport for ScriptedTransport {
        async fn post_json(
            &self,
            url: &str,
            headers: &Headers,
            body: &Value,
            _timeout: Duration,
        ) -> Result<HttpReply, TransportFailure> {
            self.calls.lock().unwrap().push(Recorded {
                method: "POST",
                url: url.to_string(),
                headers: headers.clone(),
                body: Some(body.clone()),
            });
            self.next()
        }

        async fn get_json(&self, url: &str, _timeout: Duration) -> Result<HttpReply, TransportFailure> {
            self.calls.lock().unwrap().push(Recorded {
                method: "GET",
                url: url.to_string(),
                headers: Vec::new(),
                body: None,
            });
            self.next()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accepts one connection, answers `{"ok":true}` and returns the raw
    /// request head.
    async fn capture_one(listener: TcpListener) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut chunk = [0u8; 1024];
        while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..n]);
        }
        let body = "{\"ok\":true}";
        let reply = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(reply.as_bytes()).await.unwrap();
        let text = String::from_utf8_lossy(&raw).to_string();
        text.split("\r\n\r\n").next().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn test_post_sends_a_single_content_type() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(capture_one(listener));

        let headers = crate::endpoints::attempt_headers(&base, Some("k"), None);
        let reply = ReqwestTransport::new(Client::new())
            .post_json(
                &format!("{}/submissions?wait=true", base),
                &headers,
                &json!({"source_code": "1", "language_id": 63}),
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        let head = server.await.unwrap().to_ascii_lowercase();

        assert_eq!(reply, HttpReply { status: 200, body: json!({"ok": true}) });
        assert_eq!(head.matches("content-type:").count(), 1);
        assert!(head.contains("x-rapidapi-key: k"));
    }
}
