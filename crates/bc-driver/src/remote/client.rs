//! JSON-line remote-call client
//!
//! Requests and responses are single JSON lines over one TCP connection per
//! surface. The connection is opened on first use and dropped on any
//! transport or framing failure, or when a call is abandoned before its
//! reply arrives, so the next call reconnects.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use bc_core::RemoteError;
use bc_protocol::{RemoteRequest, RemoteResponse, RemoteStatus};

use super::RemoteCall;

/// Client for one surface of one agent
pub struct RemoteClient {
    /// Agent address (`host:port`)
    address: String,
    /// Surface path sent with every request
    path: String,
    /// Next request ID
    next_id: AtomicU64,
    /// Open connection, if any
    stream: Mutex<Option<BufStream<TcpStream>>>,
}

impl RemoteClient {
    /// Create a client; no connection is made until the first call
    pub fn new(address: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            path: path.into(),
            next_id: AtomicU64::new(1),
            stream: Mutex::new(None),
        }
    }

    /// Get the agent address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Get the surface path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Send a request and wait for its response.
    ///
    /// The connection is taken out of the client for the duration of the
    /// exchange and only put back after a complete reply, so a call dropped
    /// mid-flight never leaves an unread reply on a reused connection.
    async fn send_request(&self, request: &RemoteRequest) -> Result<RemoteResponse, RemoteError> {
        let mut guard = self.stream.lock().await;

        let mut stream = match guard.take() {
            Some(stream) => stream,
            None => {
                tracing::debug!("Connecting to agent at {}{}", self.address, self.path);
                let stream = TcpStream::connect(&self.address)
                    .await
                    .map_err(|e| RemoteError::ConnectionBroken(e.to_string()))?;
                BufStream::new(stream)
            }
        };

        let response = exchange(&mut stream, request).await?;
        *guard = Some(stream);
        Ok(response)
    }
}

/// Write one request line and read one response line
async fn exchange(
    stream: &mut BufStream<TcpStream>,
    request: &RemoteRequest,
) -> Result<RemoteResponse, RemoteError> {
    let line = request
        .to_line()
        .map_err(|e| RemoteError::Protocol(format!("Failed to encode request: {}", e)))?;

    stream
        .write_all(line.as_bytes())
        .await
        .map_err(|e| RemoteError::ConnectionBroken(e.to_string()))?;
    stream
        .flush()
        .await
        .map_err(|e| RemoteError::ConnectionBroken(e.to_string()))?;

    let mut response_line = String::new();
    let read = stream
        .read_line(&mut response_line)
        .await
        .map_err(|e| RemoteError::ConnectionBroken(e.to_string()))?;
    if read == 0 {
        return Err(RemoteError::ConnectionBroken(
            "connection closed by peer".to_string(),
        ));
    }
    if !response_line.ends_with('\n') {
        return Err(RemoteError::Protocol("truncated response".to_string()));
    }

    let response: RemoteResponse = serde_json::from_str(response_line.trim())
        .map_err(|e| RemoteError::Protocol(format!("Invalid response: {}", e)))?;
    if response.id != request.id {
        return Err(RemoteError::Protocol(format!(
            "Response ID {} does not match request ID {}",
            response.id, request.id
        )));
    }
    Ok(response)
}

#[async_trait]
impl RemoteCall for RemoteClient {
    async fn call(
        &self,
        keyword: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value, RemoteError> {
        let request = RemoteRequest {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            path: self.path.clone(),
            keyword: keyword.to_string(),
            args,
            kwargs,
        };

        let response = self.send_request(&request).await?;
        match response.status {
            RemoteStatus::Pass => Ok(response.return_value),
            RemoteStatus::Fail => Err(RemoteError::KeywordFailed {
                keyword: keyword.to_string(),
                message: response.error.unwrap_or_default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tokio::io::BufReader;
    use tokio::net::TcpListener;

    /// Serve one connection, answering each request with `respond`
    async fn serve_once<F>(respond: F) -> String
    where
        F: Fn(RemoteRequest) -> Option<String> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = socket.into_split();
            let mut reader = BufReader::new(reader);
            let mut line = String::new();
            while reader.read_line(&mut line).await.unwrap_or(0) > 0 {
                let request: RemoteRequest = serde_json::from_str(line.trim()).unwrap();
                match respond(request) {
                    Some(reply) => writer.write_all(reply.as_bytes()).await.unwrap(),
                    None => return, // drop the connection
                }
                line.clear();
            }
        });

        address
    }

    #[tokio::test]
    async fn test_call_pass_returns_value() {
        let address = serve_once(|req| {
            assert_eq!(req.path, "/services");
            assert_eq!(req.keyword, "getEnvironment");
            Some(RemoteResponse::pass(req.id, json!({"os": "linux"})).to_line().unwrap())
        })
        .await;

        let client = RemoteClient::new(address, "/services");
        let value = client
            .call("getEnvironment", vec![], Map::new())
            .await
            .unwrap();
        assert_eq!(value, json!({"os": "linux"}));
    }

    #[tokio::test]
    async fn test_call_reuses_connection() {
        let address = serve_once(|req| {
            Some(RemoteResponse::pass(req.id, json!(req.id)).to_line().unwrap())
        })
        .await;

        let client = RemoteClient::new(address, "/");
        let first = client.call("ping", vec![], Map::new()).await.unwrap();
        let second = client.call("ping", vec![], Map::new()).await.unwrap();
        assert_eq!(first, json!(1));
        assert_eq!(second, json!(2));
    }

    #[tokio::test]
    async fn test_call_fail_is_keyword_failure() {
        let address = serve_once(|req| {
            Some(RemoteResponse::fail(req.id, "No button 'Exit' found").to_line().unwrap())
        })
        .await;

        let client = RemoteClient::new(address, "/");
        let err = client
            .call("pushButton", vec![json!("Exit")], Map::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RemoteError::KeywordFailed {
                keyword: "pushButton".to_string(),
                message: "No button 'Exit' found".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_peer_closing_is_connection_broken() {
        let address = serve_once(|_| None).await;

        let client = RemoteClient::new(address, "/services");
        let err = client.call("systemExit", vec![json!(0)], Map::new()).await.unwrap_err();
        assert!(matches!(err, RemoteError::ConnectionBroken(_)));
        assert!(err.to_string().starts_with("Connection to remote server broken:"));
    }

    #[tokio::test]
    async fn test_garbage_response_is_protocol_error() {
        let address = serve_once(|_| Some("<html>nope</html>\n".to_string())).await;

        let client = RemoteClient::new(address, "/");
        let err = client.call("ping", vec![], Map::new()).await.unwrap_err();
        assert!(matches!(err, RemoteError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_refused_connection_is_connection_broken() {
        // Bind and drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let client = RemoteClient::new(address, "/");
        let err = client.call("ping", vec![], Map::new()).await.unwrap_err();
        assert!(matches!(err, RemoteError::ConnectionBroken(_)));
    }

    #[tokio::test]
    async fn test_abandoned_call_does_not_poison_next_call() {
        // Slow replies for screenshots; every connection is served
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let (reader, mut writer) = socket.into_split();
                    let mut reader = BufReader::new(reader);
                    let mut line = String::new();
                    while reader.read_line(&mut line).await.unwrap_or(0) > 0 {
                        let request: RemoteRequest = serde_json::from_str(line.trim()).unwrap();
                        if request.keyword == "takeScreenshot" {
                            tokio::time::sleep(Duration::from_millis(200)).await;
                        }
                        let reply = RemoteResponse::pass(request.id, json!(request.keyword));
                        if writer.write_all(reply.to_line().unwrap().as_bytes()).await.is_err() {
                            return;
                        }
                        line.clear();
                    }
                });
            }
        });

        let client = RemoteClient::new(address, "/services");
        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            client.call("takeScreenshot", vec![json!("shot.png")], Map::new()),
        )
        .await;
        assert!(abandoned.is_err());

        let pong = client.call("ping", vec![], Map::new()).await.unwrap();
        assert_eq!(pong, json!("ping"));
    }
}
