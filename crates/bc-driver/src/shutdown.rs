//! Application shutdown detection

use std::time::Duration;

use tokio::time::Instant;

use bc_core::DriverError;

use crate::remote::{classify, Failure, Session};

/// Upper bound on the pause between pings
pub const PING_INTERVAL: Duration = Duration::from_millis(100);

/// Polls an application until it stops answering
#[derive(Debug, Clone, Copy)]
pub struct ShutdownWatcher {
    /// Upper bound on the pause between pings
    pub ping_interval: Duration,
}

impl ShutdownWatcher {
    /// Create a watcher pinging at most every `ping_interval`
    pub fn new(ping_interval: Duration) -> Self {
        Self { ping_interval }
    }

    /// Ping the session until it disconnects or `timeout` passes.
    ///
    /// Succeeds on the first ping failing with an expected disconnection.
    /// Fails with [`DriverError::NotClosed`] when the deadline passes first;
    /// unexpected failures propagate unchanged.
    pub async fn wait_for_close(
        &self,
        session: &Session,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let delta = self.ping_interval.min(timeout);
        let deadline = Instant::now() + timeout;

        while Instant::now() < deadline {
            if let Err(err) = session.ping().await {
                match classify(err) {
                    Failure::ExpectedDisconnection(_) => {
                        tracing::info!("Connection died as expected");
                        return Ok(());
                    }
                    Failure::Unexpected(err) => return Err(err.into()),
                }
            }
            tokio::time::sleep(delta).await;
        }

        Err(DriverError::NotClosed { timeout })
    }
}

impl Default for ShutdownWatcher {
    fn default() -> Self {
        Self::new(PING_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{Map, Value};

    use bc_core::RemoteError;

    use crate::remote::RemoteCall;

    /// Answers pings until `alive_for` calls, then fails with `failure`
    struct Dying {
        alive_for: usize,
        failure: Option<RemoteError>,
        pings: AtomicUsize,
    }

    impl Dying {
        fn new(alive_for: usize, failure: Option<RemoteError>) -> Arc<Self> {
            Arc::new(Self {
                alive_for,
                failure,
                pings: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RemoteCall for Dying {
        async fn call(
            &self,
            _keyword: &str,
            _args: Vec<Value>,
            _kwargs: Map<String, Value>,
        ) -> Result<Value, RemoteError> {
            let count = self.pings.fetch_add(1, Ordering::SeqCst);
            match &self.failure {
                Some(err) if count >= self.alive_for => Err(err.clone()),
                _ => Ok(Value::Null),
            }
        }
    }

    fn session(services: Arc<Dying>) -> Session {
        Session::new("app", "127.0.0.1:9000", Arc::clone(&services) as Arc<dyn RemoteCall>, services)
    }

    fn keyword_failed(message: &str) -> RemoteError {
        RemoteError::KeywordFailed {
            keyword: "ping".to_string(),
            message: message.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_disconnection_shape_means_closed() {
        let shapes = vec![
            RemoteError::ConnectionBroken("connection reset by peer".to_string()),
            RemoteError::Protocol("truncated response".to_string()),
            keyword_failed("Connection to remote server broken: socket closed"),
            keyword_failed("ProtocolError: bad status line"),
        ];

        for failure in shapes {
            let services = Dying::new(3, Some(failure));
            let result = ShutdownWatcher::default()
                .wait_for_close(&session(Arc::clone(&services)), Duration::from_secs(5))
                .await;
            assert!(result.is_ok());
            assert_eq!(services.pings.load(Ordering::SeqCst), 4);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unexpected_failure_propagates_unchanged() {
        let failure = keyword_failed("Keyword 'ping' failed: permission denied");
        let services = Dying::new(1, Some(failure.clone()));

        let err = ShutdownWatcher::default()
            .wait_for_close(&session(services), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Remote(inner) if inner == failure));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_closed_after_deadline() {
        let services = Dying::new(0, None);
        let timeout = Duration::from_millis(450);

        let started = Instant::now();
        let err = ShutdownWatcher::default()
            .wait_for_close(&session(Arc::clone(&services)), timeout)
            .await
            .unwrap_err();

        assert!(matches!(err, DriverError::NotClosed { timeout: t } if t == timeout));
        assert!(started.elapsed() >= timeout);
        assert!(started.elapsed() <= timeout + PING_INTERVAL);
        assert_eq!(services.pings.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_timeout_shrinks_interval() {
        let services = Dying::new(0, None);
        let timeout = Duration::from_millis(20);

        let started = Instant::now();
        let result = ShutdownWatcher::default()
            .wait_for_close(&session(services), timeout)
            .await;

        assert!(result.is_err());
        assert!(started.elapsed() >= timeout);
        assert!(started.elapsed() < PING_INTERVAL);
    }
}
