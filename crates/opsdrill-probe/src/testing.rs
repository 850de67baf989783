//! Test support: a scripted mock of the service under drill.
//!
//! A minimal HTTP responder on a loopback `TcpListener` that serves the
//! liveness/readiness/version triple with scriptable status codes. Unit
//! tests in this crate and the drill runner's integration tests both
//! exercise real sockets against it; no HTTP stack is mocked out.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Scripted mock service.
///
/// Serves `/health`, `/ready` and `/version`; everything else is a 404.
/// The readiness endpoint can follow a script (one status per request,
/// last entry repeating) to model a dependency coming back mid-poll.
pub struct MockService {
    addr: SocketAddr,
    state: Arc<MockState>,
    server: tokio::task::JoinHandle<()>,
}

struct MockState {
    liveness: AtomicU16,
    readiness: AtomicU16,
    readiness_script: Mutex<Vec<u16>>,
    readiness_hits: AtomicU32,
    version_body: Mutex<String>,
}

impl MockService {
    /// Starts a mock service with fixed liveness/readiness statuses.
    ///
    /// # Panics
    /// Panics if no loopback port can be bound (test environment failure).
    #[allow(clippy::expect_used)]
    pub async fn start(liveness: u16, readiness: u16) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback listener");
        let addr = listener.local_addr().expect("listener has local addr");

        let state = Arc::new(MockState {
            liveness: AtomicU16::new(liveness),
            readiness: AtomicU16::new(readiness),
            readiness_script: Mutex::new(Vec::new()),
            readiness_hits: AtomicU32::new(0),
            version_body: Mutex::new(default_version_body()),
        });

        let server_state = Arc::clone(&state);
        let server = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let conn_state = Arc::clone(&server_state);
                tokio::spawn(async move {
                    serve_one(stream, &conn_state).await;
                });
            }
        });

        Self { addr, state, server }
    }

    /// Port the mock is listening on.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Sets the liveness status for subsequent requests.
    pub fn set_liveness(&self, code: u16) {
        self.state.liveness.store(code, Ordering::SeqCst);
    }

    /// Sets the readiness status for subsequent requests.
    pub fn set_readiness(&self, code: u16) {
        self.state.readiness.store(code, Ordering::SeqCst);
        lock(&self.state.readiness_script).clear();
    }

    /// Scripts the readiness endpoint: one status per request, in order,
    /// with the last entry repeating once the script is exhausted.
    pub fn script_readiness(&self, codes: Vec<u16>) {
        let mut script = lock(&self.state.readiness_script);
        *script = codes;
        script.reverse();
    }

    /// Replaces the `/version` response body.
    pub fn set_version_body(&self, body: impl Into<String>) {
        *lock(&self.state.version_body) = body.into();
    }

    /// Number of readiness requests served so far.
    #[must_use]
    pub fn readiness_hits(&self) -> u32 {
        self.state.readiness_hits.load(Ordering::SeqCst)
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn default_version_body() -> String {
    concat!(
        r#"{"service":"mock-exchange","version":"1.4.2","env":"lab","#,
        r#""log_level":"INFO","git_sha":"0000000","build_time":"unknown"}"#
    )
    .to_string()
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

async fn serve_one(mut stream: tokio::net::TcpStream, state: &MockState) {
    let mut buf = [0u8; 1024];
    let Ok(n) = stream.read(&mut buf).await else {
        return;
    };
    let request = String::from_utf8_lossy(&buf[..n]);
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");

    let (status, body) = match path {
        "/health" => (state.liveness.load(Ordering::SeqCst), r#"{"ok":true}"#.to_string()),
        "/ready" => {
            state.readiness_hits.fetch_add(1, Ordering::SeqCst);
            let scripted = {
                let mut script = lock(&state.readiness_script);
                if script.len() > 1 {
                    script.pop()
                } else {
                    script.last().copied()
                }
            };
            let code = scripted.unwrap_or_else(|| state.readiness.load(Ordering::SeqCst));
            (code, r#"{"ready":true}"#.to_string())
        }
        "/version" => (200, lock(&state.version_body).clone()),
        _ => (404, r#"{"error":"not_found"}"#.to_string()),
    };

    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_serves_configured_statuses() {
        let service = MockService::start(200, 503).await;
        let base = format!("http://127.0.0.1:{}", service.port());

        let health = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(health.status().as_u16(), 200);

        let ready = reqwest::get(format!("{base}/ready")).await.unwrap();
        assert_eq!(ready.status().as_u16(), 503);

        let missing = reqwest::get(format!("{base}/nope")).await.unwrap();
        assert_eq!(missing.status().as_u16(), 404);
    }

    #[tokio::test]
    async fn test_mock_readiness_script_consumed_in_order() {
        let service = MockService::start(200, 200).await;
        service.script_readiness(vec![503, 503, 200]);
        let url = format!("http://127.0.0.1:{}/ready", service.port());

        let mut seen = Vec::new();
        for _ in 0..4 {
            let status = reqwest::get(&url).await.unwrap().status().as_u16();
            seen.push(status);
        }
        // Last script entry repeats.
        assert_eq!(seen, vec![503, 503, 200, 200]);
        assert_eq!(service.readiness_hits(), 4);
    }

    #[tokio::test]
    async fn test_mock_version_body_is_replaceable() {
        let service = MockService::start(200, 200).await;
        service.set_version_body(r#"{"service":"","version":"1.0"}"#);
        let url = format!("http://127.0.0.1:{}/version", service.port());

        let body = reqwest::get(&url).await.unwrap().text().await.unwrap();
        assert!(body.contains(r#""service":"""#));
    }
}
