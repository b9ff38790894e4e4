use reqwest::{Client, RequestBuilder, Response};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};

/// Counters describing upstream request behaviour
#[derive(Debug, Default)]
pub struct RequestMetrics {
    /// Total number of requests sent
    pub total_requests: AtomicU64,
    /// Requests that produced an HTTP response (any status)
    pub successful_requests: AtomicU64,
    /// Requests that failed at the transport level
    pub failed_requests: AtomicU64,
    /// Requests currently holding a permit
    pub active_requests: AtomicUsize,
    /// Peak concurrent requests observed
    pub peak_concurrent: AtomicUsize,
}

impl RequestMetrics {
    /// Get a formatted summary of metrics
    pub fn summary(&self) -> String {
        format!(
            "Requests - Total: {}, Success: {}, Failed: {}, Active: {}, Peak: {}",
            self.total_requests.load(Ordering::Relaxed),
            self.successful_requests.load(Ordering::Relaxed),
            self.failed_requests.load(Ordering::Relaxed),
            self.active_requests.load(Ordering::Relaxed),
            self.peak_concurrent.load(Ordering::Relaxed),
        )
    }
}

/// Shared HTTP client for upstream provider calls.
///
/// A single long-lived `reqwest` client keeps connections pooled across
/// requests, and a semaphore bounds how many upstream calls are in flight at
/// once. No request timeout is configured: upstream calls run until the
/// provider answers or the connection fails.
///
/// # Example
/// ```rust,no_run
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// use voice_relay::utils::req_manager::ReqManager;
///
/// let manager = ReqManager::new(8)?;
/// let guard = manager.acquire().await?;
/// let response = guard
///     .send(guard.client().get("https://api.openai.com/v1/models"))
///     .await?;
/// println!("{} / {}", response.status(), manager.metrics().summary());
/// # Ok(())
/// # }
/// ```
pub struct ReqManager {
    client: Arc<Client>,
    semaphore: Arc<Semaphore>,
    metrics: Arc<RequestMetrics>,
}

/// A permit to issue one upstream request; released when dropped.
pub struct ClientGuard<'a> {
    manager: &'a ReqManager,
    _permit: SemaphorePermit<'a>,
}

impl<'a> ClientGuard<'a> {
    /// Get the HTTP client for building requests
    pub fn client(&self) -> &Client {
        &self.manager.client
    }

    /// Send a prepared request with metrics tracking
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, reqwest::Error> {
        let metrics = &self.manager.metrics;
        metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        let result = request.send().await;
        match &result {
            Ok(_) => metrics.successful_requests.fetch_add(1, Ordering::Relaxed),
            Err(_) => metrics.failed_requests.fetch_add(1, Ordering::Relaxed),
        };
        result
    }
}

impl<'a> Drop for ClientGuard<'a> {
    fn drop(&mut self) {
        self.manager
            .metrics
            .active_requests
            .fetch_sub(1, Ordering::Relaxed);
    }
}

impl ReqManager {
    /// Create a new request manager allowing `max_concurrent_requests` in flight
    pub fn new(
        max_concurrent_requests: usize,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        if max_concurrent_requests == 0 {
            return Err("max_concurrent_requests must be greater than 0".into());
        }

        let client = Client::builder()
            .pool_max_idle_per_host(max_concurrent_requests)
            .tcp_nodelay(true)
            .user_agent(concat!("voice-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            semaphore: Arc::new(Semaphore::new(max_concurrent_requests)),
            metrics: Arc::new(RequestMetrics::default()),
        })
    }

    /// Wait for a free request slot
    pub async fn acquire(&self) -> Result<ClientGuard<'_>, AcquireError> {
        let permit = self.semaphore.acquire().await?;

        let active = self.metrics.active_requests.fetch_add(1, Ordering::Relaxed) + 1;
        self.metrics
            .peak_concurrent
            .fetch_max(active, Ordering::Relaxed);

        Ok(ClientGuard {
            manager: self,
            _permit: permit,
        })
    }

    /// Get request metrics
    pub fn metrics(&self) -> &RequestMetrics {
        &self.metrics
    }

    /// Number of free request slots
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}
