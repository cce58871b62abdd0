//! LocalScreen: a Screen backed by a browser debugging endpoint.
//!
//! # State machine
//!
//! ```text
//!              first operation (lock held)
//!  Detached ───────────────────────────────► Attached
//!     ▲                                          │
//!     └──────── driver reports lost session ─────┘
//! ```
//!
//! Construction never touches the network: it records the address and derives
//! the ID.  The first operation connects, picks the first page and activates
//! it.  Later operations reuse that page; the connection is durable, not
//! re-established per call.
//!
//! # Locking
//!
//! One `tokio::sync::Mutex` guards the optional page handle.  Every operation
//! holds it for its full duration, including the check-and-connect step, so
//! two callers racing for first use cannot both connect, and a screenshot can
//! never interleave with a navigation.  Different Screens share nothing.
//!
//! # Deadline
//!
//! Each operation, including any attach it triggers and the time spent
//! waiting for the lock, is bounded by `operation_timeout`.  A hung debugging
//! target therefore surfaces as [`ScreenError::Timeout`] instead of hanging the
//! caller.  A `show` cut off by the deadline also detaches: its page is held
//! outside the session slot while navigating and is dropped with the
//! cancelled future, so a load event from the abandoned navigation can never
//! complete a later `show`.  Timed-out `snap` and `stat` calls keep the session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kiosk_core::{derive_local_id, display_name, Screen, ScreenError, ScreenStatus, Snapshot};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Default per-operation deadline for local Screens.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// An attached page: the single page a LocalScreen drives.
///
/// Methods take `&mut self` because a page is only ever used under the
/// owning Screen's lock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageDriver: Send {
    /// Navigates to `url` and returns once the page's load event has fired.
    async fn navigate(&mut self, url: &str) -> Result<(), ScreenError>;

    /// Captures a PNG of the viewport.
    async fn screenshot(&mut self) -> Result<Vec<u8>, ScreenError>;

    /// Reads the current page title and URL.
    async fn info(&mut self) -> Result<ScreenStatus, ScreenError>;
}

/// Establishes a session with a debugging endpoint and activates its first page.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DevtoolsConnector: Send + Sync {
    /// Connects to `addr`, enumerates pages and activates the first one.
    async fn connect(&self, addr: &str) -> Result<Box<dyn PageDriver>, ScreenError>;
}

type Session = Option<Box<dyn PageDriver>>;

/// A Screen controlling a browser through its debugging endpoint.
pub struct LocalScreen {
    addr: String,
    id: String,
    name: String,
    connector: Arc<dyn DevtoolsConnector>,
    operation_timeout: Duration,
    session: Mutex<Session>,
}

impl LocalScreen {
    /// Records configuration and derives the ID.  Performs no network I/O.
    pub fn attach(
        name: impl Into<String>,
        addr: impl Into<String>,
        connector: Arc<dyn DevtoolsConnector>,
    ) -> Self {
        let addr = addr.into();
        Self {
            id: derive_local_id(&addr),
            name: name.into(),
            addr,
            connector,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            session: Mutex::new(None),
        }
    }

    /// Replaces the per-operation deadline.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Debugger address this Screen attaches to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// `true` once a session is held.  Waits for any in-flight operation.
    pub async fn is_attached(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Returns the held page, connecting first if Detached.
    ///
    /// Must be called with the session lock held (it takes the guarded value).
    async fn attached<'s>(
        &self,
        session: &'s mut Session,
    ) -> Result<&'s mut Box<dyn PageDriver>, ScreenError> {
        if session.is_none() {
            debug!(screen = %self.id, address = %self.addr, "attaching");
            let page = self.connector.connect(&self.addr).await?;
            info!(screen = %self.id, address = %self.addr, "attached to screen");
            *session = Some(page);
        }
        session.as_mut().ok_or_else(|| self.unavailable())
    }

    fn unavailable(&self) -> ScreenError {
        ScreenError::Connection {
            addr: self.addr.clone(),
            reason: "session unavailable".to_string(),
        }
    }

    /// Drops the session when the driver reports it lost, so the next call
    /// re-attaches.  The error itself is still returned to the caller.
    fn settle<T>(
        &self,
        session: &mut Session,
        result: Result<T, ScreenError>,
    ) -> Result<T, ScreenError> {
        if let Err(err) = &result {
            if err.is_connection_lost() {
                warn!(screen = %self.id, error = %err, "session lost; detaching");
                *session = None;
            }
        }
        result
    }

    /// Runs `fut` under the operation deadline.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl std::future::Future<Output = Result<T, ScreenError>>,
    ) -> Result<T, ScreenError> {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(screen = %self.id, operation, "operation timed out");
                Err(ScreenError::Timeout {
                    operation,
                    after: self.operation_timeout,
                })
            }
        }
    }
}

#[async_trait]
impl Screen for LocalScreen {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        display_name(&self.name, &self.id)
    }

    async fn show(&self, target: &str) -> Result<(), ScreenError> {
        self.bounded("show", async {
            let mut session = self.session.lock().await;
            self.attached(&mut session).await?;
            let Some(mut page) = session.take() else {
                return Err(self.unavailable());
            };
            let result = page.navigate(target).await;
            *session = Some(page);
            if result.is_ok() {
                debug!(screen = %self.id, target, "showing");
            }
            self.settle(&mut session, result)
        })
        .await
    }

    async fn snap(&self) -> Result<Snapshot, ScreenError> {
        self.bounded("snap", async {
            let mut session = self.session.lock().await;
            let page = self.attached(&mut session).await?;
            let result = page.screenshot().await;
            self.settle(&mut session, result).map(Snapshot::from_bytes)
        })
        .await
    }

    async fn stat(&self) -> Result<ScreenStatus, ScreenError> {
        self.bounded("stat", async {
            let mut session = self.session.lock().await;
            let page = self.attached(&mut session).await?;
            let result = page.info().await;
            self.settle(&mut session, result)
        })
        .await
    }
}

impl std::fmt::Debug for LocalScreen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalScreen")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    // ── Test doubles ──────────────────────────────────────────────────────────

    /// Records enter/exit instants around every driver call.
    #[derive(Default)]
    struct CallLog {
        spans: std::sync::Mutex<Vec<(Instant, Instant)>>,
    }

    struct RecordingPage {
        log: Arc<CallLog>,
        work: Duration,
        current: ScreenStatus,
        fail_with: Option<ScreenError>,
    }

    impl RecordingPage {
        async fn record(&self) -> Result<(), ScreenError> {
            let enter = Instant::now();
            tokio::time::sleep(self.work).await;
            self.log.spans.lock().unwrap().push((enter, Instant::now()));
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl PageDriver for RecordingPage {
        async fn navigate(&mut self, url: &str) -> Result<(), ScreenError> {
            self.record().await?;
            self.current = ScreenStatus {
                title: format!("title of {url}"),
                url: url.to_string(),
            };
            Ok(())
        }

        async fn screenshot(&mut self) -> Result<Vec<u8>, ScreenError> {
            self.record().await?;
            Ok(b"\x89PNG".to_vec())
        }

        async fn info(&mut self) -> Result<ScreenStatus, ScreenError> {
            self.record().await?;
            Ok(self.current.clone())
        }
    }

    /// Counts connection sequences; each one takes `delay` to complete.
    struct CountingConnector {
        connects: AtomicUsize,
        delay: Duration,
        log: Arc<CallLog>,
        work: Duration,
        fail_with: Option<ScreenError>,
    }

    impl CountingConnector {
        fn new(delay: Duration, work: Duration) -> Arc<Self> {
            Arc::new(Self {
                connects: AtomicUsize::new(0),
                delay,
                log: Arc::new(CallLog::default()),
                work,
                fail_with: None,
            })
        }

        fn failing_pages(err: ScreenError) -> Arc<Self> {
            Arc::new(Self {
                connects: AtomicUsize::new(0),
                delay: Duration::ZERO,
                log: Arc::new(CallLog::default()),
                work: Duration::ZERO,
                fail_with: Some(err),
            })
        }

        fn connects(&self) -> usize {
            self.connects.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DevtoolsConnector for CountingConnector {
        async fn connect(&self, _addr: &str) -> Result<Box<dyn PageDriver>, ScreenError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(Box::new(RecordingPage {
                log: Arc::clone(&self.log),
                work: self.work,
                current: ScreenStatus::default(),
                fail_with: self.fail_with.clone(),
            }))
        }
    }

    /// A mock with no expectations panics on any call.
    fn unused_connector() -> Arc<dyn DevtoolsConnector> {
        Arc::new(MockDevtoolsConnector::new())
    }

    fn lost() -> ScreenError {
        ScreenError::Connection {
            addr: "127.0.0.1:9222".to_string(),
            reason: "socket closed".to_string(),
        }
    }

    // ── Identity ──────────────────────────────────────────────────────────────

    #[test]
    fn test_id_is_derived_from_address() {
        let screen = LocalScreen::attach("", "127.0.0.1:9222", unused_connector());
        assert_eq!(screen.id(), derive_local_id("127.0.0.1:9222"));
        assert_eq!(screen.addr(), "127.0.0.1:9222");
    }

    #[test]
    fn test_name_falls_back_to_id() {
        let unnamed = LocalScreen::attach("", "127.0.0.1:9222", unused_connector());
        let named = LocalScreen::attach("lobby", "127.0.0.1:9222", unused_connector());
        assert_eq!(unnamed.name(), unnamed.id());
        assert_eq!(named.name(), "lobby");
    }

    // ── Lazy attach ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_construction_performs_no_connection() {
        let screen = LocalScreen::attach("", "127.0.0.1:9222", unused_connector());
        assert!(!screen.is_attached().await);
    }

    #[tokio::test]
    async fn test_first_operation_connects_once_and_later_ones_reuse_session() {
        // Arrange
        let mut connector = MockDevtoolsConnector::new();
        connector
            .expect_connect()
            .withf(|addr| addr == "127.0.0.1:9222")
            .times(1)
            .returning(|_| {
                let mut page = MockPageDriver::new();
                page.expect_navigate().returning(|_| Ok(()));
                page.expect_info().returning(|| {
                    Ok(ScreenStatus {
                        title: "T".to_string(),
                        url: "http://x".to_string(),
                    })
                });
                Ok(Box::new(page) as Box<dyn PageDriver>)
            });
        let screen = LocalScreen::attach("", "127.0.0.1:9222", Arc::new(connector));

        // Act
        screen.show("http://x").await.unwrap();
        let status = screen.stat().await.unwrap();

        // Assert: `times(1)` verifies the single connection on drop.
        assert!(screen.is_attached().await);
        assert_eq!(status.title, "T");
    }

    #[tokio::test]
    async fn test_concurrent_first_use_connects_exactly_once() {
        // Arrange: a slow connection widens the race window.
        let connector = CountingConnector::new(Duration::from_millis(50), Duration::ZERO);
        let screen = Arc::new(LocalScreen::attach(
            "",
            "127.0.0.1:9222",
            Arc::clone(&connector) as Arc<dyn DevtoolsConnector>,
        ));

        // Act
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let screen = Arc::clone(&screen);
                tokio::spawn(async move { screen.stat().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        // Assert
        assert_eq!(connector.connects(), 1);
    }

    #[tokio::test]
    async fn test_failed_connect_stays_detached_and_next_call_tries_again() {
        // Arrange
        let mut connector = MockDevtoolsConnector::new();
        let mut seq = mockall::Sequence::new();
        connector
            .expect_connect()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|addr| {
                Err(ScreenError::Connection {
                    addr: addr.to_string(),
                    reason: "connection refused".to_string(),
                })
            });
        connector
            .expect_connect()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                let mut page = MockPageDriver::new();
                page.expect_screenshot().returning(|| Ok(vec![1, 2, 3]));
                Ok(Box::new(page) as Box<dyn PageDriver>)
            });
        let screen = LocalScreen::attach("", "127.0.0.1:9222", Arc::new(connector));

        // Act
        let first = screen.snap().await;
        let attached_after_failure = screen.is_attached().await;
        let second = screen.snap().await.unwrap().into_bytes().await.unwrap();

        // Assert
        assert!(matches!(first, Err(ScreenError::Connection { .. })));
        assert!(!attached_after_failure);
        assert_eq!(&second[..], &[1, 2, 3]);
    }

    // ── Mutual exclusion ──────────────────────────────────────────────────────

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_shows_never_overlap() {
        // Arrange
        let connector = CountingConnector::new(Duration::ZERO, Duration::from_millis(5));
        let screen = Arc::new(LocalScreen::attach(
            "",
            "127.0.0.1:9222",
            Arc::clone(&connector) as Arc<dyn DevtoolsConnector>,
        ));

        // Act: 10 shows plus a few snaps racing them.
        let mut tasks = Vec::new();
        for i in 0..10 {
            let screen = Arc::clone(&screen);
            tasks.push(tokio::spawn(async move {
                screen.show(&format!("http://example.com/{i}")).await.map(|_| ())
            }));
        }
        for _ in 0..3 {
            let screen = Arc::clone(&screen);
            tasks.push(tokio::spawn(async move { screen.snap().await.map(|_| ()) }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        // Assert: sorted by entry time, every call starts after the previous ended.
        let mut spans = connector.log.spans.lock().unwrap().clone();
        spans.sort_by_key(|(enter, _)| *enter);
        assert_eq!(spans.len(), 13);
        for pair in spans.windows(2) {
            assert!(
                pair[1].0 >= pair[0].1,
                "critical sections overlapped: {:?} began before {:?} ended",
                pair[1].0,
                pair[0].1
            );
        }
    }

    // ── Display state ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_show_changes_reported_status() {
        let connector = CountingConnector::new(Duration::ZERO, Duration::ZERO);
        let screen = LocalScreen::attach("", "127.0.0.1:9222", connector);

        screen.show("http://example.com/a").await.unwrap();
        let status = screen.stat().await.unwrap();

        assert_eq!(status.url, "http://example.com/a");
        assert_eq!(status.title, "title of http://example.com/a");
    }

    #[tokio::test]
    async fn test_navigation_error_propagates_and_keeps_session() {
        // Arrange
        let mut connector = MockDevtoolsConnector::new();
        connector.expect_connect().times(1).returning(|_| {
            let mut page = MockPageDriver::new();
            page.expect_navigate().returning(|url| {
                Err(ScreenError::Navigation {
                    url: url.to_string(),
                    reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
                })
            });
            Ok(Box::new(page) as Box<dyn PageDriver>)
        });
        let screen = LocalScreen::attach("", "127.0.0.1:9222", Arc::new(connector));

        // Act
        let result = screen.show("http://nowhere.invalid").await;

        // Assert
        assert!(matches!(result, Err(ScreenError::Navigation { .. })));
        assert!(screen.is_attached().await);
    }

    #[tokio::test]
    async fn test_lost_session_detaches_and_next_call_reattaches() {
        // Arrange: every page reports the socket gone.
        let connector = CountingConnector::failing_pages(lost());
        let screen = LocalScreen::attach(
            "",
            "127.0.0.1:9222",
            Arc::clone(&connector) as Arc<dyn DevtoolsConnector>,
        );

        // Act
        let first = screen.stat().await;
        let attached = screen.is_attached().await;
        let second = screen.stat().await;

        // Assert: each failure is returned, not retried, and the next call
        // attached afresh.
        assert!(first.is_err());
        assert!(!attached);
        assert!(second.is_err());
        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test]
    async fn test_capture_error_keeps_session() {
        let connector = CountingConnector::failing_pages(ScreenError::Capture("gpu".to_string()));
        let screen = LocalScreen::attach(
            "",
            "127.0.0.1:9222",
            Arc::clone(&connector) as Arc<dyn DevtoolsConnector>,
        );

        assert!(matches!(screen.snap().await, Err(ScreenError::Capture(_))));
        assert!(matches!(screen.snap().await, Err(ScreenError::Capture(_))));
        assert_eq!(connector.connects(), 1);
    }

    // ── Deadline ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_hung_target_times_out() {
        // Arrange: every driver call takes far longer than the deadline.
        let connector = CountingConnector::new(Duration::ZERO, Duration::from_secs(10));
        let screen = LocalScreen::attach("", "127.0.0.1:9222", connector)
            .with_operation_timeout(Duration::from_millis(50));

        // Act
        let started = Instant::now();
        let result = screen.show("http://example.com").await;

        // Assert
        assert_eq!(
            result,
            Err(ScreenError::Timeout {
                operation: "show",
                after: Duration::from_millis(50),
            })
        );
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_hung_attach_times_out_and_leaves_screen_detached() {
        let connector = CountingConnector::new(Duration::from_secs(10), Duration::ZERO);
        let screen = LocalScreen::attach("", "127.0.0.1:9222", connector)
            .with_operation_timeout(Duration::from_millis(50));

        let result = screen.stat().await;

        assert!(matches!(result, Err(ScreenError::Timeout { operation: "stat", .. })));
        assert!(!screen.is_attached().await);
    }

    #[tokio::test]
    async fn test_timed_out_show_detaches_and_next_call_reattaches() {
        // Arrange: navigation outlives the deadline.
        let connector = CountingConnector::new(Duration::ZERO, Duration::from_millis(200));
        let screen = LocalScreen::attach(
            "",
            "127.0.0.1:9222",
            Arc::clone(&connector) as Arc<dyn DevtoolsConnector>,
        )
        .with_operation_timeout(Duration::from_millis(50));

        // Act
        let result = screen.show("http://slow.example").await;
        let attached_after_timeout = screen.is_attached().await;

        // Assert: the abandoned page is gone, so the next call starts afresh.
        assert!(matches!(result, Err(ScreenError::Timeout { operation: "show", .. })));
        assert!(!attached_after_timeout);
        let _ = screen.stat().await;
        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test]
    async fn test_timed_out_stat_keeps_session() {
        let connector = CountingConnector::new(Duration::ZERO, Duration::from_millis(200));
        let screen = LocalScreen::attach(
            "",
            "127.0.0.1:9222",
            Arc::clone(&connector) as Arc<dyn DevtoolsConnector>,
        )
        .with_operation_timeout(Duration::from_millis(50));

        let result = screen.stat().await;

        assert!(matches!(result, Err(ScreenError::Timeout { operation: "stat", .. })));
        assert!(screen.is_attached().await);
        assert_eq!(connector.connects(), 1);
    }
}
