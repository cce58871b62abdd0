//! Startup use case: put the default URL on every Screen.

use std::sync::Arc;

use futures_util::future::join_all;
use kiosk_core::{Screen, ScreenError};
use tracing::{info, warn};

/// Shows `url` on every Screen concurrently.
///
/// A failing Screen is logged and reported in the result; it does not stop
/// the others.  Results are in the same order as `screens`.
pub async fn show_on_all(
    screens: &[Arc<dyn Screen>],
    url: &str,
) -> Vec<(String, Result<(), ScreenError>)> {
    let shows = screens.iter().map(|screen| async move {
        let result = screen.show(url).await;
        match &result {
            Ok(()) => info!(
                screen = %screen.id(),
                name = %screen.name(),
                url,
                "showing default URL"
            ),
            Err(err) => warn!(
                screen = %screen.id(),
                name = %screen.name(),
                error = %err,
                "could not show default URL"
            ),
        }
        (screen.id().to_string(), result)
    });
    join_all(shows).await
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_core::{ScreenStatus, Snapshot};
    use std::sync::Mutex;

    struct RecordingScreen {
        id: String,
        shown: Mutex<Vec<String>>,
        should_fail: bool,
    }

    impl RecordingScreen {
        fn new(id: &str, should_fail: bool) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                shown: Mutex::new(Vec::new()),
                should_fail,
            })
        }
    }

    #[async_trait::async_trait]
    impl Screen for RecordingScreen {
        fn id(&self) -> &str {
            &self.id
        }
        fn name(&self) -> &str {
            &self.id
        }
        async fn show(&self, target: &str) -> Result<(), ScreenError> {
            if self.should_fail {
                return Err(ScreenError::Connection {
                    addr: self.id.clone(),
                    reason: "refused".to_string(),
                });
            }
            self.shown.lock().unwrap().push(target.to_string());
            Ok(())
        }
        async fn snap(&self) -> Result<Snapshot, ScreenError> {
            Ok(Snapshot::from_bytes(Vec::new()))
        }
        async fn stat(&self) -> Result<ScreenStatus, ScreenError> {
            Ok(ScreenStatus::default())
        }
    }

    #[tokio::test]
    async fn test_show_on_all_reaches_every_screen() {
        // Arrange
        let a = RecordingScreen::new("a", false);
        let b = RecordingScreen::new("b", false);
        let screens: Vec<Arc<dyn Screen>> = vec![a.clone(), b.clone()];

        // Act
        let results = show_on_all(&screens, "http://localhost:9292/").await;

        // Assert
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        assert_eq!(*a.shown.lock().unwrap(), vec!["http://localhost:9292/"]);
        assert_eq!(*b.shown.lock().unwrap(), vec!["http://localhost:9292/"]);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_rest() {
        let bad = RecordingScreen::new("bad", true);
        let good = RecordingScreen::new("good", false);
        let screens: Vec<Arc<dyn Screen>> = vec![bad, good.clone()];

        let results = show_on_all(&screens, "http://x").await;

        assert_eq!(results[0].0, "bad");
        assert!(results[0].1.is_err());
        assert_eq!(results[1].0, "good");
        assert!(results[1].1.is_ok());
        assert_eq!(good.shown.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_screens_is_a_no_op() {
        let results = show_on_all(&[], "http://x").await;
        assert!(results.is_empty());
    }
}
