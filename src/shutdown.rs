//! Graceful shutdown coordination using cancellation tokens.
//!
//! `main` owns one controller and triggers it on Ctrl+C. Long-running work
//! (the polling loop, retry waits) receives child tokens instead of looking
//! at process-wide flags.

use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
pub struct ShutdownController {
    token: CancellationToken,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token cancelled together with this controller, but which can also be
    /// cancelled on its own without stopping anything else.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Trigger on Ctrl+C. The listener runs in the background.
    pub fn listen_for_ctrl_c(&self) {
        let controller = self.clone();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                log::info!("Received Ctrl+C, initiating graceful shutdown...");
                controller.trigger();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_reaches_children() {
        let shutdown = ShutdownController::new();
        let child = shutdown.child_token();
        assert!(!shutdown.is_triggered());

        shutdown.trigger();
        assert!(shutdown.is_triggered());
        assert!(child.is_cancelled());
        tokio::time::timeout(Duration::from_secs(1), child.cancelled())
            .await
            .expect("cancelled() should resolve after trigger");
    }

    #[tokio::test]
    async fn test_child_cancel_does_not_propagate_up() {
        let shutdown = ShutdownController::new();
        let child = shutdown.child_token();
        child.cancel();
        assert!(!shutdown.is_triggered());
    }
}
