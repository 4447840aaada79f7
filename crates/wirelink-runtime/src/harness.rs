//! Process-wide owner of the running roles.
//!
//! Wires termination signals once per process and turns them into an
//! orderly stop sequence: stop every owned role, then drain the scheduled
//! tasks. Sessions themselves know nothing about signals.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use wirelink_client::Dialer;
use wirelink_server::Listener;

use crate::shutdown::ShutdownCoordinator;

/// Harness error.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("signal wiring failed: {0}")]
    Signal(#[from] std::io::Error),
}

/// A role the harness can schedule and stop.
///
/// Both roles implement this over their composed session; the harness
/// never touches a session directly.
#[async_trait]
pub trait Role: Send + Sync {
    /// Role name, used in logs.
    fn name(&self) -> &str;

    /// Role-specific entry point; runs until done or stopped.
    async fn start(&self);

    /// Stop the role and release its sessions.
    async fn stop(&self);
}

#[async_trait]
impl Role for Listener {
    fn name(&self) -> &str {
        "listener"
    }

    async fn start(&self) {
        if let Err(err) = Listener::start(self).await {
            error!(%err, "listener failed");
        }
    }

    async fn stop(&self) {
        Listener::stop(self).await;
    }
}

#[async_trait]
impl Role for Dialer {
    fn name(&self) -> &str {
        "dialer"
    }

    async fn start(&self) {
        Dialer::start(self).await;
    }

    async fn stop(&self) {
        Dialer::stop(self).await;
    }
}

/// Owns role instances and the process shutdown sequence.
pub struct Harness {
    roles: Vec<Arc<dyn Role>>,
    coordinator: ShutdownCoordinator,
}

impl Harness {
    /// Create an empty harness.
    #[must_use]
    pub fn new() -> Self {
        Self {
            roles: Vec::new(),
            coordinator: ShutdownCoordinator::new(),
        }
    }

    /// Register a role to be scheduled by [`Self::run`].
    pub fn register(&mut self, role: Arc<dyn Role>) {
        self.roles.push(role);
    }

    /// A token observing the harness shutdown state.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.coordinator.token()
    }

    /// Programmatically initiate the stop sequence.
    pub fn trigger_shutdown(&self) {
        self.coordinator.trigger();
    }

    /// Schedule every registered role's `start` as a background task.
    #[must_use]
    pub fn spawn_roles(&self) -> Vec<JoinHandle<()>> {
        self.roles
            .iter()
            .map(|role| {
                let role = Arc::clone(role);
                info!(role = role.name(), "scheduling role");
                tokio::spawn(async move { role.start().await })
            })
            .collect()
    }

    /// Run until an interrupt/terminate signal (or a programmatic
    /// trigger), then stop every role and drain the scheduled tasks.
    ///
    /// # Errors
    /// Returns an error only if signal handlers cannot be installed.
    pub async fn run(&self) -> Result<(), HarnessError> {
        let handles = self.spawn_roles();

        let token = self.coordinator.token();
        tokio::select! {
            () = token.cancelled() => info!("shutdown triggered"),
            result = wait_for_signal() => {
                result?;
                info!("termination signal received");
            }
        }

        self.stop_all().await;
        self.coordinator.drain(handles, None).await;
        info!("harness stopped");
        Ok(())
    }

    /// Stop every registered role, in registration order.
    pub async fn stop_all(&self) {
        for role in &self.roles {
            info!(role = role.name(), "stopping role");
            role.stop().await;
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve on SIGINT or, on unix, SIGTERM.
async fn wait_for_signal() -> std::io::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = ctrl_c => result?,
            _ = terminate.recv() => {}
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NopRole;

    #[async_trait]
    impl Role for NopRole {
        fn name(&self) -> &str {
            "nop"
        }
        async fn start(&self) {}
        async fn stop(&self) {}
    }

    #[tokio::test]
    async fn test_run_returns_after_programmatic_trigger() {
        let mut harness = Harness::new();
        harness.register(Arc::new(NopRole));

        let harness = Arc::new(harness);
        let background = {
            let harness = Arc::clone(&harness);
            tokio::spawn(async move { harness.run().await })
        };

        harness.trigger_shutdown();
        let result = tokio::time::timeout(std::time::Duration::from_secs(2), background)
            .await
            .expect("run did not stop")
            .expect("run task panicked");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_spawn_roles_schedules_each_role() {
        let mut harness = Harness::new();
        harness.register(Arc::new(NopRole));
        harness.register(Arc::new(NopRole));

        let handles = harness.spawn_roles();
        assert_eq!(handles.len(), 2);
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
