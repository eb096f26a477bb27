//! Hot-swappable facade.
//!
//! # Design Decisions
//! - A new configuration builds a brand new facade; cursors and breakers
//!   start from defaults
//! - Calls already running keep the facade they started with
//! - Invalid configurations are rejected and the current facade stays

use arc_swap::ArcSwap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::{ConfigError, ResilienceConfig};
use crate::connection::Connector;
use crate::facade::{Resilience, ResilienceBuilder};
use crate::observability::{ResilienceObserver, TracingObserver};

/// A [`Resilience`] facade that can be replaced while in use.
pub struct ReloadableResilience<C> {
    current: ArcSwap<Resilience<C>>,
    connector: C,
    observer: Arc<dyn ResilienceObserver>,
}

impl<C: Connector + Clone> ReloadableResilience<C> {
    pub fn new(config: &ResilienceConfig, connector: C) -> Result<Self, ConfigError> {
        Self::with_observer(config, connector, Arc::new(TracingObserver))
    }

    pub fn with_observer(
        config: &ResilienceConfig,
        connector: C,
        observer: Arc<dyn ResilienceObserver>,
    ) -> Result<Self, ConfigError> {
        let initial = Self::build(config, connector.clone(), observer.clone())?;
        Ok(Self {
            current: ArcSwap::from_pointee(initial),
            connector,
            observer,
        })
    }

    /// The facade currently in effect.
    pub fn load(&self) -> Arc<Resilience<C>> {
        self.current.load_full()
    }

    /// Replace the facade with one built from `config`.
    pub fn apply(&self, config: &ResilienceConfig) -> Result<(), ConfigError> {
        let next = Self::build(config, self.connector.clone(), self.observer.clone())?;
        self.current.store(Arc::new(next));
        tracing::info!(
            endpoints = config.endpoints.len(),
            "Resilience configuration applied"
        );
        Ok(())
    }

    /// Apply configurations from `updates` until the channel closes.
    pub async fn follow(&self, mut updates: mpsc::UnboundedReceiver<ResilienceConfig>) {
        while let Some(config) = updates.recv().await {
            if let Err(e) = self.apply(&config) {
                tracing::error!(error = %e, "Rejected configuration update");
            }
        }
        tracing::debug!("Configuration update channel closed");
    }

    fn build(
        config: &ResilienceConfig,
        connector: C,
        observer: Arc<dyn ResilienceObserver>,
    ) -> Result<Resilience<C>, ConfigError> {
        Ok(ResilienceBuilder::from_config(config, connector)?
            .observer(observer)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;
    use crate::connection::EndpointConnector;
    use crate::observability::NoopObserver;
    use crate::pool::{Endpoint, TargetKind};

    fn config(addresses: &[&str]) -> ResilienceConfig {
        let mut config = ResilienceConfig::default();
        config.retry.max_attempts_per_endpoint = 1;
        for (i, address) in addresses.iter().enumerate() {
            config.endpoints.push(EndpointConfig {
                kind: TargetKind::Rpc,
                address: address.to_string(),
                priority: i as i64,
            });
        }
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_swaps_and_resets_state() {
        let reloadable = ReloadableResilience::with_observer(
            &config(&["http://a.example.org", "http://b.example.org"]),
            EndpointConnector,
            Arc::new(NoopObserver),
        )
        .unwrap();

        reloadable
            .load()
            .execute(TargetKind::Rpc, |endpoint: Endpoint| async move {
                if endpoint.address.starts_with("http://b") {
                    Ok(())
                } else {
                    Err("down")
                }
            })
            .await
            .unwrap();
        assert_eq!(reloadable.load().status().pools[&TargetKind::Rpc].current_index, 1);

        reloadable
            .apply(&config(&["http://a.example.org", "http://b.example.org", "http://c.example.org"]))
            .unwrap();
        let status = reloadable.load().status();
        assert_eq!(status.pools[&TargetKind::Rpc].endpoints.len(), 3);
        assert_eq!(status.pools[&TargetKind::Rpc].current_index, 0);
    }

    #[tokio::test]
    async fn test_invalid_update_keeps_current() {
        let reloadable = ReloadableResilience::with_observer(
            &config(&["http://a.example.org"]),
            EndpointConnector,
            Arc::new(NoopObserver),
        )
        .unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(config(&["not a url"])).unwrap();
        tx.send(config(&["http://a.example.org", "http://b.example.org"]))
            .unwrap();
        drop(tx);

        reloadable.follow(rx).await;
        assert_eq!(reloadable.load().pool().len(TargetKind::Rpc), 2);
    }
}
