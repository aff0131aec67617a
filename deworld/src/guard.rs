//! Required-chain enforcement.
//!
//! [`ChainGuard`] keeps the last observed [`NetworkStatus`] in a watch
//! channel. It never retries: a failed switch leaves the status as it was
//! and the user has to ask again.

use std::sync::Arc;

use tokio::sync::watch;

use crate::chain::{ChainId, ChainMetadata, NetworkStatus};
use crate::error::Error;
use crate::notify::{Notice, Notifier};
use crate::wallet::WalletProvider;

/// Compares the wallet's chain against the required one and requests switches.
pub struct ChainGuard<W> {
    wallet: Arc<W>,
    chain: ChainMetadata,
    notifier: Arc<dyn Notifier>,
    status: watch::Sender<NetworkStatus>,
}

impl<W> std::fmt::Debug for ChainGuard<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainGuard")
            .field("chain", &self.chain.chain_id)
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

impl<W: WalletProvider> ChainGuard<W> {
    /// Creates a guard requiring `chain`.
    #[must_use]
    pub fn new(wallet: Arc<W>, chain: ChainMetadata, notifier: Arc<dyn Notifier>) -> Self {
        let (status, _) = watch::channel(NetworkStatus::unknown(chain.chain_id));
        Self {
            wallet,
            chain,
            notifier,
            status,
        }
    }

    /// The required chain.
    #[must_use]
    pub const fn required(&self) -> ChainId {
        self.chain.chain_id
    }

    /// Metadata of the required chain.
    #[must_use]
    pub const fn chain(&self) -> &ChainMetadata {
        &self.chain
    }

    /// Reads the wallet's active chain without updating the status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProviderUnavailable`] if the wallet cannot answer.
    pub async fn read_chain_id(&self) -> Result<ChainId, Error> {
        self.wallet
            .chain_id()
            .await
            .map_err(Error::ProviderUnavailable)
    }

    /// `true` iff `chain_id` is exactly the required chain.
    #[must_use]
    pub fn is_required(&self, chain_id: ChainId) -> bool {
        chain_id == self.chain.chain_id
    }

    /// Re-reads the active chain and publishes the recomputed status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProviderUnavailable`] if the wallet cannot answer;
    /// the previous status is kept.
    pub async fn refresh(&self) -> Result<NetworkStatus, Error> {
        let observed = self.read_chain_id().await?;
        let status = NetworkStatus::observed(self.chain.chain_id, observed);
        self.status.send_if_modified(|current| {
            let changed = *current != status;
            *current = status;
            changed
        });
        Ok(status)
    }

    /// Asks the wallet to switch to the required chain, adding it first when
    /// the wallet reports it as unrecognized. Outcomes are reported as notices.
    ///
    /// # Errors
    ///
    /// - [`Error::UserRejected`] if the user declined.
    /// - [`Error::ChainUnrecognized`] if the wallet could not add the chain.
    /// - [`Error::ProviderUnavailable`] for other wallet failures.
    pub async fn request_switch(&self) -> Result<NetworkStatus, Error> {
        let loading = Notice::loading(format!("Switching to {}...", self.chain.chain_name));
        let id = loading.id;
        self.notifier.notify(loading);

        match self.switch_or_add().await {
            Ok(status) if status.is_correct() => {
                self.notifier.notify(
                    Notice::success(format!("Switched to {}", self.chain.chain_name)).replacing(id),
                );
                Ok(status)
            }
            Ok(status) => {
                self.notifier.notify(
                    Notice::error(format!(
                        "Wallet is still on the wrong network. Please switch to {}.",
                        self.chain.chain_name
                    ))
                    .replacing(id),
                );
                Ok(status)
            }
            Err(err) => {
                self.notifier.notify(
                    Notice::error(format!("Failed to switch network: {err}")).replacing(id),
                );
                Err(err)
            }
        }
    }

    async fn switch_or_add(&self) -> Result<NetworkStatus, Error> {
        match self.wallet.switch_chain(self.chain.chain_id).await {
            Ok(()) => {}
            Err(err) if err.is_unrecognized_chain() => {
                #[cfg(feature = "telemetry")]
                tracing::info!(chain = %self.chain.chain_id, "wallet does not know chain, adding it");
                self.wallet.add_chain(&self.chain).await.map_err(|err| {
                    if err.is_user_rejected() {
                        Error::UserRejected(err)
                    } else {
                        Error::ChainUnrecognized(self.chain.chain_id)
                    }
                })?;
            }
            Err(err) => return Err(Error::from_provider(err)),
        }
        self.refresh().await
    }

    /// The last published status.
    #[must_use]
    pub fn status(&self) -> NetworkStatus {
        *self.status.borrow()
    }

    /// Subscribes to status changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.status.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NoticeLevel;
    use crate::testing::{FakeWallet, RecordingNotifier, zksync_sepolia};
    use crate::wallet::ProviderRpcError;

    fn guard(wallet: &Arc<FakeWallet>) -> (ChainGuard<FakeWallet>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let guard = ChainGuard::new(Arc::clone(wallet), zksync_sepolia(), Arc::clone(&notifier) as Arc<dyn Notifier>);
        (guard, notifier)
    }

    #[test]
    fn test_is_required_is_exact() {
        let wallet = Arc::new(FakeWallet::new(ChainId::new(1)));
        let (guard, _) = guard(&wallet);
        assert!(guard.is_required("0x12c".parse().unwrap()));
        assert!(!guard.is_required(ChainId::new(1)));
        assert!(!guard.is_required(ChainId::new(0x12d)));
        assert!(!guard.is_required(ChainId::new(324)));
    }

    #[tokio::test]
    async fn test_refresh_publishes_status() {
        let wallet = Arc::new(FakeWallet::new(ChainId::new(1)));
        let (guard, _) = guard(&wallet);
        let mut rx = guard.subscribe();
        assert_eq!(guard.status().observed, None);

        let status = guard.refresh().await.unwrap();
        assert!(status.needs_switch());
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), status);
    }

    #[tokio::test]
    async fn test_switch_known_chain() {
        let wallet = Arc::new(FakeWallet::new(ChainId::new(1)).with_known_chain(ChainId::new(300)));
        let (guard, notifier) = guard(&wallet);
        let status = guard.request_switch().await.unwrap();
        assert!(status.is_correct());
        assert_eq!(wallet.add_chain_calls(), 0);
        assert_eq!(notifier.last().unwrap().level, NoticeLevel::Success);
    }

    #[tokio::test]
    async fn test_switch_adds_unrecognized_chain_once() {
        let wallet = Arc::new(FakeWallet::new(ChainId::new(1)));
        let (guard, notifier) = guard(&wallet);
        let status = guard.request_switch().await.unwrap();
        assert!(status.is_correct());
        assert_eq!(wallet.switch_chain_calls(), 1);
        assert_eq!(wallet.add_chain_calls(), 1);

        let notices = notifier.notices();
        assert_eq!(notices[0].level, NoticeLevel::Loading);
        assert_eq!(notices[1].id, notices[0].id);
        assert_eq!(notices[1].level, NoticeLevel::Success);
    }

    #[tokio::test]
    async fn test_switch_rejected_keeps_wrong_network() {
        let wallet = Arc::new(FakeWallet::new(ChainId::new(1)).with_known_chain(ChainId::new(300)));
        wallet.reject_next_switch(ProviderRpcError::user_rejected());
        let (guard, notifier) = guard(&wallet);
        guard.refresh().await.unwrap();

        let result = guard.request_switch().await;
        assert!(matches!(result, Err(Error::UserRejected(_))));
        assert!(guard.status().needs_switch());
        assert_eq!(notifier.last().unwrap().level, NoticeLevel::Error);
        assert_eq!(wallet.switch_chain_calls(), 1);
    }

    #[tokio::test]
    async fn test_add_chain_failure_is_unrecognized() {
        let wallet = Arc::new(FakeWallet::new(ChainId::new(1)));
        wallet.reject_next_add(ProviderRpcError::internal("add failed"));
        let (guard, _) = guard(&wallet);
        let result = guard.request_switch().await;
        assert!(matches!(result, Err(Error::ChainUnrecognized(id)) if id == ChainId::new(300)));
    }
}
