//! Debounced persistence of the site collection.
//!
//! The writer task is the only caller of `SiteStore::save`. Change signals
//! open a quiet window; every further signal inside the window restarts it,
//! and once it elapses the latest snapshot is saved in one call. A steady
//! stream of changes still gets saved once the oldest unsaved change has
//! waited `max_wait`.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, timeout};
use tracing::debug;

use crate::models::Site;
use crate::store::SiteStore;

#[derive(Debug)]
pub(crate) enum WriterCommand {
    /// The collection changed
    Changed,
    /// Save now and acknowledge once done
    Flush(oneshot::Sender<()>),
}

/// Spawn the writer. It exits after the last sender is dropped, saving any
/// change still waiting for its window.
pub(crate) fn spawn_writer(
    store: Arc<dyn SiteStore>,
    snapshots: watch::Receiver<Vec<Site>>,
    mut commands: mpsc::UnboundedReceiver<WriterCommand>,
    debounce: Duration,
    max_wait: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(command) = commands.recv().await {
            let mut ack = match command {
                WriterCommand::Changed => None,
                WriterCommand::Flush(tx) => Some(tx),
            };

            let deadline = Instant::now() + max_wait;
            let mut coalesced = 1usize;
            while ack.is_none() {
                let window = debounce.min(deadline.saturating_duration_since(Instant::now()));
                if window.is_zero() {
                    break;
                }
                match timeout(window, commands.recv()).await {
                    Ok(Some(WriterCommand::Changed)) => coalesced += 1,
                    Ok(Some(WriterCommand::Flush(tx))) => ack = Some(tx),
                    // Quiet window or max wait elapsed, or the coordinator is gone
                    Ok(None) | Err(_) => break,
                }
            }

            let sites = snapshots.borrow().clone();
            debug!(changes = coalesced, sites = sites.len(), "Persisting site collection");
            store.save(&sites).await;

            if let Some(tx) = ack {
                let _ = tx.send(());
            }
        }

        debug!("Site writer stopped");
    })
}
