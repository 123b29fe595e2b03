use crate::errors::Error;
use crate::store::guarded;
use crate::store::InheritorStore;
use inheritor_api as api;

use tokio_util::sync::CancellationToken;

/*
 * Make sure the status map exists before the pass records anything.
 */
pub fn normalize(inheritor: &mut api::Inheritor) {
    if inheritor.status.is_none() {
	log::info!("Initializing status of Inheritor {:?}", inheritor.metadata.name);
	inheritor.status = Some(api::InheritorStatus::default());
    }
}

/*
 * Records the outcome for one namespace and persists the status right
 * away.  A failed write leaves any label changes in place.
 */
pub async fn record<S>(store: &S, inheritor: &mut api::Inheritor, namespace: &str, synced: bool, cancel: &CancellationToken) -> Result<(), Error>
where
    S: InheritorStore,
{
    inheritor.status
	.get_or_insert_with(api::InheritorStatus::default)
	.record(namespace, synced);

    if let Err(err) = guarded(cancel, store.update_status(inheritor)).await {
	log::error!("Unable to update Inheritor status for namespace {}: {}", namespace, err);
	return Err(err);
    }

    Ok(())
}

/*
 * Records a namespace as not synced.  Unlike record(), the write is not
 * cancellable: a pass aborted by shutdown still leaves the namespace it
 * stopped in marked as failed.
 */
pub async fn mark_unsynced<S>(store: &S, inheritor: &mut api::Inheritor, namespace: &str) -> Result<(), Error>
where
    S: InheritorStore,
{
    inheritor.status
	.get_or_insert_with(api::InheritorStatus::default)
	.record(namespace, false);

    store.update_status(inheritor).await
}
