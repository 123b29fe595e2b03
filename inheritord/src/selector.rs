use crate::errors::Error;
use crate::store::guarded;
use crate::store::NamespaceStore;
use inheritor_api as api;

use k8s_openapi::api::core::v1::Namespace as KubeNamespace;
use log;
use tokio_util::sync::CancellationToken;

/*
 * Returns the namespaces selected by `selector`, in the order the store
 * lists them.  Nothing matching is not an error.
 */
pub async fn matching_namespaces<S>(store: &S, selector: &api::NamespaceSelector, cancel: &CancellationToken) -> Result<Vec<KubeNamespace>, Error>
where
    S: NamespaceStore,
{
    let namespaces = guarded(cancel, store.list_namespaces(&selector.match_labels)).await?;
    log::debug!("Selector {:?} matches {} namespace(s)", selector.match_labels, namespaces.len());

    Ok(namespaces)
}
