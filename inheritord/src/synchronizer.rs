use crate::errors::Error;
use crate::store::guarded;
use crate::store::ObjectStore;

use k8s_openapi::api::core::v1::ConfigMap as KubeConfigMap;
use k8s_openapi::api::core::v1::Namespace as KubeNamespace;
use k8s_openapi::api::core::v1::Pod as KubePod;
use kube::Resource;
use kube::ResourceExt;
use log;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/*
 * Copies every included key from the namespace labels.  A key the
 * namespace does not carry is written with an empty value.  Labels that
 * are not included are left untouched.
 */
pub fn inherit_labels(labels: &mut BTreeMap<String, String>, namespace_labels: &BTreeMap<String, String>, include_labels: &[String]) {
    for key in include_labels {
	let value = namespace_labels.get(key).cloned().unwrap_or_default();
	labels.insert(key.clone(), value);
    }
}

/*
 * Pods first, then configmaps.  The first failed write aborts the whole
 * namespace, writes already done are kept.
 */
pub async fn sync_namespace<S>(store: &S, namespace: &KubeNamespace, include_labels: &[String], cancel: &CancellationToken) -> Result<(), Error>
where
    S: ObjectStore<KubePod> + ObjectStore<KubeConfigMap>,
{
    let name = namespace.name_any();

    log::info!("Syncing Pod labels in namespace {}", name);
    sync_objects::<KubePod, S>(store, namespace, include_labels, cancel).await?;

    log::info!("Syncing ConfigMap labels in namespace {}", name);
    sync_objects::<KubeConfigMap, S>(store, namespace, include_labels, cancel).await?;

    Ok(())
}

async fn sync_objects<K, S>(store: &S, namespace: &KubeNamespace, include_labels: &[String], cancel: &CancellationToken) -> Result<(), Error>
where
    K: Resource<DynamicType = ()> + Send + Sync + 'static,
    S: ObjectStore<K>,
{
    let name = namespace.name_any();
    let objects = guarded(cancel, ObjectStore::<K>::list(store, &name)).await?;
    if objects.is_empty() {
	return Ok(());
    }

    log::info!("{} {}(s) in namespace {}", objects.len(), K::kind(&()), name);
    for mut object in objects {
	inherit_labels(object.labels_mut(), namespace.labels(), include_labels);

	if let Err(err) = guarded(cancel, ObjectStore::<K>::update(store, &object)).await {
	    log::error!("Unable to update labels of {} {}/{}: {}", K::kind(&()), name, object.name_any(), err);
	    return Err(err);
	}
    }

    Ok(())
}
