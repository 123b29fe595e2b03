use crate::errors::Error;
use inheritor_api as api;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap as KubeConfigMap;
use k8s_openapi::api::core::v1::Namespace as KubeNamespace;
use k8s_openapi::api::core::v1::Pod as KubePod;
use k8s_openapi::NamespaceResourceScope;
use kube::Api as KubeApi;
use kube::Client as KubeClient;
use kube::Resource;
use kube::ResourceExt;
use kube::api::ListParams as KubeListParams;
use kube::api::Patch as KubePatch;
use kube::api::PatchParams as KubePatchParams;
use kube::api::PostParams as KubePostParams;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/*
 * Read and write access to the Inheritor resources themselves.
 */
#[async_trait]
pub trait InheritorStore: Send + Sync {

    /* Ok(None) when the resource does not exist */
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<api::Inheritor>, Error>;

    async fn create(&self, inheritor: &api::Inheritor) -> Result<api::Inheritor, Error>;

    /* persists only the status sub-resource */
    async fn update_status(&self, inheritor: &api::Inheritor) -> Result<(), Error>;
}

#[async_trait]
pub trait NamespaceStore: Send + Sync {

    /* namespaces carrying every one of the given labels */
    async fn list_namespaces(&self, match_labels: &BTreeMap<String, String>) -> Result<Vec<KubeNamespace>, Error>;
}

/*
 * Namespaced objects whose labels we manage (pods and configmaps).
 */
#[async_trait]
pub trait ObjectStore<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    async fn list(&self, namespace: &str) -> Result<Vec<K>, Error>;

    async fn update(&self, object: &K) -> Result<(), Error>;
}

/*
 * Everything a reconciliation pass talks to.
 */
pub trait Cluster: InheritorStore + NamespaceStore + ObjectStore<KubePod> + ObjectStore<KubeConfigMap> {}

impl<T> Cluster for T
where
    T: InheritorStore + NamespaceStore + ObjectStore<KubePod> + ObjectStore<KubeConfigMap>,
{}

/*
 * Runs a store call unless the pass was cancelled.  Cancellation wins
 * when both are ready.
 */
pub async fn guarded<T, F>(cancel: &CancellationToken, call: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    tokio::select! {
	biased;
	_ = cancel.cancelled() => Err(Error::Cancelled),
	result = call => result,
    }
}

/*
 * builds a k8s label selector query, e.g: "app=web,team=core"
 */
pub fn label_selector(match_labels: &BTreeMap<String, String>) -> String {
    match_labels.iter()
	.map(|(key, value)| format!("{}={}", key, value))
	.collect::<Vec<String>>()
	.join(",")
}

/*
 * KubeStore talks to the k8s API server.
 */
#[derive(Clone)]
pub struct KubeStore {
    kube_client: KubeClient,
}

impl KubeStore {

    fn inheritors(&self, namespace: &str) -> KubeApi<api::Inheritor> {
	KubeApi::namespaced(self.kube_client.clone(), namespace)
    }

    pub fn new(kube_client: KubeClient) -> Self {
	Self{
	    kube_client: kube_client,
	}
    }
}

fn namespace_of<K: Resource>(object: &K) -> Result<String, Error> {
    object.meta().namespace.clone().ok_or_else(|| {
	Error::InvalidResource(format!("'{}' has no namespace", object.meta().name.clone().unwrap_or_default()))
    })
}

#[async_trait]
impl InheritorStore for KubeStore {

    async fn get(&self, namespace: &str, name: &str) -> Result<Option<api::Inheritor>, Error> {
	Ok(self.inheritors(namespace).get_opt(name).await?)
    }

    async fn create(&self, inheritor: &api::Inheritor) -> Result<api::Inheritor, Error> {
	let namespace = namespace_of(inheritor)?;
	let opts = KubePostParams::default();

	Ok(self.inheritors(&namespace).create(&opts, inheritor).await?)
    }

    async fn update_status(&self, inheritor: &api::Inheritor) -> Result<(), Error> {
	let namespace = namespace_of(inheritor)?;
	let name = inheritor.name_any();

	/* merge patch: status entries are added or overwritten, never dropped */
	let patch = json!({ "status": inheritor.status });
	let opts = KubePatchParams::default();
	self.inheritors(&namespace)
	    .patch_status(&name, &opts, &KubePatch::Merge(&patch))
	    .await
	    .map_err(|err| Error::update("Inheritor", &name, err))?;

	Ok(())
    }
}

#[async_trait]
impl NamespaceStore for KubeStore {

    async fn list_namespaces(&self, match_labels: &BTreeMap<String, String>) -> Result<Vec<KubeNamespace>, Error> {
	let namespaces: KubeApi<KubeNamespace> = KubeApi::all(self.kube_client.clone());
	let params = KubeListParams::default().labels(&label_selector(match_labels));

	let list = namespaces.list(&params).await.map_err(|err| Error::list("Namespace", err))?;
	Ok(list.items)
    }
}

#[async_trait]
impl<K> ObjectStore<K> for KubeStore
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    K: Clone + Debug + DeserializeOwned + Serialize + Send + Sync + 'static,
{
    async fn list(&self, namespace: &str) -> Result<Vec<K>, Error> {
	let objects: KubeApi<K> = KubeApi::namespaced(self.kube_client.clone(), namespace);

	let list = objects.list(&KubeListParams::default())
	    .await
	    .map_err(|err| Error::list(&K::kind(&()), err))?;
	Ok(list.items)
    }

    /*
     * A full replace carrying the resourceVersion we read, so a concurrent
     * change surfaces as a WriteConflict.
     */
    async fn update(&self, object: &K) -> Result<(), Error> {
	let namespace = namespace_of(object)?;
	let name = object.name_any();
	let objects: KubeApi<K> = KubeApi::namespaced(self.kube_client.clone(), &namespace);

	objects.replace(&name, &KubePostParams::default(), object)
	    .await
	    .map_err(|err| Error::update(&K::kind(&()), &name, err))?;
	Ok(())
    }
}
