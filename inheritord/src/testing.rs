/*
 * In-memory cluster used by the unit tests.  Behaves like the API server
 * for the calls we make, and lets a test inject failures and inspect what
 * was written.
 */

use crate::errors::Error;
use crate::store::InheritorStore;
use crate::store::NamespaceStore;
use crate::store::ObjectStore;
use inheritor_api as api;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::core::v1::Pod;
use kube::Resource;
use kube::ResourceExt;
use kube::api::ObjectMeta;
use kube::core::ErrorResponse;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::MutexGuard;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct State {
    pub inheritors: BTreeMap<(String, String), api::Inheritor>,
    pub namespaces: Vec<Namespace>,
    pub pods: Vec<Pod>,
    pub config_maps: Vec<ConfigMap>,

    /* failure injection */
    pub conflicting: BTreeSet<String>,
    pub fail_namespace_list: bool,
    pub fail_get: bool,
    pub fail_create: bool,
    pub fail_status: bool,

    /* fires the token once this many object updates were attempted */
    pub cancel_after_updates: Option<(usize, CancellationToken)>,

    /* "Kind/namespace/name" of every attempted object update, in order */
    pub updates: Vec<String>,
    pub status_writes: usize,
}

#[derive(Default)]
pub struct MemoryCluster {
    state: Mutex<State>,
}

pub trait Stored: Resource<DynamicType = ()> + Clone + Send + Sync + 'static {
    fn bucket(state: &mut State) -> &mut Vec<Self>;
}

impl Stored for Pod {
    fn bucket(state: &mut State) -> &mut Vec<Self> {
	&mut state.pods
    }
}

impl Stored for ConfigMap {
    fn bucket(state: &mut State) -> &mut Vec<Self> {
	&mut state.config_maps
    }
}

fn unavailable() -> Error {
    Error::Kube(kube::Error::Api(ErrorResponse{
	status: "Failure".to_string(),
	message: "the server is currently unable to handle the request".to_string(),
	reason: "ServiceUnavailable".to_string(),
	code: 503,
    }))
}

impl MemoryCluster {

    pub fn with(setup: impl FnOnce(&mut State)) -> Self {
	let cluster = Self::default();
	{
	    let mut state = cluster.state();
	    setup(&mut *state);
	}
	cluster
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
	self.state.lock().unwrap()
    }

    pub fn pod(&self, namespace: &str, name: &str) -> Pod {
	find(&self.state().pods, namespace, name)
    }

    pub fn config_map(&self, namespace: &str, name: &str) -> ConfigMap {
	find(&self.state().config_maps, namespace, name)
    }

    pub fn inheritor(&self, namespace: &str, name: &str) -> Option<api::Inheritor> {
	let key = (namespace.to_string(), name.to_string());
	self.state().inheritors.get(&key).cloned()
    }
}

fn find<K: Resource + Clone>(objects: &[K], namespace: &str, name: &str) -> K {
    objects.iter()
	.find(|obj| obj.namespace().as_deref() == Some(namespace) && obj.name_any() == name)
	.cloned()
	.unwrap_or_else(|| panic!("no object {}/{}", namespace, name))
}

fn key_of(inheritor: &api::Inheritor) -> (String, String) {
    (inheritor.namespace().unwrap_or_default(), inheritor.name_any())
}

#[async_trait]
impl InheritorStore for MemoryCluster {

    async fn get(&self, namespace: &str, name: &str) -> Result<Option<api::Inheritor>, Error> {
	let state = self.state();
	if state.fail_get {
	    return Err(unavailable());
	}
	Ok(state.inheritors.get(&(namespace.to_string(), name.to_string())).cloned())
    }

    async fn create(&self, inheritor: &api::Inheritor) -> Result<api::Inheritor, Error> {
	let mut state = self.state();
	if state.fail_create {
	    return Err(unavailable());
	}

	let key = key_of(inheritor);
	if state.inheritors.contains_key(&key) {
	    return Err(Error::InvalidResource(format!("{}/{} already exists", key.0, key.1)));
	}

	/* the API server ignores the status sub-resource on create */
	let mut created = inheritor.clone();
	created.status = None;
	state.inheritors.insert(key, created.clone());
	Ok(created)
    }

    async fn update_status(&self, inheritor: &api::Inheritor) -> Result<(), Error> {
	let mut state = self.state();
	let name = inheritor.name_any();
	if state.fail_status {
	    return Err(Error::UpdateFailure{
		kind: "Inheritor".to_string(),
		name: name,
		reason: "status update rejected".to_string(),
	    });
	}

	state.status_writes += 1;
	match state.inheritors.get_mut(&key_of(inheritor)) {
	    Some(stored) => {
		stored.status = inheritor.status.clone();
		Ok(())
	    },
	    None => Err(Error::InvalidResource(format!("inheritor {} not found", name))),
	}
    }
}

#[async_trait]
impl NamespaceStore for MemoryCluster {

    async fn list_namespaces(&self, match_labels: &BTreeMap<String, String>) -> Result<Vec<Namespace>, Error> {
	let state = self.state();
	if state.fail_namespace_list {
	    return Err(Error::ListFailure{
		kind: "Namespace".to_string(),
		reason: "connection refused".to_string(),
	    });
	}

	Ok(state.namespaces.iter()
	   .filter(|ns| matches(match_labels, ns.labels()))
	   .cloned()
	   .collect())
    }
}

#[async_trait]
impl<K: Stored> ObjectStore<K> for MemoryCluster {

    async fn list(&self, namespace: &str) -> Result<Vec<K>, Error> {
	let mut state = self.state();
	Ok(K::bucket(&mut state).iter()
	   .filter(|obj| obj.namespace().as_deref() == Some(namespace))
	   .cloned()
	   .collect())
    }

    async fn update(&self, object: &K) -> Result<(), Error> {
	let mut state = self.state();
	let kind = K::kind(&()).to_string();
	let namespace = object.namespace().unwrap_or_default();
	let name = object.name_any();

	state.updates.push(format!("{}/{}/{}", kind, namespace, name));
	if let Some((after, cancel)) = &state.cancel_after_updates {
	    if state.updates.len() >= *after {
		cancel.cancel();
	    }
	}
	if state.conflicting.contains(&name) {
	    return Err(Error::WriteConflict{ kind: kind, name: name });
	}

	let stored = K::bucket(&mut state).iter_mut()
	    .find(|obj| obj.namespace().as_deref() == Some(namespace.as_str()) && obj.name_any() == name);
	match stored {
	    Some(stored) => {
		*stored = object.clone();
		Ok(())
	    },
	    None => Err(Error::UpdateFailure{ kind: kind, name: name, reason: "not found".to_string() }),
	}
    }
}

/*
 * Exact, conjunctive match, the way the API server evaluates a
 * matchLabels selector: every key must be present with the same value.
 */
pub fn matches(match_labels: &BTreeMap<String, String>, labels: &BTreeMap<String, String>) -> bool {
    match_labels.iter().all(|(key, value)| labels.get(key) == Some(value))
}

pub fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn meta(namespace: Option<&str>, name: &str, pairs: &[(&str, &str)]) -> ObjectMeta {
    ObjectMeta{
	name: Some(name.to_string()),
	namespace: namespace.map(|ns| ns.to_string()),
	labels: if pairs.is_empty() { None } else { Some(labels(pairs)) },
	..ObjectMeta::default()
    }
}

/* namespaces always carry kubernetes.io/metadata.name, like on a real cluster */
pub fn namespace(name: &str, pairs: &[(&str, &str)]) -> Namespace {
    let mut ns = Namespace{
	metadata: meta(None, name, pairs),
	..Namespace::default()
    };
    ns.labels_mut().insert("kubernetes.io/metadata.name".to_string(), name.to_string());
    ns
}

pub fn pod(namespace: &str, name: &str, pairs: &[(&str, &str)]) -> Pod {
    Pod{
	metadata: meta(Some(namespace), name, pairs),
	..Pod::default()
    }
}

pub fn config_map(namespace: &str, name: &str, pairs: &[(&str, &str)]) -> ConfigMap {
    ConfigMap{
	metadata: meta(Some(namespace), name, pairs),
	..ConfigMap::default()
    }
}

pub fn by_name(name: &str) -> BTreeMap<String, String> {
    labels(&[("kubernetes.io/metadata.name", name)])
}
