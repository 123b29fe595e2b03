use kube_derive::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSelector {

    /*
     * Namespaces must carry every one of these labels, with exactly
     * this value.  An empty map selects all namespaces.
     */
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Selector {

    pub namespace_selector: NamespaceSelector,

    /*
     * Label keys copied from a matched namespace onto every pod and
     * configmap living in it.
     */
    #[serde(default)]
    pub include_labels: Vec<String>,
}

impl Selector {

    pub fn new(match_labels: BTreeMap<String, String>, include_labels: &[&str]) -> Self {
	Self{
	    namespace_selector: NamespaceSelector{ match_labels },
	    include_labels: include_labels.iter().map(|key| key.to_string()).collect(),
	}
    }
}

#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(group = "labels.theisferre", version = "v1", kind = "Inheritor", namespaced)]
#[kube(status = "InheritorStatus")]
#[serde(rename_all = "camelCase")]
pub struct InheritorSpec {

    /*
     * Processed in order.  When two selectors match the same namespace
     * and include the same key, the last one wins.
     */
    #[serde(default)]
    pub selectors: Vec<Selector>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStatus {

    pub name: String,

    // whether the last pass copied the labels into every pod and configmap
    pub labels_synced: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct InheritorStatus {

    // keyed by namespace name
    #[serde(default)]
    pub namespaces: BTreeMap<String, NamespaceStatus>,
}

impl InheritorStatus {

    pub fn record(&mut self, namespace: &str, synced: bool) {
	self.namespaces.insert(namespace.to_string(), NamespaceStatus{
	    name: namespace.to_string(),
	    labels_synced: synced,
	});
    }

    pub fn is_synced(&self, namespace: &str) -> Option<bool> {
	self.namespaces.get(namespace).map(|ns| ns.labels_synced)
    }
}

/*
 * Returns an empty Inheritor: no selectors and an initialised, empty
 * status map.
 */
pub fn new(name: &str, namespace: &str) -> Inheritor {
    let mut inheritor = Inheritor::new(name, InheritorSpec::default());
    inheritor.metadata.namespace = Some(namespace.to_string());
    inheritor.status = Some(InheritorStatus::default());

    inheritor
}
