use crate::errors::Error;
use crate::selector;
use crate::status;
use crate::store::guarded;
use crate::store::Cluster;
use crate::synchronizer;
use inheritor_api as api;

use kube::ResourceExt;
use kube::runtime::reflector::ObjectRef as KubeObjectRef;
use log;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/*
 * How a pass ended.
 */
#[derive(Debug)]
pub enum PassOutcome {

    /* every selector and every matched namespace were processed */
    Completed { namespaces: usize },

    /*
     * The pass started but stopped at the first error.  `namespace` is
     * the namespace being processed, None when evaluating a selector
     * failed.
     */
    Partial { namespace: Option<String>, error: Error },

    /* the Inheritor could neither be read nor created */
    LoadFailed(Error),
}

/*
 * Result of reconcile(): the outcome plus when to run again.
 */
#[derive(Debug)]
pub struct Reconciliation {
    pub next_run_after: Duration,
    pub outcome: PassOutcome,
}

impl Reconciliation {

    pub fn into_result(self) -> Result<Duration, Error> {
	match self.outcome {
	    PassOutcome::Completed{ namespaces } => {
		log::debug!("Pass completed, {} namespace(s) synced", namespaces);
		Ok(self.next_run_after)
	    },
	    PassOutcome::Partial{ namespace, error } => {
		log::warn!("Pass aborted at namespace {:?}", namespace);
		Err(error)
	    },
	    PassOutcome::LoadFailed(error) => Err(error),
	}
    }
}

/*
 * Reconciler keeps the inherited labels of one Inheritor in sync.  It
 * holds no state between passes: every pass re-reads the Inheritor and
 * re-applies everything it describes.
 */
pub struct Reconciler<S> {
    store: S,
    interval: Duration,
}

impl<S: Cluster> Reconciler<S> {

    pub fn new(store: S, interval: Duration) -> Self {
	Self{
	    store: store,
	    interval: interval,
	}
    }

    pub fn interval(&self) -> Duration {
	self.interval
    }

    /*
     * Runs one pass for the Inheritor identified by `key`.  The next run is
     * always due after the fixed interval, whatever the outcome.
     */
    pub async fn reconcile(&self, key: &KubeObjectRef<api::Inheritor>, cancel: &CancellationToken) -> Reconciliation {
	let outcome = match self.load(key, cancel).await {
	    Ok(mut inheritor) => self.run_pass(&mut inheritor, cancel).await,
	    Err(err) => {
		log::error!("Unable to load Inheritor {}: {}", key, err);
		PassOutcome::LoadFailed(err)
	    },
	};

	Reconciliation{
	    next_run_after: self.interval,
	    outcome: outcome,
	}
    }

    async fn load(&self, key: &KubeObjectRef<api::Inheritor>, cancel: &CancellationToken) -> Result<api::Inheritor, Error> {
	let name = key.name.as_str();
	let namespace = match &key.namespace {
	    Some(ns) => ns.as_str(),
	    None => return Err(Error::InvalidResource(format!("Inheritor '{}' has no namespace", name))),
	};
	log::info!("Reconciling Inheritor {}/{}", namespace, name);

	let mut inheritor = match guarded(cancel, self.store.get(namespace, name)).await? {
	    Some(inheritor) => inheritor,
	    None => {
		log::info!("Inheritor {}/{} not found, creating", namespace, name);
		let mut created = guarded(cancel, self.store.create(&api::inheritor::new(name, namespace))).await?;

		/* status is dropped on create, write the empty map explicitly */
		status::normalize(&mut created);
		guarded(cancel, self.store.update_status(&created)).await?;
		created
	    },
	};

	status::normalize(&mut inheritor);
	Ok(inheritor)
    }

    async fn run_pass(&self, inheritor: &mut api::Inheritor, cancel: &CancellationToken) -> PassOutcome {
	let selectors = inheritor.spec.selectors.clone();
	let mut synced = 0;

	for selector in &selectors {
	    log::info!("Processing selector {:?}", selector);

	    let namespaces = match selector::matching_namespaces(&self.store, &selector.namespace_selector, cancel).await {
		Ok(namespaces) => namespaces,
		Err(err) => {
		    log::error!("Unable to list namespaces with selector {:?}: {}", selector.namespace_selector, err);
		    return PassOutcome::Partial{ namespace: None, error: err };
		},
	    };

	    for ns in &namespaces {
		let name = ns.name_any();
		log::info!("Processing namespace {}", name);

		if let Err(err) = synchronizer::sync_namespace(&self.store, ns, &selector.include_labels, cancel).await {
		    log::info!("Error syncing labels in namespace {}: {}", name, err);

		    if let Err(status_err) = status::mark_unsynced(&self.store, inheritor, &name).await {
			log::warn!("Namespace {} is not synced, but its status could not be recorded: {}", name, status_err);
		    }
		    return PassOutcome::Partial{ namespace: Some(name), error: err };
		}

		if let Err(err) = status::record(&self.store, inheritor, &name, true, cancel).await {
		    return PassOutcome::Partial{ namespace: Some(name), error: err };
		}
		synced += 1;
	    }
	}

	PassOutcome::Completed{ namespaces: synced }
    }
}
