use crate::config::Args;
use crate::errors::Error;
use crate::reconciler::Reconciler;
use crate::store::KubeStore;
use inheritor_api as api;

use futures::StreamExt;
use kube::Api as KubeApi;
use kube::Client as KubeClient;
use kube::runtime::controller::Action as KubeAction;
use kube::runtime::controller::Controller as KubeController;
use kube::runtime::reflector::ObjectRef as KubeObjectRef;
use kube::runtime::watcher::Config as KubeWatcherConfig;
use log;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/*
 * InheritorManager runs the kube controller watching Inheritor objects
 * and hands every trigger to the Reconciler.
 */
#[derive(Clone)]
pub struct InheritorManager {
    inheritor_api: KubeApi<api::Inheritor>,
    store: KubeStore,
    interval: Duration,
}

struct InheritorManagerCtx {
    reconciler: Reconciler<KubeStore>,
    cancel: CancellationToken,
}

async fn reconcile(inheritor: Arc<api::Inheritor>, ctx: Arc<InheritorManagerCtx>) -> Result<KubeAction, Error> {
    let key = KubeObjectRef::from_obj(inheritor.as_ref());

    let next_run_after = ctx.reconciler.reconcile(&key, &ctx.cancel).await.into_result()?;
    Ok(KubeAction::requeue(next_run_after))
}

/* same cadence as a successful pass, no backoff */
fn error_policy(_inheritor: Arc<api::Inheritor>, error: &Error, ctx: Arc<InheritorManagerCtx>) -> KubeAction {
    if error.is_conflict() {
	log::warn!("Write conflict, retrying in {:?}: {}", ctx.reconciler.interval(), error);
    }
    KubeAction::requeue(ctx.reconciler.interval())
}

async fn shutdown(cancel: CancellationToken) {
    cancel.cancelled().await;
}

impl InheritorManager {

    /*
     * controller returns a Future that runs until `cancel` fires.  A pass
     * in flight at that moment stops at its next store call.
     */
    pub fn controller(&self, cancel: CancellationToken) -> impl Future<Output = ()> {
	let ctx = Arc::new(InheritorManagerCtx{
	    reconciler: Reconciler::new(self.store.clone(), self.interval),
	    cancel: cancel.clone(),
	});

	KubeController::new(self.inheritor_api.clone(), KubeWatcherConfig::default())
	    .graceful_shutdown_on(shutdown(cancel))
	    .run(reconcile, error_policy, ctx)
	    .for_each(|reconcile| async move {
		match reconcile {
		    Ok((inheritor, _)) => log::debug!("Reconciled {}", inheritor),
		    Err(err) => log::error!("Failed to reconcile with error {:?}", err),
		}
	    })
    }

    pub fn new(kube_client: KubeClient, args: &Args) -> Self {
	let inheritor_api = match &args.namespace {
	    Some(namespace) => KubeApi::namespaced(kube_client.clone(), namespace),
	    None => KubeApi::all(kube_client.clone()),
	};

	Self{
	    inheritor_api: inheritor_api,
	    store: KubeStore::new(kube_client.clone()),
	    interval: args.interval(),
	}
    }
}
