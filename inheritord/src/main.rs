mod config;
mod errors;
mod manager;
mod reconciler;
mod selector;
mod status;
mod store;
mod synchronizer;

#[cfg(test)]
mod testing;

use config::Args;
use errors::Error;
use manager::InheritorManager;

use clap::Parser;
use kube::Client as KubeClient;
use log;
use tokio_util::sync::CancellationToken;

/*
 * Program design:
 *
 *  1. Watch all Inheritor objects (or the ones of a single namespace)
 *  2. For each selector, find the matching namespaces
 *  3. Copy the included labels onto their pods and configmaps
 *  4. Record per namespace whether it is in sync, run again every interval
 */
#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();

    let args = Args::parse();
    let kube_client = KubeClient::try_default().await?;

    log::info!("starting inheritord, requeue interval {:?}", args.interval());
    let mgr = InheritorManager::new(kube_client, &args);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
	// handle CTRL^C as gracefully as we can.
	if let Err(err) = tokio::signal::ctrl_c().await {
	    log::error!("Unable to listen for shutdown signal: {}", err);
	}
	on_signal.cancel();
    });

    mgr.controller(cancel).await;
    log::info!("inheritord stopped");

    Ok(())
}
