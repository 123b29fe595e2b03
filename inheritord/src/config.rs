use clap::Parser;
use std::time::Duration;

/// Copies namespace labels onto the pods and configmaps living in them
#[derive(Parser, Debug)]
#[clap(version, about)]
pub struct Args {

    /// Seconds between two passes over the same Inheritor, after success
    /// and after failure alike
    #[clap(long, env = "INHERITOR_REQUEUE_INTERVAL", default_value_t = 120)]
    pub requeue_interval: u64,

    /// Only watch Inheritors of this namespace (default: all namespaces)
    #[clap(long, short = 'n', env = "INHERITOR_NAMESPACE")]
    pub namespace: Option<String>,
}

impl Args {

    pub fn interval(&self) -> Duration {
	Duration::from_secs(self.requeue_interval)
    }
}
