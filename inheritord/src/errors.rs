use kube::Error as KubeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {

    /* encapsulate a kube-rust error */
    #[error("kube error: {0}")]
    Kube(#[from] KubeError),

    #[error("unable to list {kind}: {reason}")]
    ListFailure { kind: String, reason: String },

    /* the object changed since we have read it */
    #[error("{kind} '{name}' was modified concurrently")]
    WriteConflict { kind: String, name: String },

    #[error("unable to update {kind} '{name}': {reason}")]
    UpdateFailure { kind: String, name: String, reason: String },

    #[error("invalid resource: {0}")]
    InvalidResource(String),

    #[error("reconciliation cancelled")]
    Cancelled,
}

impl Error {

    pub fn list(kind: &str, err: KubeError) -> Self {
	Error::ListFailure{
	    kind: kind.to_string(),
	    reason: err.to_string(),
	}
    }

    /*
     * Classifies a failed write: HTTP 409 means somebody else updated the
     * object in between, anything else is a plain update failure.
     */
    pub fn update(kind: &str, name: &str, err: KubeError) -> Self {
	match err {
	    KubeError::Api(resp) if resp.code == 409 => Error::WriteConflict{
		kind: kind.to_string(),
		name: name.to_string(),
	    },
	    other => Error::UpdateFailure{
		kind: kind.to_string(),
		name: name.to_string(),
		reason: other.to_string(),
	    },
	}
    }

    pub fn is_conflict(&self) -> bool {
	matches!(self, Error::WriteConflict{ .. })
    }
}
