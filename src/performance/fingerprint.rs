use sha2::{Digest, Sha256};

use crate::performance::{
    error::{PerformanceError, internal_error},
    types::Snapshot,
};

/// Stable digest of a snapshot's instance and aggregate state.
pub(crate) fn fingerprint(snapshot: &Snapshot) -> Result<String, PerformanceError> {
    let canonical = serde_json::to_vec(&(snapshot.instance, &snapshot.states))
        .map_err(|err| internal_error(format!("cannot encode snapshot state: {}", err)))?;
    let digest = Sha256::digest(&canonical);
    let hex = format!("{:x}", digest);
    Ok(hex[..24].to_string())
}
