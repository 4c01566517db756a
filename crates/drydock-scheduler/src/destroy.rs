//! Destroy: kill, then forced removal.

use drydock_runtime::{ContainerRuntime, RuntimeError, short_id};
use tracing::{error, info, warn};

use crate::error::{SchedulerError, SchedulerResult};

/// Signal sent before removal.
pub const KILL_SIGNAL: &str = "KILL";

/// Kill a replica and remove it.
///
/// A kill against a replica that is not running is tolerated; any other
/// kill failure aborts before removal. A removal failure after the kill
/// step is reported as [`SchedulerError::DestroyInconsistent`] and left
/// for the caller to deal with.
pub async fn destroy(runtime: &dyn ContainerRuntime, id: &str) -> SchedulerResult<()> {
    match runtime.kill(id, KILL_SIGNAL).await {
        Ok(()) => {}
        Err(RuntimeError::NotRunning(_)) => {
            warn!(replica = %short_id(id), "replica not running, removing anyway");
        }
        Err(source) => {
            return Err(SchedulerError::Kill {
                id: id.to_string(),
                source,
            });
        }
    }

    if let Err(source) = runtime.remove(id, true).await {
        error!(replica = %short_id(id), error = %source, "replica killed but not removed");
        return Err(SchedulerError::DestroyInconsistent {
            id: id.to_string(),
            source,
        });
    }

    info!(replica = %short_id(id), "replica destroyed");
    Ok(())
}
