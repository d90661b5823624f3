use std::path::Path;
use std::time::Duration;

use kernel::ExecOutcome;
use tokio::process::Command;

use crate::error::ApiError;

/// Interpreter used for uploaded scripts. The child runs with the
/// service's own privileges and without sandboxing; the endpoint exists
/// for local, trusted use only.
pub const INTERPRETER: &str = "python3";

/// Only files carrying this extension may be executed.
pub const SCRIPT_EXTENSION: &str = "py";

/// Hard wall-clock limit; the child is killed when it expires.
pub const EXEC_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs an uploaded script with the working directory pinned to the
/// upload directory, capturing output and the exit code. A timeout
/// yields a distinct error instead of partial output.
pub async fn run_script(upload_root: &Path, filename: &str) -> Result<ExecOutcome, ApiError> {
    tracing::info!("executing '{}' with {}", filename, INTERPRETER);

    let child = Command::new(INTERPRETER)
        .arg(filename)
        .current_dir(upload_root)
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(EXEC_TIMEOUT, child).await {
        Ok(Ok(output)) => Ok(ExecOutcome {
            returncode: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }),
        Ok(Err(e)) => Err(ApiError::Exec(e.to_string())),
        Err(_elapsed) => {
            tracing::warn!("script '{}' hit the {:?} timeout", filename, EXEC_TIMEOUT);
            Err(ApiError::ExecTimeout)
        }
    }
}
