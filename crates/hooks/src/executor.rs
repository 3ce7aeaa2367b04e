//! Hook discovery and execution

use crate::types::{HookResult, PostInstallHook};
use crate::{Error, Result};
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Look for the hook script at `relative` inside `build_dir`.
///
/// Returns `Ok(None)` when no script is present.
pub fn discover(build_dir: &Path, relative: &Path) -> Result<Option<PostInstallHook>> {
    if relative.is_absolute() {
        return Err(Error::configuration(format!(
            "hook path must be relative to the build directory: {}",
            relative.display()
        )));
    }

    let path = build_dir.join(relative);
    if path.is_file() {
        debug!(path = %path.display(), "Found post-install hook");
        Ok(Some(PostInstallHook::new(path, build_dir)))
    } else {
        debug!(path = %path.display(), "No post-install hook");
        Ok(None)
    }
}

/// Make the hook executable and run it with `env` in the build directory.
///
/// A non-zero exit is reported through [`HookResult::success`]; an `Err`
/// means the script could not be prepared or started.
pub async fn execute_hook(hook: &PostInstallHook, env: &[(OsString, OsString)]) -> Result<HookResult> {
    make_executable(hook.path())?;

    info!(path = %hook.path.display(), "Running post-install hook");
    let start_time = Instant::now();

    let output = Command::new(&hook.path)
        .current_dir(&hook.dir)
        .envs(env.iter().map(|(k, v)| (k, v)))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| Error::process(format!("failed to start {}: {e}", hook.path.display())))?;

    let duration_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX);
    let result = HookResult {
        success: output.status.success(),
        exit_status: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration_ms,
    };

    if result.success {
        debug!("Hook completed successfully in {}ms", duration_ms);
    } else {
        warn!("Hook failed with exit code: {:?}", result.exit_status);
    }
    Ok(result)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| Error::io(e, Some(path.to_path_buf()), "make hook executable"))
}

#[cfg(not(unix))]
fn make_executable(path: &Path) -> Result<()> {
    std::fs::metadata(path)
        .map(|_| ())
        .map_err(|e| Error::io(e, Some(path.to_path_buf()), "inspect hook"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_hook(dir: &Path, body: &str) -> PostInstallHook {
        let bin = dir.join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("post_compile"), body).unwrap();
        discover(dir, Path::new("bin/post_compile")).unwrap().unwrap()
    }

    #[test]
    fn test_discover_missing() {
        let temp = TempDir::new().unwrap();
        assert!(
            discover(temp.path(), Path::new("bin/post_compile"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_discover_rejects_absolute_path() {
        let temp = TempDir::new().unwrap();
        let err = discover(temp.path(), Path::new("/etc/passwd")).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_discover_ignores_directory() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("bin/post_compile")).unwrap();
        assert!(
            discover(temp.path(), Path::new("bin/post_compile"))
                .unwrap()
                .is_none()
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_hook_success() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let hook = write_hook(temp.path(), "#!/bin/sh\npwd\nprintf '%s' \"$NODE_ENV\" >&2\n");
        let env = vec![
            (OsString::from("PATH"), OsString::from("/usr/bin:/bin")),
            (OsString::from("NODE_ENV"), OsString::from("production")),
        ];

        let result = execute_hook(&hook, &env).await.unwrap();
        assert!(result.success);
        assert_eq!(result.exit_status, Some(0));
        assert_eq!(result.stderr, "production");

        let cwd = std::fs::canonicalize(result.stdout.trim()).unwrap();
        assert_eq!(cwd, std::fs::canonicalize(temp.path()).unwrap());

        let mode = std::fs::metadata(hook.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_hook_failure() {
        let temp = TempDir::new().unwrap();
        let hook = write_hook(temp.path(), "#!/bin/sh\necho broken >&2\nexit 7\n");
        let env = vec![(OsString::from("PATH"), OsString::from("/usr/bin:/bin"))];

        let result = execute_hook(&hook, &env).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_status, Some(7));
        assert_eq!(result.failure_message(), "exit code 7: broken");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_hook_vanished() {
        let temp = TempDir::new().unwrap();
        let hook = write_hook(temp.path(), "#!/bin/sh\n");
        // Gone between discovery and execution
        std::fs::remove_file(hook.path()).unwrap();

        let err = execute_hook(&hook, &[]).await.unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
