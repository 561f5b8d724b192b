use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

pub const LOCK_FILE: &str = "sprintdesk.lock";

const MAX_BACKOFF_MS: u64 = 5000;
const INITIAL_BACKOFF_MS: u64 = 10;

/// Exclusive PID lock on the data directory, released on drop
pub struct Lock {
    lock_path: PathBuf,
}

impl Lock {
    /// Acquire the lock, retrying with exponential backoff
    pub fn acquire(data_dir: &Path) -> Result<Self> {
        let lock_path = data_dir.join(LOCK_FILE);
        let pid = std::process::id();

        let mut backoff = INITIAL_BACKOFF_MS;
        let mut total_wait = 0;

        loop {
            match try_acquire_lock(&lock_path, pid) {
                Ok(()) => {
                    debug!(path = %lock_path.display(), waited_ms = total_wait, "acquired lock");
                    return Ok(Self { lock_path });
                }
                Err(e) => {
                    if total_wait >= MAX_BACKOFF_MS {
                        anyhow::bail!(
                            "Failed to acquire lock after {}ms: {}",
                            MAX_BACKOFF_MS,
                            e
                        );
                    }

                    thread::sleep(Duration::from_millis(backoff));
                    total_wait += backoff;
                    backoff = (backoff * 2).min(MAX_BACKOFF_MS - total_wait).max(1);
                }
            }
        }
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn try_acquire_lock(lock_path: &Path, pid: u32) -> Result<()> {
    if lock_path.exists() {
        let content = fs::read_to_string(lock_path).context("Failed to read lock file")?;
        match content.trim().parse::<u32>() {
            Ok(existing_pid) if is_process_alive(existing_pid) => {
                anyhow::bail!("Lock held by process {}", existing_pid);
            }
            Ok(existing_pid) => {
                warn!(pid = existing_pid, "removing stale lock");
                fs::remove_file(lock_path).context("Failed to remove stale lock")?;
            }
            Err(_) => {
                warn!(path = %lock_path.display(), "removing unreadable lock");
                fs::remove_file(lock_path).context("Failed to remove invalid lock")?;
            }
        }
    }

    // create_new so two processes racing past the check cannot both win
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)
        .and_then(|mut file| {
            use std::io::Write;
            write!(file, "{}", pid)
        })
        .context("Failed to write lock file")?;

    Ok(())
}

#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
    use std::io;

    // kill() gives 0 and negative pids group meanings
    let pid = match i32::try_from(pid) {
        Ok(pid) if pid > 0 => pid,
        _ => return false,
    };

    // Signal 0 only checks for existence
    let result = unsafe { libc::kill(pid, 0) };

    if result == 0 {
        true
    } else {
        io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
    }
}

#[cfg(windows)]
fn is_process_alive(pid: u32) -> bool {
    use winapi::um::handleapi::CloseHandle;
    use winapi::um::processthreadsapi::OpenProcess;
    use winapi::um::winnt::PROCESS_QUERY_LIMITED_INFORMATION;

    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
        if handle.is_null() {
            false
        } else {
            CloseHandle(handle);
            true
        }
    }
}

#[cfg(not(any(unix, windows)))]
fn is_process_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_acquire_release() {
        let temp_dir = tempfile::tempdir().unwrap();

        let lock = Lock::acquire(temp_dir.path()).unwrap();
        let lock_path = temp_dir.path().join(LOCK_FILE);
        assert!(lock_path.exists());
        assert_eq!(
            fs::read_to_string(&lock_path).unwrap(),
            std::process::id().to_string()
        );

        drop(lock);
        assert!(!lock_path.exists());
    }

    #[test]
    fn test_stale_lock_is_removed() {
        let temp_dir = tempfile::tempdir().unwrap();
        let lock_path = temp_dir.path().join(LOCK_FILE);

        // Neither pid can belong to a running process
        for dead_pid in [u32::MAX, i32::MAX as u32] {
            fs::write(&lock_path, dead_pid.to_string()).unwrap();

            let lock = Lock::acquire(temp_dir.path()).unwrap();
            assert_eq!(
                fs::read_to_string(&lock_path).unwrap(),
                std::process::id().to_string()
            );
            drop(lock);
        }
    }

    #[test]
    fn test_invalid_lock_file_is_replaced() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join(LOCK_FILE), "not-a-pid").unwrap();

        let lock = Lock::acquire(temp_dir.path()).unwrap();
        drop(lock);
        assert!(!temp_dir.path().join(LOCK_FILE).exists());
    }
}
