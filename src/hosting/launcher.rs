//! Spawns and supervises the child process described by a [`LaunchPlan`]
//! (C3): port reclaim, stdio streaming, the readiness probe, and disposal.

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::launch_plan::LaunchPlan;
use crate::hosting::HostingResult;
use crate::{Error, Result};

/// A running (or just-exited) child process plus everything the launcher
/// needs to dispose of it cleanly.
pub struct ChildHandle {
    child: Arc<Mutex<Option<Child>>>,
    stdout_thread: Option<JoinHandle<()>>,
    stderr_thread: Option<JoinHandle<()>>,
    cancel: CancellationToken,
    configuration_hash: String,
    started_at: Instant,
    pid: u32,
}

impl ChildHandle {
    pub fn configuration_hash(&self) -> &str {
        &self.configuration_hash
    }
}

/// Builds the launch plan's concrete process, streams its stdio, and waits
/// for the readiness probe to succeed. Public: a caller implementing a
/// custom [`super::HostingStrategy`] beyond the four built in here can reuse
/// the same launch/supervise/dispose machinery rather than reimplementing
/// it.
pub struct ProcessLauncher {
    plan: LaunchPlan,
}

impl ProcessLauncher {
    pub fn new(plan: LaunchPlan) -> Self {
        Self { plan }
    }

    /// Run the full launch sequence. Backed by `spawn_blocking` so the
    /// synchronous process/socket APIs never block the async runtime, per
    /// the worker-owns-blocking-state shape used elsewhere in this crate.
    pub async fn start(
        self,
        cancel: CancellationToken,
    ) -> Result<(HostingResult, ChildHandle)> {
        let plan = self.plan;
        tokio::task::spawn_blocking(move || Self::start_blocking(plan, cancel))
            .await
            .map_err(|e| Error::StartupFailed(format!("launcher task panicked: {e}")))?
    }

    fn start_blocking(
        plan: LaunchPlan,
        cancel: CancellationToken,
    ) -> Result<(HostingResult, ChildHandle)> {
        reclaim_port(&plan);

        let mut command = Command::new(&plan.executable);
        command.args(&plan.arguments);
        if let Some(dir) = &plan.working_directory {
            command.current_dir(dir);
        }
        for (key, value) in &plan.environment {
            let logged_value = if plan.is_redacted_env_key(key) {
                "<redacted>"
            } else {
                value.as_str()
            };
            log::debug!("hosting.child_env key={key} value={logged_value}");
            command.env(key, value);
        }
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| {
            Error::StartupFailed(format!("failed to spawn {}: {e}", plan.executable))
        })?;

        let pid = child.id();
        log::info!("hosting.child_started pid={pid}");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let stdout_thread = plan
            .stream_output
            .then(|| spawn_stream_drain(stdout, log::Level::Info, "hosting.child_stdout"));
        let stderr_thread = plan
            .stream_output
            .then(|| spawn_stream_drain(stderr, log::Level::Warn, "hosting.child_stderr"));

        let hash = plan.configuration_hash();
        log::info!("hosting.plan_built hash={hash}");

        let child = Arc::new(Mutex::new(Some(child)));

        let result = run_readiness_loop(&plan, &child, &cancel);

        match result {
            Ok(base_url) => Ok((
                HostingResult { base_url },
                ChildHandle {
                    child,
                    stdout_thread: stdout_thread.flatten(),
                    stderr_thread: stderr_thread.flatten(),
                    cancel,
                    configuration_hash: hash,
                    started_at: Instant::now(),
                    pid,
                },
            )),
            Err(e) => {
                dispose_child(&child);
                if let Some(t) = stdout_thread.flatten() {
                    let _ = t.join();
                }
                if let Some(t) = stderr_thread.flatten() {
                    let _ = t.join();
                }
                Err(e)
            }
        }
    }

    /// Terminate the child (if still alive) and join the stdio drain
    /// threads. Idempotent.
    pub async fn dispose(handle: ChildHandle) -> Result<()> {
        tokio::task::spawn_blocking(move || {
            let exit_code = dispose_child(&handle.child);
            if let Some(t) = handle.stdout_thread {
                let _ = t.join();
            }
            if let Some(t) = handle.stderr_thread {
                let _ = t.join();
            }
            log::info!(
                "hosting.stop pid={} exit_code={:?} elapsed_ms={}",
                handle.pid,
                exit_code,
                handle.started_at.elapsed().as_millis()
            );
            handle.cancel.cancel();
        })
        .await
        .map_err(|e| Error::Other(format!("dispose task panicked: {e}")))?;
        Ok(())
    }
}

fn spawn_stream_drain<R>(
    stream: Option<R>,
    level: log::Level,
    event: &'static str,
) -> Option<JoinHandle<()>>
where
    R: std::io::Read + Send + 'static,
{
    let stream = stream?;
    Some(std::thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.lines() {
            match line {
                Ok(line) => log::log!(level, "{event} line={line}"),
                Err(_) => break,
            }
        }
    }))
}

fn dispose_child(child: &Arc<Mutex<Option<Child>>>) -> Option<i32> {
    let mut guard = child.lock().unwrap_or_else(|p| p.into_inner());
    let Some(mut child) = guard.take() else {
        return None;
    };

    match child.try_wait() {
        Ok(Some(status)) => return status.code(),
        Ok(None) => {}
        Err(_) => {}
    }

    let _ = child.kill();
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return status.code(),
            Ok(None) if Instant::now() < deadline => {
                std::thread::sleep(Duration::from_millis(50));
            }
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
        }
    }
}

fn run_readiness_loop(
    plan: &LaunchPlan,
    child: &Arc<Mutex<Option<Child>>>,
    cancel: &CancellationToken,
) -> Result<url::Url> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| Error::StartupFailed(format!("failed to build HTTP client: {e}")))?;

    std::thread::sleep(plan.initial_delay);

    let deadline = Instant::now() + plan.startup_timeout;
    let mut attempt: u64 = 0;
    let mut last_error: Option<String> = None;

    loop {
        if cancel.is_cancelled() {
            return Err(Error::StartupFailed(
                "launcher start cancelled before readiness".to_string(),
            ));
        }

        {
            let mut guard = child.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(c) = guard.as_mut() {
                if let Ok(Some(status)) = c.try_wait() {
                    return Err(Error::StartupFailed(format!(
                        "child exited before becoming ready (exit code {:?})",
                        status.code()
                    )));
                }
            }
        }

        attempt += 1;
        for endpoint in &plan.health_check_endpoints {
            let probe_url = plan.probe_url(endpoint);
            match client.get(probe_url.clone()).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if attempt % 5 == 0 {
                        log::info!(
                            "hosting.probe_attempt n={attempt} url={probe_url} status={status}"
                        );
                    }
                    if status.is_success() || status.as_u16() / 100 == 2 {
                        log::info!(
                            "hosting.ready elapsed_ms={}",
                            plan.startup_timeout
                                .saturating_sub(deadline.saturating_duration_since(Instant::now()))
                                .as_millis()
                        );
                        return Ok(plan.base_url.clone());
                    }
                    last_error = Some(format!("{probe_url} -> {status}"));
                }
                Err(e) => {
                    if attempt % 5 == 0 {
                        log::info!("hosting.probe_attempt n={attempt} url={probe_url} status=err");
                    }
                    last_error = Some(e.to_string());
                }
            }
        }

        if Instant::now() >= deadline {
            return Err(Error::ReadinessTimeout {
                endpoint: plan.health_check_endpoints.join(","),
                elapsed_secs: plan.startup_timeout.as_secs(),
            })
            .map_err(|e| {
                if let Some(cause) = &last_error {
                    log::warn!("hosting.ready_timeout last_error={cause}");
                }
                e
            });
        }

        std::thread::sleep(plan.poll_interval);
    }
}

/// Best-effort free of `base_url.port()` before spawning a new child.
/// Conservative: a process is only killed when `process_name` is set and
/// matches (by substring) the process image name; with no `process_name`
/// configured this is a no-op.
fn reclaim_port(plan: &LaunchPlan) {
    let Some(process_name) = plan.process_name.as_ref() else {
        return;
    };
    let Some(port) = plan.base_url.port_or_known_default() else {
        return;
    };

    for pid in pids_listening_on_port(port) {
        let mut system = sysinfo::System::new();
        system.refresh_processes();
        if let Some(process) = system.process(sysinfo::Pid::from_u32(pid)) {
            let image = process.name();
            if image.to_lowercase().contains(&process_name.to_lowercase()) {
                log::warn!("hosting.port_reclaim pid={pid} image={image} port={port}");
                process.kill();
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn pids_listening_on_port(port: u16) -> Vec<u32> {
    let Ok(tcp) = std::fs::read_to_string("/proc/net/tcp") else {
        return Vec::new();
    };
    let mut inodes = Vec::new();
    for line in tcp.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 {
            continue;
        }
        let local = fields[1];
        let state = fields[3];
        let Some((_, hex_port)) = local.split_once(':') else {
            continue;
        };
        let Ok(line_port) = u16::from_str_radix(hex_port, 16) else {
            continue;
        };
        if line_port != port || state != "0A" {
            continue;
        }
        if let Ok(inode) = fields[9].parse::<u64>() {
            inodes.push(inode);
        }
    }

    if inodes.is_empty() {
        return Vec::new();
    }

    let mut pids = Vec::new();
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return pids;
    };
    for entry in entries.flatten() {
        let Ok(pid) = entry.file_name().to_string_lossy().parse::<u32>() else {
            continue;
        };
        let fd_dir = entry.path().join("fd");
        let Ok(fds) = std::fs::read_dir(&fd_dir) else {
            continue;
        };
        for fd in fds.flatten() {
            if let Ok(link) = std::fs::read_link(fd.path()) {
                let link = link.to_string_lossy();
                if let Some(inode_str) = link.strip_prefix("socket:[").and_then(|s| s.strip_suffix(']')) {
                    if let Ok(inode) = inode_str.parse::<u64>() {
                        if inodes.contains(&inode) {
                            pids.push(pid);
                        }
                    }
                }
            }
        }
    }
    pids
}

#[cfg(not(target_os = "linux"))]
fn pids_listening_on_port(_port: u16) -> Vec<u32> {
    Vec::new()
}
