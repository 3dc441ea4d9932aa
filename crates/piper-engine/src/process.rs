//! Subprocess-backed engine.
//!
//! Each invocation is one job: the input is staged in a uniquely named temp
//! file, the engine is launched as
//! `program args... --input <in> --output <out> --mode compress --algorithm huffman`
//! and waited on with a deadline. The staged input is removed on every path.
//! The output file, if any, is handed to the caller.
//!
//! On unix the engine leads its own process group, so a wrapper such as
//! `cargo run` cannot leave the real compressor behind: the whole group is
//! killed on timeout, and stragglers are killed once the leader exits.

use crate::engine::{CompressionEngine, EngineInvocation, StagedOutput};
use crate::error::EngineError;
use async_trait::async_trait;
use piper_core::config::EngineConfig;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempPath;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const MODE: &str = "compress";
pub const ALGORITHM: &str = "huffman";

/// Stand-in deadline for timeouts too large for `Instant` arithmetic.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Engine that shells out to an external compressor binary.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    staging_dir: PathBuf,
}

impl ProcessEngine {
    pub fn new(program: impl Into<String>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            staging_dir: staging_dir.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            working_dir: config.working_dir.clone(),
            staging_dir: config.staging_dir.clone(),
        }
    }

    /// Arguments placed before the fixed `--input/--output/--mode/--algorithm` contract.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Full argument list for one run.
    pub fn command_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.args.iter().map(OsString::from).collect();
        args.push("--input".into());
        args.push(input.as_os_str().to_owned());
        args.push("--output".into());
        args.push(output.as_os_str().to_owned());
        args.push("--mode".into());
        args.push(MODE.into());
        args.push("--algorithm".into());
        args.push(ALGORITHM.into());
        args
    }

    fn command(&self, job: &CompressionJob) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.command_args(job.input_path(), &job.output))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

/// Staging files for one invocation.
struct CompressionJob {
    id: Uuid,
    /// Deleted when dropped.
    input: TempPath,
    /// Never created here; the engine is expected to write it.
    output: PathBuf,
}

impl CompressionJob {
    async fn stage(dir: &Path, input: &[u8]) -> Result<Self, EngineError> {
        let id = Uuid::new_v4();
        let staging_err = |source| EngineError::Staging { dir: dir.to_path_buf(), source };

        let input_path = tempfile::Builder::new()
            .prefix(&format!("piper-{id}-"))
            .suffix(".txt")
            .tempfile_in(dir)
            .map_err(staging_err)?
            .into_temp_path();
        fs::write(&input_path, input).await.map_err(staging_err)?;

        let output = dir.join(format!("piper-{id}.compressed"));
        Ok(Self { id, input: input_path, output })
    }

    fn input_path(&self) -> &Path {
        &self.input
    }

    /// Remove the staged input, logging instead of failing.
    fn finish(self) -> PathBuf {
        let path = self.input.to_path_buf();
        if let Err(e) = self.input.close() {
            warn!(job_id = %self.id, path = %path.display(), error = %e, "failed to remove staged input");
        }
        self.output
    }
}

#[async_trait]
impl CompressionEngine for ProcessEngine {
    async fn invoke(&self, input: &[u8], timeout: Duration) -> Result<EngineInvocation, EngineError> {
        let job = CompressionJob::stage(&self.staging_dir, input).await?;
        let started = Instant::now();
        let deadline = started
            .checked_add(timeout)
            .unwrap_or_else(|| started + FAR_FUTURE);

        debug!(
            op = "engine.spawn",
            job_id = %job.id,
            program = %self.program,
            input = %job.input_path().display(),
            output = %job.output.display(),
            "launching engine"
        );
        let mut child = self.command(&job).spawn().map_err(|source| EngineError::Launch {
            program: self.program.clone(),
            source,
        })?;
        let pgid = child.id();

        let mut stdout_task = spawn_reader(child.stdout.take());
        let mut stderr_task = spawn_reader(child.stderr.take());

        let status = match timeout_at(deadline, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                kill_process_group(pgid);
                stdout_task.abort();
                stderr_task.abort();
                return Err(EngineError::Io(e));
            }
            Err(_) => {
                kill_process_group(pgid);
                if let Err(e) = child.kill().await {
                    warn!(job_id = %job.id, error = %e, "failed to kill timed out engine");
                }
                stdout_task.abort();
                stderr_task.abort();
                let output = job.finish();
                StagedOutput::new(output).discard().await;
                warn!(
                    op = "engine.timeout",
                    timeout_ms = timeout.as_millis() as u64,
                    "engine timed out and was killed"
                );
                return Err(EngineError::Timeout { after: timeout });
            }
        };
        kill_process_group(pgid);

        let stdout = drain(&mut stdout_task, deadline, "stdout").await;
        let stderr = drain(&mut stderr_task, deadline, "stderr").await;
        let elapsed = started.elapsed();
        let job_id = job.id;
        let output_path = job.finish();

        let output = match fs::metadata(&output_path).await {
            Ok(meta) if meta.is_file() => Some(StagedOutput::new(output_path)),
            _ => None,
        };

        info!(
            op = "engine.exit",
            job_id = %job_id,
            exit_code = ?status.code(),
            elapsed_ms = elapsed.as_millis() as u64,
            output_present = output.is_some(),
            "engine finished"
        );
        debug!(job_id = %job_id, %stdout, %stderr, "engine output");

        Ok(EngineInvocation {
            exit_code: status.code(),
            stdout,
            stderr,
            elapsed,
            output,
        })
    }
}

/// SIGKILL every process left in the engine's group. A group that is
/// already gone is not an error.
#[cfg(unix)]
fn kill_process_group(pgid: Option<u32>) {
    let Some(pgid) = pgid.and_then(|id| libc::pid_t::try_from(id).ok()) else {
        return;
    };
    // SAFETY: kill(2) takes plain integers and touches no memory of ours.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            warn!(pgid, error = %err, "failed to kill engine process group");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: Option<u32>) {}

fn spawn_reader<R>(pipe: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(e) = pipe.read_to_end(&mut buf).await {
                debug!(error = %e, "engine pipe read failed");
            }
        }
        buf
    })
}

/// Collect a reader task. A pipe still held open past the deadline
/// (e.g. by a grandchild process) yields whatever is lost as empty text.
async fn drain(task: &mut JoinHandle<Vec<u8>>, deadline: Instant, stream: &str) -> String {
    match timeout_at(deadline, &mut *task).await {
        Ok(Ok(buf)) => String::from_utf8_lossy(&buf).into_owned(),
        Ok(Err(e)) => {
            warn!(stream, error = %e, "engine pipe reader failed");
            String::new()
        }
        Err(_) => {
            task.abort();
            warn!(stream, "engine pipe still open at deadline");
            String::new()
        }
    }
}
