//! Running the external dump tools.
//!
//! The dump tool's standard output goes straight into
//! `<outputdir>/<database>-<weekday>.sql`, which is created `0600` before the
//! tool starts. Standard error is collected in memory and becomes part of the
//! error when the tool exits non-zero, in which case the partial dump is
//! removed again.

pub mod mysql;
pub mod postgres;

use crate::backup::dump::mysql::MySqlDump;
use crate::backup::dump::postgres::PostgresDump;
use crate::backup::file_ext::SqlDump;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::retention::WeekdaySlot;
use crate::backup::target::{BackupTarget, DatabaseKind};
use bon::Builder;
use chrono::{DateTime, TimeZone};
use getset::Getters;
use std::fs::{File, OpenOptions, Permissions};
use std::io::Read;
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Mode of the raw dump while it is being written
pub static DUMP_FILE_MODE: u32 = 0o600;

static WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub trait DumpCommandBuilder {
    /// The full invocation, secrets included.
    fn build_dump_command(&self, target: &BackupTarget) -> Command;

    /// The invocation with secrets masked, for log lines.
    fn describe(&self, target: &BackupTarget) -> String;
}

/// Locations of the external dump programs.
#[derive(Clone, Debug, Builder, Getters)]
#[getset(get = "pub")]
pub struct DumpTools {
    #[builder(into, default = PathBuf::from("mysqldump"))]
    mysqldump: PathBuf,
    #[builder(into, default = PathBuf::from("pg_dump"))]
    pg_dump: PathBuf,
}

impl Default for DumpTools {
    fn default() -> Self {
        DumpTools::builder().build()
    }
}

impl DumpTools {
    pub fn command_builder(&self, kind: DatabaseKind) -> Box<dyn DumpCommandBuilder> {
        match kind {
            DatabaseKind::MySql => Box::new(MySqlDump::new(&self.mysqldump)),
            DatabaseKind::Postgres => Box::new(PostgresDump::new(&self.pg_dump)),
        }
    }
}

/// The uncompressed dump of one target for one run.
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct DumpArtifact {
    path: PathBuf,
    database: String,
}

impl DumpArtifact {
    pub(crate) fn new<P: Into<PathBuf>, S: Into<String>>(path: P, database: S) -> Self {
        Self {
            path: path.into(),
            database: database.into(),
        }
    }

    /// Where `target`'s dump for the weekday of `now` lives.
    pub fn for_target<T: TimeZone>(target: &BackupTarget, now: &DateTime<T>) -> Self {
        let path = WeekdaySlot::of(now).path_in(target.output_dir(), target.database(), &SqlDump);
        Self::new(path, target.database().as_str())
    }

    pub fn remove(&self) -> Result<()> {
        std::fs::remove_file(&self.path)
            .map_err(Error::from)
            .with_msg(format!("Failed to remove dump {:?}", self.path))
    }
}

/// Opens (or truncates last week's) dump file, owner read/write only.
fn create_dump_file(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(DUMP_FILE_MODE)
        .open(path)?;
    // mode() only applies to newly created files
    file.set_permissions(Permissions::from_mode(DUMP_FILE_MODE))?;
    Ok(file)
}

/// Dumps `target` into its weekday slot and returns the raw dump.
///
/// On any failure the partial dump is removed before the error is returned.
pub fn dump_database<T: TimeZone>(
    target: &BackupTarget,
    tools: &DumpTools,
    now: &DateTime<T>,
) -> Result<DumpArtifact> {
    let artifact = DumpArtifact::for_target(target, now);
    let builder = tools.command_builder(target.kind());

    let file = create_dump_file(artifact.path())
        .with_msg(format!("Failed to create dump file {:?}", artifact.path()))?;

    let mut cmd = builder.build_dump_command(target);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::from(file))
        .stderr(Stdio::piped());

    info!(
        "Dumping {} database {:?} into {:?}",
        target.kind(),
        target.database(),
        artifact.path()
    );
    debug!("Running {}", builder.describe(target));

    match run_dump(target, cmd) {
        Ok(()) => Ok(artifact),
        Err(e) => {
            warn!("Removing incomplete dump {:?}", artifact.path());
            match artifact.remove() {
                Ok(()) => Err(e),
                Err(e2) => Err(e.chain(e2)),
            }
        }
    }
}

fn run_dump(target: &BackupTarget, mut cmd: Command) -> Result<()> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    // Own process group, so a timeout also reaches helpers the tool forks
    cmd.process_group(0);
    let child = cmd
        .spawn()
        .map_err(Error::from)
        .with_msg(format!("Failed to start {}", program))?;
    // The Command still owns the parent's copy of the dump file's descriptor
    drop(cmd);

    let (status, stderr) = wait_with_stderr(child, target.timeout())?;
    match status {
        Some(status) if status.success() => {
            if !stderr.trim().is_empty() {
                debug!("{} stderr for {:?}: {}", program, target.database(), stderr.trim());
            }
            Ok(())
        }
        Some(status) => Err(Error::DumpFailure {
            section: target.database().clone(),
            status,
            stderr,
        }),
        None => Err(Error::DumpTimeout {
            section: target.database().clone(),
            // None only comes back when a timeout was set
            timeout: target.timeout().unwrap_or_default(),
        }),
    }
}

/// Waits for `child` while draining its stderr. Returns `None` as the status
/// when `timeout` elapsed and the child's process group was killed.
fn wait_with_stderr(
    mut child: Child,
    timeout: Option<Duration>,
) -> Result<(Option<ExitStatus>, String)> {
    let stderr = child.stderr.take();
    let reader = std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut stderr) = stderr {
            stderr.read_to_end(&mut buf)?;
        }
        Ok(buf)
    });

    let status = match timeout {
        None => child.wait()?,
        Some(timeout) => {
            let start = Instant::now();
            loop {
                if let Some(status) = child.try_wait()? {
                    break status;
                }
                let elapsed = start.elapsed();
                if elapsed >= timeout {
                    warn!("Killing dump process group {} after {:?}", child.id(), timeout);
                    kill_process_group(&mut child)?;
                    child.wait()?;
                    // A process that left the group may still hold stderr open,
                    // so the reader thread is detached rather than joined.
                    return Ok((None, String::new()));
                }
                std::thread::sleep(WAIT_POLL_INTERVAL.min(timeout - elapsed));
            }
        }
    };

    let stderr = reader
        .join()
        .map_err(|_| Error::from(std::io::Error::other("stderr reader thread panicked")))??;
    Ok((Some(status), String::from_utf8_lossy(&stderr).into_owned()))
}

fn kill_process_group(child: &mut Child) -> Result<()> {
    let pgid = match i32::try_from(child.id()) {
        Ok(pid) => Pid::from_raw(pid),
        Err(_) => return Ok(child.kill()?),
    };
    match killpg(pgid, Signal::SIGKILL) {
        // The group is already gone
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(Error::from(e).with_msg(format!("Failed to kill process group {}", pgid))),
    }
}
