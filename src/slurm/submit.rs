use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use log::info;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Failed to execute {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} exited with {status}: {stderr}")]
    Failed { command: String, status: ExitStatus, stderr: String },
    #[error("{command} printed no job id")]
    MissingJobId { command: String },
}

/// A SLURM job id as printed by sbatch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Something that accepts job scripts and hands back job ids
pub trait Scheduler {
    /// Submit `script`, starting only after `dependency` exited OK when one is given
    fn submit(&mut self, script: &Path, dependency: Option<&JobId>) -> Result<JobId, SubmitError>;
}

/// Submits with the sbatch command line tool
pub struct Sbatch {
    pub program: String,
}

impl Sbatch {
    fn arguments(script: &Path, dependency: Option<&JobId>) -> Vec<String> {
        let mut arguments = vec![script.display().to_string()];
        if let Some(id) = dependency {
            arguments.push(format!("--dependency=afterok:{id}"));
        }
        arguments
    }

    /// The command line as echoed before it runs, e.g. `sbatch /jobs/a.slurm`
    fn command_line(program: &str, arguments: &[String]) -> String {
        [program]
            .into_iter()
            .chain(arguments.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn running(command: &str) -> String {
    format!("Running: {command}")
}

impl Scheduler for Sbatch {
    fn submit(&mut self, script: &Path, dependency: Option<&JobId>) -> Result<JobId, SubmitError> {
        let arguments = Sbatch::arguments(script, dependency);
        let command = Sbatch::command_line(&self.program, &arguments);
        println!("{}", running(&command));

        let mut sbatch = Command::new(&self.program);
        sbatch.args(&arguments);
        if let Some(wd) = script.parent().filter(|wd| !wd.as_os_str().is_empty()) {
            sbatch.current_dir(wd);
        }

        let output = sbatch
            .output()
            .map_err(|source| SubmitError::Spawn { command: command.clone(), source })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(SubmitError::Failed { command, status: output.status, stderr });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_job_id(&stdout).ok_or(SubmitError::MissingJobId { command })
    }
}

/// The job id is the last word sbatch prints, e.g. `Submitted batch job 123456`
pub fn parse_job_id(stdout: &str) -> Option<JobId> {
    stdout.split_whitespace().last().map(|id| JobId(id.to_string()))
}

/// Submit each script in order and return the job ids
///
/// `after` is a dependency for the first submission. With `chain` set, every later submission
/// depends on the one before it, otherwise they all share `after`. The first failure stops the
/// run; jobs already submitted stay queued.
pub fn submit_all<S: Scheduler>(
    scheduler: &mut S,
    scripts: &[PathBuf],
    after: Option<JobId>,
    chain: bool,
) -> Result<Vec<JobId>, SubmitError> {
    let (_, ids) = scripts.iter().try_fold(
        (after, Vec::with_capacity(scripts.len())),
        |(dependency, mut ids), script| {
            let id = scheduler.submit(script, dependency.as_ref())?;
            info!("Submitted {} as SLURM job {id}", script.display());
            let dependency = match chain {
                true => Some(id.clone()),
                false => dependency,
            };
            ids.push(id);
            Ok::<_, SubmitError>((dependency, ids))
        },
    )?;
    Ok(ids)
}
