//! subnamd: write SLURM job scripts for NAMD configs and submit them with sbatch

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use crate::slurm::job::{prepare, ResourceSpec};
use crate::slurm::submit::{submit_all, JobId, Sbatch, Scheduler};
use crate::walltime::WallTime;

mod jobname;
mod slurm;
mod walltime;

/// Submit NAMD jobs specified by CONFIG
#[derive(Parser, Debug)]
#[command(name = "subnamd", version)]
struct Args {
    /// NAMD configuration file
    #[arg(value_parser = existing_file)]
    config: PathBuf,

    /// Further NAMD configuration files, submitted in order
    #[arg(value_parser = existing_file)]
    configs: Vec<PathBuf>,

    /// Number of CPUs
    #[arg(short, long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=64))]
    ncpus: u8,

    /// Number of GPUs
    #[arg(
        short = 'g',
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(0..=4)
    )]
    ngpus: u8,

    /// Wall time, [days][[-]hours:][minutes][:seconds]
    #[arg(short, long, default_value_t = WallTime::default())]
    wall_time: WallTime,

    /// Start after specified job exited OK
    #[arg(long, value_name = "JOB_ID")]
    after: Option<u64>,

    /// Submit jobs as a dependency chain
    #[arg(long)]
    chain: bool,

    /// Write job scripts but do not submit
    #[arg(long)]
    dry_run: bool,

    /// Command used to submit job scripts
    #[arg(long, env = "SUBNAMD_SBATCH", default_value = "sbatch")]
    sbatch: String,
}

impl Args {
    fn configs(&self) -> Vec<PathBuf> {
        [self.config.clone()].into_iter().chain(self.configs.iter().cloned()).collect()
    }

    fn resources(&self) -> ResourceSpec {
        ResourceSpec { ncpus: self.ncpus, ngpus: self.ngpus, wall_time: self.wall_time.clone() }
    }
}

/// Accept paths to existing regular files, made absolute so sbatch can find the script from
/// the script's own directory
fn existing_file(value: &str) -> Result<PathBuf, String> {
    let path = Path::new(value);
    if !path.exists() {
        return Err(format!("'{value}' does not exist"));
    }
    if !path.is_file() {
        return Err(format!("'{value}' is not a file"));
    }
    std::path::absolute(path).map_err(|err| format!("'{value}': {err}"))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let home = dirs::home_dir();
    if home.is_none() {
        warn!("Can't determine home directory, job names are relative to git repositories only");
    }

    let mut sbatch = Sbatch { program: args.sbatch.clone() };
    run(&args, home.as_deref(), &mut sbatch)?;
    Ok(())
}

/// Write all job scripts, then submit them unless this is a dry run
fn run<S: Scheduler>(args: &Args, home: Option<&Path>, scheduler: &mut S) -> Result<Vec<JobId>> {
    let configs = args.configs();
    let scripts = prepare(&configs, &args.resources(), home)?;

    if args.dry_run {
        info!("--dry-run set, not submitting {} job script(s)", scripts.len());
        return Ok(Vec::new());
    }

    let after = args.after.map(|id| JobId(id.to_string()));
    let ids = submit_all(scheduler, &scripts, after, args.chain).context("Submission failed")?;
    let listed = ids.iter().map(JobId::to_string).collect::<Vec<_>>().join(" ");
    info!("Submitted {} job(s): {listed}", ids.len());
    Ok(ids)
}
