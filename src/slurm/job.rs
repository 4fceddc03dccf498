use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::info;
use serde::Serialize;
use tinytemplate::{format_unescaped, TinyTemplate};

use crate::jobname::job_name;
use crate::walltime::WallTime;

/// Resources requested for every job in a run
#[derive(Clone, Debug)]
pub struct ResourceSpec {
    pub ncpus: u8,
    pub ngpus: u8,
    pub wall_time: WallTime,
}

/// A NAMD configuration file to be run as a SLURM job
///
/// The job script and the NAMD log share the config's stem:
/// - job script -> `<stem>.slurm`
/// - NAMD stdout -> `<stem>.out`
pub struct JobConfig {
    pub path: PathBuf,
}

impl JobConfig {
    pub fn script_path(&self) -> PathBuf {
        self.path.with_extension("slurm")
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn output_name(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{stem}.out")
    }
}

/// GPUs handed to NAMD, expanded by the shell on the compute node
static GPU_DEVICES: &str = "${CUDA_VISIBLE_DEVICES}";

/// A complete rendered job script
#[derive(Debug, PartialEq, Eq)]
pub struct JobScript {
    content: String,
}

/// Rendering context for the SBATCH header
#[derive(Serialize)]
struct HeaderContext {
    name: String,
    wall_time: String,
    ncpus: u8,
    ngpus: u8,
    gpus: bool,
}

/// Rendering context for the NAMD command line
#[derive(Serialize)]
struct NamdContext {
    ncpus: u8,
    gpus: bool,
    devices: String,
    config: String,
    output: String,
}

impl JobScript {
    /// Render the header, environment modules and NAMD invocation, in that order
    pub fn render(config: &JobConfig, resources: &ResourceSpec, name: &str) -> Result<JobScript> {
        /// included header template
        static HEADER: &str =
            include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/header.txt"));
        /// included environment modules, everything is static
        static MODULES: &str =
            include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/modules.txt"));
        /// included NAMD command template
        static NAMD: &str =
            include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/namd.txt"));

        let mut tt = TinyTemplate::new();
        // paths and job names are not HTML
        tt.set_default_formatter(&format_unescaped);
        tt.add_template("header", HEADER).map_err(template_error)?;
        tt.add_template("namd", NAMD).map_err(template_error)?;

        let gpus = resources.ngpus > 0;
        let header = HeaderContext {
            name: name.to_string(),
            wall_time: resources.wall_time.as_str().to_string(),
            ncpus: resources.ncpus,
            ngpus: resources.ngpus,
            gpus,
        };
        let namd = NamdContext {
            ncpus: resources.ncpus,
            gpus,
            devices: GPU_DEVICES.to_string(),
            config: config.file_name(),
            output: config.output_name(),
        };

        let sections = [
            tt.render("header", &header).map_err(template_error)?,
            MODULES.to_string(),
            tt.render("namd", &namd).map_err(template_error)?,
        ];
        Ok(JobScript { content: sections.concat() })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Write the job script, replacing anything already at `out_path`
    pub fn write(&self, out_path: &Path) -> std::io::Result<()> {
        let mut file = File::create(out_path)?;
        file.write_all(self.content().as_bytes())?;
        Ok(())
    }
}

fn template_error(err: tinytemplate::error::Error) -> anyhow::Error {
    anyhow!("Job script template: {err}")
}

/// Write one job script next to each config and return the script paths in input order
pub fn prepare(
    configs: &[PathBuf],
    resources: &ResourceSpec,
    home: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let mut scripts = Vec::with_capacity(configs.len());
    for path in configs {
        let config = JobConfig { path: path.clone() };
        let name = job_name(&config.path, home);
        let script = JobScript::render(&config, resources, &name)?;

        let script_path = config.script_path();
        script
            .write(&script_path)
            .with_context(|| format!("Can't write job script {}", script_path.display()))?;
        info!("Wrote job script {} (job name {name})", script_path.display());
        scripts.push(script_path);
    }
    Ok(scripts)
}
