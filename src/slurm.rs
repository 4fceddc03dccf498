//! Render NAMD job scripts and submit them to SLURM

/// Render job script templates and write them next to each config
pub mod job;

/// Run sbatch for each job script, optionally as a dependency chain
pub mod submit;
