use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// `[days][[-]hours:][minutes][:seconds]`, every part optional
static WALLTIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<days>\d+)??(-?(?P<hours>\d+):?)??(?P<minutes>\d+)?(:(?P<seconds>\d+))?$")
        .expect("walltime pattern compiles")
});

#[derive(Error, Debug, PartialEq, Eq)]
#[error("'{0}' is not a valid walltime")]
pub struct WallTimeError(pub String);

/// A wall time accepted by sbatch `--time`, kept exactly as the user typed it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WallTime(String);

impl WallTime {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for WallTime {
    fn default() -> Self {
        WallTime("12:00:00".to_string())
    }
}

impl FromStr for WallTime {
    type Err = WallTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match WALLTIME.is_match(s) {
            true => Ok(WallTime(s.to_string())),
            false => Err(WallTimeError(s.to_string())),
        }
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
