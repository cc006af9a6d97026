//! Host platform (linux for example) utility functions

use std::env;
use std::path::PathBuf;

/// Name of the environment variable pointing at the software root directory.
pub const SW_ROOT_ENV_VAR: &str = "DRIVE_SW_ROOT";

/// Retrieve the software root directory from the environment.
pub fn get_drive_sw_root() -> Result<PathBuf, env::VarError> {
    Ok(PathBuf::from(env::var(SW_ROOT_ENV_VAR)?))
}
