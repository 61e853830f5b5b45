//! Instance configuration from the command line.
//!
//! The runtime recognizes exactly two flags and ignores everything else, so
//! that the user's own arguments pass through untouched:
//!
//! - `--muscle-instance=<reference>` (required): the fully qualified name of
//!   this instance, e.g. `micro[3]`.
//! - `--muscle-manager=<host:port>` (optional): where to reach the manager.
//!   Default: `localhost:9000`.

use {
    crate::error::{InstanceError, Result},
    mcf_coupling_model::Reference,
};

const INSTANCE_FLAG: &str = "--muscle-instance=";
const MANAGER_FLAG: &str = "--muscle-manager=";

/// Default manager location when `--muscle-manager` is not given.
pub const DEFAULT_MANAGER_LOCATION: &str = "localhost:9000";

/// Identity and manager location of one compute element instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceConfig {
    /// Fully qualified instance name: compute element name plus index.
    pub name: Reference,
    /// `host:port` of the manager.
    pub manager_location: String,
}

impl InstanceConfig {
    /// Parse the configuration from command line arguments.
    ///
    /// `args` is the full argument list including the program name. Unknown
    /// flags and positional arguments belong to the user's code and are
    /// ignored.
    pub fn from_args(args: &[String]) -> Result<Self> {
        let name = args
            .iter()
            .skip(1)
            .find_map(|arg| arg.strip_prefix(INSTANCE_FLAG))
            .ok_or_else(|| {
                InstanceError::Config(String::from(
                    "a --muscle-instance command line argument is required \
                     to identify this instance; please add one",
                ))
            })?
            .parse::<Reference>()
            .map_err(|e| InstanceError::Config(e.to_string()))?;

        let manager_location = args
            .iter()
            .skip(1)
            .find_map(|arg| arg.strip_prefix(MANAGER_FLAG))
            .unwrap_or(DEFAULT_MANAGER_LOCATION)
            .to_string();

        Ok(Self {
            name,
            manager_location,
        })
    }

    /// The compute element name: the instance name without its index.
    pub fn kernel(&self) -> Reference {
        self.name.leading_identifiers()
    }

    /// The index of this instance within its instance set; empty when the
    /// compute element is not replicated.
    pub fn index(&self) -> Vec<usize> {
        self.name.trailing_indices()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_instance_name_is_parsed() {
        let config = InstanceConfig::from_args(&args(&[
            "bin",
            "--muscle-instance=macro",
            "--muscle-manager=host:1234",
        ]))
        .unwrap();
        assert_eq!(config.name.to_string(), "macro");
        assert_eq!(config.manager_location, "host:1234");
    }

    #[test]
    fn test_missing_instance_flag_fails() {
        let result = InstanceConfig::from_args(&args(&["bin", "--other=1"]));
        assert!(matches!(result, Err(InstanceError::Config(_))));
    }

    #[test]
    fn test_manager_location_defaults() {
        let config =
            InstanceConfig::from_args(&args(&["bin", "--muscle-instance=micro[3]"])).unwrap();
        assert_eq!(config.manager_location, DEFAULT_MANAGER_LOCATION);
    }

    #[test]
    fn test_unknown_flags_are_ignored() {
        let config = InstanceConfig::from_args(&args(&[
            "bin",
            "--verbose",
            "input.dat",
            "--muscle-instance=macro.meso[2][0]",
            "--seed=42",
        ]))
        .unwrap();
        assert_eq!(config.name.to_string(), "macro.meso[2][0]");
    }

    #[test]
    fn test_kernel_and_index_split() {
        let config =
            InstanceConfig::from_args(&args(&["bin", "--muscle-instance=macro.meso[2][0]"]))
                .unwrap();
        assert_eq!(config.kernel().to_string(), "macro.meso");
        assert_eq!(config.index(), vec![2, 0]);
    }

    #[test]
    fn test_program_name_is_not_scanned() {
        let result = InstanceConfig::from_args(&args(&["--muscle-instance=macro"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_instance_reference_fails() {
        let result = InstanceConfig::from_args(&args(&["bin", "--muscle-instance=3macro"]));
        assert!(matches!(result, Err(InstanceError::Config(_))));
    }
}
