use std::{path::Path, time::Duration};

use serde::Deserialize;

use crate::{cli::args::Cli, Result};

pub const DEFAULT_SAMPLING_ON: Duration = Duration::from_secs(60);
pub const DEFAULT_SAMPLING_OFF: Duration = Duration::from_secs(240);

/// Which hook groups get attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Monitors {
	pub processes: bool,
	pub syscalls: bool,
	pub network: bool,
}

impl Default for Monitors {
	fn default() -> Self {
		Self {
			processes: true,
			syscalls: true,
			network: true,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub sampling_on: Duration,
	pub sampling_off: Duration,
	pub verbose: bool,
	pub monitors: Monitors,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			sampling_on: DEFAULT_SAMPLING_ON,
			sampling_off: DEFAULT_SAMPLING_OFF,
			verbose: false,
			monitors: Monitors::default(),
		}
	}
}

/// On-disk config. Every key is optional; unknown keys are ignored.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct FileConfig {
	/// seconds
	pub sampling_on: Option<u64>,
	/// seconds
	pub sampling_off: Option<u64>,
	pub verbose: Option<bool>,
	pub monitor_processes: Option<bool>,
	pub monitor_syscalls: Option<bool>,
	pub monitor_network: Option<bool>,
}

impl FileConfig {
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)?;
		Self::from_json(&content)
	}

	pub fn from_json(content: &str) -> Result<Self> {
		Ok(serde_json::from_str(content)?)
	}
}

impl Config {
	/// Defaults, then the file, then CLI flags.
	pub fn resolve(file: Option<FileConfig>, cli: &Cli) -> Self {
		let mut config = Config::default();

		if let Some(file) = file {
			if let Some(secs) = file.sampling_on {
				config.sampling_on = Duration::from_secs(secs);
			}
			if let Some(secs) = file.sampling_off {
				config.sampling_off = Duration::from_secs(secs);
			}
			config.verbose = file.verbose.unwrap_or(config.verbose);
			config.monitors.processes = file.monitor_processes.unwrap_or(config.monitors.processes);
			config.monitors.syscalls = file.monitor_syscalls.unwrap_or(config.monitors.syscalls);
			config.monitors.network = file.monitor_network.unwrap_or(config.monitors.network);
		}

		if let Some(on) = &cli.sampling_on {
			config.sampling_on = **on;
		}
		if let Some(off) = &cli.sampling_off {
			config.sampling_off = **off;
		}
		config.verbose |= cli.verbose;
		config.monitors.processes &= !cli.no_processes;
		config.monitors.syscalls &= !cli.no_syscalls;
		config.monitors.network &= !cli.no_network;

		config
	}
}

// region:    --- Tests


// endregion: --- Tests
