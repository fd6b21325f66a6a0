use std::path::PathBuf;

use clap::Parser;
use humantime::Duration;

#[derive(Parser, Debug)]
#[command(name = "observer", about = "Sparse-sampling kernel telemetry agent")]
pub struct Cli {
	#[arg(long, help = "JSON config file; CLI flags override its values")]
	pub config: Option<PathBuf>,

	#[arg(long, help = "Capture window per cycle (e.g., 60s, 5m)")]
	pub sampling_on: Option<Duration>,

	#[arg(long, help = "Idle window between captures (e.g., 240s, 10m)")]
	pub sampling_off: Option<Duration>,

	#[arg(short, long, help = "Log a summary line per event")]
	pub verbose: bool,

	#[arg(long)]
	pub no_processes: bool,

	#[arg(long)]
	pub no_syscalls: bool,

	#[arg(long)]
	pub no_network: bool,

	#[arg(long, help = "Kernel BTF to resolve structure offsets against [default: /sys/kernel/btf/vmlinux]")]
	pub btf: Option<PathBuf>,
}
