use aya::{
	programs::{
		kprobe::KProbeLinkId, raw_trace_point::RawTracePointLinkId, trace_point::TracePointLinkId, KProbe,
		RawTracePoint, TracePoint,
	},
	Ebpf,
};
use tracing::{debug, info};

use crate::{config::Monitors, Error, Result};

/// Kernel programs and where they attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
	ProcessExec,
	ProcessExit,
	SysEnter,
	SysExit,
	TcpConnect,
}

impl Hook {
	pub const ALL: [Hook; 5] = [
		Self::ProcessExec,
		Self::ProcessExit,
		Self::SysEnter,
		Self::SysExit,
		Self::TcpConnect,
	];

	/// Program name in the object file.
	pub const fn program(self) -> &'static str {
		match self {
			Self::ProcessExec => "sched_process_exec",
			Self::ProcessExit => "sched_process_exit",
			Self::SysEnter => "sys_enter",
			Self::SysExit => "sys_exit",
			Self::TcpConnect => "tcp_connect",
		}
	}

	pub fn enabled(self, monitors: &Monitors) -> bool {
		match self {
			Self::ProcessExec | Self::ProcessExit => monitors.processes,
			Self::SysEnter | Self::SysExit => monitors.syscalls,
			Self::TcpConnect => monitors.network,
		}
	}

	pub fn selected(monitors: &Monitors) -> Vec<Hook> {
		Self::ALL.into_iter().filter(|hook| hook.enabled(monitors)).collect()
	}
}

enum Link {
	TracePoint(Hook, TracePointLinkId),
	RawTracePoint(Hook, RawTracePointLinkId),
	KProbe(Hook, KProbeLinkId),
}

/// Loaded programs plus the links of the current capture window.
pub struct Hooks {
	selected: Vec<Hook>,
	links: Vec<Link>,
}

impl Hooks {
	/// Loads every selected program once. Attaching happens per cycle.
	pub fn load(ebpf: &mut Ebpf, monitors: &Monitors) -> Result<Self> {
		let selected = Hook::selected(monitors);

		for hook in &selected {
			match hook {
				Hook::ProcessExec | Hook::ProcessExit => tracepoint(ebpf, *hook)?.load()?,
				Hook::SysEnter | Hook::SysExit => raw_tracepoint(ebpf, *hook)?.load()?,
				Hook::TcpConnect => kprobe(ebpf, *hook)?.load()?,
			}
			debug!("loaded {}", hook.program());
		}
		info!("loaded {} programs: {:?}", selected.len(), selected);

		Ok(Self {
			selected,
			links: Vec::new(),
		})
	}

	pub fn is_attached(&self) -> bool {
		!self.links.is_empty()
	}

	pub fn attach(&mut self, ebpf: &mut Ebpf) -> Result<()> {
		for hook in self.selected.iter().copied() {
			let link = match hook {
				Hook::ProcessExec | Hook::ProcessExit => {
					Link::TracePoint(hook, tracepoint(ebpf, hook)?.attach("sched", hook.program())?)
				}
				Hook::SysEnter | Hook::SysExit => {
					Link::RawTracePoint(hook, raw_tracepoint(ebpf, hook)?.attach(hook.program())?)
				}
				Hook::TcpConnect => Link::KProbe(hook, kprobe(ebpf, hook)?.attach(hook.program(), 0)?),
			};
			self.links.push(link);
			debug!("attached {}", hook.program());
		}
		Ok(())
	}

	pub fn detach(&mut self, ebpf: &mut Ebpf) -> Result<()> {
		for link in self.links.drain(..) {
			let hook = match link {
				Link::TracePoint(hook, id) => {
					tracepoint(ebpf, hook)?.detach(id)?;
					hook
				}
				Link::RawTracePoint(hook, id) => {
					raw_tracepoint(ebpf, hook)?.detach(id)?;
					hook
				}
				Link::KProbe(hook, id) => {
					kprobe(ebpf, hook)?.detach(id)?;
					hook
				}
			};
			debug!("detached {}", hook.program());
		}
		Ok(())
	}
}

fn tracepoint(ebpf: &mut Ebpf, hook: Hook) -> Result<&mut TracePoint> {
	let program: &mut TracePoint = ebpf
		.program_mut(hook.program())
		.ok_or(Error::EbpfProgNotFound(hook.program()))?
		.try_into()?;
	Ok(program)
}

fn raw_tracepoint(ebpf: &mut Ebpf, hook: Hook) -> Result<&mut RawTracePoint> {
	let program: &mut RawTracePoint = ebpf
		.program_mut(hook.program())
		.ok_or(Error::EbpfProgNotFound(hook.program()))?
		.try_into()?;
	Ok(program)
}

fn kprobe(ebpf: &mut Ebpf, hook: Hook) -> Result<&mut KProbe> {
	let program: &mut KProbe = ebpf
		.program_mut(hook.program())
		.ok_or(Error::EbpfProgNotFound(hook.program()))?
		.try_into()?;
	Ok(program)
}

// region:    --- Tests


// endregion: --- Tests
