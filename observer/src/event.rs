use std::net::Ipv4Addr;

use observer_common::{fixed::trim_nul, EbpfEvent, ExecEvent, ExitEvent, SyscallEvent, TcpConnectEvent};
use serde::Serialize;

/// Decoded ring record, serialised as one JSON object tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObserverEvent {
	ProcessExec(ProcessExec),
	ProcessExit(ProcessExit),
	Syscall(Syscall),
	TcpConnect(TcpConnect),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessExec {
	pub timestamp_ns: u64,
	pub pid: u32,
	pub ppid: u32,
	pub uid: u32,
	pub gid: u32,
	pub comm: String,
	pub filename: String,
	pub cgroup_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessExit {
	pub timestamp_ns: u64,
	pub pid: u32,
	pub exit_status: u32,
	pub exit_code: u32,
	pub signal: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Syscall {
	pub timestamp_ns: u64,
	pub pid: u32,
	pub uid: u32,
	pub comm: String,
	pub syscall_id: u64,
	pub syscall_name: String,
	pub duration_ns: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TcpConnect {
	pub timestamp_ns: u64,
	pub pid: u32,
	pub uid: u32,
	pub comm: String,
	pub saddr: Ipv4Addr,
	pub daddr: Ipv4Addr,
	pub sport: u16,
	pub dport: u16,
	pub cgroup_id: u64,
}

impl From<EbpfEvent> for ObserverEvent {
	fn from(evt: EbpfEvent) -> Self {
		match evt {
			EbpfEvent::Exec(e) => Self::ProcessExec(e.into()),
			EbpfEvent::Exit(e) => Self::ProcessExit(e.into()),
			EbpfEvent::Syscall(e) => Self::Syscall(e.into()),
			EbpfEvent::TcpConnect(e) => Self::TcpConnect(e.into()),
		}
	}
}

impl From<ExecEvent> for ProcessExec {
	fn from(e: ExecEvent) -> Self {
		Self {
			timestamp_ns: e.header.timestamp_ns,
			pid: e.pid,
			ppid: e.ppid,
			uid: e.uid,
			gid: e.gid,
			comm: fixed_str(&e.comm),
			filename: fixed_str(&e.filename),
			cgroup_id: e.cgroup_id,
		}
	}
}

impl From<ExitEvent> for ProcessExit {
	fn from(e: ExitEvent) -> Self {
		Self {
			timestamp_ns: e.header.timestamp_ns,
			pid: e.pid,
			exit_status: e.exit_code,
			exit_code: (e.exit_code >> 8) & 0xff,
			signal: e.exit_code & 0x7f,
		}
	}
}

impl From<SyscallEvent> for Syscall {
	fn from(e: SyscallEvent) -> Self {
		Self {
			timestamp_ns: e.header.timestamp_ns,
			pid: e.pid,
			uid: e.uid,
			comm: fixed_str(&e.comm),
			syscall_id: e.syscall_id,
			syscall_name: fixed_str(&e.syscall_name),
			duration_ns: e.duration_ns,
		}
	}
}

impl From<TcpConnectEvent> for TcpConnect {
	fn from(e: TcpConnectEvent) -> Self {
		Self {
			timestamp_ns: e.header.timestamp_ns,
			pid: e.pid,
			uid: e.uid,
			comm: fixed_str(&e.comm),
			saddr: ipv4(e.saddr),
			daddr: ipv4(e.daddr),
			sport: e.sport,
			dport: e.dport,
			cgroup_id: e.cgroup_id,
		}
	}
}

impl ObserverEvent {
	/// One human-readable line, for verbose logging.
	pub fn summary(&self) -> String {
		match self {
			Self::ProcessExec(e) => format!(
				"[PROCESS_EXEC] PID:{} | PPID:{} | UID:{} | CMD:{} | FILE:{}",
				e.pid, e.ppid, e.uid, e.comm, e.filename
			),
			Self::ProcessExit(e) => format!(
				"[PROCESS_EXIT] PID:{} | CODE:{} | SIGNAL:{}",
				e.pid, e.exit_code, e.signal
			),
			Self::Syscall(e) => format!(
				"[SYSCALL] PID:{} | CMD:{} | {}({}) | {}ns",
				e.pid, e.comm, e.syscall_name, e.syscall_id, e.duration_ns
			),
			Self::TcpConnect(e) => format!(
				"[TCP_CONNECT] PID:{} | CMD:{} | {}:{} → {}:{}",
				e.pid, e.comm, e.saddr, e.sport, e.daddr, e.dport
			),
		}
	}
}

fn fixed_str(field: &[u8]) -> String {
	String::from_utf8_lossy(trim_nul(field)).into_owned()
}

/// Addresses are stored in network order; their in-memory bytes are the octets.
fn ipv4(raw: u32) -> Ipv4Addr {
	Ipv4Addr::from(raw.to_ne_bytes())
}

// region:    --- Tests


// endregion: --- Tests
