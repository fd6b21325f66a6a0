use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout};

// 1 => PROCESS_EXEC   (sched_process_exec)
// 2 => PROCESS_EXIT   (sched_process_exit)
// 3 => SYSCALL        (raw sys_enter / sys_exit pair, sampled)
// 4 => TCP_CONNECT    (kprobe tcp_connect)

pub const TASK_COMM_LEN: usize = 16;
pub const FILENAME_LEN: usize = 256;
pub const SYSCALL_NAME_LEN: usize = 32;

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
	ProcessExec = 1,
	ProcessExit = 2,
	Syscall = 3,
	TcpConnect = 4,
}

impl EventKind {
	pub const fn from_tag(tag: u32) -> Option<Self> {
		match tag {
			1 => Some(Self::ProcessExec),
			2 => Some(Self::ProcessExit),
			3 => Some(Self::Syscall),
			4 => Some(Self::TcpConnect),
			_ => None,
		}
	}

	pub const fn tag(self) -> u32 {
		self as u32
	}

	/// Size of the record carrying this tag. The stream has no length prefix.
	pub const fn record_size(self) -> usize {
		match self {
			Self::ProcessExec => core::mem::size_of::<ExecEvent>(),
			Self::ProcessExit => core::mem::size_of::<ExitEvent>(),
			Self::Syscall => core::mem::size_of::<SyscallEvent>(),
			Self::TcpConnect => core::mem::size_of::<TcpConnectEvent>(),
		}
	}

	pub const fn name(self) -> &'static str {
		match self {
			Self::ProcessExec => "PROCESS_EXEC",
			Self::ProcessExit => "PROCESS_EXIT",
			Self::Syscall => "SYSCALL",
			Self::TcpConnect => "TCP_CONNECT",
		}
	}
}

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct EventHeader {
	pub kind: u32,         // 0..4
	pub _pad0: [u8; 4],    // 4..8
	pub timestamp_ns: u64, // 8..16
}

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ExecEvent {
	pub header: EventHeader,           // 0..16
	pub pid: u32,                      // 16..20
	pub ppid: u32,                     // 20..24
	pub uid: u32,                      // 24..28
	pub gid: u32,                      // 28..32
	pub comm: [u8; TASK_COMM_LEN],     // 32..48
	pub filename: [u8; FILENAME_LEN], // 48..304
	pub cgroup_id: u64,                // 304..312
}

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ExitEvent {
	pub header: EventHeader, // 0..16
	pub pid: u32,            // 16..20
	pub exit_code: u32,      // 20..24 | raw wait status: code << 8 | signal
}

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct SyscallEvent {
	pub header: EventHeader,                   // 0..16
	pub pid: u32,                              // 16..20
	pub uid: u32,                              // 20..24
	pub comm: [u8; TASK_COMM_LEN],             // 24..40
	pub syscall_id: u64,                       // 40..48
	pub syscall_name: [u8; SYSCALL_NAME_LEN], // 48..80
	pub duration_ns: u64,                      // 80..88
}

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct TcpConnectEvent {
	pub header: EventHeader,       // 0..16
	pub pid: u32,                  // 16..20
	pub uid: u32,                  // 20..24
	pub comm: [u8; TASK_COMM_LEN], // 24..40
	pub saddr: u32,                // 40..44 | network order, as stored by the kernel
	pub daddr: u32,                // 44..48 | network order, as stored by the kernel
	pub sport: u16,                // 48..50 | host order (skc_num)
	pub dport: u16,                // 50..52 | host order (converted from skc_dport)
	pub _pad0: [u8; 4],            // 52..56
	pub cgroup_id: u64,            // 56..64
}

/// A fixed-layout record that can be written into a ring slot.
///
/// Slots are zero-filled before the handler sees them, so every record type
/// must accept the all-zero bit pattern (`FromBytes`) and have no implicit
/// padding (`IntoBytes`).
pub trait Record: zerocopy::FromBytes + zerocopy::IntoBytes + zerocopy::Immutable + zerocopy::KnownLayout + 'static {
	const KIND: EventKind;

	fn header_mut(&mut self) -> &mut EventHeader;

	/// Writes the tag and timestamp shared by every record.
	#[inline(always)]
	fn stamp(&mut self, timestamp_ns: u64) {
		let header = self.header_mut();
		header.kind = Self::KIND.tag();
		header.timestamp_ns = timestamp_ns;
	}
}

macro_rules! impl_record {
	($ty:ty, $kind:expr) => {
		impl Record for $ty {
			const KIND: EventKind = $kind;

			#[inline(always)]
			fn header_mut(&mut self) -> &mut EventHeader {
				&mut self.header
			}
		}
	};
}

impl_record!(ExecEvent, EventKind::ProcessExec);
impl_record!(ExitEvent, EventKind::ProcessExit);
impl_record!(SyscallEvent, EventKind::Syscall);
impl_record!(TcpConnectEvent, EventKind::TcpConnect);

#[derive(Clone, Copy, Debug)]
pub enum EbpfEvent {
	Exec(ExecEvent),
	Exit(ExitEvent),
	Syscall(SyscallEvent),
	TcpConnect(TcpConnectEvent),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseError {
	/// Fewer bytes than the header, or than the size implied by the tag.
	Truncated { expected: usize, actual: usize },
	UnknownKind(u32),
}

impl EbpfEvent {
	/// Decodes one ring record. The length is inferred from the leading tag.
	pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
		let header: EventHeader = read_prefix(data, core::mem::size_of::<EventHeader>())?;
		let kind = EventKind::from_tag(header.kind).ok_or(ParseError::UnknownKind(header.kind))?;
		let size = kind.record_size();

		let evt = match kind {
			EventKind::ProcessExec => Self::Exec(read_prefix(data, size)?),
			EventKind::ProcessExit => Self::Exit(read_prefix(data, size)?),
			EventKind::Syscall => Self::Syscall(read_prefix(data, size)?),
			EventKind::TcpConnect => Self::TcpConnect(read_prefix(data, size)?),
		};

		Ok(evt)
	}

	pub fn kind(&self) -> EventKind {
		match self {
			Self::Exec(_) => EventKind::ProcessExec,
			Self::Exit(_) => EventKind::ProcessExit,
			Self::Syscall(_) => EventKind::Syscall,
			Self::TcpConnect(_) => EventKind::TcpConnect,
		}
	}

	pub fn timestamp_ns(&self) -> u64 {
		match self {
			Self::Exec(e) => e.header.timestamp_ns,
			Self::Exit(e) => e.header.timestamp_ns,
			Self::Syscall(e) => e.header.timestamp_ns,
			Self::TcpConnect(e) => e.header.timestamp_ns,
		}
	}

	pub fn pid(&self) -> u32 {
		match self {
			Self::Exec(e) => e.pid,
			Self::Exit(e) => e.pid,
			Self::Syscall(e) => e.pid,
			Self::TcpConnect(e) => e.pid,
		}
	}
}

fn read_prefix<T: zerocopy::FromBytes>(data: &[u8], expected: usize) -> Result<T, ParseError> {
	T::read_from_prefix(data).map(|(evt, _)| evt).map_err(|_| ParseError::Truncated {
		expected,
		actual: data.len(),
	})
}

// region:    --- Tests


// endregion: --- Tests
