//! Handler bodies shared by every attachment point.
//!
//! Each method runs once per kernel invocation, does bounded work and never
//! fails outward: a full ring or a missing correlation entry only changes the
//! returned [`Outcome`]. The kernel program ignores the outcome; tests assert
//! on it.

use crate::correlation::CorrelationTable;
use crate::event::{ExecEvent, ExitEvent, Record, SyscallEvent, TcpConnectEvent};
use crate::kernel::{Kernel, KernelPtr, RegsReader, SockReader, TaskReader};
use crate::relocation::FieldOffsets;
use crate::sampling;
use crate::syscall::syscall_name;
use crate::transport::{RecordSlot, RingTransport};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
	/// A record was handed to the ring.
	Submitted,
	/// A syscall entry timestamp was stored.
	Recorded,
	/// The exit matched an entry but was not admitted by sampling.
	SampledOut,
	/// The exit had no stored entry.
	NoEntry,
	/// No space in the ring, or the table refused the entry.
	Dropped,
}

pub struct Capture<'a, K, C, R> {
	kernel: &'a K,
	table: &'a C,
	ring: &'a R,
	offsets: &'a FieldOffsets,
}

impl<'a, K, C, R> Capture<'a, K, C, R>
where
	K: Kernel,
	C: CorrelationTable,
	R: RingTransport,
{
	pub fn new(kernel: &'a K, table: &'a C, ring: &'a R, offsets: &'a FieldOffsets) -> Self {
		Self {
			kernel,
			table,
			ring,
			offsets,
		}
	}

	fn task(&self) -> TaskReader<'a, K> {
		TaskReader::new(self.kernel, self.offsets, self.kernel.current_task())
	}

	fn pid(&self) -> u32 {
		(self.kernel.pid_tgid() >> 32) as u32
	}

	/// Image replacement. `filename` points at the new executable path.
	pub fn process_exec(&self, filename: KernelPtr) -> Outcome {
		let Some(mut slot) = self.ring.reserve::<ExecEvent>() else {
			return Outcome::Dropped;
		};
		let task = self.task();
		let uid_gid = self.kernel.uid_gid();

		let evt = slot.record_mut();
		evt.stamp(self.kernel.ktime_ns());
		evt.pid = self.pid();
		evt.ppid = task.parent_tgid();
		evt.uid = uid_gid as u32;
		evt.gid = (uid_gid >> 32) as u32;
		evt.comm = self.kernel.comm();
		// unreadable path leaves the field empty
		let _ = self.kernel.read_str(filename, &mut evt.filename);
		evt.cgroup_id = task.cgroup_id();

		slot.submit();
		Outcome::Submitted
	}

	pub fn process_exit(&self) -> Outcome {
		let Some(mut slot) = self.ring.reserve::<ExitEvent>() else {
			return Outcome::Dropped;
		};

		let evt = slot.record_mut();
		evt.stamp(self.kernel.ktime_ns());
		evt.pid = self.pid();
		evt.exit_code = self.task().exit_code();

		slot.submit();
		Outcome::Submitted
	}

	pub fn syscall_enter(&self) -> Outcome {
		let enter_ns = self.kernel.ktime_ns();
		if self.table.insert(self.kernel.pid_tgid(), enter_ns) {
			Outcome::Recorded
		} else {
			Outcome::Dropped
		}
	}

	/// `regs` are the saved user registers of the exiting task.
	pub fn syscall_exit(&self, regs: KernelPtr) -> Outcome {
		let pid_tgid = self.kernel.pid_tgid();
		let exit_ns = self.kernel.ktime_ns();
		let admitted = sampling::admit(exit_ns);

		// the entry is consumed whatever sampling decided
		let Some(enter_ns) = self.table.lookup(pid_tgid) else {
			return Outcome::NoEntry;
		};
		self.table.delete(pid_tgid);

		if !admitted {
			return Outcome::SampledOut;
		}

		let Some(mut slot) = self.ring.reserve::<SyscallEvent>() else {
			return Outcome::Dropped;
		};
		let syscall_id = RegsReader::new(self.kernel, self.offsets, regs).syscall_nr();

		let evt = slot.record_mut();
		evt.stamp(exit_ns);
		evt.pid = (pid_tgid >> 32) as u32;
		evt.uid = self.kernel.uid_gid() as u32;
		evt.comm = self.kernel.comm();
		evt.syscall_id = syscall_id;
		evt.syscall_name = syscall_name(syscall_id);
		evt.duration_ns = exit_ns.saturating_sub(enter_ns);

		slot.submit();
		Outcome::Submitted
	}

	/// Outbound connect on `sk`. Only IPv4 fields are meaningful.
	pub fn tcp_connect(&self, sk: KernelPtr) -> Outcome {
		let Some(mut slot) = self.ring.reserve::<TcpConnectEvent>() else {
			return Outcome::Dropped;
		};
		let sock = SockReader::new(self.kernel, self.offsets, sk);

		let evt = slot.record_mut();
		evt.stamp(self.kernel.ktime_ns());
		evt.pid = self.pid();
		evt.uid = self.kernel.uid_gid() as u32;
		evt.comm = self.kernel.comm();
		evt.saddr = sock.saddr();
		evt.daddr = sock.daddr();
		evt.sport = sock.sport();
		evt.dport = sock.dport();
		evt.cgroup_id = self.task().cgroup_id();

		slot.submit();
		Outcome::Submitted
	}
}

// region:    --- Tests


// endregion: --- Tests
