//! Best-effort readers for kernel-owned structures.
//!
//! Nothing here dereferences kernel memory directly. Every access goes through
//! [`Kernel::read`], which in the kernel is a verified probe read and in tests
//! a lookup into a fake address space. Field offsets come from the load-time
//! [`FieldOffsets`] table; an unresolved field or a null link reads as zero.

use crate::event::TASK_COMM_LEN;
use crate::relocation::{FieldOffsets, KernelField};

/// Address of a kernel object. Never dereferenced on this side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct KernelPtr(pub u64);

impl KernelPtr {
	pub const NULL: KernelPtr = KernelPtr(0);

	#[inline(always)]
	pub fn is_null(self) -> bool {
		self.0 == 0
	}

	#[inline(always)]
	pub fn offset(self, by: u32) -> KernelPtr {
		KernelPtr(self.0.wrapping_add(by as u64))
	}
}

/// Helpers the capture core needs from its execution environment.
pub trait Kernel {
	/// `tgid << 32 | pid` of the current task.
	fn pid_tgid(&self) -> u64;

	/// `gid << 32 | uid` of the current task.
	fn uid_gid(&self) -> u64;

	fn comm(&self) -> [u8; TASK_COMM_LEN];

	/// Monotonic clock, nanoseconds.
	fn ktime_ns(&self) -> u64;

	fn current_task(&self) -> KernelPtr;

	/// Copies a `T` out of kernel memory. `None` when the read faults.
	fn read<T: zerocopy::FromBytes>(&self, ptr: KernelPtr) -> Option<T>;

	/// Copies a nul-terminated string into `dst`, truncating to `dst.len() - 1`
	/// and always terminating. Returns the content length.
	fn read_str(&self, ptr: KernelPtr, dst: &mut [u8]) -> Option<usize>;
}

#[inline(always)]
fn read_field<K: Kernel, T: zerocopy::FromBytes>(
	kernel: &K,
	offsets: &FieldOffsets,
	base: KernelPtr,
	field: KernelField,
) -> Option<T> {
	if base.is_null() {
		return None;
	}
	let off = offsets.get(field)?;
	kernel.read(base.offset(off))
}

#[inline(always)]
fn read_link<K: Kernel>(kernel: &K, offsets: &FieldOffsets, base: KernelPtr, field: KernelField) -> Option<KernelPtr> {
	let raw: u64 = read_field(kernel, offsets, base, field)?;
	let ptr = KernelPtr(raw);
	if ptr.is_null() {
		None
	} else {
		Some(ptr)
	}
}

// region:    --- TaskReader

/// Process descriptor (`task_struct`).
pub struct TaskReader<'a, K: Kernel> {
	kernel: &'a K,
	offsets: &'a FieldOffsets,
	task: KernelPtr,
}

impl<'a, K: Kernel> TaskReader<'a, K> {
	pub fn new(kernel: &'a K, offsets: &'a FieldOffsets, task: KernelPtr) -> Self {
		Self { kernel, offsets, task }
	}

	pub fn tgid(&self) -> u32 {
		read_field::<K, i32>(self.kernel, self.offsets, self.task, KernelField::TaskTgid)
			.map(|v| v as u32)
			.unwrap_or(0)
	}

	/// `real_parent->tgid`
	pub fn parent_tgid(&self) -> u32 {
		match read_link(self.kernel, self.offsets, self.task, KernelField::TaskRealParent) {
			Some(parent) => TaskReader::new(self.kernel, self.offsets, parent).tgid(),
			None => 0,
		}
	}

	/// Raw wait status (`code << 8 | signal`).
	pub fn exit_code(&self) -> u32 {
		read_field::<K, i32>(self.kernel, self.offsets, self.task, KernelField::TaskExitCode)
			.map(|v| v as u32)
			.unwrap_or(0)
	}

	/// `cgroups->dfl_cgrp->kn->id`, zero if any link is missing.
	pub fn cgroup_id(&self) -> u64 {
		self.try_cgroup_id().unwrap_or(0)
	}

	fn try_cgroup_id(&self) -> Option<u64> {
		let css_set = read_link(self.kernel, self.offsets, self.task, KernelField::TaskCgroups)?;
		let cgroup = read_link(self.kernel, self.offsets, css_set, KernelField::CssSetDflCgrp)?;
		let kn = read_link(self.kernel, self.offsets, cgroup, KernelField::CgroupKn)?;
		read_field(self.kernel, self.offsets, kn, KernelField::KernfsNodeId)
	}
}

// endregion: --- TaskReader

// region:    --- SockReader

/// Socket descriptor (`sock.__sk_common`). IPv4 fields only.
pub struct SockReader<'a, K: Kernel> {
	kernel: &'a K,
	offsets: &'a FieldOffsets,
	sk: KernelPtr,
}

impl<'a, K: Kernel> SockReader<'a, K> {
	pub fn new(kernel: &'a K, offsets: &'a FieldOffsets, sk: KernelPtr) -> Self {
		Self { kernel, offsets, sk }
	}

	/// Network order, untouched.
	pub fn saddr(&self) -> u32 {
		read_field(self.kernel, self.offsets, self.sk, KernelField::SockRcvSaddr).unwrap_or(0)
	}

	/// Network order, untouched.
	pub fn daddr(&self) -> u32 {
		read_field(self.kernel, self.offsets, self.sk, KernelField::SockDaddr).unwrap_or(0)
	}

	/// `skc_num` is already host order.
	pub fn sport(&self) -> u16 {
		read_field(self.kernel, self.offsets, self.sk, KernelField::SockNum).unwrap_or(0)
	}

	/// `skc_dport` is network order; converted here.
	pub fn dport(&self) -> u16 {
		let raw: u16 = read_field(self.kernel, self.offsets, self.sk, KernelField::SockDport).unwrap_or(0);
		u16::from_be(raw)
	}
}

// endregion: --- SockReader

// region:    --- RegsReader

/// Saved user registers (`pt_regs`) of a task leaving a syscall.
pub struct RegsReader<'a, K: Kernel> {
	kernel: &'a K,
	offsets: &'a FieldOffsets,
	regs: KernelPtr,
}

impl<'a, K: Kernel> RegsReader<'a, K> {
	pub const UNKNOWN_SYSCALL: u64 = u64::MAX;

	pub fn new(kernel: &'a K, offsets: &'a FieldOffsets, regs: KernelPtr) -> Self {
		Self { kernel, offsets, regs }
	}

	/// `UNKNOWN_SYSCALL` when the register slot is unresolved or unreadable.
	pub fn syscall_nr(&self) -> u64 {
		read_field(self.kernel, self.offsets, self.regs, KernelField::PtRegsSyscallNr).unwrap_or(Self::UNKNOWN_SYSCALL)
	}
}

// endregion: --- RegsReader

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use crate::harness::{fake_offsets, FakeKernel};

	#[test]
	fn cgroup_id_is_zero_for_null_css_set() -> Result<()> {
		// -- Setup & Fixtures
		let offsets = fake_offsets();
		let mut kernel = FakeKernel::default();
		let task = kernel.alloc(0x100);
		kernel.write_u64(task.offset(0x20), 0); // task->cgroups = NULL

		// -- Exec
		let id = TaskReader::new(&kernel, &offsets, task).cgroup_id();

		// -- Check
		assert_eq!(id, 0);

		Ok(())
	}

	#[test]
	fn cgroup_id_follows_full_chain() -> Result<()> {
		// -- Setup & Fixtures
		let offsets = fake_offsets();
		let mut kernel = FakeKernel::default();
		let task = kernel.spawn_task(100, 1, 0);
		kernel.link_cgroup(task, 0xc0ffee);

		// -- Exec
		let id = TaskReader::new(&kernel, &offsets, task).cgroup_id();

		// -- Check
		assert_eq!(id, 0xc0ffee);

		Ok(())
	}

	#[test]
	fn unresolved_field_reads_zero() -> Result<()> {
		// -- Setup & Fixtures
		let offsets = FieldOffsets::unresolved();
		let mut kernel = FakeKernel::default();
		let task = kernel.spawn_task(100, 1, 3);

		// -- Exec
		let reader = TaskReader::new(&kernel, &offsets, task);

		// -- Check
		assert_eq!(reader.tgid(), 0);
		assert_eq!(reader.parent_tgid(), 0);
		assert_eq!(reader.exit_code(), 0);

		Ok(())
	}

	#[test]
	fn sock_ports_keep_their_asymmetric_byte_order() -> Result<()> {
		// -- Setup & Fixtures
		let offsets = fake_offsets();
		let mut kernel = FakeKernel::default();
		let sk = kernel.spawn_sock([10, 0, 0, 1], [93, 184, 216, 34], 0xd431, 8080);

		// -- Exec
		let reader = SockReader::new(&kernel, &offsets, sk);

		// -- Check
		assert_eq!(reader.dport(), 8080);
		assert_eq!(reader.sport(), 0xd431);
		assert_eq!(reader.saddr().to_ne_bytes(), [10, 0, 0, 1]);
		assert_eq!(reader.daddr().to_ne_bytes(), [93, 184, 216, 34]);

		Ok(())
	}

	#[test]
	fn syscall_nr_unresolved_is_unknown() -> Result<()> {
		// -- Setup & Fixtures
		let offsets = FieldOffsets::unresolved();
		let mut kernel = FakeKernel::default();
		let regs = kernel.spawn_regs(1);

		// -- Exec
		let nr = RegsReader::new(&kernel, &offsets, regs).syscall_nr();

		// -- Check
		assert_eq!(nr, u64::MAX);

		Ok(())
	}
}

// endregion: --- Tests
