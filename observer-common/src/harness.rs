//! In-memory stand-ins for the kernel, the ring and the correlation table, so
//! the capture core can run on the host.

use crate::correlation::CorrelationTable;
use crate::event::{Record, TASK_COMM_LEN};
use crate::fixed::{copy_str, padded};
use crate::kernel::{Kernel, KernelPtr};
use crate::relocation::{FieldOffsets, KernelField};
use crate::transport::{RecordSlot, RingTransport};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};

// region:    --- Layout

const TASK_SIZE: usize = 0x100;
const TASK_TGID: u32 = 0x10;
const TASK_REAL_PARENT: u32 = 0x18;
const TASK_CGROUPS: u32 = 0x20;
const TASK_EXIT_CODE: u32 = 0x28;
const CSS_SET_DFL_CGRP: u32 = 0x08;
const CGROUP_KN: u32 = 0x10;
const KERNFS_NODE_ID: u32 = 0x00;
const SOCK_DADDR: u32 = 0x00;
const SOCK_RCV_SADDR: u32 = 0x04;
const SOCK_DPORT: u32 = 0x0c;
const SOCK_NUM: u32 = 0x0e;
const PT_REGS_ORIG_AX: u32 = 120;

/// Offsets matching the structures [`FakeKernel`] lays out.
pub fn fake_offsets() -> FieldOffsets {
	let mut offsets = FieldOffsets::unresolved();
	offsets.set(KernelField::TaskTgid, TASK_TGID);
	offsets.set(KernelField::TaskRealParent, TASK_REAL_PARENT);
	offsets.set(KernelField::TaskCgroups, TASK_CGROUPS);
	offsets.set(KernelField::TaskExitCode, TASK_EXIT_CODE);
	offsets.set(KernelField::CssSetDflCgrp, CSS_SET_DFL_CGRP);
	offsets.set(KernelField::CgroupKn, CGROUP_KN);
	offsets.set(KernelField::KernfsNodeId, KERNFS_NODE_ID);
	offsets.set(KernelField::SockDaddr, SOCK_DADDR);
	offsets.set(KernelField::SockRcvSaddr, SOCK_RCV_SADDR);
	offsets.set(KernelField::SockDport, SOCK_DPORT);
	offsets.set(KernelField::SockNum, SOCK_NUM);
	offsets.set(KernelField::PtRegsSyscallNr, PT_REGS_ORIG_AX);
	offsets
}

// endregion: --- Layout

// region:    --- FakeKernel

/// Sparse address space plus the per-task state the helpers report.
pub struct FakeKernel {
	regions: BTreeMap<u64, Vec<u8>>,
	next_addr: u64,
	pid_tgid: Cell<u64>,
	uid_gid: Cell<u64>,
	comm: Cell<[u8; TASK_COMM_LEN]>,
	now_ns: Cell<u64>,
	current: Cell<KernelPtr>,
}

impl Default for FakeKernel {
	fn default() -> Self {
		Self {
			regions: BTreeMap::new(),
			next_addr: 0xffff_8880_0000_0000,
			pid_tgid: Cell::new(0),
			uid_gid: Cell::new(0),
			comm: Cell::new([0; TASK_COMM_LEN]),
			now_ns: Cell::new(0),
			current: Cell::new(KernelPtr::NULL),
		}
	}
}

impl FakeKernel {
	pub fn alloc(&mut self, size: usize) -> KernelPtr {
		let base = self.next_addr;
		self.regions.insert(base, vec![0; size]);
		self.next_addr += (size as u64).next_multiple_of(0x1000) + 0x1000;
		KernelPtr(base)
	}

	pub fn write_bytes(&mut self, ptr: KernelPtr, bytes: &[u8]) {
		let (base, region) = self
			.regions
			.range_mut(..=ptr.0)
			.next_back()
			.expect("write to unmapped address");
		let start = (ptr.0 - base) as usize;
		region[start..start + bytes.len()].copy_from_slice(bytes);
	}

	pub fn write_u64(&mut self, ptr: KernelPtr, val: u64) {
		self.write_bytes(ptr, &val.to_ne_bytes());
	}

	pub fn write_i32(&mut self, ptr: KernelPtr, val: i32) {
		self.write_bytes(ptr, &val.to_ne_bytes());
	}

	/// Task whose `real_parent` is a second task with `parent_tgid`.
	pub fn spawn_task(&mut self, tgid: i32, parent_tgid: i32, exit_code: i32) -> KernelPtr {
		let parent = self.alloc(TASK_SIZE);
		self.write_i32(parent.offset(TASK_TGID), parent_tgid);

		let task = self.alloc(TASK_SIZE);
		self.write_i32(task.offset(TASK_TGID), tgid);
		self.write_u64(task.offset(TASK_REAL_PARENT), parent.0);
		self.write_i32(task.offset(TASK_EXIT_CODE), exit_code);
		task
	}

	/// Populates `task->cgroups->dfl_cgrp->kn->id`.
	pub fn link_cgroup(&mut self, task: KernelPtr, id: u64) {
		let css_set = self.alloc(0x40);
		let cgroup = self.alloc(0x40);
		let kn = self.alloc(0x40);
		self.write_u64(task.offset(TASK_CGROUPS), css_set.0);
		self.write_u64(css_set.offset(CSS_SET_DFL_CGRP), cgroup.0);
		self.write_u64(cgroup.offset(CGROUP_KN), kn.0);
		self.write_u64(kn.offset(KERNFS_NODE_ID), id);
	}

	/// Socket stored the way the kernel stores it: addresses and `skc_dport`
	/// in network order, `skc_num` in host order.
	pub fn spawn_sock(&mut self, saddr: [u8; 4], daddr: [u8; 4], sport: u16, dport: u16) -> KernelPtr {
		let sk = self.alloc(0x40);
		self.write_bytes(sk.offset(SOCK_DADDR), &daddr);
		self.write_bytes(sk.offset(SOCK_RCV_SADDR), &saddr);
		self.write_bytes(sk.offset(SOCK_DPORT), &dport.to_be_bytes());
		self.write_bytes(sk.offset(SOCK_NUM), &sport.to_ne_bytes());
		sk
	}

	pub fn spawn_regs(&mut self, syscall_nr: u64) -> KernelPtr {
		let regs = self.alloc(0xa8);
		self.write_u64(regs.offset(PT_REGS_ORIG_AX), syscall_nr);
		regs
	}

	/// Nul-terminated copy of `s`.
	pub fn put_str(&mut self, s: &[u8]) -> KernelPtr {
		let ptr = self.alloc(s.len() + 1);
		self.write_bytes(ptr, s);
		ptr
	}

	pub fn set_current(&self, task: KernelPtr, pid_tgid: u64, uid_gid: u64, comm: &[u8]) {
		self.current.set(task);
		self.pid_tgid.set(pid_tgid);
		self.uid_gid.set(uid_gid);
		self.comm.set(padded(comm));
	}

	pub fn set_time(&self, now_ns: u64) {
		self.now_ns.set(now_ns);
	}

	fn mapped(&self, ptr: KernelPtr) -> Option<&[u8]> {
		let (base, region) = self.regions.range(..=ptr.0).next_back()?;
		let start = (ptr.0 - base) as usize;
		region.get(start..)
	}
}

impl Kernel for FakeKernel {
	fn pid_tgid(&self) -> u64 {
		self.pid_tgid.get()
	}

	fn uid_gid(&self) -> u64 {
		self.uid_gid.get()
	}

	fn comm(&self) -> [u8; TASK_COMM_LEN] {
		self.comm.get()
	}

	fn ktime_ns(&self) -> u64 {
		self.now_ns.get()
	}

	fn current_task(&self) -> KernelPtr {
		self.current.get()
	}

	fn read<T: zerocopy::FromBytes>(&self, ptr: KernelPtr) -> Option<T> {
		let bytes = self.mapped(ptr)?;
		T::read_from_prefix(bytes).ok().map(|(val, _)| val)
	}

	fn read_str(&self, ptr: KernelPtr, dst: &mut [u8]) -> Option<usize> {
		let bytes = self.mapped(ptr)?;
		Some(copy_str(dst, bytes))
	}
}

// endregion: --- FakeKernel

// region:    --- MemoryRing

/// Byte-accounted ring. Submitted records stay charged until drained.
pub struct MemoryRing {
	capacity: usize,
	used: Cell<usize>,
	delivered: RefCell<Vec<Vec<u8>>>,
	discarded: Cell<usize>,
}

impl MemoryRing {
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			capacity,
			used: Cell::new(0),
			delivered: RefCell::new(Vec::new()),
			discarded: Cell::new(0),
		}
	}

	/// Takes every submitted record and frees its space.
	pub fn drain(&self) -> Vec<Vec<u8>> {
		let records = std::mem::take(&mut *self.delivered.borrow_mut());
		let freed: usize = records.iter().map(Vec::len).sum();
		self.used.set(self.used.get() - freed);
		records
	}

	pub fn used(&self) -> usize {
		self.used.get()
	}

	pub fn pending(&self) -> usize {
		self.delivered.borrow().len()
	}

	pub fn discarded(&self) -> usize {
		self.discarded.get()
	}
}

pub struct MemorySlot<'a, T: Record> {
	ring: &'a MemoryRing,
	record: T,
}

impl RingTransport for MemoryRing {
	type Slot<'a, T: Record>
		= MemorySlot<'a, T>
	where
		Self: 'a;

	fn reserve<T: Record>(&self) -> Option<MemorySlot<'_, T>> {
		let size = core::mem::size_of::<T>();
		let used = self.used.get();
		if used + size > self.capacity {
			return None;
		}
		self.used.set(used + size);
		Some(MemorySlot {
			ring: self,
			record: T::new_zeroed(),
		})
	}
}

impl<T: Record> RecordSlot<T> for MemorySlot<'_, T> {
	fn record_mut(&mut self) -> &mut T {
		&mut self.record
	}

	fn submit(self) {
		self.ring.delivered.borrow_mut().push(self.record.as_bytes().to_vec());
	}

	fn discard(self) {
		self.ring.used.set(self.ring.used.get() - core::mem::size_of::<T>());
		self.ring.discarded.set(self.ring.discarded.get() + 1);
	}
}

// endregion: --- MemoryRing

// region:    --- MemoryTable

/// Capacity-bounded table evicting the least recently inserted entry.
pub struct MemoryTable {
	capacity: usize,
	entries: RefCell<VecDeque<(u64, u64)>>,
}

impl MemoryTable {
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			capacity,
			entries: RefCell::new(VecDeque::new()),
		}
	}

	pub fn len(&self) -> usize {
		self.entries.borrow().len()
	}
}

impl CorrelationTable for MemoryTable {
	fn insert(&self, pid_tgid: u64, enter_ns: u64) -> bool {
		if self.capacity == 0 {
			return false;
		}
		let mut entries = self.entries.borrow_mut();
		entries.retain(|(key, _)| *key != pid_tgid);
		if entries.len() == self.capacity {
			entries.pop_front();
		}
		entries.push_back((pid_tgid, enter_ns));
		true
	}

	fn lookup(&self, pid_tgid: u64) -> Option<u64> {
		self.entries.borrow().iter().find(|(key, _)| *key == pid_tgid).map(|(_, ts)| *ts)
	}

	fn delete(&self, pid_tgid: u64) {
		self.entries.borrow_mut().retain(|(key, _)| *key != pid_tgid);
	}
}

// endregion: --- MemoryTable
