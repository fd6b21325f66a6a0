//! aya-ebpf bindings for the capture core.

use aya_ebpf::{
	helpers::{
		bpf_get_current_comm, bpf_get_current_pid_tgid, bpf_get_current_uid_gid, bpf_ktime_get_ns, bpf_probe_read_kernel,
		bpf_probe_read_kernel_str_bytes, r#gen::bpf_get_current_task,
	},
	maps::ring_buf::RingBufEntry,
};
use observer_common::{
	Capture, CorrelationTable, FieldOffsets, Kernel, KernelPtr, Record, RecordSlot, RingTransport, TASK_COMM_LEN,
};

use crate::{EVENTS, RELOCATIONS, SYSCALL_ENTRY_TIMES};

/// Used until user space has written the relocation table.
static UNRESOLVED: FieldOffsets = FieldOffsets::unresolved();

pub type BpfCapture = Capture<'static, BpfKernel, BpfCorrelation, BpfRing>;

static KERNEL: BpfKernel = BpfKernel;
static TABLE: BpfCorrelation = BpfCorrelation;
static RING: BpfRing = BpfRing;

pub fn capture() -> BpfCapture {
	let offsets = RELOCATIONS.get(0).unwrap_or(&UNRESOLVED);
	Capture::new(&KERNEL, &TABLE, &RING, offsets)
}

// region:    --- Kernel

pub struct BpfKernel;

impl Kernel for BpfKernel {
	#[inline(always)]
	fn pid_tgid(&self) -> u64 {
		bpf_get_current_pid_tgid()
	}

	#[inline(always)]
	fn uid_gid(&self) -> u64 {
		bpf_get_current_uid_gid()
	}

	#[inline(always)]
	fn comm(&self) -> [u8; TASK_COMM_LEN] {
		bpf_get_current_comm().unwrap_or([0u8; TASK_COMM_LEN])
	}

	#[inline(always)]
	fn ktime_ns(&self) -> u64 {
		unsafe { bpf_ktime_get_ns() }
	}

	#[inline(always)]
	fn current_task(&self) -> KernelPtr {
		KernelPtr(unsafe { bpf_get_current_task() })
	}

	#[inline(always)]
	fn read<T: zerocopy::FromBytes>(&self, ptr: KernelPtr) -> Option<T> {
		if ptr.is_null() {
			return None;
		}
		unsafe { bpf_probe_read_kernel(ptr.0 as *const T).ok() }
	}

	#[inline(always)]
	fn read_str(&self, ptr: KernelPtr, dst: &mut [u8]) -> Option<usize> {
		if ptr.is_null() {
			return None;
		}
		unsafe { bpf_probe_read_kernel_str_bytes(ptr.0 as *const u8, dst).ok().map(|s| s.len()) }
	}
}

// endregion: --- Kernel

// region:    --- Correlation

pub struct BpfCorrelation;

impl CorrelationTable for BpfCorrelation {
	#[inline(always)]
	fn insert(&self, pid_tgid: u64, enter_ns: u64) -> bool {
		SYSCALL_ENTRY_TIMES.insert(&pid_tgid, &enter_ns, 0).is_ok()
	}

	#[inline(always)]
	fn lookup(&self, pid_tgid: u64) -> Option<u64> {
		unsafe { SYSCALL_ENTRY_TIMES.get(&pid_tgid).copied() }
	}

	#[inline(always)]
	fn delete(&self, pid_tgid: u64) {
		let _ = SYSCALL_ENTRY_TIMES.remove(&pid_tgid);
	}
}

// endregion: --- Correlation

// region:    --- Ring

pub struct BpfRing;

pub struct KernelSlot<T: 'static> {
	entry: RingBufEntry<T>,
}

impl RingTransport for BpfRing {
	type Slot<'a, T: Record>
		= KernelSlot<T>
	where
		Self: 'a;

	#[inline(always)]
	fn reserve<T: Record>(&self) -> Option<KernelSlot<T>> {
		let mut entry = EVENTS.reserve::<T>(0)?;
		// ring memory is not zeroed by the kernel
		unsafe { core::ptr::write_bytes(entry.as_mut_ptr(), 0, 1) };
		Some(KernelSlot { entry })
	}
}

impl<T: Record> RecordSlot<T> for KernelSlot<T> {
	#[inline(always)]
	fn record_mut(&mut self) -> &mut T {
		// zero-filled at reserve and every Record accepts all-zero bytes
		unsafe { self.entry.assume_init_mut() }
	}

	#[inline(always)]
	fn submit(self) {
		self.entry.submit(0);
	}

	#[inline(always)]
	fn discard(self) {
		self.entry.discard(0);
	}
}

// endregion: --- Ring
