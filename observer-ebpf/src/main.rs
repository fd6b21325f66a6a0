#![no_std]
#![no_main]

use aya_ebpf::{
	macros::{kprobe, map, raw_tracepoint, tracepoint},
	maps::{Array, LruHashMap, RingBuf},
	programs::{ProbeContext, RawTracePointContext, TracePointContext},
};
use observer_common::{FieldOffsets, CORRELATION_MAX_ENTRIES, RING_BYTE_SIZE};

mod hooks;
mod kernel;

#[map]
static EVENTS: RingBuf = RingBuf::with_byte_size(RING_BYTE_SIZE, 0);

/// pid_tgid -> sys_enter timestamp
#[map]
static SYSCALL_ENTRY_TIMES: LruHashMap<u64, u64> = LruHashMap::with_max_entries(CORRELATION_MAX_ENTRIES, 0);

/// Slot 0 holds the field offsets resolved by user space before attach.
#[map]
static RELOCATIONS: Array<FieldOffsets> = Array::with_max_entries(1, 0);

#[tracepoint]
pub fn sched_process_exec(ctx: TracePointContext) -> u32 {
	match hooks::try_sched_process_exec(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[tracepoint]
pub fn sched_process_exit(ctx: TracePointContext) -> u32 {
	match hooks::try_sched_process_exit(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[raw_tracepoint(tracepoint = "sys_enter")]
pub fn sys_enter(ctx: RawTracePointContext) -> i32 {
	match hooks::try_sys_enter(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[raw_tracepoint(tracepoint = "sys_exit")]
pub fn sys_exit(ctx: RawTracePointContext) -> i32 {
	match hooks::try_sys_exit(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[kprobe]
pub fn tcp_connect(ctx: ProbeContext) -> u32 {
	match hooks::try_tcp_connect(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
	loop {}
}

#[link_section = "license"]
#[no_mangle]
static LICENSE: [u8; 13] = *b"Dual MIT/GPL\0";
