use aya_ebpf::{programs::TracePointContext, EbpfContext};
use observer_common::KernelPtr;

use crate::kernel::capture;

/// `__data_loc char[] filename` in the sched_process_exec record.
const EXEC_FILENAME_LOC_OFFSET: usize = 8;

pub fn try_sched_process_exec(ctx: TracePointContext) -> Result<u32, u32> {
	// low 16 bits: offset of the string from the start of the record
	let data_loc: u32 = unsafe { ctx.read_at(EXEC_FILENAME_LOC_OFFSET) }.unwrap_or(0);
	let filename = match data_loc & 0xFFFF {
		0 => KernelPtr::NULL,
		off => KernelPtr(ctx.as_ptr() as u64 + off as u64),
	};

	capture().process_exec(filename);

	Ok(0)
}

pub fn try_sched_process_exit(_ctx: TracePointContext) -> Result<u32, u32> {
	capture().process_exit();

	Ok(0)
}
