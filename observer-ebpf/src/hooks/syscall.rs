use aya_ebpf::{programs::RawTracePointContext, EbpfContext};
use observer_common::KernelPtr;

use crate::kernel::capture;

pub fn try_sys_enter(_ctx: RawTracePointContext) -> Result<i32, i32> {
	capture().syscall_enter();

	Ok(0)
}

pub fn try_sys_exit(ctx: RawTracePointContext) -> Result<i32, i32> {
	// args[0] is the task's pt_regs, args[1] the return value
	let regs = unsafe { *(ctx.as_ptr() as *const u64) };

	capture().syscall_exit(KernelPtr(regs));

	Ok(0)
}
