use aya_ebpf::programs::ProbeContext;
use observer_common::KernelPtr;

use crate::kernel::capture;

pub fn try_tcp_connect(ctx: ProbeContext) -> Result<u32, u32> {
	let sk: u64 = ctx.arg(0).ok_or(0u32)?;

	capture().tcp_connect(KernelPtr(sk));

	Ok(0)
}
