#![cfg_attr(not(any(test, feature = "user")), no_std)]

pub mod capture;
pub mod correlation;
pub mod event;
pub mod fixed;
pub mod kernel;
pub mod relocation;
pub mod sampling;
pub mod syscall;
pub mod transport;

#[cfg(test)]
mod harness;

pub use capture::{Capture, Outcome};
pub use correlation::{CorrelationTable, CORRELATION_MAX_ENTRIES};
pub use event::{
	EbpfEvent, EventHeader, EventKind, ExecEvent, ExitEvent, Record, SyscallEvent, TcpConnectEvent, FILENAME_LEN,
	SYSCALL_NAME_LEN, TASK_COMM_LEN,
};
pub use kernel::{Kernel, KernelPtr, RegsReader, SockReader, TaskReader};
pub use relocation::{FieldOffsets, KernelField, FIELD_COUNT};
pub use transport::{RecordSlot, RingTransport, RING_BYTE_SIZE};
