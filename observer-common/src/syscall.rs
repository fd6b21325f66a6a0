use crate::event::SYSCALL_NAME_LEN;
use crate::fixed::padded;

type SyscallName = [u8; SYSCALL_NAME_LEN];

const READ: SyscallName = padded(b"read");
const WRITE: SyscallName = padded(b"write");
const OPEN: SyscallName = padded(b"open");
const CLOSE: SyscallName = padded(b"close");
const CONNECT: SyscallName = padded(b"connect");
const ACCEPT: SyscallName = padded(b"accept");
const UNKNOWN: SyscallName = padded(b"unknown");

/// Label for a syscall number (x86_64 numbering). Only a short allow-list is
/// named; everything else is `unknown`.
#[inline(always)]
pub fn syscall_name(id: u64) -> SyscallName {
	match id {
		0 => READ,
		1 => WRITE,
		2 => OPEN,
		3 => CLOSE,
		42 => CONNECT,
		43 => ACCEPT,
		_ => UNKNOWN,
	}
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use crate::fixed::trim_nul;

	#[test]
	fn names_allow_listed_syscalls() -> Result<()> {
		// -- Check
		assert_eq!(trim_nul(&syscall_name(0)), b"read");
		assert_eq!(trim_nul(&syscall_name(42)), b"connect");
		assert_eq!(trim_nul(&syscall_name(43)), b"accept");

		Ok(())
	}

	#[test]
	fn other_numbers_are_unknown() -> Result<()> {
		// -- Check
		assert_eq!(trim_nul(&syscall_name(59)), b"unknown");
		assert_eq!(trim_nul(&syscall_name(u64::MAX)), b"unknown");

		Ok(())
	}
}

// endregion: --- Tests
