/// One syscall exit in `SAMPLE_MODULUS` is admitted.
pub const SAMPLE_MODULUS: u64 = 10;

/// Admission decision for the syscall-exit path, derived from the exit timestamp.
#[inline(always)]
pub fn admit(timestamp_ns: u64) -> bool {
	timestamp_ns % SAMPLE_MODULUS == 0
}

// region:    --- Tests


// endregion: --- Tests
