//! Fixed-capacity, nul-padded byte strings.
//!
//! Every string field in a record has a declared capacity `N`. Content is
//! truncated to `N - 1` bytes so that a terminator always fits; the rest of
//! the field stays zero.

/// Builds a nul-padded field at compile time.
pub const fn padded<const N: usize>(src: &[u8]) -> [u8; N] {
	let mut out = [0u8; N];
	if N == 0 {
		return out;
	}
	let len = if src.len() < N - 1 { src.len() } else { N - 1 };
	let mut i = 0;
	while i < len {
		out[i] = src[i];
		i += 1;
	}
	out
}

/// Copies `src` into `dst` with the same truncation rule as [`padded`].
///
/// Returns the number of content bytes written, terminator excluded.
pub fn copy_str(dst: &mut [u8], src: &[u8]) -> usize {
	let Some(cap) = dst.len().checked_sub(1) else {
		return 0;
	};
	let content = match src.iter().position(|&b| b == 0) {
		Some(end) => &src[..end],
		None => src,
	};
	let len = content.len().min(cap);
	dst[..len].copy_from_slice(&content[..len]);
	dst[len..].fill(0);
	len
}

/// Content of a nul-padded field, up to the first terminator.
pub fn trim_nul(field: &[u8]) -> &[u8] {
	match field.iter().position(|&b| b == 0) {
		Some(end) => &field[..end],
		None => field,
	}
}

// region:    --- Tests


// endregion: --- Tests
