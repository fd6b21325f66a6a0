//! Load-time relocation table for kernel structure fields.
//!
//! The kernel program is compiled once but runs on kernels whose internal
//! structures differ in layout. User space resolves each [`KernelField`]
//! against the running kernel's BTF and stores the byte offsets in a one-slot
//! array map; the kernel side looks fields up by index on every invocation.

use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const FIELD_COUNT: usize = 12;

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KernelField {
	/// `task_struct.tgid` (i32)
	TaskTgid = 0,
	/// `task_struct.real_parent` (pointer)
	TaskRealParent = 1,
	/// `task_struct.cgroups` (pointer to `css_set`)
	TaskCgroups = 2,
	/// `task_struct.exit_code` (i32)
	TaskExitCode = 3,
	/// `css_set.dfl_cgrp` (pointer to `cgroup`)
	CssSetDflCgrp = 4,
	/// `cgroup.kn` (pointer to `kernfs_node`)
	CgroupKn = 5,
	/// `kernfs_node.id` (u64)
	KernfsNodeId = 6,
	/// `sock.__sk_common.skc_rcv_saddr` (be32)
	SockRcvSaddr = 7,
	/// `sock.__sk_common.skc_daddr` (be32)
	SockDaddr = 8,
	/// `sock.__sk_common.skc_num` (u16, host order)
	SockNum = 9,
	/// `sock.__sk_common.skc_dport` (be16)
	SockDport = 10,
	/// `pt_regs.orig_ax` (u64), the x86_64 syscall number
	PtRegsSyscallNr = 11,
}

impl KernelField {
	pub const ALL: [KernelField; FIELD_COUNT] = [
		Self::TaskTgid,
		Self::TaskRealParent,
		Self::TaskCgroups,
		Self::TaskExitCode,
		Self::CssSetDflCgrp,
		Self::CgroupKn,
		Self::KernfsNodeId,
		Self::SockRcvSaddr,
		Self::SockDaddr,
		Self::SockNum,
		Self::SockDport,
		Self::PtRegsSyscallNr,
	];

	pub const fn index(self) -> usize {
		self as usize
	}

	/// Candidate BTF paths, tried in order: the owning struct and the member
	/// chain below it. Anonymous struct/union members are walked implicitly.
	pub const fn btf_paths(self) -> &'static [(&'static str, &'static [&'static str])] {
		match self {
			Self::TaskTgid => &[("task_struct", &["tgid"])],
			Self::TaskRealParent => &[("task_struct", &["real_parent"])],
			Self::TaskCgroups => &[("task_struct", &["cgroups"])],
			Self::TaskExitCode => &[("task_struct", &["exit_code"])],
			Self::CssSetDflCgrp => &[("css_set", &["dfl_cgrp"])],
			Self::CgroupKn => &[("cgroup", &["kn"])],
			Self::KernfsNodeId => &[("kernfs_node", &["id"])],
			Self::SockRcvSaddr => &[("sock", &["__sk_common", "skc_rcv_saddr"])],
			Self::SockDaddr => &[("sock", &["__sk_common", "skc_daddr"])],
			Self::SockNum => &[("sock", &["__sk_common", "skc_num"])],
			Self::SockDport => &[("sock", &["__sk_common", "skc_dport"])],
			Self::PtRegsSyscallNr => &[("pt_regs", &["orig_ax"])],
		}
	}
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct FieldOffsets {
	offsets: [u32; FIELD_COUNT],
	resolved: u32, // bit per KernelField
}

impl FieldOffsets {
	/// A table with nothing resolved. Every read through it yields `None`.
	pub const fn unresolved() -> Self {
		Self {
			offsets: [0; FIELD_COUNT],
			resolved: 0,
		}
	}

	pub fn set(&mut self, field: KernelField, offset: u32) {
		self.offsets[field.index()] = offset;
		self.resolved |= 1 << field.index();
	}

	#[inline(always)]
	pub fn get(&self, field: KernelField) -> Option<u32> {
		if self.is_resolved(field) {
			Some(self.offsets[field.index()])
		} else {
			None
		}
	}

	#[inline(always)]
	pub fn is_resolved(&self, field: KernelField) -> bool {
		self.resolved & (1 << field.index()) != 0
	}

	pub fn resolved_count(&self) -> u32 {
		self.resolved.count_ones()
	}
}

impl Default for FieldOffsets {
	fn default() -> Self {
		Self::unresolved()
	}
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for FieldOffsets {}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;

	#[test]
	fn unresolved_table_yields_nothing() -> Result<()> {
		// -- Setup & Fixtures
		let table = FieldOffsets::unresolved();

		// -- Check
		for field in KernelField::ALL {
			assert_eq!(table.get(field), None);
		}
		assert_eq!(table.resolved_count(), 0);

		Ok(())
	}

	#[test]
	fn zero_offset_is_a_valid_resolution() -> Result<()> {
		// -- Setup & Fixtures
		let mut table = FieldOffsets::unresolved();

		// -- Exec
		table.set(KernelField::SockDaddr, 0);

		// -- Check
		assert_eq!(table.get(KernelField::SockDaddr), Some(0));
		assert_eq!(table.get(KernelField::SockRcvSaddr), None);
		assert_eq!(table.resolved_count(), 1);

		Ok(())
	}

	#[test]
	fn all_fields_are_indexed_in_order() -> Result<()> {
		// -- Check
		for (idx, field) in KernelField::ALL.iter().enumerate() {
			assert_eq!(field.index(), idx);
			assert!(!field.btf_paths().is_empty());
		}

		Ok(())
	}
}

// endregion: --- Tests
