use std::path::Path;

use aya::{maps::Array, Ebpf};
use observer_common::{FieldOffsets, KernelField, FIELD_COUNT};
use tracing::{debug, info, warn};

use crate::{btf::Btf, Error, Result};

pub const RELOCATIONS_MAP: &str = "RELOCATIONS";

/// Resolves every kernel field against `btf`. Fields with no matching path
/// stay unresolved; the kernel side then reports zero for them.
pub fn resolve(btf: &Btf) -> FieldOffsets {
	let mut offsets = FieldOffsets::unresolved();

	for field in KernelField::ALL {
		let found = field
			.btf_paths()
			.iter()
			.find_map(|(strukt, path)| btf.field_offset(strukt, path).map(|off| (off, *strukt, *path)));

		match found {
			Some((off, strukt, path)) => {
				debug!("{field:?} -> {strukt}.{} @ {off:#x}", path.join("."));
				offsets.set(field, off);
			}
			None => debug!("{field:?} unresolved"),
		}
	}

	let resolved = offsets.resolved_count() as usize;
	if resolved < FIELD_COUNT {
		let missing: Vec<_> = KernelField::ALL.iter().filter(|f| !offsets.is_resolved(**f)).collect();
		warn!("{} kernel fields unresolved, they will read as zero: {missing:?}", FIELD_COUNT - resolved);
	}

	offsets
}

/// Loads BTF from `path` and resolves. An unreadable BTF is not fatal: the
/// table stays empty and events carry zeroed kernel fields.
pub fn resolve_from(path: &Path) -> FieldOffsets {
	match Btf::from_file(path) {
		Ok(btf) => {
			info!("loaded {} BTF types from {}", btf.type_count(), path.display());
			resolve(&btf)
		}
		Err(err) => {
			warn!("cannot read BTF from {}: {err}", path.display());
			FieldOffsets::unresolved()
		}
	}
}

/// Writes the table into slot 0. Must run before any program is attached.
pub fn install(ebpf: &mut Ebpf, offsets: &FieldOffsets) -> Result<()> {
	let map = ebpf.map_mut(RELOCATIONS_MAP).ok_or(Error::EbpfMapNotFound(RELOCATIONS_MAP))?;
	let mut table: Array<_, FieldOffsets> = Array::try_from(map)?;
	table.set(0, offsets, 0)?;
	Ok(())
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use crate::btf::fixtures::{arm64_regs, kernel_like};

	#[test]
	fn resolves_register_slot_and_task_fields() -> Result<()> {
		// -- Setup & Fixtures
		let btf = Btf::parse(&kernel_like())?;

		// -- Exec
		let offsets = resolve(&btf);

		// -- Check
		assert_eq!(offsets.get(KernelField::PtRegsSyscallNr), Some(120));
		assert_eq!(offsets.get(KernelField::TaskTgid), Some(0x10));
		assert_eq!(offsets.get(KernelField::TaskRealParent), Some(0x18));
		assert_eq!(offsets.get(KernelField::SockNum), Some(18));
		assert_eq!(offsets.get(KernelField::SockDport), Some(16));

		Ok(())
	}

	#[test]
	fn missing_structs_stay_unresolved() -> Result<()> {
		// -- Setup & Fixtures
		let btf = Btf::parse(&kernel_like())?;

		// -- Exec
		let offsets = resolve(&btf);

		// -- Check
		assert_eq!(offsets.get(KernelField::CssSetDflCgrp), None);
		assert_eq!(offsets.get(KernelField::KernfsNodeId), None);
		assert_eq!(offsets.get(KernelField::TaskExitCode), None);
		assert_eq!(offsets.resolved_count(), 7);

		Ok(())
	}

	#[test]
	fn narrow_arm64_syscallno_is_not_used() -> Result<()> {
		// -- Setup & Fixtures
		let btf = Btf::parse(&arm64_regs())?;

		// -- Exec
		let offsets = resolve(&btf);

		// -- Check
		assert_eq!(offsets.get(KernelField::PtRegsSyscallNr), None);
		assert_eq!(offsets.resolved_count(), 0);

		Ok(())
	}

	#[test]
	fn unreadable_btf_yields_empty_table() -> Result<()> {
		// -- Exec
		let offsets = resolve_from(Path::new("/nonexistent/btf/vmlinux"));

		// -- Check
		assert_eq!(offsets, FieldOffsets::unresolved());

		Ok(())
	}
}

// endregion: --- Tests
