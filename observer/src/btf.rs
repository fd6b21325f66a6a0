//! Minimal reader for kernel BTF.
//!
//! Only what relocation needs: composite types (struct/union), their members
//! and the alias chain (typedef, const, volatile, ...) between them. Every
//! other kind is skipped by size.

use std::path::Path;

use zerocopy::FromBytes as _;
use zerocopy_derive::{FromBytes, Immutable, KnownLayout};

use crate::{Error, Result};

pub const VMLINUX_BTF: &str = "/sys/kernel/btf/vmlinux";

const BTF_MAGIC: u16 = 0xeb9f;

const KIND_INT: u32 = 1;
const KIND_PTR: u32 = 2;
const KIND_ARRAY: u32 = 3;
const KIND_STRUCT: u32 = 4;
const KIND_UNION: u32 = 5;
const KIND_ENUM: u32 = 6;
const KIND_FWD: u32 = 7;
const KIND_TYPEDEF: u32 = 8;
const KIND_VOLATILE: u32 = 9;
const KIND_CONST: u32 = 10;
const KIND_RESTRICT: u32 = 11;
const KIND_FUNC: u32 = 12;
const KIND_FUNC_PROTO: u32 = 13;
const KIND_VAR: u32 = 14;
const KIND_DATASEC: u32 = 15;
const KIND_FLOAT: u32 = 16;
const KIND_DECL_TAG: u32 = 17;
const KIND_TYPE_TAG: u32 = 18;
const KIND_ENUM64: u32 = 19;

/// Bounds alias chains and anonymous member nesting.
const MAX_DEPTH: u8 = 16;

#[repr(C)]
#[derive(Debug, FromBytes, Immutable, KnownLayout)]
struct Header {
	magic: u16,
	version: u8,
	flags: u8,
	hdr_len: u32,
	type_off: u32, // relative to the end of the header
	type_len: u32,
	str_off: u32, // relative to the end of the header
	str_len: u32,
}

#[repr(C)]
#[derive(Debug, FromBytes, Immutable, KnownLayout)]
struct RawType {
	name_off: u32,
	info: u32, // vlen: 0..16 | kind: 24..29 | kind_flag: 31
	size_or_type: u32,
}

#[repr(C)]
#[derive(Debug, FromBytes, Immutable, KnownLayout)]
struct RawMember {
	name_off: u32,
	ty: u32,
	offset: u32, // bits; with kind_flag: bitfield_size << 24 | bit_offset
}

#[derive(Debug)]
struct Member {
	name_off: u32,
	ty: u32,
	bit_offset: u32,
}

#[derive(Debug)]
enum BtfType {
	Composite { name_off: u32, members: Vec<Member> },
	Alias { target: u32 },
	Other,
}

pub struct Btf {
	types: Vec<BtfType>, // index = type id, 0 is void
	strings: Vec<u8>,
}

impl Btf {
	pub fn from_file(path: &Path) -> Result<Self> {
		let data = std::fs::read(path)?;
		Self::parse(&data)
	}

	pub fn parse(data: &[u8]) -> Result<Self> {
		let (header, _) = Header::read_from_prefix(data).map_err(|_| truncated("header"))?;
		if header.magic != BTF_MAGIC {
			return Err(Error::BtfBadMagic(header.magic));
		}

		let body = data.get(header.hdr_len as usize..).ok_or(truncated("header"))?;
		let type_data = section(body, header.type_off, header.type_len, "types")?;
		let strings = section(body, header.str_off, header.str_len, "strings")?.to_vec();

		let mut types = vec![BtfType::Other];
		let mut rest = type_data;
		while !rest.is_empty() {
			let (raw, tail) = RawType::read_from_prefix(rest).map_err(|_| truncated("types"))?;
			let kind = (raw.info >> 24) & 0x1f;
			let vlen = (raw.info & 0xffff) as usize;
			let kind_flag = raw.info >> 31 == 1;

			let extra = match kind {
				KIND_PTR | KIND_FWD | KIND_TYPEDEF | KIND_VOLATILE | KIND_CONST | KIND_RESTRICT | KIND_FUNC
				| KIND_FLOAT | KIND_TYPE_TAG => 0,
				KIND_INT | KIND_VAR | KIND_DECL_TAG => 4,
				KIND_ARRAY => 12,
				KIND_ENUM | KIND_FUNC_PROTO => vlen * 8,
				KIND_STRUCT | KIND_UNION | KIND_DATASEC | KIND_ENUM64 => vlen * 12,
				other => return Err(Error::BtfUnknownKind(other)),
			};
			let trailing = tail.get(..extra).ok_or(truncated("types"))?;

			let ty = match kind {
				KIND_STRUCT | KIND_UNION => BtfType::Composite {
					name_off: raw.name_off,
					members: parse_members(trailing, kind_flag)?,
				},
				KIND_TYPEDEF | KIND_VOLATILE | KIND_CONST | KIND_RESTRICT | KIND_TYPE_TAG => BtfType::Alias {
					target: raw.size_or_type,
				},
				_ => BtfType::Other,
			};
			types.push(ty);
			rest = &tail[extra..];
		}

		Ok(Self { types, strings })
	}

	pub fn type_count(&self) -> usize {
		self.types.len() - 1
	}

	/// Byte offset of `path` inside the struct named `struct_name`.
	///
	/// Each path element names a member of the previous one's type; anonymous
	/// struct/union members are searched transparently. `None` when a name is
	/// missing or the member does not start on a byte boundary.
	pub fn field_offset(&self, struct_name: &str, path: &[&str]) -> Option<u32> {
		let mut id = self.find_composite(struct_name)?;
		let mut bits = 0u32;
		for name in path {
			let (offset, ty) = self.member(id, name, 0)?;
			bits = bits.checked_add(offset)?;
			id = ty;
		}

		if bits % 8 != 0 {
			return None;
		}
		Some(bits / 8)
	}

	fn find_composite(&self, name: &str) -> Option<u32> {
		self.types
			.iter()
			.position(|ty| matches!(ty, BtfType::Composite { name_off, .. } if self.name(*name_off) == name))
			.map(|idx| idx as u32)
	}

	/// (bit offset, type id) of `name` inside composite `id`.
	fn member(&self, id: u32, name: &str, depth: u8) -> Option<(u32, u32)> {
		let BtfType::Composite { members, .. } = self.resolve(id)? else {
			return None;
		};

		for member in members {
			let member_name = self.name(member.name_off);
			if member_name == name {
				return Some((member.bit_offset, member.ty));
			}
			if member_name.is_empty() && depth < MAX_DEPTH {
				if let Some((inner, ty)) = self.member(member.ty, name, depth + 1) {
					return Some((member.bit_offset + inner, ty));
				}
			}
		}
		None
	}

	fn resolve(&self, mut id: u32) -> Option<&BtfType> {
		for _ in 0..MAX_DEPTH {
			match self.types.get(id as usize)? {
				BtfType::Alias { target } => id = *target,
				ty => return Some(ty),
			}
		}
		None
	}

	fn name(&self, offset: u32) -> &str {
		let Some(tail) = self.strings.get(offset as usize..) else {
			return "";
		};
		let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
		std::str::from_utf8(&tail[..end]).unwrap_or("")
	}
}

fn parse_members(mut data: &[u8], kind_flag: bool) -> Result<Vec<Member>> {
	let mut members = Vec::with_capacity(data.len() / 12);
	while !data.is_empty() {
		let (raw, tail) = RawMember::read_from_prefix(data).map_err(|_| truncated("members"))?;
		let bit_offset = if kind_flag { raw.offset & 0x00ff_ffff } else { raw.offset };
		members.push(Member {
			name_off: raw.name_off,
			ty: raw.ty,
			bit_offset,
		});
		data = tail;
	}
	Ok(members)
}

fn section<'a>(body: &'a [u8], off: u32, len: u32, name: &'static str) -> Result<&'a [u8]> {
	let start = off as usize;
	let end = start.checked_add(len as usize).ok_or(truncated(name))?;
	body.get(start..end).ok_or(truncated(name))
}

fn truncated(section: &'static str) -> Error {
	Error::BtfTruncated { section }
}

// region:    --- Fixtures


// endregion: --- Fixtures

// region:    --- Tests


// endregion: --- Tests
