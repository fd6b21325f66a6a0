/// Capacity of the entry/exit table. Older entries are evicted under pressure.
pub const CORRELATION_MAX_ENTRIES: u32 = 10240;

/// Bounded side table pairing a syscall's entry with its exit.
///
/// Keys are `pid_tgid`, values the entry timestamp. Every operation is
/// best-effort: an insert may be refused or evict another entry, and a
/// missing key is a normal outcome.
pub trait CorrelationTable {
	/// Upserts. `false` when the table refused the entry.
	fn insert(&self, pid_tgid: u64, enter_ns: u64) -> bool;

	fn lookup(&self, pid_tgid: u64) -> Option<u64>;

	fn delete(&self, pid_tgid: u64);
}
