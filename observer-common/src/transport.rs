use crate::event::Record;

/// Size of the kernel-to-user ring, bytes.
pub const RING_BYTE_SIZE: u32 = 256 * 1024;

/// Bounded, non-blocking record channel.
///
/// A slot is reserved for exactly one record and then either submitted or
/// discarded. Reservation fails when the ring is full; the caller drops the
/// event.
pub trait RingTransport {
	type Slot<'a, T: Record>: RecordSlot<T>
	where
		Self: 'a;

	fn reserve<T: Record>(&self) -> Option<Self::Slot<'_, T>>;
}

pub trait RecordSlot<T: Record> {
	/// The record under construction. Zero-filled at reservation.
	fn record_mut(&mut self) -> &mut T;

	fn submit(self);

	fn discard(self);
}

// region:    --- Tests


// endregion: --- Tests
