use std::{
	os::fd::AsRawFd,
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
};

use aya::maps::{MapData, RingBuf};
use observer_common::EbpfEvent;
use tokio::io::unix::AsyncFd;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
	error::{Error, Result},
	trx::Tx,
};

/// Pollable ring of raw records.
pub trait RecordSource: AsRawFd {
	/// Hands every pending record to `f`, oldest first.
	fn drain_records(&mut self, f: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()>;
}

impl RecordSource for RingBuf<MapData> {
	fn drain_records(&mut self, f: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()> {
		while let Some(item) = self.next() {
			let data: &[u8] = &item;
			f(data)?;
		}
		Ok(())
	}
}

pub struct RingBufWorker<R: RecordSource = RingBuf<MapData>> {
	pub ringbuf_fd: AsyncFd<R>,
	pub tx: Tx<EbpfEvent>,
	received: Arc<AtomicU64>,
	shutdown: CancellationToken,
}

impl<R: RecordSource> RingBufWorker<R> {
	pub fn start(
		ringbuf_fd: AsyncFd<R>,
		tx: Tx<EbpfEvent>,
		received: Arc<AtomicU64>,
		shutdown: CancellationToken,
	) -> Result<Self> {
		Ok(RingBufWorker {
			ringbuf_fd,
			tx,
			received,
			shutdown,
		})
	}

	pub async fn run(mut self) -> Result<()> {
		loop {
			let mut guard = tokio::select! {
				_ = self.shutdown.cancelled() => break,
				guard = self.ringbuf_fd.readable_mut() => guard?,
			};

			forward(guard.get_inner_mut(), &self.tx, &self.received)?;
			guard.clear_ready();
		}

		// records submitted before the last detach
		forward(self.ringbuf_fd.get_mut(), &self.tx, &self.received)?;

		info!("{} worker stopped", self.tx.name());
		Ok(())
	}
}

fn forward<R: RecordSource>(ring: &mut R, tx: &Tx<EbpfEvent>, received: &AtomicU64) -> Result<()> {
	ring.drain_records(&mut |data: &[u8]| {
		match EbpfEvent::parse(data) {
			Ok(evt) => {
				received.fetch_add(1, Ordering::Relaxed);
				tx.send_sync(evt)?;
			}
			Err(err) => debug!("skipping ring record: {}", Error::from(err)),
		}
		Ok(())
	})
}

// region:    --- Tests


// endregion: --- Tests
