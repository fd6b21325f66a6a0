use observer_common::EbpfEvent;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{error::Result, event::ObserverEvent, trx::Rx};

/// Writes every event as one JSON line.
pub struct SinkWorker<W> {
	rx: Rx<EbpfEvent>,
	out: W,
	verbose: bool,
	shutdown: CancellationToken,
}

impl<W> SinkWorker<W>
where
	W: AsyncWrite + Unpin,
{
	pub fn start(rx: Rx<EbpfEvent>, out: W, verbose: bool, shutdown: CancellationToken) -> Self {
		SinkWorker {
			rx,
			out,
			verbose,
			shutdown,
		}
	}

	pub async fn run(mut self) -> Result<()> {
		loop {
			tokio::select! {
				_ = self.shutdown.cancelled() => break,
				evt = self.rx.recv() => match evt {
					Ok(evt) => self.emit(evt).await?,
					// every sender is gone
					Err(_) => break,
				},
			}
		}

		for evt in self.rx.drain() {
			self.emit(evt).await?;
		}
		self.out.flush().await?;

		info!("{} sink stopped", self.rx.name());
		Ok(())
	}

	async fn emit(&mut self, evt: EbpfEvent) -> Result<()> {
		let evt = ObserverEvent::from(evt);
		if self.verbose {
			info!("{}", evt.summary());
		}

		let mut line = serde_json::to_vec(&evt)?;
		line.push(b'\n');
		self.out.write_all(&line).await?;
		Ok(())
	}
}

// region:    --- Tests


// endregion: --- Tests
