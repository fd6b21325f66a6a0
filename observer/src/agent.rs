use std::{
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
	time::Duration,
};

use aya::Ebpf;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{config::Config, hooks::Hooks, Result};

/// Capture window followed by an idle window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyCycle {
	pub on: Duration,
	pub off: Duration,
}

impl From<&Config> for DutyCycle {
	fn from(config: &Config) -> Self {
		Self {
			on: config.sampling_on,
			off: config.sampling_off,
		}
	}
}

/// Attaches for `on`, detaches for `off`, until `shutdown` fires.
/// Programs are detached before returning, also on cancellation.
pub async fn run_agent(
	ebpf: &mut Ebpf,
	hooks: &mut Hooks,
	cycle: DutyCycle,
	received: Arc<AtomicU64>,
	shutdown: CancellationToken,
) -> Result<()> {
	info!(
		"sparse sampling: {} on / {} off",
		humantime::format_duration(cycle.on),
		humantime::format_duration(cycle.off)
	);

	let mut cycle_no: u64 = 0;
	loop {
		cycle_no += 1;
		let before = received.load(Ordering::Relaxed);

		hooks.attach(ebpf)?;
		info!("cycle {cycle_no}: capture started");
		let cancelled = sleep_or_cancel(cycle.on, &shutdown).await;
		hooks.detach(ebpf)?;

		let events = received.load(Ordering::Relaxed) - before;
		info!("cycle {cycle_no}: capture stopped, {events} events");

		if cancelled || sleep_or_cancel(cycle.off, &shutdown).await {
			break;
		}
	}

	Ok(())
}

/// `true` when cancelled before `duration` elapsed.
async fn sleep_or_cancel(duration: Duration, shutdown: &CancellationToken) -> bool {
	tokio::select! {
		_ = shutdown.cancelled() => true,
		_ = tokio::time::sleep(duration) => false,
	}
}

// region:    --- Tests


// endregion: --- Tests
