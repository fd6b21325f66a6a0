use std::future::Future;

use tokio::{
	signal::unix::{signal, SignalKind},
	task::JoinSet,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::Result;

pub struct Supervisor {
	pub shutdown: CancellationToken,
	pub tasks: JoinSet<Result<()>>,
}

impl Supervisor {
	pub fn new() -> Self {
		Self {
			shutdown: CancellationToken::new(),
			tasks: JoinSet::new(),
		}
	}

	pub fn token(&self) -> CancellationToken {
		self.shutdown.clone()
	}

	pub fn spawn<F>(&mut self, fut: F)
	where
		F: Future<Output = Result<()>> + Send + 'static,
	{
		self.tasks.spawn(fut);
	}

	pub async fn shutdown(mut self) -> Result<()> {
		info!("Supervisor shutdown starting");
		self.shutdown.cancel();

		while let Some(res) = self.tasks.join_next().await {
			res??;
		}
		info!("Supervisor shutdown complete");

		Ok(())
	}
}

/// Cancels `token` on SIGINT or SIGTERM.
pub fn install_signal_handlers(token: CancellationToken) -> Result<()> {
	let mut sigint = signal(SignalKind::interrupt())?;
	let mut sigterm = signal(SignalKind::terminate())?;

	tokio::spawn(async move {
		tokio::select! {
			_ = sigint.recv() => info!("SIGINT received"),
			_ = sigterm.recv() => info!("SIGTERM received"),
			_ = token.cancelled() => return,
		}
		token.cancel();
	});

	Ok(())
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;

	#[tokio::test]
	async fn shutdown_cancels_and_joins_tasks() -> Result<()> {
		// -- Setup & Fixtures
		let mut supervisor = Supervisor::new();
		let token = supervisor.token();
		supervisor.spawn(async move {
			token.cancelled().await;
			Ok(())
		});

		// -- Exec
		supervisor.shutdown().await?;

		Ok(())
	}

	#[tokio::test]
	async fn shutdown_surfaces_task_errors() -> Result<()> {
		// -- Setup & Fixtures
		let mut supervisor = Supervisor::new();
		supervisor.spawn(async { Err(crate::Error::custom("worker failed")) });

		// -- Exec
		let res = supervisor.shutdown().await;

		// -- Check
		assert!(res.is_err());

		Ok(())
	}
}

// endregion: --- Tests
