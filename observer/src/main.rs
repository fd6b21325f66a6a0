// region:    --- Modules
mod agent;
mod btf;
mod cli;
mod config;
mod error;
mod event;
mod hooks;
mod relocation;
mod supervisor;
mod trx;
mod workers;
// endregion: --- Modules

use std::{
	path::PathBuf,
	sync::{atomic::AtomicU64, Arc},
};

use crate::{
	agent::{run_agent, DutyCycle},
	cli::args::Cli,
	config::{Config, FileConfig},
	hooks::Hooks,
	supervisor::{install_signal_handlers, Supervisor},
	trx::new_channel,
	workers::{RingBufWorker, SinkWorker},
};

pub use self::error::{Error, Result};
use aya::{
	maps::{MapData, RingBuf},
	Ebpf,
};
use clap::Parser;
use observer_common::EbpfEvent;
use tokio::io::unix::AsyncFd;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const EVENTS_MAP: &str = "EVENTS";

#[tokio::main]
async fn main() -> Result<()> {
	let args = Cli::parse();
	let file_config = args.config.as_deref().map(FileConfig::load).transpose()?;
	let config = Config::resolve(file_config, &args);

	let default_level = if config.verbose { "debug" } else { "info" };
	tracing_subscriber::fmt()
		.with_target(false)
		.with_writer(std::io::stderr)
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
		.init();

	// Bump the memlock rlimit. This is needed for older kernels that don't use the
	// new memcg based accounting, see https://lwn.net/Articles/837122/
	let rlim = libc::rlimit {
		rlim_cur: libc::RLIM_INFINITY,
		rlim_max: libc::RLIM_INFINITY,
	};
	let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
	if ret != 0 {
		debug!("remove limit on locked memory failed, ret is: {ret}");
	}

	let mut ebpf = Ebpf::load(aya::include_bytes_aligned!(concat!(env!("OUT_DIR"), "/observer")))?;

	let btf_path = args.btf.clone().unwrap_or_else(|| PathBuf::from(btf::VMLINUX_BTF));
	let offsets = relocation::resolve_from(&btf_path);
	relocation::install(&mut ebpf, &offsets)?;

	let mut hooks = Hooks::load(&mut ebpf, &config.monitors)?;
	let ringbuf_fd = take_ringbuf(&mut ebpf)?;

	let (ringbuf_tx, ringbuf_rx) = new_channel::<EbpfEvent>("ringbuf");
	let received = Arc::new(AtomicU64::new(0));

	let mut supervisor = Supervisor::new();
	install_signal_handlers(supervisor.token())?;

	let ringbuf_worker = RingBufWorker::start(ringbuf_fd, ringbuf_tx, received.clone(), supervisor.token())?;
	let sink_worker = SinkWorker::start(ringbuf_rx, tokio::io::stdout(), config.verbose, supervisor.token());
	supervisor.spawn(ringbuf_worker.run());
	supervisor.spawn(sink_worker.run());

	let agent_res = run_agent(
		&mut ebpf,
		&mut hooks,
		DutyCycle::from(&config),
		received,
		supervisor.token(),
	)
	.await;

	if hooks.is_attached() {
		hooks.detach(&mut ebpf)?;
	}
	supervisor.shutdown().await?;
	info!("observer stopped");

	agent_res
}

fn take_ringbuf(ebpf: &mut Ebpf) -> Result<AsyncFd<RingBuf<MapData>>> {
	let map = ebpf.take_map(EVENTS_MAP).ok_or(Error::EbpfMapNotFound(EVENTS_MAP))?;
	let ring_buf = RingBuf::try_from(map)?;
	let fd = AsyncFd::new(ring_buf)?;
	Ok(fd)
}
