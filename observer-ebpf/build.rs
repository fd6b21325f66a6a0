use anyhow::{anyhow, Context as _};
use which::which;

/// Rebuild when bpf-linker changes, since aya-build does not track it.
fn main() -> anyhow::Result<()> {
	let bpf_linker = which("bpf-linker").context("bpf-linker not found in PATH")?;
	let bpf_linker = bpf_linker
		.to_str()
		.ok_or_else(|| anyhow!("bpf-linker path is not valid UTF-8"))?;
	println!("cargo:rerun-if-changed={bpf_linker}");
	Ok(())
}
