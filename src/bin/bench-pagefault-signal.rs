//! Fault-delivery latency benchmark: a PROT_NONE read recovered by a
//! SIGSEGV handler that timestamps from signal context.

#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
fn main() -> anyhow::Result<()> {
    use syslat::payloads::pagefault_signal::PagefaultSignal;

    syslat::driver::run_all_with(|_threads| PagefaultSignal::new())?;
    Ok(())
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn main() {
    eprintln!("error: the faulting-load fixup is only implemented for x86_64 and aarch64");
    std::process::exit(1);
}
