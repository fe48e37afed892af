//! Bare mmap(2) benchmark; the unmap happens outside the measured span.

use syslat::driver;
use syslat::payloads::mmap::MmapOnly;

fn main() -> anyhow::Result<()> {
    driver::run_all(MmapOnly::new())?;
    Ok(())
}
