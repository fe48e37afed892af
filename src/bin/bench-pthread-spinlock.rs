//! pthread_spinlock lock/unlock benchmark.

use syslat::driver;
use syslat::payloads::locks;

fn main() -> anyhow::Result<()> {
    driver::run_all_with(|_threads| locks::spinlock())?;
    Ok(())
}
