//! pthread_rwlock read-lock/unlock benchmark.

use syslat::driver;
use syslat::payloads::locks;

fn main() -> anyhow::Result<()> {
    driver::run_all_with(|_threads| locks::rwlock_read())?;
    Ok(())
}
