//! pthread_kill(SIGUSR1) one-way wakeup benchmark.

use syslat::driver;
use syslat::payloads::pthread_kill::PthreadKillWakeup;

fn main() -> anyhow::Result<()> {
    driver::run_all_with(|threads| Ok(PthreadKillWakeup::new(threads)))?;
    Ok(())
}
