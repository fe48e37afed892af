//! sched_yield(2) latency and energy benchmark.

use syslat::driver;
use syslat::payloads::calls;

fn main() -> anyhow::Result<()> {
    driver::run_all(calls::sched_yield())?;
    Ok(())
}
