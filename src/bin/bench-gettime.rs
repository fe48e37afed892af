//! clock_gettime(2) latency and energy benchmark.

use syslat::driver;
use syslat::payloads::calls;

fn main() -> anyhow::Result<()> {
    driver::run_all(calls::gettime())?;
    Ok(())
}
