//! mprotect(2) benchmark on a shared 1 MiB region.

use syslat::driver;
use syslat::payloads::mprotect;

fn main() -> anyhow::Result<()> {
    driver::run_all_with(|_threads| mprotect::toggle())?;
    Ok(())
}
