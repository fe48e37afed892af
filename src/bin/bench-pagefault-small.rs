//! First-touch fault benchmark on a fresh 4 KiB mapping per operation.

use syslat::driver;
use syslat::payloads::pagefault::PagefaultSmall;

fn main() -> anyhow::Result<()> {
    driver::run_all(PagefaultSmall)?;
    Ok(())
}
