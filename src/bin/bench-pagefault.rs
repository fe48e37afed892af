//! Minor page-fault benchmark: one 4 KiB fault per operation.

use syslat::driver;
use syslat::payloads::pagefault;

fn main() -> anyhow::Result<()> {
    driver::run_all(pagefault::small_pages())?;
    Ok(())
}
