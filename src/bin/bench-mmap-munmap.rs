//! mmap/munmap cycle benchmark (1 MiB anonymous region).

use syslat::driver;
use syslat::payloads::mmap;

fn main() -> anyhow::Result<()> {
    driver::run_all(mmap::map_unmap())?;
    Ok(())
}
