//! mmap/munmap cycle benchmark with MAP_POPULATE (2 MiB region).

use syslat::driver;
use syslat::payloads::mmap;

fn main() -> anyhow::Result<()> {
    driver::run_all(mmap::map_populate_unmap())?;
    Ok(())
}
