//! open(2)/close(2) benchmark against a scratch file.

use syslat::driver;
use syslat::payloads::open::OpenClose;

fn main() -> anyhow::Result<()> {
    driver::run_all_with(|_threads| OpenClose::new())?;
    Ok(())
}
