//! eventfd one-way wakeup benchmark (blocking co-runners).

use syslat::driver;
use syslat::payloads::eventfd::EventFdWakeup;

fn main() -> anyhow::Result<()> {
    driver::run_all_with(EventFdWakeup::blocking)?;
    Ok(())
}
