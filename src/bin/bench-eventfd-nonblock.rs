//! eventfd one-way wakeup benchmark (busy-polling co-runners).

use syslat::driver;
use syslat::payloads::eventfd::EventFdWakeup;

fn main() -> anyhow::Result<()> {
    driver::run_all_with(EventFdWakeup::nonblocking)?;
    Ok(())
}
