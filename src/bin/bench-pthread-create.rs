//! Thread creation benchmark; the child records the end timestamp.

use syslat::driver;
use syslat::payloads::thread_create::ThreadCreate;

fn main() -> anyhow::Result<()> {
    driver::run_all(ThreadCreate)?;
    Ok(())
}
