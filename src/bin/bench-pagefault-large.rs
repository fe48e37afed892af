//! Hugetlb page-fault benchmark: one 2 MiB fault per operation.
//!
//! Needs a configured hugepage pool (vm.nr_hugepages).

use syslat::driver;
use syslat::payloads::pagefault;

fn main() -> anyhow::Result<()> {
    driver::run_all(pagefault::huge_pages())?;
    Ok(())
}
