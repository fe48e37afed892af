//! `open(2)`/`close(2)` payload
//!
//! Opens and closes a pre-created scratch file. The tempfile is owned by
//! the action and removed when the benchmark finishes.

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;

use tempfile::NamedTempFile;

use crate::action::{Action, InterferingThreads};
use crate::error::{BenchError, Result};

pub struct OpenClose {
    // Keeps the file alive; removed on drop.
    _file: NamedTempFile,
    path: CString,
}

impl OpenClose {
    pub fn new() -> Result<OpenClose> {
        let file = NamedTempFile::new()?;
        let path = CString::new(file.path().as_os_str().as_bytes())
            .map_err(|e| BenchError::Io(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
        Ok(OpenClose { _file: file, path })
    }
}

impl Action for OpenClose {
    type State = ();

    fn name(&self) -> &'static str {
        "open"
    }

    fn make_state(&self, _threads: &InterferingThreads) -> Result<()> {
        Ok(())
    }

    fn raw_operation(&self, _state: &mut ()) -> Result<()> {
        let fd = unsafe { libc::open(self.path.as_ptr(), libc::O_RDWR) };
        if fd < 0 {
            return Err(BenchError::last_sys("open"));
        }
        if unsafe { libc::close(fd) } < 0 {
            return Err(BenchError::last_sys("close"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_close_roundtrip() {
        let action = OpenClose::new().unwrap();
        let mut state = action.make_state(&InterferingThreads::default()).unwrap();
        action.raw_operation(&mut state).unwrap();
        assert!(action.measured_operation(&mut state).unwrap() > 0);
    }

    #[test]
    fn test_scratch_file_removed_on_drop() {
        let path = {
            let action = OpenClose::new().unwrap();
            action._file.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
