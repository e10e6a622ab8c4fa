//! §9b — concrete byte sources for the reference binary. The transport
//! layer above only needs a `std::io::Read`; this module just resolves a
//! `TransportSource` config value into one, the same way the teacher's
//! bridge binary turns a `--port` flag into an open serial handle.

use std::fs::File;
use std::io::{self, Read};

use crate::config::TransportSource;

/// Boxed so `main` doesn't need a generic parameter over every possible
/// source variant.
pub fn open_source(source: &TransportSource) -> Result<Box<dyn Read + Send>, String> {
    match source {
        TransportSource::SerialPath(path) => {
            let file = File::open(path)
                .map_err(|e| format!("failed to open serial path {path:?}: {e}"))?;
            set_nonblocking(&file)
                .map_err(|e| format!("failed to set {path:?} non-blocking: {e}"))?;
            Ok(Box::new(file))
        }
        TransportSource::File(path) => File::open(path)
            .map(|f| Box::new(f) as Box<dyn Read + Send>)
            .map_err(|e| format!("failed to open replay file {path:?}: {e}")),
        TransportSource::Stdin => Ok(Box::new(io::stdin())),
    }
}

/// §5: "USB read is non-blocking; the parser polls and returns when no
/// bytes are available." A plain file handle standing in for the CDC
/// endpoint has to be put into non-blocking mode explicitly to get that
/// behavior; `read()` then returns `ErrorKind::WouldBlock` instead of
/// parking, which the main loop treats as "nothing to do this tick".
#[cfg(unix)]
fn set_nonblocking(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL, 0);
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_nonblocking(_file: &File) -> io::Result<()> {
    Ok(())
}
