//! Extended-attribute presence probe.

use std::path::Path;

/// Answers whether an entry carries any extended attributes.
pub trait XattrProbe {
    fn has_any(&self, path: &Path) -> bool;
}

/// Queries the attribute name list size without traversing symlinks.
///
/// Errors (unsupported filesystem, permission denied) count as "no
/// attributes"; the flag is advisory UI state, never worth failing a scan.
#[derive(Debug, Default)]
pub struct SystemXattrProbe;

#[cfg(target_os = "linux")]
impl XattrProbe for SystemXattrProbe {
    fn has_any(&self, path: &Path) -> bool {
        use std::os::unix::ffi::OsStrExt;

        let Ok(c_path) = std::ffi::CString::new(path.as_os_str().as_bytes()) else {
            return false;
        };
        // SAFETY: a size query; the NULL buffer is never written through.
        let len = unsafe { libc::llistxattr(c_path.as_ptr(), std::ptr::null_mut(), 0) };
        len > 0
    }
}

#[cfg(not(target_os = "linux"))]
impl XattrProbe for SystemXattrProbe {
    fn has_any(&self, _path: &Path) -> bool {
        false
    }
}
