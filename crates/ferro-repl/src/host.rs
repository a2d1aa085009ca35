//! Reference [`HostHooks`] implementation: a file-slurping loader with a
//! concrete module-resolution policy, kept deliberately out of the core.
//! `ferro-core`/`ferro-rt` never touch the filesystem; this is the one
//! place in the workspace that does.

use std::alloc::{self, Layout};
use std::fs;
use std::path::PathBuf;

use ferro_rt::{HostHooks, VmError, VmResult};

/// One byte per tracked allocation token (see `ferro_rt::vm`'s
/// `note_allocations`/`note_collection`): the token's size is never
/// inspected, only its identity, so a fixed single-byte layout is enough.
const TOKEN_LAYOUT: Layout = match Layout::from_size_align(1, 1) {
    Ok(l) => l,
    Err(_) => unreachable!(),
};

/// Resolves `$import`ed module names to `<name>.ferro` files under a
/// configurable search path (CLI `--search-path`, repeatable; falls back
/// to the current directory and `$FERRO_PATH` if neither is given).
pub struct FileHostHooks {
    search_paths: Vec<PathBuf>,
}

impl FileHostHooks {
    pub fn new(mut search_paths: Vec<PathBuf>) -> FileHostHooks {
        if let Ok(path_var) = std::env::var("FERRO_PATH") {
            search_paths.extend(std::env::split_paths(&path_var));
        }
        if search_paths.is_empty() {
            search_paths.push(PathBuf::from("."));
        }
        FileHostHooks { search_paths }
    }

    fn resolve(&self, modname: &str) -> Option<PathBuf> {
        let filename = format!("{modname}.ferro");
        self.search_paths
            .iter()
            .map(|dir| dir.join(&filename))
            .find(|candidate| candidate.is_file())
    }
}

impl HostHooks for FileHostHooks {
    fn mem_alloc(&mut self, _n: usize) -> *mut u8 {
        // SAFETY: TOKEN_LAYOUT is a fixed, valid, non-zero-sized layout.
        let ptr = unsafe { alloc::alloc(TOKEN_LAYOUT) };
        assert!(!ptr.is_null(), "ferro: host allocator returned null");
        ptr
    }

    fn mem_free(&mut self, ptr: *mut u8) {
        // SAFETY: every pointer passed here was returned by `mem_alloc`
        // above, using the same layout.
        unsafe { alloc::dealloc(ptr, TOKEN_LAYOUT) };
    }

    fn init(&mut self) {
        tracing::debug!(search_paths = ?self.search_paths, "ferro: vm initialized");
    }

    fn quit(&mut self) {
        tracing::debug!("ferro: vm shut down");
    }

    fn output(&mut self, bytes: &[u8]) {
        use std::io::Write;
        let _ = std::io::stdout().write_all(bytes);
    }

    fn import(&mut self, modname: &str) -> VmResult<Vec<u8>> {
        let path = self
            .resolve(modname)
            .ok_or_else(|| VmError::FileNotFound(modname.to_string()))?;
        fs::read(&path).map_err(|e| VmError::FileNotFound(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_module_from_search_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("geometry.ferro"), "($define pi 3.14159)").unwrap();

        let hooks = FileHostHooks::new(vec![dir.path().to_path_buf()]);
        let source = hooks.resolve("geometry");
        assert_eq!(source, Some(dir.path().join("geometry.ferro")));
    }

    #[test]
    fn missing_module_resolves_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = FileHostHooks::new(vec![dir.path().to_path_buf()]);
        assert_eq!(hooks.resolve("nope"), None);
    }

    #[test]
    fn import_reads_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("geometry.ferro"), "($define pi 3.14159)").unwrap();
        let mut hooks = FileHostHooks::new(vec![dir.path().to_path_buf()]);
        let bytes = hooks.import("geometry").unwrap();
        assert_eq!(bytes, b"($define pi 3.14159)");
    }

    #[test]
    fn import_of_unresolved_module_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut hooks = FileHostHooks::new(vec![dir.path().to_path_buf()]);
        assert!(matches!(hooks.import("nope"), Err(VmError::FileNotFound(_))));
    }
}
