// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

/*! Locating and loading `libdrmaa2`.

The library is loaded once per process, on first use. Grid Engine installs
it below `$SGE_ROOT`; `DRMAA2_LIBRARY` names an explicit file instead.

*/

use once_cell::sync::OnceCell;
use std::env;
use std::path::{Path, PathBuf};
use sys::Drmaa2Api;

use crate::error::{Error, Result};

/// Environment variable naming the shared object to load, overriding
/// everything else.
pub const LIBRARY_ENV: &str = "DRMAA2_LIBRARY";

/// Environment variable giving the Grid Engine installation root.
pub const ROOT_ENV: &str = "SGE_ROOT";

const LIBRARY_NAME: &str = "libdrmaa2.so";
const ARCH_DIR: &str = "lib/lx-amd64";

static API: OnceCell<Drmaa2Api> = OnceCell::new();

/// The shared object `init()` would load, given the current environment.
pub fn library_path() -> PathBuf {
    if let Some(path) = env::var_os(LIBRARY_ENV) {
        return PathBuf::from(path);
    }

    match env::var_os(ROOT_ENV) {
        Some(root) => {
            let mut path = PathBuf::from(root);
            path.push(ARCH_DIR);
            path.push(LIBRARY_NAME);
            path
        }

        None => PathBuf::from(LIBRARY_NAME),
    }
}

/// Load the DRMAA2 library from its default location.
///
/// Every other entry point calls this implicitly, so there is normally no
/// need to call it except to surface loading problems early. Calling it
/// again after a successful load does nothing.
pub fn init() -> Result<()> {
    api().map(|_| ())
}

/// Load the DRMAA2 library from an explicit path.
///
/// If a library has already been loaded this does nothing, even if `path`
/// names a different file.
pub fn init_from<P: AsRef<Path>>(path: P) -> Result<()> {
    API.get_or_try_init(|| load(path.as_ref()))?;
    Ok(())
}

pub(crate) fn api() -> Result<&'static Drmaa2Api> {
    API.get_or_try_init(|| load(&library_path()))
}

/// The table, if something has loaded it already. Used where we must not
/// trigger a load, such as from inside a C callback.
pub(crate) fn loaded() -> Option<&'static Drmaa2Api> {
    API.get()
}

fn load(path: &Path) -> Result<Drmaa2Api> {
    debug!(path = %path.display(), "loading DRMAA2 library");

    unsafe { Drmaa2Api::load(path) }.map_err(|e| Error::Load {
        path: path.display().to_string(),
        cause: e.to_string(),
    })
}

/// Install a table that was not loaded from disk. The first installation
/// wins.
#[cfg(test)]
pub(crate) fn install<F: FnOnce() -> Drmaa2Api>(make: F) -> &'static Drmaa2Api {
    API.get_or_init(make)
}
