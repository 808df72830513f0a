// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

/*! Moving strings across the boundary.

Strings the library hands us with ownership must go back through
`drmaa2_string_free`, never through Rust's allocator. There is no
`drmaa2_string_create`, so a string we store into a native record is a
Rust `CString` kept alive next to the record. Such fields must be reset to
null before the record's own free routine runs, or the library would free
memory it never allocated.

*/

use libc::c_char;
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::mem;
use std::ptr;
use sys::{self, Drmaa2Api};

use crate::error::{Error, Result};

/// Copy out a string returned with ownership, then free it.
///
/// Null maps to None. The pointer is dead afterwards, so it must not be
/// passed here twice.
pub(crate) unsafe fn read_owned_string(api: &Drmaa2Api, ptr: sys::drmaa2_string) -> Option<String> {
    if ptr.is_null() {
        return None;
    }

    let text = CStr::from_ptr(ptr).to_string_lossy().into_owned();
    let mut ptr = ptr;
    (api.drmaa2_string_free)(&mut ptr);
    Some(text)
}

/// Copy out a string that stays owned by someone else.
pub(crate) unsafe fn read_borrowed_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

pub(crate) fn to_cstring(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| Error::InteriorNul(s.to_owned()))
}

/// The same, for an optional string: None becomes a null pointer at the
/// call site.
pub(crate) fn to_opt_cstring(s: Option<&str>) -> Result<Option<CString>> {
    match s {
        Some(s) => to_cstring(s).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn opt_ptr(s: &Option<CString>) -> *const c_char {
    match *s {
        Some(ref c) => c.as_ptr(),
        None => ptr::null(),
    }
}


/// The string fields of one native record that currently point at our
/// memory.
///
/// A field is in here exactly when we last wrote it. Anything else that is
/// non-null in the record belongs to the library.
#[derive(Default)]
pub(crate) struct StringPins {
    slots: HashMap<&'static str, (*mut sys::drmaa2_string, CString)>,
}

impl StringPins {
    /// Store `value` into the field at `slot`, releasing whatever was there.
    ///
    /// `slot` must point into a live record and stay valid until `detach`.
    pub unsafe fn write(
        &mut self,
        api: &Drmaa2Api,
        name: &'static str,
        slot: *mut sys::drmaa2_string,
        value: Option<&str>,
    ) -> Result<()> {
        // Convert first, so that a bad value leaves the field untouched.
        let fresh = to_opt_cstring(value)?;
        let previous = self.slots.remove(name);

        if previous.is_none() && !(*slot).is_null() {
            trace!(field = name, "freeing library-owned string");
            (api.drmaa2_string_free)(slot);
        }

        match fresh {
            Some(c) => {
                *slot = c.as_ptr() as *mut c_char;
                self.slots.insert(name, (slot, c));
            }

            None => *slot = ptr::null_mut(),
        }

        mem::drop(previous);
        Ok(())
    }

    /// Null out every field pointing at our memory. Must run before the
    /// record is freed.
    pub unsafe fn detach(&mut self) {
        for (name, (slot, _pin)) in self.slots.drain() {
            trace!(field = name, "detaching pinned string");
            *slot = ptr::null_mut();
        }
    }
}
