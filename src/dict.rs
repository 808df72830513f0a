// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

//! Native string-to-string dictionaries.

use libc::c_char;
use std::collections::HashMap;
use std::ffi::CString;
use std::fmt;
use sys::{self, Drmaa2Api};

use crate::error::{check_code, last_error, Result};
use crate::library;
use crate::list::List;
use crate::string::{read_borrowed_string, to_cstring};

/// A `drmaa2_dict`.
///
/// Dictionaries we create have no entry-free callback; the key and value
/// of each entry we set are kept alive here until the entry is replaced or
/// deleted, or the dictionary is freed.
pub struct Dict {
    ptr: sys::drmaa2_dict,
    owned: bool,
    api: &'static Drmaa2Api,
    pins: HashMap<String, (CString, CString)>,
}

impl Dict {
    pub fn new() -> Result<Dict> {
        Self::create(library::api()?)
    }

    pub(crate) fn create(api: &'static Drmaa2Api) -> Result<Dict> {
        let ptr = unsafe { (api.drmaa2_dict_create)(None) };

        if ptr.is_null() {
            return Err(last_error(api));
        }

        debug!("created dict");
        Ok(Dict {
            ptr,
            owned: true,
            api,
            pins: HashMap::new(),
        })
    }

    /// Build a dictionary holding the given pairs.
    pub(crate) fn from_pairs<I, K, V>(api: &'static Drmaa2Api, pairs: I) -> Result<Dict>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut dict = Self::create(api)?;

        for (k, v) in pairs {
            dict.set(k.as_ref(), v.as_ref())?;
        }

        Ok(dict)
    }

    /// Wrap a dictionary that lives inside a native record; we never free it.
    pub(crate) unsafe fn borrowed(api: &'static Drmaa2Api, ptr: sys::drmaa2_dict) -> Dict {
        Dict {
            ptr,
            owned: false,
            api,
            pins: HashMap::new(),
        }
    }

    pub(crate) fn as_ptr(&self) -> sys::drmaa2_dict {
        self.ptr
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        if self.ptr.is_null() {
            return Ok(Vec::new());
        }

        let ptr = unsafe { (self.api.drmaa2_dict_list)(self.ptr) };

        if ptr.is_null() {
            crate::error::check_register(self.api)?;
            return Ok(Vec::new());
        }

        // The key list is a fresh list, but its entries are the dictionary's
        // own key strings and it has no callback to free them.
        let keys: List<String> = unsafe { List::adopt(self.api, ptr, true, None) };
        keys.to_vec()
    }

    pub fn contains_key(&self, key: &str) -> Result<bool> {
        if self.ptr.is_null() {
            return Ok(false);
        }

        let k = to_cstring(key)?;
        Ok(unsafe { (self.api.drmaa2_dict_has)(self.ptr, k.as_ptr()) } == sys::DRMAA2_TRUE)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        if !self.contains_key(key)? {
            return Ok(None);
        }

        let k = to_cstring(key)?;
        let v: *const c_char = unsafe { (self.api.drmaa2_dict_get)(self.ptr, k.as_ptr()) };

        if v.is_null() {
            return Err(last_error(self.api));
        }

        Ok(unsafe { read_borrowed_string(v) })
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let v = to_cstring(value)?;

        // An existing entry may still hold the key pointer we first passed,
        // so replacing a value reuses it.
        let (k, previous) = match self.pins.remove(key) {
            Some((k, old)) => (k, Some(old)),
            None => (to_cstring(key)?, None),
        };

        let api = self.api;
        let code = unsafe { (api.drmaa2_dict_set)(self.ptr, k.as_ptr(), v.as_ptr()) };

        if let Err(e) = check_code(api, code) {
            if let Some(old) = previous {
                self.pins.insert(key.to_owned(), (k, old));
            }

            return Err(e);
        }

        trace!(key, "set dict entry");
        self.pins.insert(key.to_owned(), (k, v));
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Result<()> {
        let k = to_cstring(key)?;
        let api = self.api;
        dtry!(api, (api.drmaa2_dict_del)(self.ptr, k.as_ptr()));
        self.pins.remove(key);
        Ok(())
    }

    /// Copy out the whole dictionary.
    pub fn to_map(&self) -> Result<HashMap<String, String>> {
        // Decode every key before looking any up; the key list borrows the
        // dictionary's storage.
        let keys = self.keys()?;
        let mut map = HashMap::with_capacity(keys.len());

        for key in keys {
            if let Some(value) = self.get(&key)? {
                map.insert(key, value);
            }
        }

        Ok(map)
    }

    pub fn len(&self) -> Result<usize> {
        self.keys().map(|k| k.len())
    }
}

impl Drop for Dict {
    fn drop(&mut self) {
        if self.owned && !self.ptr.is_null() {
            debug!("freeing dict");
            unsafe { (self.api.drmaa2_dict_free)(&mut self.ptr) };
        }
    }
}

impl fmt::Debug for Dict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.to_map() {
            Ok(m) => write!(f, "Dict({:?})", m),
            Err(_) => write!(f, "Dict({:?})", self.ptr),
        }
    }
}
