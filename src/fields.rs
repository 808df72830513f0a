// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

/*! Typed access to the fields of native records.

Templates and info records are plain C structs. Reading a field copies it
out. Writing a string, list or dictionary field releases whatever was
there and installs memory we own, which the `Overlay` of the record keeps
track of. Before the record goes back to the library's free routine,
`Overlay::detach` resets all of those fields to null so the library never
frees our memory.

The accessor macros below expect the record type to have an `overlay`
field plus `api()`, `raw()` and `raw_mut()` methods.

*/

use libc::{c_int, c_longlong};
use std::collections::HashMap;
use std::convert::TryFrom;
use std::ptr;
use sys::{self, Drmaa2Api};

use crate::dict::Dict;
use crate::error::{Error, Result};
use crate::list::List;
use crate::string::StringPins;

/// The fields of one record that currently point at our memory.
#[derive(Default)]
pub(crate) struct Overlay {
    pub strings: StringPins,
    lists: HashMap<&'static str, (*mut sys::drmaa2_list, List<String>)>,
    dicts: HashMap<&'static str, (*mut sys::drmaa2_dict, Dict)>,
}

impl Overlay {
    /// Replace a string-list field. An empty slice leaves the field unset.
    pub unsafe fn set_string_list(
        &mut self,
        api: &'static Drmaa2Api,
        name: &'static str,
        slot: *mut sys::drmaa2_list,
        values: &[&str],
    ) -> Result<()> {
        // Build the whole replacement first; if any add fails the field is
        // left as it was.
        let fresh = if values.is_empty() {
            None
        } else {
            Some(List::from_strs(api, values)?)
        };

        match self.lists.remove(name) {
            Some((_, ours)) => {
                *slot = ptr::null_mut();
                drop(ours);
            }

            None => {
                if !(*slot).is_null() {
                    debug!(field = name, "freeing library-owned list");
                    (api.drmaa2_list_free)(slot);
                }
            }
        }

        match fresh {
            Some(list) => {
                *slot = list.as_ptr();
                self.lists.insert(name, (slot, list));
            }

            None => *slot = ptr::null_mut(),
        }

        Ok(())
    }

    /// Replace a dictionary field wholesale. No pairs leaves it unset.
    pub unsafe fn set_dict<I, K, V>(
        &mut self,
        api: &'static Drmaa2Api,
        name: &'static str,
        slot: *mut sys::drmaa2_dict,
        pairs: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let pairs: Vec<(K, V)> = pairs.into_iter().collect();

        let fresh = if pairs.is_empty() {
            None
        } else {
            Some(Dict::from_pairs(api, pairs)?)
        };

        match self.dicts.remove(name) {
            Some((_, ours)) => {
                *slot = ptr::null_mut();
                drop(ours);
            }

            None => {
                if !(*slot).is_null() {
                    debug!(field = name, "freeing library-owned dict");
                    (api.drmaa2_dict_free)(slot);
                }
            }
        }

        match fresh {
            Some(dict) => {
                *slot = dict.as_ptr();
                self.dicts.insert(name, (slot, dict));
            }

            None => *slot = ptr::null_mut(),
        }

        Ok(())
    }

    /// Null out every field that points at our memory, and release the
    /// lists and dictionaries we created.
    pub unsafe fn detach(&mut self) {
        self.strings.detach();

        for (name, (slot, list)) in self.lists.drain() {
            trace!(field = name, "detaching list");
            *slot = ptr::null_mut();
            drop(list);
        }

        for (name, (slot, dict)) in self.dicts.drain() {
            trace!(field = name, "detaching dict");
            *slot = ptr::null_mut();
            drop(dict);
        }
    }
}


pub(crate) unsafe fn read_string_list(api: &'static Drmaa2Api, ptr: sys::drmaa2_list) -> Result<Vec<String>> {
    if ptr.is_null() {
        return Ok(Vec::new());
    }

    let list: List<String> = List::adopt(api, ptr, false, None);
    list.to_vec()
}

pub(crate) unsafe fn read_dict(api: &'static Drmaa2Api, ptr: sys::drmaa2_dict) -> Result<HashMap<String, String>> {
    if ptr.is_null() {
        return Ok(HashMap::new());
    }

    Dict::borrowed(api, ptr).to_map()
}

pub(crate) fn read_num(raw: c_longlong) -> Option<i64> {
    if raw == sys::DRMAA2_UNSET_NUM {
        None
    } else {
        Some(raw as i64)
    }
}

pub(crate) fn raw_num(value: Option<i64>) -> c_longlong {
    match value {
        Some(n) => n as c_longlong,
        None => sys::DRMAA2_UNSET_NUM,
    }
}

/// For the few numeric fields that are a C `int` rather than a `long long`.
pub(crate) fn raw_int(value: Option<i64>, field: &'static str) -> Result<c_int> {
    match value {
        Some(n) => c_int::try_from(n).map_err(|_| Error::OutOfRange { field, value: n.to_string() }),
        None => Ok(sys::DRMAA2_UNSET_NUM as c_int),
    }
}

pub(crate) fn read_bool(raw: sys::drmaa2_bool) -> bool {
    raw == sys::DRMAA2_TRUE
}

pub(crate) fn raw_bool(value: bool) -> sys::drmaa2_bool {
    if value {
        sys::DRMAA2_TRUE
    } else {
        sys::DRMAA2_FALSE
    }
}


macro_rules! string_field {
    ($(#[$meta:meta])* $get:ident, $set:ident, $field:ident) => {
        $(#[$meta])*
        pub fn $get(&self) -> Option<String> {
            unsafe { $crate::string::read_borrowed_string(self.raw().$field) }
        }

        pub fn $set(&mut self, value: Option<&str>) -> $crate::error::Result<()> {
            let api = self.api();
            let slot = unsafe { &mut (*self.raw_mut()).$field as *mut _ };
            unsafe { self.overlay.strings.write(api, stringify!($field), slot, value) }
        }
    };
}

macro_rules! string_list_field {
    ($(#[$meta:meta])* $get:ident, $set:ident, $field:ident) => {
        $(#[$meta])*
        pub fn $get(&self) -> $crate::error::Result<Vec<String>> {
            unsafe { $crate::fields::read_string_list(self.api(), self.raw().$field) }
        }

        pub fn $set(&mut self, values: &[&str]) -> $crate::error::Result<()> {
            let api = self.api();
            let slot = unsafe { &mut (*self.raw_mut()).$field as *mut _ };
            unsafe { self.overlay.set_string_list(api, stringify!($field), slot, values) }
        }
    };
}

macro_rules! dict_field {
    ($(#[$meta:meta])* $get:ident, $set:ident, $field:ident) => {
        $(#[$meta])*
        pub fn $get(&self) -> $crate::error::Result<::std::collections::HashMap<String, String>> {
            unsafe { $crate::fields::read_dict(self.api(), self.raw().$field) }
        }

        pub fn $set<I, K, V>(&mut self, pairs: I) -> $crate::error::Result<()>
        where
            I: IntoIterator<Item = (K, V)>,
            K: AsRef<str>,
            V: AsRef<str>,
        {
            let api = self.api();
            let slot = unsafe { &mut (*self.raw_mut()).$field as *mut _ };
            unsafe { self.overlay.set_dict(api, stringify!($field), slot, pairs) }
        }
    };
}

macro_rules! bool_field {
    ($(#[$meta:meta])* $get:ident, $set:ident, $field:ident) => {
        $(#[$meta])*
        pub fn $get(&self) -> bool {
            $crate::fields::read_bool(self.raw().$field)
        }

        pub fn $set(&mut self, value: bool) {
            unsafe { (*self.raw_mut()).$field = $crate::fields::raw_bool(value) };
        }
    };
}

macro_rules! num_field {
    ($(#[$meta:meta])* $get:ident, $set:ident, $field:ident) => {
        $(#[$meta])*
        pub fn $get(&self) -> Option<i64> {
            $crate::fields::read_num(self.raw().$field as ::libc::c_longlong)
        }

        pub fn $set(&mut self, value: Option<i64>) {
            unsafe { (*self.raw_mut()).$field = $crate::fields::raw_num(value) };
        }
    };
}

macro_rules! int_field {
    ($(#[$meta:meta])* $get:ident, $set:ident, $field:ident) => {
        $(#[$meta])*
        pub fn $get(&self) -> Option<i64> {
            $crate::fields::read_num(self.raw().$field as ::libc::c_longlong)
        }

        pub fn $set(&mut self, value: Option<i64>) -> $crate::error::Result<()> {
            let raw = $crate::fields::raw_int(value, stringify!($field))?;
            unsafe { (*self.raw_mut()).$field = raw };
            Ok(())
        }
    };
}

macro_rules! enum_field {
    ($(#[$meta:meta])* $get:ident, $set:ident, $field:ident, $ty:ident) => {
        $(#[$meta])*
        pub fn $get(&self) -> Option<$ty> {
            $ty::from_raw(self.raw().$field)
        }

        pub fn $set(&mut self, value: Option<$ty>) {
            unsafe { (*self.raw_mut()).$field = $ty::raw_or_unset(value) };
        }
    };
}

macro_rules! time_field {
    ($(#[$meta:meta])* $get:ident, $set:ident, $field:ident) => {
        $(#[$meta])*
        pub fn $get(&self) -> Option<$crate::time::TimeValue> {
            $crate::time::TimeValue::from_raw(self.raw().$field)
        }

        pub fn $set(&mut self, value: Option<$crate::time::TimeValue>) -> $crate::error::Result<()> {
            let raw = $crate::time::TimeValue::to_raw(value, stringify!($field))?;
            unsafe { (*self.raw_mut()).$field = raw };
            Ok(())
        }
    };
}
