// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

/*! Native lists.

A `drmaa2_list` holds untyped `void *` entries and carries a tag saying
what they point at. `List<T>` fixes the tag at the type level: each entry
type implements `ListEntry`, which knows how to copy an entry out and how
to compare two entries by value, and `IntoListEntry` if we can also put
entries in.

Lists we create have no entry-free callback, so the library never frees
what we add. The memory behind each added entry is kept alive alongside
the native list for as long as the list exists. Lists the library hands
back may or may not be ours to free, depending on the call; see `adopt`.

*/

use libc::{c_long, c_void};
use std::any::Any;
use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use sys::{self, Drmaa2Api};

use crate::enums::ListType;
use crate::error::{last_error, Error, Result};
use crate::library;
use crate::string::to_cstring;

/// The native list itself, shared by a `List` and by anything borrowed out
/// of it.
pub(crate) struct RawList {
    ptr: sys::drmaa2_list,
    owned: bool,
    api: &'static Drmaa2Api,
    list_type: ListType,
    pins: RefCell<Vec<(*const c_void, Box<dyn Any>)>>,
    _parent: Option<Rc<dyn Any>>,
}

impl Drop for RawList {
    fn drop(&mut self) {
        if self.owned && !self.ptr.is_null() {
            debug!(list_type = %self.list_type, "freeing list");
            unsafe { (self.api.drmaa2_list_free)(&mut self.ptr) };
        }
        // The pins go after this, once nothing can reference them.
    }
}

/// Keeps a native list alive while an entry borrowed from it is in use.
#[derive(Clone)]
pub struct Keepalive(Rc<dyn Any>);

impl Keepalive {
    pub(crate) fn rc(&self) -> Rc<dyn Any> {
        self.0.clone()
    }
}

/// A type that can be read out of a native list.
pub trait ListEntry: Sized {
    /// The tag of lists holding this type.
    const LIST_TYPE: ListType;

    /// What two entries are compared by.
    type Key: PartialEq + fmt::Debug;

    #[doc(hidden)]
    unsafe fn entry_key(api: &Drmaa2Api, entry: *const c_void) -> Self::Key;

    /// Copy an entry out. `keep` may be retained by the result if it
    /// needs to keep referring to the native entry.
    #[doc(hidden)]
    unsafe fn from_void(api: &'static Drmaa2Api, entry: *const c_void, keep: &Keepalive) -> Self;

    /// Value equality of two native entries.
    #[doc(hidden)]
    unsafe fn compare(api: &Drmaa2Api, a: *const c_void, b: *const c_void) -> bool {
        Self::entry_key(api, a) == Self::entry_key(api, b)
    }
}

/// A type that can also be added to a native list.
pub trait IntoListEntry: ListEntry {
    /// A pointer suitable for `drmaa2_list_add`, and whatever must stay
    /// alive for that pointer to remain valid.
    #[doc(hidden)]
    fn to_void(&self) -> Result<(*const c_void, Box<dyn Any>)>;
}


/// A typed view of a native list.
pub struct List<T: ListEntry> {
    raw: Rc<RawList>,
    _entries: PhantomData<T>,
}

impl<T: ListEntry> List<T> {
    /// Create an empty list, owned by us.
    pub fn new() -> Result<List<T>> {
        Self::create(library::api()?)
    }

    pub(crate) fn create(api: &'static Drmaa2Api) -> Result<List<T>> {
        let ptr = unsafe { (api.drmaa2_list_create)(T::LIST_TYPE.to_raw(), None) };

        if ptr.is_null() {
            return Err(last_error(api));
        }

        debug!(list_type = %T::LIST_TYPE, "created list");
        Ok(unsafe { Self::adopt(api, ptr, true, None) })
    }

    /// Wrap a list the library returned. If `owned`, we free it when done;
    /// its own entry-free callback then takes care of the entries. `parent`
    /// is kept alive as long as the list, for lists that live inside some
    /// other native object.
    pub(crate) unsafe fn adopt(
        api: &'static Drmaa2Api,
        ptr: sys::drmaa2_list,
        owned: bool,
        parent: Option<Rc<dyn Any>>,
    ) -> List<T> {
        List {
            raw: Rc::new(RawList {
                ptr,
                owned,
                api,
                list_type: T::LIST_TYPE,
                pins: RefCell::new(Vec::new()),
                _parent: parent,
            }),
            _entries: PhantomData,
        }
    }

    pub(crate) fn as_ptr(&self) -> sys::drmaa2_list {
        self.raw.ptr
    }

    pub fn list_type(&self) -> ListType {
        self.raw.list_type
    }

    pub fn len(&self) -> usize {
        if self.raw.ptr.is_null() {
            return 0;
        }

        let n = unsafe { (self.raw.api.drmaa2_list_size)(self.raw.ptr) };

        if n < 0 {
            0
        } else {
            n as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn keepalive(&self) -> Keepalive {
        Keepalive(self.raw.clone())
    }

    /// The raw entry at `index`.
    pub(crate) fn entry(&self, index: usize) -> Result<*const c_void> {
        let len = self.len();

        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }

        let api = self.raw.api;
        let entry = unsafe { (api.drmaa2_list_get)(self.raw.ptr, index as c_long) };

        if entry.is_null() {
            Err(last_error(api))
        } else {
            Ok(entry)
        }
    }

    pub fn get(&self, index: usize) -> Result<T> {
        let entry = self.entry(index)?;
        trace!(list_type = %self.raw.list_type, index, "reading list entry");
        Ok(unsafe { T::from_void(self.raw.api, entry, &self.keepalive()) })
    }

    /// Copy out every entry.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }

    /// Delete the entry at `index`. Later entries shift down.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        let entry = self.entry(index)?;
        let api = self.raw.api;
        dtry!(api, (api.drmaa2_list_del)(self.raw.ptr, index as c_long));

        // Values read out of this list may still point at the entry, and
        // they hold a reference to the list while they do.
        if Rc::strong_count(&self.raw) == 1 {
            let mut pins = self.raw.pins.borrow_mut();

            if let Some(i) = pins.iter().position(|(p, _)| *p == entry) {
                pins.remove(i);
            }
        }

        Ok(())
    }

    /// Find the first entry that is exactly `entry`, by address.
    pub(crate) fn position_by_identity(&self, entry: *const c_void) -> Result<Option<usize>> {
        for i in 0..self.len() {
            if self.entry(i)? == entry {
                return Ok(Some(i));
            }
        }

        Ok(None)
    }

    /// Find the first entry whose value equals that of `entry`.
    pub(crate) fn position_by_value(&self, entry: *const c_void) -> Result<Option<usize>> {
        for i in 0..self.len() {
            if unsafe { T::compare(self.raw.api, self.entry(i)?, entry) } {
                return Ok(Some(i));
            }
        }

        Ok(None)
    }

    /// Remove the entry that is exactly `entry`, by address. Returns whether
    /// one was found.
    pub(crate) fn remove_by_identity(&mut self, entry: *const c_void) -> Result<bool> {
        match self.position_by_identity(entry)? {
            Some(i) => {
                self.remove(i)?;
                Ok(true)
            }

            None => Ok(false),
        }
    }

    /// Whether both lists hold equal values in the same order. The entries
    /// are compared by content, not by address.
    pub fn equals_by_value(&self, other: &List<T>) -> Result<bool> {
        let n = self.len();

        if n != other.len() {
            return Ok(false);
        }

        for i in 0..n {
            if !unsafe { T::compare(self.raw.api, self.entry(i)?, other.entry(i)?) } {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

impl<T: IntoListEntry> List<T> {
    /// Create a list holding copies of `items`.
    pub fn from_items(items: &[T]) -> Result<List<T>> {
        let mut list = Self::new()?;

        for item in items {
            list.push(item)?;
        }

        Ok(list)
    }

    /// Append an item. Only valid on lists we created.
    ///
    /// If this fails the list keeps whatever was added before.
    pub fn push(&mut self, item: &T) -> Result<()> {
        let (entry, pin) = item.to_void()?;
        let api = self.raw.api;
        dtry!(api, (api.drmaa2_list_add)(self.raw.ptr, entry));
        self.raw.pins.borrow_mut().push((entry, pin));
        Ok(())
    }
}

impl<T: ListEntry> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "List<{}>(len {})", self.raw.list_type, self.len())
    }
}


impl ListEntry for String {
    const LIST_TYPE: ListType = ListType::StringList;
    type Key = String;

    unsafe fn entry_key(_api: &Drmaa2Api, entry: *const c_void) -> String {
        CStr::from_ptr(entry as *const _).to_string_lossy().into_owned()
    }

    unsafe fn from_void(api: &'static Drmaa2Api, entry: *const c_void, _keep: &Keepalive) -> String {
        Self::entry_key(api, entry)
    }
}

impl IntoListEntry for String {
    fn to_void(&self) -> Result<(*const c_void, Box<dyn Any>)> {
        let c: CString = to_cstring(self)?;
        let entry = c.as_ptr() as *const c_void;
        let pin: Box<dyn Any> = Box::new(c);
        Ok((entry, pin))
    }
}

impl List<String> {
    /// Build a string list from anything string-like.
    pub(crate) fn from_strs<S: AsRef<str>>(api: &'static Drmaa2Api, items: &[S]) -> Result<List<String>> {
        let mut list = Self::create(api)?;

        for item in items {
            list.push(&item.as_ref().to_owned())?;
        }

        Ok(list)
    }
}
