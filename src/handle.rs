// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

//! Raw pointers with an explicit owner.

use std::any::Any;
use std::fmt;
use std::ptr;
use std::rc::Rc;
use sys::Drmaa2Api;

use crate::error::{Error, Result};

/// Who is responsible for a native pointer.
pub(crate) enum Owner<T> {
    /// We are; this is the library's free routine for it.
    Owned(unsafe extern "C" fn(*mut *mut T)),

    /// The library is. We must never free it.
    Borrowed,

    /// It lives inside a container that we keep alive via this reference.
    Within(Rc<dyn Any>),
}

/// A native pointer plus the knowledge of whether, and how, to free it.
///
/// Freeing happens at most once: `release` nulls the pointer, and dropping
/// a released handle does nothing.
pub(crate) struct NativeHandle<T> {
    ptr: *mut T,
    owner: Owner<T>,
    api: &'static Drmaa2Api,
    what: &'static str,
}

impl<T> NativeHandle<T> {
    pub fn owned(
        api: &'static Drmaa2Api,
        ptr: *mut T,
        free: unsafe extern "C" fn(*mut *mut T),
        what: &'static str,
    ) -> Self {
        debug!(what, ?ptr, "adopting owned handle");
        NativeHandle { ptr, owner: Owner::Owned(free), api, what }
    }

    pub fn borrowed(api: &'static Drmaa2Api, ptr: *mut T, what: &'static str) -> Self {
        NativeHandle { ptr, owner: Owner::Borrowed, api, what }
    }

    pub fn within(api: &'static Drmaa2Api, ptr: *mut T, parent: Rc<dyn Any>, what: &'static str) -> Self {
        NativeHandle { ptr, owner: Owner::Within(parent), api, what }
    }

    pub fn api(&self) -> &'static Drmaa2Api {
        self.api
    }

    pub fn as_ptr(&self) -> *mut T {
        self.ptr
    }

    /// The pointer, or an error if it has been released.
    pub fn live(&self) -> Result<*mut T> {
        if self.ptr.is_null() {
            Err(Error::NullHandle(self.what))
        } else {
            Ok(self.ptr)
        }
    }

    pub fn is_live(&self) -> bool {
        !self.ptr.is_null()
    }

    /// Free the pointer now if we own it, and forget it either way.
    pub fn release(&mut self) {
        if self.ptr.is_null() {
            return;
        }

        if let Owner::Owned(free) = self.owner {
            debug!(what = self.what, ptr = ?self.ptr, "freeing handle");
            unsafe { free(&mut self.ptr) };
        }

        self.ptr = ptr::null_mut();
        self.owner = Owner::Borrowed;
    }
}

impl<T> Drop for NativeHandle<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> fmt::Debug for NativeHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let owner = match self.owner {
            Owner::Owned(_) => "owned",
            Owner::Borrowed => "borrowed",
            Owner::Within(_) => "within",
        };
        write!(f, "{}({:?}, {})", self.what, self.ptr, owner)
    }
}
