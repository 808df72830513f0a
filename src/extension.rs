// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

/*! Implementation-specific attributes.

Besides their standard fields, templates and info records may carry extra
attributes that only the DRMS knows about, such as Grid Engine's
`uge_jt_pe` (the parallel environment request of a job template). Their
names are discovered at runtime, per record kind, and their values go
through `drmaa2_get_instance_value` and friends.

*/

use libc::c_void;
use std::fmt;
use sys::Drmaa2Api;

use crate::error::{check_code, check_register, last_error, Error, Result};
use crate::library;
use crate::list::List;
use crate::string::{read_owned_string, to_cstring, to_opt_cstring, opt_ptr};

/// The kinds of record that can carry implementation-specific attributes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RecordKind {
    JobTemplate,
    JobInfo,
    ReservationTemplate,
    ReservationInfo,
    QueueInfo,
    MachineInfo,
    Notification,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            RecordKind::JobTemplate => "job template",
            RecordKind::JobInfo => "job info",
            RecordKind::ReservationTemplate => "reservation template",
            RecordKind::ReservationInfo => "reservation info",
            RecordKind::QueueInfo => "queue info",
            RecordKind::MachineInfo => "machine info",
            RecordKind::Notification => "notification",
        })
    }
}

/// The names of the implementation-specific attributes the DRMS supports
/// for records of this kind.
pub fn implementation_specific_names(kind: RecordKind) -> Result<Vec<String>> {
    names_in(library::api()?, kind)
}

pub(crate) fn names_in(api: &'static Drmaa2Api, kind: RecordKind) -> Result<Vec<String>> {
    let query = match kind {
        RecordKind::JobTemplate => api.drmaa2_jtemplate_impl_spec,
        RecordKind::JobInfo => api.drmaa2_jinfo_impl_spec,
        RecordKind::ReservationTemplate => api.drmaa2_rtemplate_impl_spec,
        RecordKind::ReservationInfo => api.drmaa2_rinfo_impl_spec,
        RecordKind::QueueInfo => api.drmaa2_queueinfo_impl_spec,
        RecordKind::MachineInfo => api.drmaa2_machineinfo_impl_spec,
        RecordKind::Notification => api.drmaa2_notification_impl_spec,
    };

    let ptr = unsafe { query() };

    if ptr.is_null() {
        check_register(api)?;
        return Ok(Vec::new());
    }

    let names: List<String> = unsafe { List::adopt(api, ptr, true, None) };
    names.to_vec()
}

/// A record with implementation-specific attributes.
pub trait Extensible {
    const RECORD_KIND: RecordKind;

    #[doc(hidden)]
    fn extension_api(&self) -> &'static Drmaa2Api;

    #[doc(hidden)]
    fn instance(&self) -> *mut c_void;

    /// The attribute names this record kind supports.
    fn extension_names(&self) -> Result<Vec<String>> {
        names_in(self.extension_api(), Self::RECORD_KIND)
    }

    #[doc(hidden)]
    fn require_extension(&self, name: &str) -> Result<()> {
        if self.extension_names()?.iter().any(|n| n == name) {
            Ok(())
        } else {
            Err(Error::AttributeNotFound(name.to_owned()))
        }
    }

    /// Get an implementation-specific attribute. `None` means the attribute
    /// exists but currently has no value.
    fn get_extension(&self, name: &str) -> Result<Option<String>> {
        self.require_extension(name)?;

        let api = self.extension_api();
        let cname = to_cstring(name)?;
        let value = unsafe { (api.drmaa2_get_instance_value)(self.instance() as *const c_void, cname.as_ptr()) };

        if value.is_null() {
            // Grid Engine reports an error here for an attribute that is
            // merely empty. The name is known to be valid, so a null is
            // an unset value.
            let code = crate::error::last_error_code(api);
            debug!(name, code, "implementation-specific attribute has no value");
            return Ok(None);
        }

        Ok(unsafe { read_owned_string(api, value) })
    }

    /// Set, or with `None` clear, an implementation-specific attribute.
    fn set_extension(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        self.require_extension(name)?;

        let api = self.extension_api();
        let cname = to_cstring(name)?;
        let cvalue = to_opt_cstring(value)?;
        let code = unsafe { (api.drmaa2_set_instance_value)(self.instance(), cname.as_ptr(), opt_ptr(&cvalue)) };
        check_code(api, code)
    }

    /// The DRMS's description of an implementation-specific attribute.
    fn describe_extension(&self, name: &str) -> Result<String> {
        self.require_extension(name)?;

        let api = self.extension_api();
        let cname = to_cstring(name)?;
        let text = unsafe { (api.drmaa2_describe_attribute)(self.instance() as *const c_void, cname.as_ptr()) };

        match unsafe { read_owned_string(api, text) } {
            Some(t) => Ok(t),
            None => Err(last_error(api)),
        }
    }
}
