// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

/*! Jobs and job arrays.

A `Job` is the pair of a job ID and the name of the session it was
submitted in. Jobs returned by the library also carry a native handle,
which the control operations need. `Job::detached` makes one without a
handle, good only for comparisons.

*/

use libc::c_void;
use std::any::Any;
use std::ffi::CString;
use std::fmt;
use std::ptr;
use std::rc::Rc;
use sys::{self, Drmaa2Api};

use crate::enums::{JobState, ListType};
use crate::error::{check_register, last_error, Error, Result};
use crate::handle::NativeHandle;
use crate::info::JobInfo;
use crate::list::{IntoListEntry, Keepalive, List, ListEntry};
use crate::string::{read_borrowed_string, read_owned_string, to_cstring};
use crate::template::JobTemplate;
use crate::time::Timeout;

#[derive(Clone)]
pub struct Job {
    id: String,
    session_name: String,
    handle: Option<Rc<NativeHandle<sys::drmaa2_j_s>>>,
}

impl Job {
    /// A job value with no native handle, for comparing against jobs the
    /// library returns.
    pub fn detached(id: &str, session_name: &str) -> Job {
        Job {
            id: id.to_owned(),
            session_name: session_name.to_owned(),
            handle: None,
        }
    }

    unsafe fn decode(ptr: *const sys::drmaa2_j_s) -> (String, String) {
        (
            read_borrowed_string((*ptr).id).unwrap_or_default(),
            read_borrowed_string((*ptr).session_name).unwrap_or_default(),
        )
    }

    /// Wrap a job handle. `handle` decides whether it gets freed.
    pub(crate) unsafe fn from_handle(handle: NativeHandle<sys::drmaa2_j_s>) -> Job {
        let (id, session_name) = Self::decode(handle.as_ptr());
        Job {
            id,
            session_name,
            handle: Some(Rc::new(handle)),
        }
    }

    /// Take ownership of a job the library allocated for us.
    pub(crate) unsafe fn adopt(api: &'static Drmaa2Api, ptr: sys::drmaa2_j) -> Job {
        Self::from_handle(NativeHandle::owned(api, ptr, api.drmaa2_j_free, "job"))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Whether this job has a native handle to operate on.
    pub fn is_live(&self) -> bool {
        self.handle.as_ref().map(|h| h.is_live()).unwrap_or(false)
    }

    pub(crate) fn as_ptr(&self) -> *const sys::drmaa2_j_s {
        match self.handle {
            Some(ref h) => h.as_ptr() as *const _,
            None => ptr::null(),
        }
    }

    fn live(&self) -> Result<(&'static Drmaa2Api, sys::drmaa2_j)> {
        match self.handle {
            Some(ref h) => Ok((h.api(), h.live()?)),
            None => Err(Error::NullHandle("detached job")),
        }
    }

    pub fn suspend(&self) -> Result<()> {
        let (api, j) = self.live()?;
        dtry!(api, (api.drmaa2_j_suspend)(j));
        Ok(())
    }

    pub fn resume(&self) -> Result<()> {
        let (api, j) = self.live()?;
        dtry!(api, (api.drmaa2_j_resume)(j));
        Ok(())
    }

    pub fn hold(&self) -> Result<()> {
        let (api, j) = self.live()?;
        dtry!(api, (api.drmaa2_j_hold)(j));
        Ok(())
    }

    pub fn release(&self) -> Result<()> {
        let (api, j) = self.live()?;
        dtry!(api, (api.drmaa2_j_release)(j));
        Ok(())
    }

    pub fn terminate(&self) -> Result<()> {
        let (api, j) = self.live()?;
        dtry!(api, (api.drmaa2_j_terminate)(j));
        Ok(())
    }

    /// Tell the DRMS it may forget about this finished job.
    pub fn reap(&self) -> Result<()> {
        let (api, j) = self.live()?;
        dtry!(api, (api.drmaa2_j_reap)(j));
        Ok(())
    }

    /// The job's state and the DRMS's own sub-state description.
    pub fn state(&self) -> Result<(Option<JobState>, Option<String>)> {
        let (api, j) = self.live()?;
        let mut substate: sys::drmaa2_string = ptr::null_mut();
        let raw = unsafe { (api.drmaa2_j_get_state)(j, &mut substate) };
        let substate = unsafe { read_owned_string(api, substate) };

        if raw == sys::DRMAA2_UNSET_JSTATE {
            check_register(api)?;
        }

        Ok((JobState::from_raw(raw), substate))
    }

    pub fn info(&self) -> Result<JobInfo> {
        let (api, j) = self.live()?;
        let ptr = unsafe { (api.drmaa2_j_get_info)(j) };

        if ptr.is_null() {
            return Err(last_error(api));
        }

        Ok(unsafe { JobInfo::adopt(api, ptr) })
    }

    /// A copy of the template the job was submitted with.
    pub fn template(&self) -> Result<JobTemplate> {
        let (api, j) = self.live()?;
        let ptr = unsafe { (api.drmaa2_j_get_jtemplate)(j) };

        if ptr.is_null() {
            return Err(last_error(api));
        }

        Ok(unsafe { JobTemplate::adopt(api, ptr) })
    }

    /// Block until the job starts. Returns false on timeout.
    pub fn wait_started(&self, timeout: Timeout) -> Result<bool> {
        let (api, j) = self.live()?;
        let code = unsafe { (api.drmaa2_j_wait_started)(j, timeout.to_raw()) };
        wait_outcome(api, code)
    }

    /// Block until the job finishes. Returns false on timeout.
    pub fn wait_terminated(&self, timeout: Timeout) -> Result<bool> {
        let (api, j) = self.live()?;
        let code = unsafe { (api.drmaa2_j_wait_terminated)(j, timeout.to_raw()) };
        wait_outcome(api, code)
    }
}

fn wait_outcome(api: &Drmaa2Api, code: sys::drmaa2_error) -> Result<bool> {
    match code {
        sys::DRMAA2_SUCCESS => Ok(true),
        sys::DRMAA2_TIMEOUT => {
            // Drain the text so it does not linger in the register.
            let _ = crate::error::error_for_code(api, code);
            Ok(false)
        }
        _ => Err(crate::error::error_for_code(api, code)),
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Job) -> bool {
        self.id == other.id && self.session_name == other.session_name
    }
}

impl Eq for Job {}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("session_name", &self.session_name)
            .field("live", &self.is_live())
            .finish()
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.session_name)
    }
}

/// A job structure we built ourselves, for putting detached jobs into a
/// list.
struct FabricatedJob {
    _raw: Box<sys::drmaa2_j_s>,
    _id: CString,
    _session_name: CString,
}

impl ListEntry for Job {
    const LIST_TYPE: ListType = ListType::JobList;
    type Key = (String, String);

    unsafe fn entry_key(_api: &Drmaa2Api, entry: *const c_void) -> (String, String) {
        Self::decode(entry as *const sys::drmaa2_j_s)
    }

    unsafe fn from_void(api: &'static Drmaa2Api, entry: *const c_void, keep: &Keepalive) -> Job {
        Self::from_handle(NativeHandle::within(api, entry as *mut sys::drmaa2_j_s, keep.rc(), "job"))
    }
}

impl IntoListEntry for Job {
    fn to_void(&self) -> Result<(*const c_void, Box<dyn Any>)> {
        if let Some(ref handle) = self.handle {
            if handle.is_live() {
                let pin: Box<dyn Any> = Box::new(handle.clone());
                return Ok((handle.as_ptr() as *const c_void, pin));
            }
        }

        let id = to_cstring(&self.id)?;
        let session_name = to_cstring(&self.session_name)?;
        let raw = Box::new(sys::drmaa2_j_s {
            id: id.as_ptr() as *mut _,
            session_name: session_name.as_ptr() as *mut _,
        });
        let entry = &*raw as *const sys::drmaa2_j_s as *const c_void;

        let pin: Box<dyn Any> = Box::new(FabricatedJob {
            _raw: raw,
            _id: id,
            _session_name: session_name,
        });
        Ok((entry, pin))
    }
}


/// A set of jobs submitted together with `JobSession::run_bulk`.
pub struct JobArray {
    handle: Rc<NativeHandle<sys::drmaa2_jarray_s>>,
}

impl JobArray {
    pub(crate) unsafe fn adopt(api: &'static Drmaa2Api, ptr: sys::drmaa2_jarray) -> JobArray {
        JobArray {
            handle: Rc::new(NativeHandle::owned(api, ptr, api.drmaa2_jarray_free, "job array")),
        }
    }

    fn live(&self) -> Result<(&'static Drmaa2Api, sys::drmaa2_jarray)> {
        Ok((self.handle.api(), self.handle.live()?))
    }

    pub fn id(&self) -> Result<String> {
        let (api, ja) = self.live()?;

        match unsafe { read_owned_string(api, (api.drmaa2_jarray_get_id)(ja)) } {
            Some(id) => Ok(id),
            None => Err(last_error(api)),
        }
    }

    pub fn session_name(&self) -> Result<String> {
        let (api, ja) = self.live()?;

        match unsafe { read_owned_string(api, (api.drmaa2_jarray_get_session_name)(ja)) } {
            Some(name) => Ok(name),
            None => Err(last_error(api)),
        }
    }

    /// The jobs making up the array.
    pub fn jobs(&self) -> Result<Vec<Job>> {
        let (api, ja) = self.live()?;
        let ptr = unsafe { (api.drmaa2_jarray_get_jobs)(ja) };

        if ptr.is_null() {
            check_register(api)?;
            return Ok(Vec::new());
        }

        // This is the array's own job list; it lives as long as the array.
        let parent: Rc<dyn Any> = self.handle.clone();
        let list: List<Job> = unsafe { List::adopt(api, ptr, false, Some(parent)) };
        list.to_vec()
    }

    pub fn template(&self) -> Result<JobTemplate> {
        let (api, ja) = self.live()?;
        let ptr = unsafe { (api.drmaa2_jarray_get_jtemplate)(ja) };

        if ptr.is_null() {
            return Err(last_error(api));
        }

        Ok(unsafe { JobTemplate::adopt(api, ptr) })
    }

    pub fn suspend(&self) -> Result<()> {
        let (api, ja) = self.live()?;
        dtry!(api, (api.drmaa2_jarray_suspend)(ja));
        Ok(())
    }

    pub fn resume(&self) -> Result<()> {
        let (api, ja) = self.live()?;
        dtry!(api, (api.drmaa2_jarray_resume)(ja));
        Ok(())
    }

    pub fn hold(&self) -> Result<()> {
        let (api, ja) = self.live()?;
        dtry!(api, (api.drmaa2_jarray_hold)(ja));
        Ok(())
    }

    pub fn release(&self) -> Result<()> {
        let (api, ja) = self.live()?;
        dtry!(api, (api.drmaa2_jarray_release)(ja));
        Ok(())
    }

    pub fn terminate(&self) -> Result<()> {
        let (api, ja) = self.live()?;
        dtry!(api, (api.drmaa2_jarray_terminate)(ja));
        Ok(())
    }
}

impl fmt::Debug for JobArray {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "JobArray({:?})", self.handle)
    }
}
