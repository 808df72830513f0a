// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

/*! Job sessions.

A job session is a named context, known to the DRMS, in which jobs are
submitted and tracked. Sessions persist on the DRMS side until destroyed,
so a second process can open a session by name. Closing a session releases
its resources on both sides; destroying it removes it from the DRMS;
freeing it only releases our local handle.

*/

use libc::c_char;
use std::ffi::CStr;
use std::fmt;
use sys::{self, Drmaa2Api};
use uuid::Uuid;

use crate::error::{check_register, error_for_code, last_error, last_error_code, Error, Result};
use crate::handle::NativeHandle;
use crate::info::JobInfo;
use crate::job::{Job, JobArray};
use crate::library;
use crate::list::List;
use crate::string::{opt_ptr, read_owned_string, to_cstring, to_opt_cstring};
use crate::template::JobTemplate;
use crate::time::Timeout;

/// Create a session, or open it if a session of that name already exists.
///
/// Grid Engine reports a name collision on create as an internal error.
/// After the fallback open succeeds the error register still holds the
/// create failure, so it is not consulted again.
pub(crate) fn create_or_open_with<T>(
    api: &Drmaa2Api,
    name: &CStr,
    create: impl FnOnce(*const c_char) -> *mut T,
    open: impl FnOnce(*const c_char) -> *mut T,
) -> Result<*mut T> {
    let ptr = create(name.as_ptr());

    if !ptr.is_null() {
        debug!(name = ?name, "created session");
        return Ok(ptr);
    }

    let code = last_error_code(api);

    if code != sys::DRMAA2_INTERNAL {
        return Err(error_for_code(api, code));
    }

    debug!(name = ?name, "session exists; opening it");
    let ptr = open(name.as_ptr());

    if ptr.is_null() {
        return Err(last_error(api));
    }

    Ok(ptr)
}

/// A fresh session name that will not collide with anyone else's.
pub(crate) fn unique_name() -> String {
    format!("drmaa2-{}", Uuid::new_v4())
}

pub(crate) fn string_list_result(api: &'static Drmaa2Api, ptr: sys::drmaa2_list) -> Result<Vec<String>> {
    if ptr.is_null() {
        check_register(api)?;
        return Ok(Vec::new());
    }

    let list: List<String> = unsafe { List::adopt(api, ptr, true, None) };
    list.to_vec()
}


pub struct JobSession {
    handle: NativeHandle<sys::drmaa2_jsession_s>,
    name: String,
    open: bool,
}

impl JobSession {
    /// Create a session, falling back to opening an existing one of the
    /// same name. Without a name, a unique one is made up.
    pub fn create_or_open(name: Option<&str>, contact: Option<&str>) -> Result<JobSession> {
        let api = library::api()?;
        let name = name.map(|s| s.to_owned()).unwrap_or_else(unique_name);
        let cname = to_cstring(&name)?;
        let ccontact = to_opt_cstring(contact)?;

        let ptr = create_or_open_with(
            api,
            &cname,
            |n| unsafe { (api.drmaa2_create_jsession)(n, opt_ptr(&ccontact)) },
            |n| unsafe { (api.drmaa2_open_jsession)(n) },
        )?;

        Ok(Self::adopt(api, ptr, name))
    }

    /// Open an existing session.
    pub fn open(name: &str) -> Result<JobSession> {
        let api = library::api()?;
        let cname = to_cstring(name)?;
        let ptr = unsafe { (api.drmaa2_open_jsession)(cname.as_ptr()) };

        if ptr.is_null() {
            return Err(last_error(api));
        }

        debug!(name, "opened session");
        Ok(Self::adopt(api, ptr, name.to_owned()))
    }

    fn adopt(api: &'static Drmaa2Api, ptr: sys::drmaa2_jsession, name: String) -> JobSession {
        JobSession {
            handle: NativeHandle::owned(api, ptr, api.drmaa2_jsession_free, "job session"),
            name,
            open: true,
        }
    }

    /// The names of all job sessions the DRMS knows about.
    pub fn names() -> Result<Vec<String>> {
        let api = library::api()?;
        string_list_result(api, unsafe { (api.drmaa2_get_jsession_names)() })
    }

    /// Remove a session from the DRMS, by name. Nothing needs to be open.
    pub fn destroy_named(name: &str) -> Result<()> {
        let api = library::api()?;
        let cname = to_cstring(name)?;
        dtry!(api, (api.drmaa2_destroy_jsession)(cname.as_ptr()));
        debug!(name, "destroyed session");
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn live(&self) -> Result<(&'static Drmaa2Api, sys::drmaa2_jsession)> {
        let js = self.handle.live()?;

        if !self.open {
            return Err(Error::SessionClosed(self.name.clone()));
        }

        Ok((self.handle.api(), js))
    }

    /// Close the session. Closing a closed session does nothing.
    pub fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }

        let api = self.handle.api();
        let js = self.handle.live()?;
        dtry!(api, (api.drmaa2_close_jsession)(js));
        self.open = false;
        debug!(name = %self.name, "closed session");
        Ok(())
    }

    /// Release the local handle. The session itself lives on in the DRMS.
    /// Freeing twice does nothing.
    pub fn free(&mut self) {
        self.handle.release();
        self.open = false;
    }

    /// Remove this session from the DRMS. Whether the DRMS tolerates this
    /// on a session that is still open is up to it; see
    /// `close_and_destroy`.
    pub fn destroy(&self) -> Result<()> {
        Self::destroy_named(&self.name)
    }

    /// Close, free and destroy the session, in that order.
    pub fn close_and_destroy(mut self) -> Result<()> {
        self.close()?;
        self.free();
        Self::destroy_named(&self.name)
    }

    pub fn contact(&self) -> Result<Option<String>> {
        let (api, js) = self.live()?;
        let ptr = unsafe { (api.drmaa2_jsession_get_contact)(js) };

        if ptr.is_null() {
            check_register(api)?;
        }

        Ok(unsafe { read_owned_string(api, ptr) })
    }

    /// The job categories the DRMS offers.
    pub fn job_categories(&self) -> Result<Vec<String>> {
        let (api, js) = self.live()?;
        string_list_result(api, unsafe { (api.drmaa2_jsession_get_job_categories)(js) })
    }

    /// The jobs in this session, optionally restricted by a filter.
    pub fn jobs(&self, filter: Option<&JobInfo>) -> Result<Vec<Job>> {
        let (api, js) = self.live()?;
        let filter = filter.map(|f| f.as_ptr()).unwrap_or(std::ptr::null_mut());
        let ptr = unsafe { (api.drmaa2_jsession_get_jobs)(js, filter) };

        if ptr.is_null() {
            check_register(api)?;
            return Ok(Vec::new());
        }

        owned_job_list(api, ptr)
    }

    pub fn job_array(&self, id: &str) -> Result<JobArray> {
        let (api, js) = self.live()?;
        let cid = to_cstring(id)?;
        let ptr = unsafe { (api.drmaa2_jsession_get_job_array)(js, cid.as_ptr() as *mut _) };

        if ptr.is_null() {
            return Err(last_error(api));
        }

        Ok(unsafe { JobArray::adopt(api, ptr) })
    }

    /// Submit a job.
    pub fn run(&self, template: &JobTemplate) -> Result<Job> {
        let (api, js) = self.live()?;
        let ptr = unsafe { (api.drmaa2_jsession_run_job)(js, template.as_ptr()) };

        if ptr.is_null() {
            return Err(last_error(api));
        }

        let job = unsafe { Job::adopt(api, ptr) };
        debug!(job = %job, "submitted job");
        Ok(job)
    }

    /// Submit a bulk job, with task indices `begin..=end` in steps of
    /// `step`. `max_parallel` limits how many run at once.
    pub fn run_bulk(
        &self,
        template: &JobTemplate,
        begin: i64,
        end: i64,
        step: i64,
        max_parallel: Option<i64>,
    ) -> Result<JobArray> {
        let (api, js) = self.live()?;
        let ptr = unsafe {
            (api.drmaa2_jsession_run_bulk_jobs)(
                js,
                template.as_ptr(),
                begin,
                end,
                step,
                max_parallel.unwrap_or(sys::DRMAA2_UNSET_NUM),
            )
        };

        if ptr.is_null() {
            return Err(last_error(api));
        }

        Ok(unsafe { JobArray::adopt(api, ptr) })
    }

    /// Wait until any of `jobs` has started. Returns None on timeout.
    pub fn wait_any_started(&self, jobs: &[Job], timeout: Timeout) -> Result<Option<Job>> {
        let list = List::from_items(jobs)?;
        Ok(self.wait_in(&list, timeout, WaitFor::Started)?.map(|(i, _)| jobs[i].clone()))
    }

    /// Wait until any of `jobs` has terminated. Returns None on timeout.
    pub fn wait_any_terminated(&self, jobs: &[Job], timeout: Timeout) -> Result<Option<Job>> {
        let list = List::from_items(jobs)?;
        Ok(self.wait_in(&list, timeout, WaitFor::Terminated)?.map(|(i, _)| jobs[i].clone()))
    }

    /// Iterate over `jobs` as they terminate. Each step waits up to
    /// `timeout`; iteration ends when every job has been seen or a wait
    /// times out.
    pub fn terminated(&self, jobs: &[Job], timeout: Timeout) -> Result<TerminatedJobs> {
        Ok(TerminatedJobs {
            session: self,
            list: List::from_items(jobs)?,
            pending: jobs.to_vec(),
            timeout,
            done: false,
        })
    }

    /// Run one wait against `list`, returning the index of the job it
    /// reports and the list's own entry for it.
    fn wait_in(
        &self,
        list: &List<Job>,
        timeout: Timeout,
        what: WaitFor,
    ) -> Result<Option<(usize, *const libc::c_void)>> {
        let (api, js) = self.live()?;
        let wait = match what {
            WaitFor::Started => api.drmaa2_jsession_wait_any_started,
            WaitFor::Terminated => api.drmaa2_jsession_wait_any_terminated,
        };

        // The job we get back belongs to the library; never free it.
        let ptr = unsafe { wait(js, list.as_ptr(), timeout.to_raw()) };

        if ptr.is_null() {
            let code = last_error_code(api);

            if code == sys::DRMAA2_TIMEOUT {
                let _ = error_for_code(api, code);
                debug!(session = %self.name, %timeout, "wait timed out");
                return Ok(None);
            }

            return Err(error_for_code(api, code));
        }

        let entry = ptr as *const libc::c_void;

        let index = match list.position_by_identity(entry)? {
            Some(i) => Some(i),
            None => list.position_by_value(entry)?,
        };

        match index {
            Some(i) => Ok(Some((i, list.entry(i)?))),
            None => {
                let (id, _) = unsafe { <Job as crate::list::ListEntry>::entry_key(api, entry) };
                Err(Error::WaitSetMismatch(id))
            }
        }
    }
}

impl Drop for JobSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(name = %self.name, error = %e, "failed to close job session");
        }
    }
}

impl fmt::Debug for JobSession {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("JobSession")
            .field("name", &self.name)
            .field("open", &self.open)
            .field("handle", &self.handle)
            .finish()
    }
}

#[derive(Clone, Copy, Debug)]
enum WaitFor {
    Started,
    Terminated,
}

/// Copy out a job list that was handed to us with ownership. Each Job
/// keeps the list, and so its own entry, alive.
pub(crate) fn owned_job_list(api: &'static Drmaa2Api, ptr: sys::drmaa2_list) -> Result<Vec<Job>> {
    let list: List<Job> = unsafe { List::adopt(api, ptr, true, None) };
    list.to_vec()
}


/// Jobs of a wait set, yielded as they terminate. See
/// `JobSession::terminated`.
pub struct TerminatedJobs<'a> {
    session: &'a JobSession,
    list: List<Job>,
    pending: Vec<Job>,
    timeout: Timeout,
    done: bool,
}

impl<'a> TerminatedJobs<'a> {
    /// The jobs not yet seen to terminate.
    pub fn pending(&self) -> &[Job] {
        &self.pending
    }
}

impl<'a> Iterator for TerminatedJobs<'a> {
    type Item = Result<Job>;

    fn next(&mut self) -> Option<Result<Job>> {
        if self.done || self.pending.is_empty() {
            return None;
        }

        let (index, entry) = match self.session.wait_in(&self.list, self.timeout, WaitFor::Terminated) {
            Ok(Some(found)) => found,
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        if let Err(e) = self.list.remove_by_identity(entry) {
            self.done = true;
            return Some(Err(e));
        }

        let job = self.pending.remove(index);
        trace!(job = %job, remaining = self.pending.len(), "job terminated");
        Some(Ok(job))
    }
}
