// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

//! Snapshots of job state, also used as filters for job queries.

use libc::c_void;
use std::fmt;
use sys::{self, Drmaa2Api};

use crate::enums::JobState;
use crate::error::{last_error, Result};
use crate::extension::{Extensible, RecordKind};
use crate::fields::Overlay;
use crate::handle::NativeHandle;
use crate::library;

/// A `drmaa2_jinfo`.
///
/// Returned by `Job::info`. A fresh one with a few fields set serves as a
/// filter for `JobSession::jobs` and `MonitorSession::all_jobs`.
pub struct JobInfo {
    handle: NativeHandle<sys::drmaa2_jinfo_s>,
    overlay: Overlay,
}

impl JobInfo {
    pub fn new() -> Result<JobInfo> {
        let api = library::api()?;
        let ptr = unsafe { (api.drmaa2_jinfo_create)() };

        if ptr.is_null() {
            return Err(last_error(api));
        }

        Ok(unsafe { Self::adopt(api, ptr) })
    }

    pub(crate) unsafe fn adopt(api: &'static Drmaa2Api, ptr: sys::drmaa2_jinfo) -> JobInfo {
        JobInfo {
            handle: NativeHandle::owned(api, ptr, api.drmaa2_jinfo_free, "job info"),
            overlay: Overlay::default(),
        }
    }

    fn api(&self) -> &'static Drmaa2Api {
        self.handle.api()
    }

    pub(crate) fn as_ptr(&self) -> sys::drmaa2_jinfo {
        self.handle.as_ptr()
    }

    fn raw(&self) -> &sys::drmaa2_jinfo_s {
        unsafe { &*self.handle.as_ptr() }
    }

    fn raw_mut(&mut self) -> *mut sys::drmaa2_jinfo_s {
        self.handle.as_ptr()
    }

    string_field! { job_id, set_job_id, jobId }
    int_field! {
        /// The job's exit status, once it has one.
        exit_status, set_exit_status, exitStatus
    }
    string_field! { terminating_signal, set_terminating_signal, terminatingSignal }
    string_field! { annotation, set_annotation, annotation }
    enum_field! { job_state, set_job_state, jobState, JobState }
    string_field! {
        /// The DRMS's own, finer-grained name for the state.
        job_sub_state, set_job_sub_state, jobSubState
    }
    string_list_field! { allocated_machines, set_allocated_machines, allocatedMachines }
    string_field! { submission_machine, set_submission_machine, submissionMachine }
    string_field! { job_owner, set_job_owner, jobOwner }
    num_field! { slots, set_slots, slots }
    string_field! { queue_name, set_queue_name, queueName }
    time_field! { wallclock_time, set_wallclock_time, wallclockTime }
    num_field! {
        /// Accumulated CPU time, in seconds.
        cpu_time, set_cpu_time, cpuTime
    }
    time_field! { submission_time, set_submission_time, submissionTime }
    time_field! { dispatch_time, set_dispatch_time, dispatchTime }
    time_field! { finish_time, set_finish_time, finishTime }
}

impl Extensible for JobInfo {
    const RECORD_KIND: RecordKind = RecordKind::JobInfo;

    fn extension_api(&self) -> &'static Drmaa2Api {
        self.api()
    }

    fn instance(&self) -> *mut c_void {
        self.handle.as_ptr() as *mut c_void
    }
}

impl Drop for JobInfo {
    fn drop(&mut self) {
        unsafe { self.overlay.detach() };
    }
}

impl fmt::Debug for JobInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("JobInfo")
            .field("job_id", &self.job_id())
            .field("job_state", &self.job_state())
            .field("exit_status", &self.exit_status())
            .field("job_owner", &self.job_owner())
            .field("queue_name", &self.queue_name())
            .finish()
    }
}
