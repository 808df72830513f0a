// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

/*! Job templates.

A `JobTemplate` describes what to run and how. Every field starts out
unset; set only what you need. The placeholders `HOME_DIR`, `WORKING_DIR`
and `PARAMETRIC_INDEX` may be used inside path fields and are expanded by
the DRMS.

*/

use itertools::Itertools;
use libc::c_void;
use std::fmt;
use sys::{self, Drmaa2Api};

use crate::enums::{Cpu, Os};
use crate::error::{last_error, Result};
use crate::extension::{Extensible, RecordKind};
use crate::fields::Overlay;
use crate::handle::NativeHandle;
use crate::library;

/// Expands to the user's home directory on the execution host.
pub const HOME_DIR: &str = sys::DRMAA2_HOME_DIR;

/// Expands to the job's working directory.
pub const WORKING_DIR: &str = sys::DRMAA2_WORKING_DIR;

/// Expands to a bulk job's task index.
pub const PARAMETRIC_INDEX: &str = sys::DRMAA2_INDEX;

pub struct JobTemplate {
    handle: NativeHandle<sys::drmaa2_jtemplate_s>,
    overlay: Overlay,
}

impl JobTemplate {
    pub fn new() -> Result<JobTemplate> {
        let api = library::api()?;
        let ptr = unsafe { (api.drmaa2_jtemplate_create)() };

        if ptr.is_null() {
            return Err(last_error(api));
        }

        Ok(unsafe { Self::adopt(api, ptr) })
    }

    /// Take ownership of a template the library allocated.
    pub(crate) unsafe fn adopt(api: &'static Drmaa2Api, ptr: sys::drmaa2_jtemplate) -> JobTemplate {
        JobTemplate {
            handle: NativeHandle::owned(api, ptr, api.drmaa2_jtemplate_free, "job template"),
            overlay: Overlay::default(),
        }
    }

    fn api(&self) -> &'static Drmaa2Api {
        self.handle.api()
    }

    pub(crate) fn as_ptr(&self) -> sys::drmaa2_jtemplate {
        self.handle.as_ptr()
    }

    fn raw(&self) -> &sys::drmaa2_jtemplate_s {
        unsafe { &*self.handle.as_ptr() }
    }

    fn raw_mut(&mut self) -> *mut sys::drmaa2_jtemplate_s {
        self.handle.as_ptr()
    }

    string_field! {
        /// The program to run.
        remote_command, set_remote_command, remoteCommand
    }
    string_list_field! {
        /// Command-line arguments for the remote command.
        args, set_args, args
    }
    bool_field! {
        /// Submit the job in the held state.
        submit_as_hold, set_submit_as_hold, submitAsHold
    }
    bool_field! { rerunnable, set_rerunnable, rerunnable }
    dict_field! {
        /// Environment variables for the job.
        job_environment, set_job_environment, jobEnvironment
    }
    string_field! { working_directory, set_working_directory, workingDirectory }
    string_field! { job_category, set_job_category, jobCategory }
    string_list_field! { email, set_email, email }
    bool_field! { email_on_started, set_email_on_started, emailOnStarted }
    bool_field! { email_on_terminated, set_email_on_terminated, emailOnTerminated }
    string_field! { job_name, set_job_name, jobName }
    string_field! {
        /// Where standard input comes from, as `[host]:path`.
        input_path, set_input_path, inputPath
    }
    string_field! { output_path, set_output_path, outputPath }
    string_field! { error_path, set_error_path, errorPath }
    bool_field! {
        /// Merge standard error into standard output.
        join_files, set_join_files, joinFiles
    }
    string_field! { reservation_id, set_reservation_id, reservationId }
    string_field! { queue_name, set_queue_name, queueName }
    num_field! { min_slots, set_min_slots, minSlots }
    num_field! { max_slots, set_max_slots, maxSlots }
    num_field! { priority, set_priority, priority }
    string_list_field! { candidate_machines, set_candidate_machines, candidateMachines }
    num_field! {
        /// Minimum physical memory, in kilobytes.
        min_phys_memory, set_min_phys_memory, minPhysMemory
    }
    enum_field! { machine_os, set_machine_os, machineOS, Os }
    enum_field! { machine_arch, set_machine_arch, machineArch, Cpu }
    time_field! { start_time, set_start_time, startTime }
    time_field! { deadline_time, set_deadline_time, deadlineTime }
    dict_field! {
        /// Files to copy in before the job runs, source to destination.
        stage_in_files, set_stage_in_files, stageInFiles
    }
    dict_field! { stage_out_files, set_stage_out_files, stageOutFiles }
    dict_field! { resource_limits, set_resource_limits, resourceLimits }
    string_field! { accounting_id, set_accounting_id, accountingId }
}

impl Extensible for JobTemplate {
    const RECORD_KIND: RecordKind = RecordKind::JobTemplate;

    fn extension_api(&self) -> &'static Drmaa2Api {
        self.api()
    }

    fn instance(&self) -> *mut c_void {
        self.handle.as_ptr() as *mut c_void
    }
}

impl Drop for JobTemplate {
    fn drop(&mut self) {
        unsafe { self.overlay.detach() };
        // `handle` frees the record after this.
    }
}

impl fmt::Debug for JobTemplate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "JobTemplate({})", self)
    }
}

impl fmt::Display for JobTemplate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let args = self.args().unwrap_or_default();
        write!(
            f,
            "remote_command={:?} args=[{}]",
            self.remote_command().unwrap_or_default(),
            args.iter().join(", ")
        )?;

        if let Some(name) = self.job_name() {
            write!(f, " job_name={:?}", name)?;
        }

        Ok(())
    }
}
