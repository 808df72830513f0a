// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT license.

//! Low-level bindings to the DRMAA2 C library, `libdrmaa2`.
//!
//! DRMAA2 is the Open Grid Forum's standard C interface to batch-queuing
//! systems. These declarations follow the `drmaa2.h` header distributed with
//! Univa Grid Engine, including its implementation-specific structure
//! layouts for jobs, job arrays and sessions.
//!
//! Unlike most `-sys` crates this one does not link against the library at
//! build time. Grid Engine installs `libdrmaa2.so` below `$SGE_ROOT`, so the
//! entry points are resolved at runtime into a [`Drmaa2Api`] table. These
//! bindings provide nothing beyond the barest minimum needed to interface to
//! the C code unsafely. Use a higher-level Rust crate in application code.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

extern crate libc;
extern crate libloading;

use libc::{c_char, c_float, c_int, c_long, c_longlong, c_void, time_t};
use libloading::Library;
use std::ffi::OsStr;
use std::ops::Deref;


/* Variables which will be resolved during job submission. */
pub const DRMAA2_HOME_DIR: &str = "$DRMAA2_HOME_DIR$";
pub const DRMAA2_INDEX: &str = "$DRMAA2_INDEX$";
pub const DRMAA2_WORKING_DIR: &str = "$DRMAA2_WORKING_DIR$";

/* Special time values, also used as waiting timeouts. */
pub const DRMAA2_ZERO_TIME: time_t = 0;
pub const DRMAA2_INFINITE_TIME: time_t = -1;
pub const DRMAA2_NOW: time_t = -2;

pub const DRMAA2_UNSET_BOOL: drmaa2_bool = DRMAA2_FALSE;
pub const DRMAA2_UNSET_ENUM: c_int = -1;
pub const DRMAA2_UNSET_NUM: c_longlong = -1;
pub const DRMAA2_UNSET_TIME: time_t = -3;

pub type drmaa2_bool = c_int;
pub const DRMAA2_FALSE: drmaa2_bool = 0;
pub const DRMAA2_TRUE: drmaa2_bool = 1;

pub type drmaa2_capability = c_int;
pub const DRMAA2_UNSET_CAPABILITY: drmaa2_capability = -1;
pub const DRMAA2_ADVANCE_RESERVATION: drmaa2_capability = 0;
pub const DRMAA2_RESERVE_SLOTS: drmaa2_capability = 1;
pub const DRMAA2_CALLBACK: drmaa2_capability = 2;
pub const DRMAA2_BULK_JOBS_MAXPARALLEL: drmaa2_capability = 3;
pub const DRMAA2_JT_EMAIL: drmaa2_capability = 4;
pub const DRMAA2_JT_STAGING: drmaa2_capability = 5;
pub const DRMAA2_JT_DEADLINE: drmaa2_capability = 6;
pub const DRMAA2_JT_MAXSLOTS: drmaa2_capability = 7;
pub const DRMAA2_JT_ACCOUNTINGID: drmaa2_capability = 8;
pub const DRMAA2_RT_STARTNOW: drmaa2_capability = 9;
pub const DRMAA2_RT_DURATION: drmaa2_capability = 10;
pub const DRMAA2_RT_MACHINEOS: drmaa2_capability = 11;
pub const DRMAA2_RT_MACHINEARCH: drmaa2_capability = 12;

pub type drmaa2_cpu = c_int;
pub const DRMAA2_UNSET_CPU: drmaa2_cpu = -1;
pub const DRMAA2_OTHER_CPU: drmaa2_cpu = 0;
pub const DRMAA2_ALPHA: drmaa2_cpu = 1;
pub const DRMAA2_ARM: drmaa2_cpu = 2;
pub const DRMAA2_ARM64: drmaa2_cpu = 3;
pub const DRMAA2_CELL: drmaa2_cpu = 4;
pub const DRMAA2_PARISC: drmaa2_cpu = 5;
pub const DRMAA2_PARISC64: drmaa2_cpu = 6;
pub const DRMAA2_X86: drmaa2_cpu = 7;
pub const DRMAA2_X64: drmaa2_cpu = 8;
pub const DRMAA2_IA64: drmaa2_cpu = 9;
pub const DRMAA2_MIPS: drmaa2_cpu = 10;
pub const DRMAA2_MIPS64: drmaa2_cpu = 11;
pub const DRMAA2_PPC: drmaa2_cpu = 12;
pub const DRMAA2_PPC64: drmaa2_cpu = 13;
pub const DRMAA2_SPARC: drmaa2_cpu = 14;
pub const DRMAA2_SPARC64: drmaa2_cpu = 15;

pub type drmaa2_error = c_int;
pub const DRMAA2_UNSET_ERROR: drmaa2_error = -1;
pub const DRMAA2_SUCCESS: drmaa2_error = 0;
pub const DRMAA2_DENIED_BY_DRMS: drmaa2_error = 1;
pub const DRMAA2_DRM_COMMUNICATION: drmaa2_error = 2;
pub const DRMAA2_TRY_LATER: drmaa2_error = 3;
pub const DRMAA2_SESSION_MANAGEMENT: drmaa2_error = 4;
pub const DRMAA2_TIMEOUT: drmaa2_error = 5;
pub const DRMAA2_INTERNAL: drmaa2_error = 6;
pub const DRMAA2_INVALID_ARGUMENT: drmaa2_error = 7;
pub const DRMAA2_INVALID_SESSION: drmaa2_error = 8;
pub const DRMAA2_INVALID_STATE: drmaa2_error = 9;
pub const DRMAA2_OUT_OF_RESOURCE: drmaa2_error = 10;
pub const DRMAA2_UNSUPPORTED_ATTRIBUTE: drmaa2_error = 11;
pub const DRMAA2_UNSUPPORTED_OPERATION: drmaa2_error = 12;
pub const DRMAA2_IMPLEMENTATION_SPECIFIC: drmaa2_error = 13;
pub const DRMAA2_LASTERROR: drmaa2_error = 14;

pub type drmaa2_event = c_int;
pub const DRMAA2_UNSET_EVENT: drmaa2_event = -1;
pub const DRMAA2_NEW_STATE: drmaa2_event = 0;
pub const DRMAA2_MIGRATED: drmaa2_event = 1;
pub const DRMAA2_ATTRIBUTE_CHANGE: drmaa2_event = 2;

pub type drmaa2_listtype = c_int;
pub const DRMAA2_UNSET_LISTTYPE: drmaa2_listtype = -1;
pub const DRMAA2_STRINGLIST: drmaa2_listtype = 0;
pub const DRMAA2_JOBLIST: drmaa2_listtype = 1;
pub const DRMAA2_QUEUEINFOLIST: drmaa2_listtype = 2;
pub const DRMAA2_MACHINEINFOLIST: drmaa2_listtype = 3;
pub const DRMAA2_SLOTINFOLIST: drmaa2_listtype = 4;
pub const DRMAA2_RESERVATIONLIST: drmaa2_listtype = 5;

pub type drmaa2_os = c_int;
pub const DRMAA2_UNSET_OS: drmaa2_os = -1;
pub const DRMAA2_OTHER_OS: drmaa2_os = 0;
pub const DRMAA2_AIX: drmaa2_os = 1;
pub const DRMAA2_BSD: drmaa2_os = 2;
pub const DRMAA2_LINUX: drmaa2_os = 3;
pub const DRMAA2_HPUX: drmaa2_os = 4;
pub const DRMAA2_IRIX: drmaa2_os = 5;
pub const DRMAA2_MACOS: drmaa2_os = 6;
pub const DRMAA2_SUNOS: drmaa2_os = 7;
pub const DRMAA2_TRU64: drmaa2_os = 8;
pub const DRMAA2_UNIXWARE: drmaa2_os = 9;
pub const DRMAA2_WIN: drmaa2_os = 10;
pub const DRMAA2_WINNT: drmaa2_os = 11;

pub type drmaa2_jstate = c_int;
pub const DRMAA2_UNSET_JSTATE: drmaa2_jstate = -1;
pub const DRMAA2_UNDETERMINED: drmaa2_jstate = 0;
pub const DRMAA2_QUEUED: drmaa2_jstate = 1;
pub const DRMAA2_QUEUED_HELD: drmaa2_jstate = 2;
pub const DRMAA2_RUNNING: drmaa2_jstate = 3;
pub const DRMAA2_SUSPENDED: drmaa2_jstate = 4;
pub const DRMAA2_REQUEUED: drmaa2_jstate = 5;
pub const DRMAA2_REQUEUED_HELD: drmaa2_jstate = 6;
pub const DRMAA2_DONE: drmaa2_jstate = 7;
pub const DRMAA2_FAILED: drmaa2_jstate = 8;

pub type drmaa2_string = *mut c_char;

#[repr(C)]
pub struct drmaa2_list_s {
    _private: [u8; 0],
}

pub type drmaa2_list = *mut drmaa2_list_s;
pub type drmaa2_string_list = drmaa2_list;
pub type drmaa2_j_list = drmaa2_list;
pub type drmaa2_queueinfo_list = drmaa2_list;
pub type drmaa2_machineinfo_list = drmaa2_list;
pub type drmaa2_slotinfo_list = drmaa2_list;
pub type drmaa2_r_list = drmaa2_list;

pub type drmaa2_list_entryfree = Option<unsafe extern "C" fn(value: *mut *mut c_void)>;

#[repr(C)]
pub struct drmaa2_dict_s {
    _private: [u8; 0],
}

pub type drmaa2_dict = *mut drmaa2_dict_s;

pub type drmaa2_dict_entryfree =
    Option<unsafe extern "C" fn(key: *mut *mut c_char, val: *mut *mut c_char)>;

#[repr(C)]
#[derive(Debug)]
pub struct drmaa2_jinfo_s {
    pub jobId: drmaa2_string,
    pub exitStatus: c_int,
    pub terminatingSignal: drmaa2_string,
    pub annotation: drmaa2_string,
    pub jobState: drmaa2_jstate,
    pub jobSubState: drmaa2_string,
    pub allocatedMachines: drmaa2_string_list,
    pub submissionMachine: drmaa2_string,
    pub jobOwner: drmaa2_string,
    pub slots: c_longlong,
    pub queueName: drmaa2_string,
    pub wallclockTime: time_t,
    pub cpuTime: c_longlong,
    pub submissionTime: time_t,
    pub dispatchTime: time_t,
    pub finishTime: time_t,
    pub implementationSpecific: *mut c_void,
}

pub type drmaa2_jinfo = *mut drmaa2_jinfo_s;

#[repr(C)]
#[derive(Debug)]
pub struct drmaa2_slotinfo_s {
    pub machineName: drmaa2_string,
    pub slots: c_longlong,
}

pub type drmaa2_slotinfo = *mut drmaa2_slotinfo_s;

#[repr(C)]
#[derive(Debug)]
pub struct drmaa2_rinfo_s {
    pub reservationId: drmaa2_string,
    pub reservationName: drmaa2_string,
    pub reservedStartTime: time_t,
    pub reservedEndTime: time_t,
    pub usersACL: drmaa2_string_list,
    pub reservedSlots: c_longlong,
    pub reservedMachines: drmaa2_slotinfo_list,
    pub implementationSpecific: *mut c_void,
}

pub type drmaa2_rinfo = *mut drmaa2_rinfo_s;

/// Grid Engine's implementation-specific job template extension.
#[repr(C)]
#[derive(Debug)]
pub struct jtImplementationSpecific_s {
    pub uge_jt_pe: drmaa2_string,
}

pub type jtImplementationSpecific = *mut jtImplementationSpecific_s;

#[repr(C)]
#[derive(Debug)]
pub struct drmaa2_jtemplate_s {
    pub remoteCommand: drmaa2_string,
    pub args: drmaa2_string_list,
    pub submitAsHold: drmaa2_bool,
    pub rerunnable: drmaa2_bool,
    pub jobEnvironment: drmaa2_dict,
    pub workingDirectory: drmaa2_string,
    pub jobCategory: drmaa2_string,
    pub email: drmaa2_string_list,
    pub emailOnStarted: drmaa2_bool,
    pub emailOnTerminated: drmaa2_bool,
    pub jobName: drmaa2_string,
    pub inputPath: drmaa2_string,
    pub outputPath: drmaa2_string,
    pub errorPath: drmaa2_string,
    pub joinFiles: drmaa2_bool,
    pub reservationId: drmaa2_string,
    pub queueName: drmaa2_string,
    pub minSlots: c_longlong,
    pub maxSlots: c_longlong,
    pub priority: c_longlong,
    pub candidateMachines: drmaa2_string_list,
    pub minPhysMemory: c_longlong,
    pub machineOS: drmaa2_os,
    pub machineArch: drmaa2_cpu,
    pub startTime: time_t,
    pub deadlineTime: time_t,
    pub stageInFiles: drmaa2_dict,
    pub stageOutFiles: drmaa2_dict,
    pub resourceLimits: drmaa2_dict,
    pub accountingId: drmaa2_string,
    pub implementationSpecific: *mut c_void,
}

pub type drmaa2_jtemplate = *mut drmaa2_jtemplate_s;

#[repr(C)]
#[derive(Debug)]
pub struct drmaa2_rtemplate_s {
    pub reservationName: drmaa2_string,
    pub startTime: time_t,
    pub endTime: time_t,
    pub duration: time_t,
    pub minSlots: c_longlong,
    pub maxSlots: c_longlong,
    pub jobCategory: drmaa2_string,
    pub usersACL: drmaa2_string_list,
    pub candidateMachines: drmaa2_string_list,
    pub minPhysMemory: c_longlong,
    pub machineOS: drmaa2_os,
    pub machineArch: drmaa2_cpu,
    pub implementationSpecific: *mut c_void,
}

pub type drmaa2_rtemplate = *mut drmaa2_rtemplate_s;

#[repr(C)]
#[derive(Debug)]
pub struct drmaa2_notification_s {
    pub event: drmaa2_event,
    pub jobId: drmaa2_string,
    pub sessionName: drmaa2_string,
    pub jobState: drmaa2_jstate,
}

pub type drmaa2_notification = *mut drmaa2_notification_s;

#[repr(C)]
#[derive(Debug)]
pub struct drmaa2_queueinfo_s {
    pub name: drmaa2_string,
    pub implementationSpecific: *mut c_void,
}

pub type drmaa2_queueinfo = *mut drmaa2_queueinfo_s;

#[repr(C)]
#[derive(Debug)]
pub struct drmaa2_version_s {
    pub major: drmaa2_string,
    pub minor: drmaa2_string,
}

pub type drmaa2_version = *mut drmaa2_version_s;

#[repr(C)]
#[derive(Debug)]
pub struct drmaa2_machineinfo_s {
    pub name: drmaa2_string,
    pub available: drmaa2_bool,
    pub sockets: c_longlong,
    pub coresPerSocket: c_longlong,
    pub threadsPerCore: c_longlong,
    pub load: c_float,
    pub physMemory: c_longlong,
    pub virtMemory: c_longlong,
    pub machineArch: drmaa2_cpu,
    pub machineOSVersion: drmaa2_version,
    pub machineOS: drmaa2_os,
    pub implementationSpecific: *mut c_void,
}

pub type drmaa2_machineinfo = *mut drmaa2_machineinfo_s;

pub type drmaa2_callback = Option<unsafe extern "C" fn(notification: *mut drmaa2_notification)>;

/* Univa Grid Engine specific structure definitions. */

#[repr(C)]
#[derive(Debug)]
pub struct drmaa2_j_s {
    pub id: drmaa2_string,
    pub session_name: drmaa2_string,
}

pub type drmaa2_j = *mut drmaa2_j_s;

#[repr(C)]
#[derive(Debug)]
pub struct drmaa2_jarray_s {
    pub id: drmaa2_string,
    pub job_list: drmaa2_j_list,
    pub session_name: drmaa2_string,
}

pub type drmaa2_jarray = *mut drmaa2_jarray_s;

#[repr(C)]
#[derive(Debug)]
pub struct drmaa2_jsession_s {
    pub contact: drmaa2_string,
    pub name: drmaa2_string,
}

pub type drmaa2_jsession = *mut drmaa2_jsession_s;

#[repr(C)]
#[derive(Debug)]
pub struct drmaa2_msession_s {
    pub name: drmaa2_string,
}

pub type drmaa2_msession = *mut drmaa2_msession_s;

#[repr(C)]
pub struct drmaa2_rsession_s {
    _private: [u8; 0],
}

pub type drmaa2_rsession = *mut drmaa2_rsession_s;

#[repr(C)]
pub struct drmaa2_r_s {
    _private: [u8; 0],
}

pub type drmaa2_r = *mut drmaa2_r_s;


/// Declare the function table.
///
/// For every entry this generates a field of `Drmaa2Fns`, the code that
/// resolves it from a loaded library, and an inert stand-in that returns a
/// zeroed value. Signatures must match `drmaa2.h` exactly: a wrong pointer
/// depth or integer width corrupts memory rather than failing.
macro_rules! drmaa2_api {
    ($(fn $name:ident($($arg:ident: $ty:ty),*) $(-> $ret:ty)?;)*) => {
        /// The entry points of `libdrmaa2`, one field per C function.
        #[derive(Clone, Copy)]
        pub struct Drmaa2Fns {
            $(pub $name: unsafe extern "C" fn($($ty),*) $(-> $ret)?,)*
        }

        impl Drmaa2Fns {
            unsafe fn resolve(lib: &Library) -> Result<Self, libloading::Error> {
                Ok(Drmaa2Fns {
                    $($name: *lib.get::<unsafe extern "C" fn($($ty),*) $(-> $ret)?>(
                        concat!(stringify!($name), "\0").as_bytes()
                    )?,)*
                })
            }

            /// A table whose every entry ignores its arguments and returns a
            /// zeroed value (a null pointer, `DRMAA2_SUCCESS`, or nothing).
            ///
            /// This is a starting point for substituting individual entries,
            /// typically in tests.
            pub fn inert() -> Self {
                $(
                    #[allow(unused_variables)]
                    unsafe extern "C" fn $name($($arg: $ty),*) $(-> $ret)? {
                        ::std::mem::zeroed()
                    }
                )*

                Drmaa2Fns {
                    $($name: $name,)*
                }
            }
        }
    };
}

drmaa2_api! {
    fn drmaa2_string_free(string: *mut drmaa2_string);

    fn drmaa2_list_create(t: drmaa2_listtype, callback: drmaa2_list_entryfree) -> drmaa2_list;
    fn drmaa2_list_free(l: *mut drmaa2_list);
    fn drmaa2_list_get(l: drmaa2_list, pos: c_long) -> *const c_void;
    fn drmaa2_list_add(l: drmaa2_list, value: *const c_void) -> drmaa2_error;
    fn drmaa2_list_del(l: drmaa2_list, pos: c_long) -> drmaa2_error;
    fn drmaa2_list_size(l: drmaa2_list) -> c_long;

    fn drmaa2_lasterror() -> drmaa2_error;
    fn drmaa2_lasterror_text() -> drmaa2_string;

    fn drmaa2_dict_create(callback: drmaa2_dict_entryfree) -> drmaa2_dict;
    fn drmaa2_dict_free(dict: *mut drmaa2_dict);
    fn drmaa2_dict_list(dict: drmaa2_dict) -> drmaa2_string_list;
    fn drmaa2_dict_has(dict: drmaa2_dict, key: *const c_char) -> drmaa2_bool;
    fn drmaa2_dict_get(dict: drmaa2_dict, key: *const c_char) -> *const c_char;
    fn drmaa2_dict_del(dict: drmaa2_dict, key: *const c_char) -> drmaa2_error;
    fn drmaa2_dict_set(dict: drmaa2_dict, key: *const c_char, val: *const c_char) -> drmaa2_error;

    fn drmaa2_jinfo_create() -> drmaa2_jinfo;
    fn drmaa2_jinfo_free(ji: *mut drmaa2_jinfo);
    fn drmaa2_slotinfo_free(si: *mut drmaa2_slotinfo);
    fn drmaa2_rinfo_free(ri: *mut drmaa2_rinfo);
    fn drmaa2_jtemplate_create() -> drmaa2_jtemplate;
    fn drmaa2_jtemplate_free(jt: *mut drmaa2_jtemplate);
    fn drmaa2_rtemplate_create() -> drmaa2_rtemplate;
    fn drmaa2_rtemplate_free(rt: *mut drmaa2_rtemplate);
    fn drmaa2_notification_free(notification: *mut drmaa2_notification);
    fn drmaa2_queueinfo_free(qi: *mut drmaa2_queueinfo);
    fn drmaa2_version_free(version: *mut drmaa2_version);
    fn drmaa2_machineinfo_free(mi: *mut drmaa2_machineinfo);

    fn drmaa2_jtemplate_impl_spec() -> drmaa2_string_list;
    fn drmaa2_jinfo_impl_spec() -> drmaa2_string_list;
    fn drmaa2_rtemplate_impl_spec() -> drmaa2_string_list;
    fn drmaa2_rinfo_impl_spec() -> drmaa2_string_list;
    fn drmaa2_queueinfo_impl_spec() -> drmaa2_string_list;
    fn drmaa2_machineinfo_impl_spec() -> drmaa2_string_list;
    fn drmaa2_notification_impl_spec() -> drmaa2_string_list;

    fn drmaa2_get_instance_value(instance: *const c_void, name: *const c_char) -> drmaa2_string;
    fn drmaa2_describe_attribute(instance: *const c_void, name: *const c_char) -> drmaa2_string;
    fn drmaa2_set_instance_value(instance: *mut c_void, name: *const c_char, value: *const c_char) -> drmaa2_error;

    fn drmaa2_jsession_free(js: *mut drmaa2_jsession);
    fn drmaa2_rsession_free(rs: *mut drmaa2_rsession);
    fn drmaa2_msession_free(ms: *mut drmaa2_msession);
    fn drmaa2_j_free(j: *mut drmaa2_j);
    fn drmaa2_jarray_free(ja: *mut drmaa2_jarray);

    fn drmaa2_rsession_get_contact(rs: drmaa2_rsession) -> drmaa2_string;
    fn drmaa2_rsession_get_session_name(rs: drmaa2_rsession) -> drmaa2_string;
    fn drmaa2_rsession_get_reservation(rs: drmaa2_rsession, reservation_id: drmaa2_string) -> drmaa2_r;
    fn drmaa2_rsession_request_reservation(rs: drmaa2_rsession, rt: drmaa2_rtemplate) -> drmaa2_r;
    fn drmaa2_rsession_get_reservations(rs: drmaa2_rsession) -> drmaa2_r_list;

    fn drmaa2_r_get_id(r: drmaa2_r) -> drmaa2_string;
    fn drmaa2_r_get_session_name(r: drmaa2_r) -> drmaa2_string;
    fn drmaa2_r_get_reservation_template(r: drmaa2_r) -> drmaa2_rtemplate;
    fn drmaa2_r_get_info(r: drmaa2_r) -> drmaa2_rinfo;
    fn drmaa2_r_terminate(r: drmaa2_r) -> drmaa2_error;

    fn drmaa2_jarray_get_id(ja: drmaa2_jarray) -> drmaa2_string;
    fn drmaa2_jarray_get_jobs(ja: drmaa2_jarray) -> drmaa2_j_list;
    fn drmaa2_jarray_get_session_name(ja: drmaa2_jarray) -> drmaa2_string;
    fn drmaa2_jarray_get_jtemplate(ja: drmaa2_jarray) -> drmaa2_jtemplate;
    fn drmaa2_jarray_suspend(ja: drmaa2_jarray) -> drmaa2_error;
    fn drmaa2_jarray_resume(ja: drmaa2_jarray) -> drmaa2_error;
    fn drmaa2_jarray_hold(ja: drmaa2_jarray) -> drmaa2_error;
    fn drmaa2_jarray_release(ja: drmaa2_jarray) -> drmaa2_error;
    fn drmaa2_jarray_terminate(ja: drmaa2_jarray) -> drmaa2_error;

    fn drmaa2_jsession_get_contact(js: drmaa2_jsession) -> drmaa2_string;
    fn drmaa2_jsession_get_session_name(js: drmaa2_jsession) -> drmaa2_string;
    fn drmaa2_jsession_get_job_categories(js: drmaa2_jsession) -> drmaa2_string_list;
    fn drmaa2_jsession_get_jobs(js: drmaa2_jsession, filter: drmaa2_jinfo) -> drmaa2_j_list;
    fn drmaa2_jsession_get_job_array(js: drmaa2_jsession, job_array_id: drmaa2_string) -> drmaa2_jarray;
    fn drmaa2_jsession_run_job(js: drmaa2_jsession, jt: drmaa2_jtemplate) -> drmaa2_j;
    fn drmaa2_jsession_run_bulk_jobs(
        js: drmaa2_jsession,
        jt: drmaa2_jtemplate,
        begin_index: c_longlong,
        end_index: c_longlong,
        step: c_longlong,
        max_parallel: c_longlong
    ) -> drmaa2_jarray;
    fn drmaa2_jsession_wait_any_started(js: drmaa2_jsession, jobs: drmaa2_j_list, timeout: time_t) -> drmaa2_j;
    fn drmaa2_jsession_wait_any_terminated(js: drmaa2_jsession, jobs: drmaa2_j_list, timeout: time_t) -> drmaa2_j;

    fn drmaa2_j_suspend(j: drmaa2_j) -> drmaa2_error;
    fn drmaa2_j_resume(j: drmaa2_j) -> drmaa2_error;
    fn drmaa2_j_hold(j: drmaa2_j) -> drmaa2_error;
    fn drmaa2_j_release(j: drmaa2_j) -> drmaa2_error;
    fn drmaa2_j_terminate(j: drmaa2_j) -> drmaa2_error;
    fn drmaa2_j_reap(j: drmaa2_j) -> drmaa2_error;
    fn drmaa2_j_get_id(j: drmaa2_j) -> drmaa2_string;
    fn drmaa2_j_get_session_name(j: drmaa2_j) -> drmaa2_string;
    fn drmaa2_j_get_jtemplate(j: drmaa2_j) -> drmaa2_jtemplate;
    fn drmaa2_j_get_state(j: drmaa2_j, substate: *mut drmaa2_string) -> drmaa2_jstate;
    fn drmaa2_j_get_info(j: drmaa2_j) -> drmaa2_jinfo;
    fn drmaa2_j_wait_started(j: drmaa2_j, timeout: time_t) -> drmaa2_error;
    fn drmaa2_j_wait_terminated(j: drmaa2_j, timeout: time_t) -> drmaa2_error;

    fn drmaa2_msession_get_all_reservations(ms: drmaa2_msession) -> drmaa2_r_list;
    fn drmaa2_msession_get_all_jobs(ms: drmaa2_msession, filter: drmaa2_jinfo) -> drmaa2_j_list;
    fn drmaa2_msession_get_all_queues(ms: drmaa2_msession, names: drmaa2_string_list) -> drmaa2_queueinfo_list;
    fn drmaa2_msession_get_all_machines(ms: drmaa2_msession, names: drmaa2_string_list) -> drmaa2_machineinfo_list;

    fn drmaa2_get_drms_name() -> drmaa2_string;
    fn drmaa2_get_drms_version() -> drmaa2_version;
    fn drmaa2_supports(c: drmaa2_capability) -> drmaa2_bool;
    fn drmaa2_create_jsession(session_name: *const c_char, contact: *const c_char) -> drmaa2_jsession;
    fn drmaa2_create_rsession(session_name: *const c_char, contact: *const c_char) -> drmaa2_rsession;
    fn drmaa2_open_jsession(session_name: *const c_char) -> drmaa2_jsession;
    fn drmaa2_open_rsession(session_name: *const c_char) -> drmaa2_rsession;
    fn drmaa2_open_msession(session_name: *const c_char) -> drmaa2_msession;
    fn drmaa2_close_jsession(js: drmaa2_jsession) -> drmaa2_error;
    fn drmaa2_close_rsession(rs: drmaa2_rsession) -> drmaa2_error;
    fn drmaa2_close_msession(ms: drmaa2_msession) -> drmaa2_error;
    fn drmaa2_destroy_jsession(session_name: *const c_char) -> drmaa2_error;
    fn drmaa2_destroy_rsession(session_name: *const c_char) -> drmaa2_error;
    fn drmaa2_get_jsession_names() -> drmaa2_string_list;
    fn drmaa2_get_rsession_names() -> drmaa2_string_list;
    fn drmaa2_register_event_notification(callback: drmaa2_callback) -> drmaa2_error;
}


/// A resolved DRMAA2 function table.
///
/// The table keeps the shared object it was resolved from loaded for as long
/// as it lives. It derefs to `Drmaa2Fns` so that entries can be called
/// directly.
pub struct Drmaa2Api {
    fns: Drmaa2Fns,

    /// `drmaa2_r_free` is declared in `drmaa2.h` but missing from some
    /// builds of `libdrmaa2.so`, so it is resolved optionally.
    pub drmaa2_r_free: Option<unsafe extern "C" fn(r: *mut drmaa2_r)>,

    _library: Option<Library>,
}

impl Drmaa2Api {
    /// Load the shared object at `path` and resolve every entry point.
    ///
    /// This is unsafe because loading a library runs its initializers, and
    /// because nothing checks that the symbols have the declared signatures.
    pub unsafe fn load<P: AsRef<OsStr>>(path: P) -> Result<Drmaa2Api, libloading::Error> {
        let library = Library::new(path)?;
        let fns = Drmaa2Fns::resolve(&library)?;
        let drmaa2_r_free = library
            .get::<unsafe extern "C" fn(*mut drmaa2_r)>(b"drmaa2_r_free\0")
            .ok()
            .map(|sym| *sym);

        Ok(Drmaa2Api {
            fns,
            drmaa2_r_free,
            _library: Some(library),
        })
    }

    /// Wrap a table that was not resolved from a shared object.
    pub fn from_fns(fns: Drmaa2Fns) -> Drmaa2Api {
        Drmaa2Api {
            fns,
            drmaa2_r_free: None,
            _library: None,
        }
    }
}

impl Deref for Drmaa2Api {
    type Target = Drmaa2Fns;

    fn deref(&self) -> &Drmaa2Fns {
        &self.fns
    }
}
