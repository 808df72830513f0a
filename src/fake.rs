// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

/*! An in-process stand-in for `libdrmaa2`, used by the unit tests.

It implements just enough of the C interface to exercise ownership and the
error register: strings, lists, dicts, records, job and reservation
sessions, jobs, waits and notifications. It also behaves like Grid Engine
in the awkward places: a failed create leaves its error in the register
after the fallback open succeeds, the instance-value getter complains
about empty attributes, and waits hand back the very pointer that sits in
the caller's list.

All state is per thread, so tests running in parallel do not see each
other. Job IDs come from a per-thread counter.

*/

use libc::{c_char, c_int, c_long, c_longlong, c_void, time_t};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::ffi::{CStr, CString};
use std::ptr;
use sys::{self, Drmaa2Api, Drmaa2Fns};

use crate::enums::{Event, JobState};
use crate::library;

/// How many times each kind of object has been freed on this thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct Counts {
    pub string_frees: usize,
    pub list_frees: usize,
    pub dict_frees: usize,
    pub template_frees: usize,
    pub rtemplate_frees: usize,
    pub info_frees: usize,
    pub job_frees: usize,
    pub session_frees: usize,
    pub reservation_frees: usize,
    pub notification_frees: usize,
}

struct JobRecord {
    session: String,
    command: String,
    state: sys::drmaa2_jstate,
}

struct ArrayRecord {
    command: String,
    jobs: Vec<String>,
}

struct ReservationRecord {
    session: String,
    name: Option<String>,
    slots: c_longlong,
}

/// A failure waiting for the named entry point, after `skip` calls that
/// succeed.
struct Injected {
    call: &'static str,
    skip: usize,
    code: sys::drmaa2_error,
    text: String,
}

#[derive(Default)]
struct State {
    counts: Counts,
    error: (sys::drmaa2_error, Option<String>),
    job_sessions: Vec<String>,
    reservation_sessions: Vec<String>,
    jobs: BTreeMap<String, JobRecord>,
    arrays: HashMap<String, ArrayRecord>,
    reservations: BTreeMap<String, ReservationRecord>,
    instance_values: HashMap<(usize, String), String>,
    next_id: u64,
    callback: sys::drmaa2_callback,
    injected: Vec<Injected>,
    stray_wait: Option<(String, String)>,
}

thread_local! {
    static STATE: RefCell<State> = RefCell::new(State::default());
}

/// Never call back into the fake from inside `f`.
fn with<R>(f: impl FnOnce(&mut State) -> R) -> R {
    STATE.with(|s| f(&mut s.borrow_mut()))
}

fn count(f: impl FnOnce(&mut Counts)) {
    with(|s| f(&mut s.counts))
}

fn next_id() -> String {
    with(|s| {
        s.next_id += 1;
        (1000 + s.next_id).to_string()
    })
}

fn fail(code: sys::drmaa2_error, text: impl Into<String>) {
    let text = text.into();
    with(|s| s.error = (code, Some(text)));
}

/// The table of fake entry points. Every test calls this first.
pub fn api() -> &'static Drmaa2Api {
    library::install(build)
}

pub fn counts() -> Counts {
    with(|s| s.counts)
}

pub fn set_error(code: sys::drmaa2_error, text: &str) {
    fail(code, text)
}

pub fn clear_error() {
    with(|s| s.error = (sys::DRMAA2_SUCCESS, None));
}

/// Make the next call to the entry point `call` fail with `code`.
pub fn fail_next(call: &'static str, code: sys::drmaa2_error, text: &str) {
    fail_after(call, 0, code, text)
}

/// Let `skip` calls to `call` succeed, then fail the one after.
pub fn fail_after(call: &'static str, skip: usize, code: sys::drmaa2_error, text: &str) {
    with(|s| {
        s.injected.push(Injected {
            call,
            skip,
            code,
            text: text.to_owned(),
        })
    });
}

/// Make the next wait report a job that was never in the waited-on list.
pub fn wait_returns_stray(id: &str, session: &str) {
    with(|s| s.stray_wait = Some((id.to_owned(), session.to_owned())));
}

/// If a failure is due for `call`, load it into the register.
fn injected(call: &str) -> Option<sys::drmaa2_error> {
    let (code, text) = with(|s| {
        let i = s.injected.iter().position(|f| f.call == call)?;

        if s.injected[i].skip > 0 {
            s.injected[i].skip -= 1;
            return None;
        }

        let f = s.injected.remove(i);
        Some((f.code, f.text))
    })?;

    fail(code, text);
    Some(code)
}

/// A string as the library would allocate it.
pub fn alloc_string(s: &str) -> sys::drmaa2_string {
    CString::new(s).expect("test strings have no NULs").into_raw()
}

unsafe fn free_raw_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

unsafe fn text(p: *const c_char) -> Option<String> {
    if p.is_null() {
        None
    } else {
        Some(CStr::from_ptr(p).to_string_lossy().into_owned())
    }
}

/// A string list as the library would return it, freeing its own entries.
pub fn string_list(items: &[&str]) -> sys::drmaa2_list {
    let entries = items.iter().map(|s| alloc_string(s) as *const c_void).collect();
    list_of(entries, Some(free_string_entry))
}

/// A job handle, owned by the caller, for a job registered in `state`.
pub fn job(id: &str, session: &str, state: JobState) -> sys::drmaa2_j {
    with(|s| {
        s.jobs.insert(
            id.to_owned(),
            JobRecord {
                session: session.to_owned(),
                command: "/bin/true".to_owned(),
                state: state.to_raw(),
            },
        )
    });
    unsafe { new_job_handle(id, session) }
}

/// Deliver an event to whatever callback is registered on this thread.
pub fn emit(event: Event, job_id: &str, session: &str, state: JobState) {
    let callback = with(|s| s.callback);

    if let Some(callback) = callback {
        let mut n = Box::into_raw(Box::new(sys::drmaa2_notification_s {
            event: event.to_raw(),
            jobId: alloc_string(job_id),
            sessionName: alloc_string(session),
            jobState: state.to_raw(),
        }));
        unsafe { callback(&mut n) };
    }
}


fn build() -> Drmaa2Api {
    let mut f = Drmaa2Fns::inert();

    f.drmaa2_string_free = string_free;
    f.drmaa2_lasterror = lasterror;
    f.drmaa2_lasterror_text = lasterror_text;

    f.drmaa2_list_create = list_create;
    f.drmaa2_list_free = list_free;
    f.drmaa2_list_get = list_get;
    f.drmaa2_list_add = list_add;
    f.drmaa2_list_del = list_del;
    f.drmaa2_list_size = list_size;

    f.drmaa2_dict_create = dict_create;
    f.drmaa2_dict_free = dict_free;
    f.drmaa2_dict_list = dict_list;
    f.drmaa2_dict_has = dict_has;
    f.drmaa2_dict_get = dict_get;
    f.drmaa2_dict_del = dict_del;
    f.drmaa2_dict_set = dict_set;

    f.drmaa2_jinfo_create = jinfo_create;
    f.drmaa2_jinfo_free = jinfo_free;
    f.drmaa2_slotinfo_free = slotinfo_free;
    f.drmaa2_rinfo_free = rinfo_free;
    f.drmaa2_jtemplate_create = jtemplate_create;
    f.drmaa2_jtemplate_free = jtemplate_free;
    f.drmaa2_rtemplate_create = rtemplate_create;
    f.drmaa2_rtemplate_free = rtemplate_free;
    f.drmaa2_notification_free = notification_free;
    f.drmaa2_queueinfo_free = queueinfo_free;
    f.drmaa2_version_free = version_free;
    f.drmaa2_machineinfo_free = machineinfo_free;

    f.drmaa2_jtemplate_impl_spec = jtemplate_impl_spec;
    f.drmaa2_jinfo_impl_spec = no_impl_spec;
    f.drmaa2_rtemplate_impl_spec = no_impl_spec;
    f.drmaa2_rinfo_impl_spec = no_impl_spec;
    f.drmaa2_queueinfo_impl_spec = no_impl_spec;
    f.drmaa2_machineinfo_impl_spec = no_impl_spec;
    f.drmaa2_notification_impl_spec = no_impl_spec;
    f.drmaa2_get_instance_value = get_instance_value;
    f.drmaa2_set_instance_value = set_instance_value;
    f.drmaa2_describe_attribute = describe_attribute;

    f.drmaa2_create_jsession = create_jsession;
    f.drmaa2_open_jsession = open_jsession;
    f.drmaa2_close_jsession = close_jsession;
    f.drmaa2_destroy_jsession = destroy_jsession;
    f.drmaa2_jsession_free = jsession_free;
    f.drmaa2_get_jsession_names = get_jsession_names;
    f.drmaa2_jsession_get_contact = jsession_get_contact;
    f.drmaa2_jsession_get_session_name = jsession_get_session_name;
    f.drmaa2_jsession_get_job_categories = jsession_get_job_categories;
    f.drmaa2_jsession_get_jobs = jsession_get_jobs;
    f.drmaa2_jsession_get_job_array = jsession_get_job_array;
    f.drmaa2_jsession_run_job = jsession_run_job;
    f.drmaa2_jsession_run_bulk_jobs = jsession_run_bulk_jobs;
    f.drmaa2_jsession_wait_any_started = jsession_wait_any_started;
    f.drmaa2_jsession_wait_any_terminated = jsession_wait_any_terminated;

    f.drmaa2_j_free = j_free;
    f.drmaa2_j_suspend = j_suspend;
    f.drmaa2_j_resume = j_resume;
    f.drmaa2_j_hold = j_hold;
    f.drmaa2_j_release = j_release;
    f.drmaa2_j_terminate = j_terminate;
    f.drmaa2_j_reap = j_reap;
    f.drmaa2_j_get_id = j_get_id;
    f.drmaa2_j_get_session_name = j_get_session_name;
    f.drmaa2_j_get_jtemplate = j_get_jtemplate;
    f.drmaa2_j_get_state = j_get_state;
    f.drmaa2_j_get_info = j_get_info;
    f.drmaa2_j_wait_started = j_wait_started;
    f.drmaa2_j_wait_terminated = j_wait_terminated;

    f.drmaa2_jarray_free = jarray_free;
    f.drmaa2_jarray_get_id = jarray_get_id;
    f.drmaa2_jarray_get_jobs = jarray_get_jobs;
    f.drmaa2_jarray_get_session_name = jarray_get_session_name;
    f.drmaa2_jarray_get_jtemplate = jarray_get_jtemplate;
    f.drmaa2_jarray_suspend = jarray_suspend;
    f.drmaa2_jarray_resume = jarray_resume;
    f.drmaa2_jarray_hold = jarray_hold;
    f.drmaa2_jarray_release = jarray_release;
    f.drmaa2_jarray_terminate = jarray_terminate;

    f.drmaa2_open_msession = open_msession;
    f.drmaa2_close_msession = close_msession;
    f.drmaa2_msession_free = msession_free;
    f.drmaa2_msession_get_all_jobs = msession_get_all_jobs;
    f.drmaa2_msession_get_all_queues = msession_get_all_queues;
    f.drmaa2_msession_get_all_machines = msession_get_all_machines;
    f.drmaa2_msession_get_all_reservations = msession_get_all_reservations;

    f.drmaa2_create_rsession = create_rsession;
    f.drmaa2_open_rsession = open_rsession;
    f.drmaa2_close_rsession = close_rsession;
    f.drmaa2_destroy_rsession = destroy_rsession;
    f.drmaa2_rsession_free = rsession_free;
    f.drmaa2_get_rsession_names = get_rsession_names;
    f.drmaa2_rsession_get_contact = rsession_get_contact;
    f.drmaa2_rsession_get_session_name = rsession_get_session_name;
    f.drmaa2_rsession_request_reservation = rsession_request_reservation;
    f.drmaa2_rsession_get_reservation = rsession_get_reservation;
    f.drmaa2_rsession_get_reservations = rsession_get_reservations;
    f.drmaa2_r_get_id = r_get_id;
    f.drmaa2_r_get_session_name = r_get_session_name;
    f.drmaa2_r_get_reservation_template = r_get_reservation_template;
    f.drmaa2_r_get_info = r_get_info;
    f.drmaa2_r_terminate = r_terminate;

    f.drmaa2_get_drms_name = get_drms_name;
    f.drmaa2_get_drms_version = get_drms_version;
    f.drmaa2_supports = supports;
    f.drmaa2_register_event_notification = register_event_notification;

    let mut api = Drmaa2Api::from_fns(f);
    api.drmaa2_r_free = Some(r_free);
    api
}


// Strings and the error register.

unsafe extern "C" fn string_free(s: *mut sys::drmaa2_string) {
    if s.is_null() || (*s).is_null() {
        return;
    }

    free_raw_string(*s);
    *s = ptr::null_mut();
    count(|c| c.string_frees += 1);
}

unsafe extern "C" fn lasterror() -> sys::drmaa2_error {
    with(|s| s.error.0)
}

unsafe extern "C" fn lasterror_text() -> sys::drmaa2_string {
    match with(|s| s.error.1.clone()) {
        Some(t) => alloc_string(&t),
        None => ptr::null_mut(),
    }
}


// Lists.

struct FakeList {
    entries: Vec<*const c_void>,
    callback: sys::drmaa2_list_entryfree,
}

fn list_of(entries: Vec<*const c_void>, callback: sys::drmaa2_list_entryfree) -> sys::drmaa2_list {
    Box::into_raw(Box::new(FakeList { entries, callback })) as sys::drmaa2_list
}

unsafe fn list_ref<'a>(l: sys::drmaa2_list) -> &'a mut FakeList {
    &mut *(l as *mut FakeList)
}

unsafe fn destroy_list(l: sys::drmaa2_list) {
    if l.is_null() {
        return;
    }

    let list = Box::from_raw(l as *mut FakeList);

    if let Some(callback) = list.callback {
        for entry in &list.entries {
            let mut e = *entry as *mut c_void;
            callback(&mut e);
        }
    }
}

unsafe extern "C" fn free_string_entry(value: *mut *mut c_void) {
    free_raw_string(*value as *mut c_char);
    *value = ptr::null_mut();
}

unsafe fn list_strings(l: sys::drmaa2_list) -> Option<Vec<String>> {
    if l.is_null() {
        return None;
    }

    Some(
        list_ref(l)
            .entries
            .iter()
            .filter_map(|e| text(*e as *const c_char))
            .collect(),
    )
}

unsafe extern "C" fn list_create(_t: sys::drmaa2_listtype, callback: sys::drmaa2_list_entryfree) -> sys::drmaa2_list {
    list_of(Vec::new(), callback)
}

unsafe extern "C" fn list_free(l: *mut sys::drmaa2_list) {
    if l.is_null() || (*l).is_null() {
        return;
    }

    destroy_list(*l);
    *l = ptr::null_mut();
    count(|c| c.list_frees += 1);
}

unsafe extern "C" fn list_get(l: sys::drmaa2_list, pos: c_long) -> *const c_void {
    if l.is_null() {
        fail(sys::DRMAA2_INVALID_ARGUMENT, "null list");
        return ptr::null();
    }

    let list = list_ref(l);

    if pos < 0 || pos as usize >= list.entries.len() {
        fail(sys::DRMAA2_INVALID_ARGUMENT, "list index out of range");
        return ptr::null();
    }

    list.entries[pos as usize]
}

unsafe extern "C" fn list_add(l: sys::drmaa2_list, value: *const c_void) -> sys::drmaa2_error {
    if let Some(code) = injected("drmaa2_list_add") {
        return code;
    }

    if l.is_null() || value.is_null() {
        fail(sys::DRMAA2_INVALID_ARGUMENT, "null list or value");
        return sys::DRMAA2_INVALID_ARGUMENT;
    }

    list_ref(l).entries.push(value);
    sys::DRMAA2_SUCCESS
}

unsafe extern "C" fn list_del(l: sys::drmaa2_list, pos: c_long) -> sys::drmaa2_error {
    if l.is_null() || pos < 0 || pos as usize >= list_ref(l).entries.len() {
        fail(sys::DRMAA2_INVALID_ARGUMENT, "list index out of range");
        return sys::DRMAA2_INVALID_ARGUMENT;
    }

    let list = list_ref(l);
    let mut entry = list.entries.remove(pos as usize) as *mut c_void;

    if let Some(callback) = list.callback {
        callback(&mut entry);
    }

    sys::DRMAA2_SUCCESS
}

unsafe extern "C" fn list_size(l: sys::drmaa2_list) -> c_long {
    if l.is_null() {
        fail(sys::DRMAA2_INVALID_ARGUMENT, "null list");
        return -1;
    }

    list_ref(l).entries.len() as c_long
}


// Dictionaries. Keys and values are copied in.

struct FakeDict {
    entries: Vec<(CString, CString)>,
}

unsafe fn dict_ref<'a>(d: sys::drmaa2_dict) -> &'a mut FakeDict {
    &mut *(d as *mut FakeDict)
}

unsafe fn destroy_dict(d: sys::drmaa2_dict) {
    if !d.is_null() {
        drop(Box::from_raw(d as *mut FakeDict));
    }
}

unsafe extern "C" fn dict_create(_callback: sys::drmaa2_dict_entryfree) -> sys::drmaa2_dict {
    Box::into_raw(Box::new(FakeDict { entries: Vec::new() })) as sys::drmaa2_dict
}

unsafe extern "C" fn dict_free(d: *mut sys::drmaa2_dict) {
    if d.is_null() || (*d).is_null() {
        return;
    }

    destroy_dict(*d);
    *d = ptr::null_mut();
    count(|c| c.dict_frees += 1);
}

unsafe extern "C" fn dict_list(d: sys::drmaa2_dict) -> sys::drmaa2_string_list {
    let keys = dict_ref(d).entries.iter().map(|(k, _)| k.as_ptr() as *const c_void).collect();
    list_of(keys, None)
}

unsafe extern "C" fn dict_has(d: sys::drmaa2_dict, key: *const c_char) -> sys::drmaa2_bool {
    let key = CStr::from_ptr(key);

    if dict_ref(d).entries.iter().any(|(k, _)| k.as_c_str() == key) {
        sys::DRMAA2_TRUE
    } else {
        sys::DRMAA2_FALSE
    }
}

unsafe extern "C" fn dict_get(d: sys::drmaa2_dict, key: *const c_char) -> *const c_char {
    let key = CStr::from_ptr(key);

    match dict_ref(d).entries.iter().find(|(k, _)| k.as_c_str() == key) {
        Some((_, v)) => v.as_ptr(),
        None => {
            fail(sys::DRMAA2_INVALID_ARGUMENT, "no such key");
            ptr::null()
        }
    }
}

unsafe extern "C" fn dict_del(d: sys::drmaa2_dict, key: *const c_char) -> sys::drmaa2_error {
    let key = CStr::from_ptr(key);
    let entries = &mut dict_ref(d).entries;

    match entries.iter().position(|(k, _)| k.as_c_str() == key) {
        Some(i) => {
            entries.remove(i);
            sys::DRMAA2_SUCCESS
        }

        None => {
            fail(sys::DRMAA2_INVALID_ARGUMENT, "no such key");
            sys::DRMAA2_INVALID_ARGUMENT
        }
    }
}

unsafe extern "C" fn dict_set(d: sys::drmaa2_dict, key: *const c_char, val: *const c_char) -> sys::drmaa2_error {
    if d.is_null() {
        fail(sys::DRMAA2_INVALID_ARGUMENT, "null dict");
        return sys::DRMAA2_INVALID_ARGUMENT;
    }

    let key = CStr::from_ptr(key).to_owned();
    let val = CStr::from_ptr(val).to_owned();
    let entries = &mut dict_ref(d).entries;

    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => entry.1 = val,
        None => entries.push((key, val)),
    }

    sys::DRMAA2_SUCCESS
}


// Records.

unsafe extern "C" fn jtemplate_create() -> sys::drmaa2_jtemplate {
    Box::into_raw(Box::new(sys::drmaa2_jtemplate_s {
        remoteCommand: ptr::null_mut(),
        args: ptr::null_mut(),
        submitAsHold: sys::DRMAA2_FALSE,
        rerunnable: sys::DRMAA2_FALSE,
        jobEnvironment: ptr::null_mut(),
        workingDirectory: ptr::null_mut(),
        jobCategory: ptr::null_mut(),
        email: ptr::null_mut(),
        emailOnStarted: sys::DRMAA2_FALSE,
        emailOnTerminated: sys::DRMAA2_FALSE,
        jobName: ptr::null_mut(),
        inputPath: ptr::null_mut(),
        outputPath: ptr::null_mut(),
        errorPath: ptr::null_mut(),
        joinFiles: sys::DRMAA2_FALSE,
        reservationId: ptr::null_mut(),
        queueName: ptr::null_mut(),
        minSlots: sys::DRMAA2_UNSET_NUM,
        maxSlots: sys::DRMAA2_UNSET_NUM,
        priority: sys::DRMAA2_UNSET_NUM,
        candidateMachines: ptr::null_mut(),
        minPhysMemory: sys::DRMAA2_UNSET_NUM,
        machineOS: sys::DRMAA2_UNSET_OS,
        machineArch: sys::DRMAA2_UNSET_CPU,
        startTime: sys::DRMAA2_UNSET_TIME,
        deadlineTime: sys::DRMAA2_UNSET_TIME,
        stageInFiles: ptr::null_mut(),
        stageOutFiles: ptr::null_mut(),
        resourceLimits: ptr::null_mut(),
        accountingId: ptr::null_mut(),
        implementationSpecific: ptr::null_mut(),
    }))
}

unsafe extern "C" fn jtemplate_free(jt: *mut sys::drmaa2_jtemplate) {
    if jt.is_null() || (*jt).is_null() {
        return;
    }

    let addr = *jt as usize;
    let t = Box::from_raw(*jt);

    for s in &[
        t.remoteCommand,
        t.workingDirectory,
        t.jobCategory,
        t.jobName,
        t.inputPath,
        t.outputPath,
        t.errorPath,
        t.reservationId,
        t.queueName,
        t.accountingId,
    ] {
        free_raw_string(*s);
    }

    destroy_list(t.args);
    destroy_list(t.email);
    destroy_list(t.candidateMachines);
    destroy_dict(t.jobEnvironment);
    destroy_dict(t.stageInFiles);
    destroy_dict(t.stageOutFiles);
    destroy_dict(t.resourceLimits);

    with(|s| s.instance_values.retain(|k, _| k.0 != addr));
    *jt = ptr::null_mut();
    count(|c| c.template_frees += 1);
}

unsafe extern "C" fn jinfo_create() -> sys::drmaa2_jinfo {
    Box::into_raw(Box::new(sys::drmaa2_jinfo_s {
        jobId: ptr::null_mut(),
        exitStatus: -1,
        terminatingSignal: ptr::null_mut(),
        annotation: ptr::null_mut(),
        jobState: sys::DRMAA2_UNSET_JSTATE,
        jobSubState: ptr::null_mut(),
        allocatedMachines: ptr::null_mut(),
        submissionMachine: ptr::null_mut(),
        jobOwner: ptr::null_mut(),
        slots: sys::DRMAA2_UNSET_NUM,
        queueName: ptr::null_mut(),
        wallclockTime: sys::DRMAA2_UNSET_TIME,
        cpuTime: sys::DRMAA2_UNSET_NUM,
        submissionTime: sys::DRMAA2_UNSET_TIME,
        dispatchTime: sys::DRMAA2_UNSET_TIME,
        finishTime: sys::DRMAA2_UNSET_TIME,
        implementationSpecific: ptr::null_mut(),
    }))
}

unsafe extern "C" fn jinfo_free(ji: *mut sys::drmaa2_jinfo) {
    if ji.is_null() || (*ji).is_null() {
        return;
    }

    let i = Box::from_raw(*ji);

    for s in &[
        i.jobId,
        i.terminatingSignal,
        i.annotation,
        i.jobSubState,
        i.submissionMachine,
        i.jobOwner,
        i.queueName,
    ] {
        free_raw_string(*s);
    }

    destroy_list(i.allocatedMachines);
    *ji = ptr::null_mut();
    count(|c| c.info_frees += 1);
}

unsafe extern "C" fn rtemplate_create() -> sys::drmaa2_rtemplate {
    Box::into_raw(Box::new(sys::drmaa2_rtemplate_s {
        reservationName: ptr::null_mut(),
        startTime: sys::DRMAA2_UNSET_TIME,
        endTime: sys::DRMAA2_UNSET_TIME,
        duration: sys::DRMAA2_UNSET_TIME,
        minSlots: sys::DRMAA2_UNSET_NUM,
        maxSlots: sys::DRMAA2_UNSET_NUM,
        jobCategory: ptr::null_mut(),
        usersACL: ptr::null_mut(),
        candidateMachines: ptr::null_mut(),
        minPhysMemory: sys::DRMAA2_UNSET_NUM,
        machineOS: sys::DRMAA2_UNSET_OS,
        machineArch: sys::DRMAA2_UNSET_CPU,
        implementationSpecific: ptr::null_mut(),
    }))
}

unsafe extern "C" fn rtemplate_free(rt: *mut sys::drmaa2_rtemplate) {
    if rt.is_null() || (*rt).is_null() {
        return;
    }

    let t = Box::from_raw(*rt);
    free_raw_string(t.reservationName);
    free_raw_string(t.jobCategory);
    destroy_list(t.usersACL);
    destroy_list(t.candidateMachines);
    *rt = ptr::null_mut();
    count(|c| c.rtemplate_frees += 1);
}

unsafe extern "C" fn rinfo_free(ri: *mut sys::drmaa2_rinfo) {
    if ri.is_null() || (*ri).is_null() {
        return;
    }

    let i = Box::from_raw(*ri);
    free_raw_string(i.reservationId);
    free_raw_string(i.reservationName);
    destroy_list(i.usersACL);
    destroy_list(i.reservedMachines);
    *ri = ptr::null_mut();
    count(|c| c.info_frees += 1);
}

unsafe extern "C" fn slotinfo_free(si: *mut sys::drmaa2_slotinfo) {
    if si.is_null() || (*si).is_null() {
        return;
    }

    let i = Box::from_raw(*si);
    free_raw_string(i.machineName);
    *si = ptr::null_mut();
}

unsafe extern "C" fn free_slotinfo_entry(value: *mut *mut c_void) {
    slotinfo_free(value as *mut sys::drmaa2_slotinfo)
}

unsafe extern "C" fn queueinfo_free(qi: *mut sys::drmaa2_queueinfo) {
    if qi.is_null() || (*qi).is_null() {
        return;
    }

    let q = Box::from_raw(*qi);
    free_raw_string(q.name);
    *qi = ptr::null_mut();
}

unsafe extern "C" fn free_queueinfo_entry(value: *mut *mut c_void) {
    queueinfo_free(value as *mut sys::drmaa2_queueinfo)
}

unsafe extern "C" fn version_free(version: *mut sys::drmaa2_version) {
    if version.is_null() || (*version).is_null() {
        return;
    }

    let v = Box::from_raw(*version);
    free_raw_string(v.major);
    free_raw_string(v.minor);
    *version = ptr::null_mut();
}

unsafe fn new_version(major: &str, minor: &str) -> sys::drmaa2_version {
    Box::into_raw(Box::new(sys::drmaa2_version_s {
        major: alloc_string(major),
        minor: alloc_string(minor),
    }))
}

unsafe extern "C" fn machineinfo_free(mi: *mut sys::drmaa2_machineinfo) {
    if mi.is_null() || (*mi).is_null() {
        return;
    }

    let mut m = Box::from_raw(*mi);
    free_raw_string(m.name);
    version_free(&mut m.machineOSVersion);
    *mi = ptr::null_mut();
}

unsafe extern "C" fn free_machineinfo_entry(value: *mut *mut c_void) {
    machineinfo_free(value as *mut sys::drmaa2_machineinfo)
}

unsafe extern "C" fn notification_free(notification: *mut sys::drmaa2_notification) {
    if notification.is_null() || (*notification).is_null() {
        return;
    }

    let n = Box::from_raw(*notification);
    free_raw_string(n.jobId);
    free_raw_string(n.sessionName);
    *notification = ptr::null_mut();
    count(|c| c.notification_frees += 1);
}


// Implementation-specific attributes. Only job templates have one.

const PE_ATTRIBUTE: &str = "uge_jt_pe";

unsafe extern "C" fn jtemplate_impl_spec() -> sys::drmaa2_string_list {
    string_list(&[PE_ATTRIBUTE])
}

unsafe extern "C" fn no_impl_spec() -> sys::drmaa2_string_list {
    string_list(&[])
}

unsafe fn known_attribute(name: *const c_char) -> Option<String> {
    match text(name) {
        Some(ref n) if n == PE_ATTRIBUTE => Some(n.clone()),
        other => {
            fail(
                sys::DRMAA2_UNSUPPORTED_ATTRIBUTE,
                format!("unknown attribute {}", other.unwrap_or_default()),
            );
            None
        }
    }
}

unsafe extern "C" fn get_instance_value(instance: *const c_void, name: *const c_char) -> sys::drmaa2_string {
    let name = match known_attribute(name) {
        Some(n) => n,
        None => return ptr::null_mut(),
    };

    match with(|s| s.instance_values.get(&(instance as usize, name)).cloned()) {
        Some(v) => alloc_string(&v),
        None => {
            fail(sys::DRMAA2_INVALID_ARGUMENT, "attribute has no value");
            ptr::null_mut()
        }
    }
}

unsafe extern "C" fn set_instance_value(
    instance: *mut c_void,
    name: *const c_char,
    value: *const c_char,
) -> sys::drmaa2_error {
    let name = match known_attribute(name) {
        Some(n) => n,
        None => return sys::DRMAA2_UNSUPPORTED_ATTRIBUTE,
    };

    let key = (instance as usize, name);
    let value = text(value);

    with(|s| match value {
        Some(v) => {
            s.instance_values.insert(key, v);
        }
        None => {
            s.instance_values.remove(&key);
        }
    });

    sys::DRMAA2_SUCCESS
}

unsafe extern "C" fn describe_attribute(_instance: *const c_void, name: *const c_char) -> sys::drmaa2_string {
    match known_attribute(name) {
        Some(_) => alloc_string("parallel environment request"),
        None => ptr::null_mut(),
    }
}


// Job sessions.

unsafe fn new_jsession(name: &str) -> sys::drmaa2_jsession {
    Box::into_raw(Box::new(sys::drmaa2_jsession_s {
        contact: alloc_string("fake:6444"),
        name: alloc_string(name),
    }))
}

unsafe fn jsession_name(js: sys::drmaa2_jsession) -> String {
    text((*js).name).unwrap_or_default()
}

unsafe extern "C" fn create_jsession(name: *const c_char, _contact: *const c_char) -> sys::drmaa2_jsession {
    let name = text(name).unwrap_or_default();

    if with(|s| s.job_sessions.contains(&name)) {
        fail(sys::DRMAA2_INTERNAL, format!("session {} already exists", name));
        return ptr::null_mut();
    }

    with(|s| s.job_sessions.push(name.clone()));
    new_jsession(&name)
}

unsafe extern "C" fn open_jsession(name: *const c_char) -> sys::drmaa2_jsession {
    let name = text(name).unwrap_or_default();

    if !with(|s| s.job_sessions.contains(&name)) {
        fail(sys::DRMAA2_INVALID_SESSION, format!("no session named {}", name));
        return ptr::null_mut();
    }

    new_jsession(&name)
}

unsafe extern "C" fn close_jsession(js: sys::drmaa2_jsession) -> sys::drmaa2_error {
    if js.is_null() {
        fail(sys::DRMAA2_INVALID_SESSION, "null session");
        return sys::DRMAA2_INVALID_SESSION;
    }

    sys::DRMAA2_SUCCESS
}

unsafe extern "C" fn destroy_jsession(name: *const c_char) -> sys::drmaa2_error {
    let name = text(name).unwrap_or_default();
    let found = with(|s| {
        let before = s.job_sessions.len();
        s.job_sessions.retain(|n| *n != name);
        s.job_sessions.len() != before
    });

    if found {
        sys::DRMAA2_SUCCESS
    } else {
        fail(sys::DRMAA2_INVALID_SESSION, format!("no session named {}", name));
        sys::DRMAA2_INVALID_SESSION
    }
}

unsafe extern "C" fn jsession_free(js: *mut sys::drmaa2_jsession) {
    if js.is_null() || (*js).is_null() {
        return;
    }

    let s = Box::from_raw(*js);
    free_raw_string(s.contact);
    free_raw_string(s.name);
    *js = ptr::null_mut();
    count(|c| c.session_frees += 1);
}

unsafe extern "C" fn get_jsession_names() -> sys::drmaa2_string_list {
    let names = with(|s| s.job_sessions.clone());
    let names: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
    string_list(&names)
}

unsafe extern "C" fn jsession_get_contact(js: sys::drmaa2_jsession) -> sys::drmaa2_string {
    match text((*js).contact) {
        Some(c) => alloc_string(&c),
        None => ptr::null_mut(),
    }
}

unsafe extern "C" fn jsession_get_session_name(js: sys::drmaa2_jsession) -> sys::drmaa2_string {
    alloc_string(&jsession_name(js))
}

unsafe extern "C" fn jsession_get_job_categories(_js: sys::drmaa2_jsession) -> sys::drmaa2_string_list {
    string_list(&["default"])
}

unsafe extern "C" fn jsession_get_jobs(js: sys::drmaa2_jsession, filter: sys::drmaa2_jinfo) -> sys::drmaa2_j_list {
    let session = jsession_name(js);
    job_list(Some(&session), filter)
}

/// A fresh, caller-owned list of handles to the jobs matching `filter`.
unsafe fn job_list(session: Option<&str>, filter: sys::drmaa2_jinfo) -> sys::drmaa2_j_list {
    let (want_state, want_id) = if filter.is_null() {
        (None, None)
    } else {
        (JobState::from_raw((*filter).jobState), text((*filter).jobId))
    };

    let matching: Vec<(String, String)> = with(|s| {
        s.jobs
            .iter()
            .filter(|(_, r)| session.map(|n| r.session == n).unwrap_or(true))
            .filter(|(_, r)| want_state.map(|st| st.to_raw() == r.state).unwrap_or(true))
            .filter(|(id, _)| want_id.as_ref().map(|w| w == *id).unwrap_or(true))
            .map(|(id, r)| (id.clone(), r.session.clone()))
            .collect()
    });

    let entries = matching
        .iter()
        .map(|(id, session)| new_job_handle(id, session) as *const c_void)
        .collect();
    list_of(entries, Some(free_job_entry))
}

fn state_for(command: &str) -> sys::drmaa2_jstate {
    match command {
        "/bin/true" => sys::DRMAA2_DONE,
        "/bin/false" => sys::DRMAA2_FAILED,
        "/bin/sleep" => sys::DRMAA2_RUNNING,
        _ => sys::DRMAA2_QUEUED,
    }
}

unsafe fn submit(session: &str, jt: sys::drmaa2_jtemplate) -> Option<String> {
    let command = if jt.is_null() { None } else { text((*jt).remoteCommand) };

    let command = match command {
        Some(c) => c,
        None => {
            fail(sys::DRMAA2_INVALID_ARGUMENT, "remote command not set");
            return None;
        }
    };

    let id = next_id();
    with(|s| {
        s.jobs.insert(
            id.clone(),
            JobRecord {
                session: session.to_owned(),
                state: state_for(&command),
                command,
            },
        )
    });
    Some(id)
}

unsafe extern "C" fn jsession_run_job(js: sys::drmaa2_jsession, jt: sys::drmaa2_jtemplate) -> sys::drmaa2_j {
    let session = jsession_name(js);

    match submit(&session, jt) {
        Some(id) => new_job_handle(&id, &session),
        None => ptr::null_mut(),
    }
}

unsafe extern "C" fn jsession_run_bulk_jobs(
    js: sys::drmaa2_jsession,
    jt: sys::drmaa2_jtemplate,
    begin_index: c_longlong,
    end_index: c_longlong,
    step: c_longlong,
    _max_parallel: c_longlong,
) -> sys::drmaa2_jarray {
    if step <= 0 || end_index < begin_index {
        fail(sys::DRMAA2_INVALID_ARGUMENT, "bad task index range");
        return ptr::null_mut();
    }

    let session = jsession_name(js);
    let mut ids = Vec::new();
    let mut index = begin_index;

    while index <= end_index {
        match submit(&session, jt) {
            Some(id) => ids.push(id),
            None => return ptr::null_mut(),
        }

        index += step;
    }

    let array_id = format!("array-{}", next_id());
    let command = text((*jt).remoteCommand).unwrap_or_default();
    let jobs = ids.clone();
    with(|s| s.arrays.insert(array_id.clone(), ArrayRecord { command, jobs }));
    new_jarray(&array_id, &session, &ids)
}

unsafe extern "C" fn jsession_get_job_array(js: sys::drmaa2_jsession, id: sys::drmaa2_string) -> sys::drmaa2_jarray {
    let session = jsession_name(js);
    let id = text(id).unwrap_or_default();

    match with(|s| s.arrays.get(&id).map(|a| a.jobs.clone())) {
        Some(jobs) => new_jarray(&id, &session, &jobs),
        None => {
            fail(sys::DRMAA2_INVALID_ARGUMENT, format!("no job array {}", id));
            ptr::null_mut()
        }
    }
}

fn has_started(state: sys::drmaa2_jstate) -> bool {
    match state {
        sys::DRMAA2_RUNNING | sys::DRMAA2_SUSPENDED | sys::DRMAA2_DONE | sys::DRMAA2_FAILED => true,
        _ => false,
    }
}

fn has_terminated(state: sys::drmaa2_jstate) -> bool {
    state == sys::DRMAA2_DONE || state == sys::DRMAA2_FAILED
}

/// Hands back the matching entry of `jobs` itself, like Grid Engine does.
/// Nothing ever blocks: a set with no match times out at once.
unsafe fn wait_any(
    call: &str,
    jobs: sys::drmaa2_j_list,
    reached: fn(sys::drmaa2_jstate) -> bool,
) -> sys::drmaa2_j {
    if injected(call).is_some() {
        return ptr::null_mut();
    }

    if jobs.is_null() {
        fail(sys::DRMAA2_INVALID_ARGUMENT, "null job list");
        return ptr::null_mut();
    }

    if let Some((id, session)) = with(|s| s.stray_wait.take()) {
        // Leaked: the library keeps what it hands out of a wait.
        return new_job_handle(&id, &session);
    }

    for entry in list_ref(jobs).entries.clone() {
        let j = entry as sys::drmaa2_j;

        if job_state(&job_id(j)).map(reached).unwrap_or(false) {
            return j;
        }
    }

    fail(sys::DRMAA2_TIMEOUT, "no job reached the state in time");
    ptr::null_mut()
}

unsafe extern "C" fn jsession_wait_any_started(
    _js: sys::drmaa2_jsession,
    jobs: sys::drmaa2_j_list,
    _timeout: time_t,
) -> sys::drmaa2_j {
    wait_any("drmaa2_jsession_wait_any_started", jobs, has_started)
}

unsafe extern "C" fn jsession_wait_any_terminated(
    _js: sys::drmaa2_jsession,
    jobs: sys::drmaa2_j_list,
    _timeout: time_t,
) -> sys::drmaa2_j {
    wait_any("drmaa2_jsession_wait_any_terminated", jobs, has_terminated)
}


// Jobs.

unsafe fn new_job_handle(id: &str, session: &str) -> sys::drmaa2_j {
    Box::into_raw(Box::new(sys::drmaa2_j_s {
        id: alloc_string(id),
        session_name: alloc_string(session),
    }))
}

unsafe fn job_id(j: sys::drmaa2_j) -> String {
    text((*j).id).unwrap_or_default()
}

fn job_state(id: &str) -> Option<sys::drmaa2_jstate> {
    with(|s| s.jobs.get(id).map(|r| r.state))
}

unsafe extern "C" fn j_free(j: *mut sys::drmaa2_j) {
    if j.is_null() || (*j).is_null() {
        return;
    }

    let b = Box::from_raw(*j);
    free_raw_string(b.id);
    free_raw_string(b.session_name);
    *j = ptr::null_mut();
    count(|c| c.job_frees += 1);
}

unsafe extern "C" fn free_job_entry(value: *mut *mut c_void) {
    j_free(value as *mut sys::drmaa2_j)
}

const ACTIVE: &[sys::drmaa2_jstate] = &[
    sys::DRMAA2_UNDETERMINED,
    sys::DRMAA2_QUEUED,
    sys::DRMAA2_QUEUED_HELD,
    sys::DRMAA2_RUNNING,
    sys::DRMAA2_SUSPENDED,
    sys::DRMAA2_REQUEUED,
    sys::DRMAA2_REQUEUED_HELD,
];

fn transition(id: &str, from: &[sys::drmaa2_jstate], to: sys::drmaa2_jstate, what: &str) -> sys::drmaa2_error {
    let outcome = with(|s| match s.jobs.get_mut(id) {
        Some(r) if from.contains(&r.state) => {
            r.state = to;
            Ok(())
        }
        Some(_) => Err((sys::DRMAA2_INVALID_STATE, format!("cannot {} job {} in its current state", what, id))),
        None => Err((sys::DRMAA2_INVALID_ARGUMENT, format!("no job {}", id))),
    });

    match outcome {
        Ok(()) => sys::DRMAA2_SUCCESS,
        Err((code, message)) => {
            fail(code, message);
            code
        }
    }
}

unsafe extern "C" fn j_suspend(j: sys::drmaa2_j) -> sys::drmaa2_error {
    transition(&job_id(j), &[sys::DRMAA2_RUNNING], sys::DRMAA2_SUSPENDED, "suspend")
}

unsafe extern "C" fn j_resume(j: sys::drmaa2_j) -> sys::drmaa2_error {
    transition(&job_id(j), &[sys::DRMAA2_SUSPENDED], sys::DRMAA2_RUNNING, "resume")
}

unsafe extern "C" fn j_hold(j: sys::drmaa2_j) -> sys::drmaa2_error {
    transition(&job_id(j), &[sys::DRMAA2_QUEUED], sys::DRMAA2_QUEUED_HELD, "hold")
}

unsafe extern "C" fn j_release(j: sys::drmaa2_j) -> sys::drmaa2_error {
    transition(&job_id(j), &[sys::DRMAA2_QUEUED_HELD], sys::DRMAA2_QUEUED, "release")
}

unsafe extern "C" fn j_terminate(j: sys::drmaa2_j) -> sys::drmaa2_error {
    transition(&job_id(j), ACTIVE, sys::DRMAA2_FAILED, "terminate")
}

unsafe extern "C" fn j_reap(j: sys::drmaa2_j) -> sys::drmaa2_error {
    let id = job_id(j);

    match job_state(&id) {
        Some(state) if has_terminated(state) => {
            with(|s| s.jobs.remove(&id));
            sys::DRMAA2_SUCCESS
        }
        Some(_) => {
            fail(sys::DRMAA2_INVALID_STATE, format!("job {} has not finished", id));
            sys::DRMAA2_INVALID_STATE
        }
        None => {
            fail(sys::DRMAA2_INVALID_ARGUMENT, format!("no job {}", id));
            sys::DRMAA2_INVALID_ARGUMENT
        }
    }
}

unsafe extern "C" fn j_get_id(j: sys::drmaa2_j) -> sys::drmaa2_string {
    alloc_string(&job_id(j))
}

unsafe extern "C" fn j_get_session_name(j: sys::drmaa2_j) -> sys::drmaa2_string {
    alloc_string(&text((*j).session_name).unwrap_or_default())
}

unsafe fn template_running(command: &str) -> sys::drmaa2_jtemplate {
    let jt = jtemplate_create();
    (*jt).remoteCommand = alloc_string(command);
    jt
}

unsafe extern "C" fn j_get_jtemplate(j: sys::drmaa2_j) -> sys::drmaa2_jtemplate {
    let id = job_id(j);

    match with(|s| s.jobs.get(&id).map(|r| r.command.clone())) {
        Some(command) => template_running(&command),
        None => {
            fail(sys::DRMAA2_INVALID_ARGUMENT, format!("no job {}", id));
            ptr::null_mut()
        }
    }
}

unsafe extern "C" fn j_get_state(j: sys::drmaa2_j, substate: *mut sys::drmaa2_string) -> sys::drmaa2_jstate {
    let id = job_id(j);

    match job_state(&id) {
        Some(state) => {
            if !substate.is_null() {
                *substate = alloc_string("fake");
            }

            state
        }

        None => {
            fail(sys::DRMAA2_INVALID_ARGUMENT, format!("no job {}", id));
            sys::DRMAA2_UNSET_JSTATE
        }
    }
}

unsafe extern "C" fn j_get_info(j: sys::drmaa2_j) -> sys::drmaa2_jinfo {
    let id = job_id(j);

    let state = match job_state(&id) {
        Some(state) => state,
        None => {
            fail(sys::DRMAA2_INVALID_ARGUMENT, format!("no job {}", id));
            return ptr::null_mut();
        }
    };

    let ji = jinfo_create();
    (*ji).jobId = alloc_string(&id);
    (*ji).jobState = state;
    (*ji).queueName = alloc_string("all.q");
    (*ji).exitStatus = match state {
        sys::DRMAA2_DONE => 0,
        sys::DRMAA2_FAILED => 1,
        _ => -1 as c_int,
    };
    ji
}

unsafe fn wait_one(j: sys::drmaa2_j, reached: fn(sys::drmaa2_jstate) -> bool) -> sys::drmaa2_error {
    let id = job_id(j);

    match job_state(&id) {
        Some(state) if reached(state) => sys::DRMAA2_SUCCESS,
        Some(_) => {
            fail(sys::DRMAA2_TIMEOUT, "timed out");
            sys::DRMAA2_TIMEOUT
        }
        None => {
            fail(sys::DRMAA2_INVALID_ARGUMENT, format!("no job {}", id));
            sys::DRMAA2_INVALID_ARGUMENT
        }
    }
}

unsafe extern "C" fn j_wait_started(j: sys::drmaa2_j, _timeout: time_t) -> sys::drmaa2_error {
    wait_one(j, has_started)
}

unsafe extern "C" fn j_wait_terminated(j: sys::drmaa2_j, _timeout: time_t) -> sys::drmaa2_error {
    wait_one(j, has_terminated)
}


// Job arrays. An array owns its job list.

unsafe fn new_jarray(id: &str, session: &str, jobs: &[String]) -> sys::drmaa2_jarray {
    let entries = jobs.iter().map(|j| new_job_handle(j, session) as *const c_void).collect();

    Box::into_raw(Box::new(sys::drmaa2_jarray_s {
        id: alloc_string(id),
        job_list: list_of(entries, Some(free_job_entry)),
        session_name: alloc_string(session),
    }))
}

unsafe fn array_id(ja: sys::drmaa2_jarray) -> String {
    text((*ja).id).unwrap_or_default()
}

unsafe extern "C" fn jarray_free(ja: *mut sys::drmaa2_jarray) {
    if ja.is_null() || (*ja).is_null() {
        return;
    }

    let a = Box::from_raw(*ja);
    free_raw_string(a.id);
    free_raw_string(a.session_name);
    destroy_list(a.job_list);
    *ja = ptr::null_mut();
}

unsafe extern "C" fn jarray_get_id(ja: sys::drmaa2_jarray) -> sys::drmaa2_string {
    alloc_string(&array_id(ja))
}

unsafe extern "C" fn jarray_get_jobs(ja: sys::drmaa2_jarray) -> sys::drmaa2_j_list {
    (*ja).job_list
}

unsafe extern "C" fn jarray_get_session_name(ja: sys::drmaa2_jarray) -> sys::drmaa2_string {
    alloc_string(&text((*ja).session_name).unwrap_or_default())
}

unsafe extern "C" fn jarray_get_jtemplate(ja: sys::drmaa2_jarray) -> sys::drmaa2_jtemplate {
    let id = array_id(ja);

    match with(|s| s.arrays.get(&id).map(|a| a.command.clone())) {
        Some(command) => template_running(&command),
        None => {
            fail(sys::DRMAA2_INVALID_ARGUMENT, format!("no job array {}", id));
            ptr::null_mut()
        }
    }
}

/// Apply a transition to every member that is in a suitable state.
unsafe fn array_each(ja: sys::drmaa2_jarray, from: &[sys::drmaa2_jstate], to: sys::drmaa2_jstate) -> sys::drmaa2_error {
    let id = array_id(ja);
    let jobs = with(|s| s.arrays.get(&id).map(|a| a.jobs.clone())).unwrap_or_default();

    for job in jobs {
        if job_state(&job).map(|st| from.contains(&st)).unwrap_or(false) {
            transition(&job, from, to, "change");
        }
    }

    sys::DRMAA2_SUCCESS
}

unsafe extern "C" fn jarray_suspend(ja: sys::drmaa2_jarray) -> sys::drmaa2_error {
    array_each(ja, &[sys::DRMAA2_RUNNING], sys::DRMAA2_SUSPENDED)
}

unsafe extern "C" fn jarray_resume(ja: sys::drmaa2_jarray) -> sys::drmaa2_error {
    array_each(ja, &[sys::DRMAA2_SUSPENDED], sys::DRMAA2_RUNNING)
}

unsafe extern "C" fn jarray_hold(ja: sys::drmaa2_jarray) -> sys::drmaa2_error {
    array_each(ja, &[sys::DRMAA2_QUEUED], sys::DRMAA2_QUEUED_HELD)
}

unsafe extern "C" fn jarray_release(ja: sys::drmaa2_jarray) -> sys::drmaa2_error {
    array_each(ja, &[sys::DRMAA2_QUEUED_HELD], sys::DRMAA2_QUEUED)
}

unsafe extern "C" fn jarray_terminate(ja: sys::drmaa2_jarray) -> sys::drmaa2_error {
    array_each(ja, ACTIVE, sys::DRMAA2_FAILED)
}


// Monitoring sessions.

const QUEUES: &[&str] = &["all.q", "gpu.q"];

unsafe extern "C" fn open_msession(name: *const c_char) -> sys::drmaa2_msession {
    let name = text(name).unwrap_or_else(|| "monitor".to_owned());
    Box::into_raw(Box::new(sys::drmaa2_msession_s { name: alloc_string(&name) }))
}

unsafe extern "C" fn close_msession(_ms: sys::drmaa2_msession) -> sys::drmaa2_error {
    sys::DRMAA2_SUCCESS
}

unsafe extern "C" fn msession_free(ms: *mut sys::drmaa2_msession) {
    if ms.is_null() || (*ms).is_null() {
        return;
    }

    let m = Box::from_raw(*ms);
    free_raw_string(m.name);
    *ms = ptr::null_mut();
    count(|c| c.session_frees += 1);
}

unsafe extern "C" fn msession_get_all_jobs(_ms: sys::drmaa2_msession, filter: sys::drmaa2_jinfo) -> sys::drmaa2_j_list {
    job_list(None, filter)
}

unsafe extern "C" fn msession_get_all_queues(
    _ms: sys::drmaa2_msession,
    names: sys::drmaa2_string_list,
) -> sys::drmaa2_queueinfo_list {
    let wanted = list_strings(names);

    let entries = QUEUES
        .iter()
        .filter(|q| wanted.as_ref().map(|w| w.iter().any(|n| n.as_str() == **q)).unwrap_or(true))
        .map(|q| {
            Box::into_raw(Box::new(sys::drmaa2_queueinfo_s {
                name: alloc_string(q),
                implementationSpecific: ptr::null_mut(),
            })) as *const c_void
        })
        .collect();

    list_of(entries, Some(free_queueinfo_entry))
}

unsafe extern "C" fn msession_get_all_machines(
    _ms: sys::drmaa2_msession,
    names: sys::drmaa2_string_list,
) -> sys::drmaa2_machineinfo_list {
    let wanted = list_strings(names);
    let mut entries = Vec::new();

    if wanted.map(|w| w.iter().any(|n| n.as_str() == "node1")).unwrap_or(true) {
        let mi = Box::into_raw(Box::new(sys::drmaa2_machineinfo_s {
            name: alloc_string("node1"),
            available: sys::DRMAA2_TRUE,
            sockets: 2,
            coresPerSocket: 8,
            threadsPerCore: 2,
            load: 0.5,
            physMemory: 64 * 1024 * 1024,
            virtMemory: 128 * 1024 * 1024,
            machineArch: sys::DRMAA2_X64,
            machineOSVersion: new_version("4", "18"),
            machineOS: sys::DRMAA2_LINUX,
            implementationSpecific: ptr::null_mut(),
        }));
        entries.push(mi as *const c_void);
    }

    list_of(entries, Some(free_machineinfo_entry))
}

unsafe extern "C" fn msession_get_all_reservations(_ms: sys::drmaa2_msession) -> sys::drmaa2_r_list {
    reservation_list(None)
}


// Reservation sessions and reservations. Both are opaque to the caller.

struct FakeRSession {
    name: String,
}

struct FakeReservation {
    id: String,
    session: String,
}

unsafe fn rsession_ref<'a>(rs: sys::drmaa2_rsession) -> &'a FakeRSession {
    &*(rs as *const FakeRSession)
}

unsafe fn reservation_ref<'a>(r: sys::drmaa2_r) -> &'a FakeReservation {
    &*(r as *const FakeReservation)
}

fn new_rsession(name: &str) -> sys::drmaa2_rsession {
    Box::into_raw(Box::new(FakeRSession { name: name.to_owned() })) as sys::drmaa2_rsession
}

fn new_reservation(id: &str, session: &str) -> sys::drmaa2_r {
    Box::into_raw(Box::new(FakeReservation {
        id: id.to_owned(),
        session: session.to_owned(),
    })) as sys::drmaa2_r
}

unsafe extern "C" fn create_rsession(name: *const c_char, _contact: *const c_char) -> sys::drmaa2_rsession {
    let name = text(name).unwrap_or_default();

    if with(|s| s.reservation_sessions.contains(&name)) {
        fail(sys::DRMAA2_INTERNAL, format!("session {} already exists", name));
        return ptr::null_mut();
    }

    with(|s| s.reservation_sessions.push(name.clone()));
    new_rsession(&name)
}

unsafe extern "C" fn open_rsession(name: *const c_char) -> sys::drmaa2_rsession {
    let name = text(name).unwrap_or_default();

    if !with(|s| s.reservation_sessions.contains(&name)) {
        fail(sys::DRMAA2_INVALID_SESSION, format!("no session named {}", name));
        return ptr::null_mut();
    }

    new_rsession(&name)
}

unsafe extern "C" fn close_rsession(_rs: sys::drmaa2_rsession) -> sys::drmaa2_error {
    sys::DRMAA2_SUCCESS
}

unsafe extern "C" fn destroy_rsession(name: *const c_char) -> sys::drmaa2_error {
    let name = text(name).unwrap_or_default();
    let found = with(|s| {
        let before = s.reservation_sessions.len();
        s.reservation_sessions.retain(|n| *n != name);
        s.reservation_sessions.len() != before
    });

    if found {
        sys::DRMAA2_SUCCESS
    } else {
        fail(sys::DRMAA2_INVALID_SESSION, format!("no session named {}", name));
        sys::DRMAA2_INVALID_SESSION
    }
}

unsafe extern "C" fn rsession_free(rs: *mut sys::drmaa2_rsession) {
    if rs.is_null() || (*rs).is_null() {
        return;
    }

    drop(Box::from_raw(*rs as *mut FakeRSession));
    *rs = ptr::null_mut();
    count(|c| c.session_frees += 1);
}

unsafe extern "C" fn get_rsession_names() -> sys::drmaa2_string_list {
    let names = with(|s| s.reservation_sessions.clone());
    let names: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
    string_list(&names)
}

unsafe extern "C" fn rsession_get_contact(_rs: sys::drmaa2_rsession) -> sys::drmaa2_string {
    alloc_string("fake:6444")
}

unsafe extern "C" fn rsession_get_session_name(rs: sys::drmaa2_rsession) -> sys::drmaa2_string {
    alloc_string(&rsession_ref(rs).name)
}

unsafe extern "C" fn rsession_request_reservation(
    rs: sys::drmaa2_rsession,
    rt: sys::drmaa2_rtemplate,
) -> sys::drmaa2_r {
    if rt.is_null() {
        fail(sys::DRMAA2_INVALID_ARGUMENT, "null reservation template");
        return ptr::null_mut();
    }

    let session = rsession_ref(rs).name.clone();
    let name = text((*rt).reservationName);
    let slots = match (*rt).minSlots {
        sys::DRMAA2_UNSET_NUM => 1,
        n => n,
    };

    let id = format!("R{}", next_id());
    with(|s| {
        s.reservations.insert(
            id.clone(),
            ReservationRecord {
                session: session.clone(),
                name,
                slots,
            },
        )
    });
    new_reservation(&id, &session)
}

unsafe extern "C" fn rsession_get_reservation(rs: sys::drmaa2_rsession, id: sys::drmaa2_string) -> sys::drmaa2_r {
    let id = text(id).unwrap_or_default();

    match with(|s| s.reservations.get(&id).map(|r| r.session.clone())) {
        Some(session) if session == rsession_ref(rs).name => new_reservation(&id, &session),
        _ => {
            fail(sys::DRMAA2_INVALID_ARGUMENT, format!("no reservation {}", id));
            ptr::null_mut()
        }
    }
}

unsafe fn reservation_list(session: Option<&str>) -> sys::drmaa2_r_list {
    let matching: Vec<(String, String)> = with(|s| {
        s.reservations
            .iter()
            .filter(|(_, r)| session.map(|n| r.session == n).unwrap_or(true))
            .map(|(id, r)| (id.clone(), r.session.clone()))
            .collect()
    });

    let entries = matching
        .iter()
        .map(|(id, session)| new_reservation(id, session) as *const c_void)
        .collect();
    list_of(entries, Some(free_reservation_entry))
}

unsafe extern "C" fn rsession_get_reservations(rs: sys::drmaa2_rsession) -> sys::drmaa2_r_list {
    let session = rsession_ref(rs).name.clone();
    reservation_list(Some(&session))
}

unsafe extern "C" fn r_free(r: *mut sys::drmaa2_r) {
    if r.is_null() || (*r).is_null() {
        return;
    }

    drop(Box::from_raw(*r as *mut FakeReservation));
    *r = ptr::null_mut();
    count(|c| c.reservation_frees += 1);
}

unsafe extern "C" fn free_reservation_entry(value: *mut *mut c_void) {
    r_free(value as *mut sys::drmaa2_r)
}

unsafe extern "C" fn r_get_id(r: sys::drmaa2_r) -> sys::drmaa2_string {
    alloc_string(&reservation_ref(r).id)
}

unsafe extern "C" fn r_get_session_name(r: sys::drmaa2_r) -> sys::drmaa2_string {
    alloc_string(&reservation_ref(r).session)
}

fn reservation_details(id: &str) -> Option<(Option<String>, c_longlong)> {
    let details = with(|s| s.reservations.get(id).map(|r| (r.name.clone(), r.slots)));

    if details.is_none() {
        fail(sys::DRMAA2_INVALID_ARGUMENT, format!("no reservation {}", id));
    }

    details
}

unsafe extern "C" fn r_get_reservation_template(r: sys::drmaa2_r) -> sys::drmaa2_rtemplate {
    let (name, slots) = match reservation_details(&reservation_ref(r).id) {
        Some(d) => d,
        None => return ptr::null_mut(),
    };

    let rt = rtemplate_create();

    if let Some(name) = name {
        (*rt).reservationName = alloc_string(&name);
    }

    (*rt).minSlots = slots;
    rt
}

unsafe extern "C" fn r_get_info(r: sys::drmaa2_r) -> sys::drmaa2_rinfo {
    let id = reservation_ref(r).id.clone();

    let (name, slots) = match reservation_details(&id) {
        Some(d) => d,
        None => return ptr::null_mut(),
    };

    let slot = Box::into_raw(Box::new(sys::drmaa2_slotinfo_s {
        machineName: alloc_string("node1"),
        slots,
    }));

    Box::into_raw(Box::new(sys::drmaa2_rinfo_s {
        reservationId: alloc_string(&id),
        reservationName: name.map(|n| alloc_string(&n)).unwrap_or(ptr::null_mut()),
        reservedStartTime: sys::DRMAA2_UNSET_TIME,
        reservedEndTime: sys::DRMAA2_UNSET_TIME,
        usersACL: ptr::null_mut(),
        reservedSlots: slots,
        reservedMachines: list_of(vec![slot as *const c_void], Some(free_slotinfo_entry)),
        implementationSpecific: ptr::null_mut(),
    }))
}

unsafe extern "C" fn r_terminate(r: sys::drmaa2_r) -> sys::drmaa2_error {
    let id = reservation_ref(r).id.clone();

    if with(|s| s.reservations.remove(&id)).is_some() {
        sys::DRMAA2_SUCCESS
    } else {
        fail(sys::DRMAA2_INVALID_ARGUMENT, format!("no reservation {}", id));
        sys::DRMAA2_INVALID_ARGUMENT
    }
}


// The DRMS as a whole.

unsafe extern "C" fn get_drms_name() -> sys::drmaa2_string {
    alloc_string("Fake Grid Engine")
}

unsafe extern "C" fn get_drms_version() -> sys::drmaa2_version {
    new_version("8", "6")
}

unsafe extern "C" fn supports(c: sys::drmaa2_capability) -> sys::drmaa2_bool {
    match c {
        sys::DRMAA2_ADVANCE_RESERVATION | sys::DRMAA2_RESERVE_SLOTS | sys::DRMAA2_CALLBACK => sys::DRMAA2_TRUE,
        _ => sys::DRMAA2_FALSE,
    }
}

unsafe extern "C" fn register_event_notification(callback: sys::drmaa2_callback) -> sys::drmaa2_error {
    with(|s| s.callback = callback);
    sys::DRMAA2_SUCCESS
}
