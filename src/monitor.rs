// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

/*! Monitoring sessions: read-only views of the whole DRMS.
 */

use libc::c_void;
use std::fmt;
use std::ptr;
use sys::{self, Drmaa2Api};

use crate::enums::{Cpu, ListType, Os};
use crate::error::{check_register, last_error, Result};
use crate::fields::{read_bool, read_num};
use crate::handle::NativeHandle;
use crate::info::JobInfo;
use crate::job::Job;
use crate::library;
use crate::list::{Keepalive, List, ListEntry};
use crate::reservation::Reservation;
use crate::session::owned_job_list;
use crate::string::{opt_ptr, read_borrowed_string, to_opt_cstring};

/// A DRMS or operating system version.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Version {
    pub major: String,
    pub minor: String,
}

impl Version {
    pub(crate) unsafe fn read(ptr: *const sys::drmaa2_version_s) -> Option<Version> {
        if ptr.is_null() {
            return None;
        }

        Some(Version {
            major: read_borrowed_string((*ptr).major).unwrap_or_default(),
            minor: read_borrowed_string((*ptr).minor).unwrap_or_default(),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}


#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueueInfo {
    pub name: String,
}

impl ListEntry for QueueInfo {
    const LIST_TYPE: ListType = ListType::QueueInfoList;
    type Key = String;

    unsafe fn entry_key(_api: &Drmaa2Api, entry: *const c_void) -> String {
        let qi = entry as *const sys::drmaa2_queueinfo_s;
        read_borrowed_string((*qi).name).unwrap_or_default()
    }

    unsafe fn from_void(api: &'static Drmaa2Api, entry: *const c_void, _keep: &Keepalive) -> QueueInfo {
        QueueInfo { name: Self::entry_key(api, entry) }
    }
}


#[derive(Clone, Debug, PartialEq)]
pub struct MachineInfo {
    pub name: String,
    pub available: bool,
    pub sockets: Option<i64>,
    pub cores_per_socket: Option<i64>,
    pub threads_per_core: Option<i64>,
    pub load: f32,
    pub phys_memory: Option<i64>,
    pub virt_memory: Option<i64>,
    pub machine_arch: Option<Cpu>,
    pub machine_os_version: Option<Version>,
    pub machine_os: Option<Os>,
}

impl ListEntry for MachineInfo {
    const LIST_TYPE: ListType = ListType::MachineInfoList;
    type Key = String;

    unsafe fn entry_key(_api: &Drmaa2Api, entry: *const c_void) -> String {
        let mi = entry as *const sys::drmaa2_machineinfo_s;
        read_borrowed_string((*mi).name).unwrap_or_default()
    }

    unsafe fn from_void(_api: &'static Drmaa2Api, entry: *const c_void, _keep: &Keepalive) -> MachineInfo {
        let mi = &*(entry as *const sys::drmaa2_machineinfo_s);

        MachineInfo {
            name: read_borrowed_string(mi.name).unwrap_or_default(),
            available: read_bool(mi.available),
            sockets: read_num(mi.sockets),
            cores_per_socket: read_num(mi.coresPerSocket),
            threads_per_core: read_num(mi.threadsPerCore),
            load: mi.load as f32,
            phys_memory: read_num(mi.physMemory),
            virt_memory: read_num(mi.virtMemory),
            machine_arch: Cpu::from_raw(mi.machineArch),
            machine_os_version: Version::read(mi.machineOSVersion),
            machine_os: Os::from_raw(mi.machineOS),
        }
    }
}


pub struct MonitorSession {
    handle: NativeHandle<sys::drmaa2_msession_s>,
    open: bool,
}

impl MonitorSession {
    pub fn open(name: Option<&str>) -> Result<MonitorSession> {
        let api = library::api()?;
        let cname = to_opt_cstring(name)?;
        let ptr = unsafe { (api.drmaa2_open_msession)(opt_ptr(&cname)) };

        if ptr.is_null() {
            return Err(last_error(api));
        }

        debug!(name = ?name, "opened monitoring session");
        Ok(MonitorSession {
            handle: NativeHandle::owned(api, ptr, api.drmaa2_msession_free, "monitoring session"),
            open: true,
        })
    }

    fn live(&self) -> Result<(&'static Drmaa2Api, sys::drmaa2_msession)> {
        if !self.open {
            return Err(crate::error::Error::SessionClosed(self.name()));
        }

        Ok((self.handle.api(), self.handle.live()?))
    }

    pub fn name(&self) -> String {
        if !self.handle.is_live() {
            return String::new();
        }

        unsafe { read_borrowed_string((*self.handle.as_ptr()).name) }.unwrap_or_default()
    }

    /// Close the session. Closing a closed session does nothing.
    pub fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }

        let api = self.handle.api();
        let ms = self.handle.live()?;
        dtry!(api, (api.drmaa2_close_msession)(ms));
        self.open = false;
        Ok(())
    }

    /// Every job the DRMS knows about, optionally filtered.
    pub fn all_jobs(&self, filter: Option<&JobInfo>) -> Result<Vec<Job>> {
        let (api, ms) = self.live()?;
        let filter = filter.map(|f| f.as_ptr()).unwrap_or(ptr::null_mut());
        let list = unsafe { (api.drmaa2_msession_get_all_jobs)(ms, filter) };

        if list.is_null() {
            check_register(api)?;
            return Ok(Vec::new());
        }

        owned_job_list(api, list)
    }

    /// Queues, either all of them or those named.
    pub fn all_queues(&self, names: Option<&[&str]>) -> Result<Vec<QueueInfo>> {
        let (api, ms) = self.live()?;
        let names = names_filter(api, names)?;
        let names_ptr = names.as_ref().map(|l| l.as_ptr()).unwrap_or(ptr::null_mut());
        let list = unsafe { (api.drmaa2_msession_get_all_queues)(ms, names_ptr) };
        copy_out(api, list)
    }

    /// Execution hosts, either all of them or those named.
    pub fn all_machines(&self, names: Option<&[&str]>) -> Result<Vec<MachineInfo>> {
        let (api, ms) = self.live()?;
        let names = names_filter(api, names)?;
        let names_ptr = names.as_ref().map(|l| l.as_ptr()).unwrap_or(ptr::null_mut());
        let list = unsafe { (api.drmaa2_msession_get_all_machines)(ms, names_ptr) };
        copy_out(api, list)
    }

    pub fn all_reservations(&self) -> Result<Vec<Reservation>> {
        let (api, ms) = self.live()?;
        let list = unsafe { (api.drmaa2_msession_get_all_reservations)(ms) };
        copy_out(api, list)
    }
}

impl Drop for MonitorSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close monitoring session");
        }
    }
}

impl fmt::Debug for MonitorSession {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MonitorSession({:?}, open={})", self.handle, self.open)
    }
}

fn names_filter(api: &'static Drmaa2Api, names: Option<&[&str]>) -> Result<Option<List<String>>> {
    match names {
        Some(names) => List::from_strs(api, names).map(Some),

        None => Ok(None),
    }
}

/// Copy the entries out of a list we were given ownership of.
fn copy_out<T: ListEntry>(api: &'static Drmaa2Api, ptr: sys::drmaa2_list) -> Result<Vec<T>> {
    if ptr.is_null() {
        check_register(api)?;
        return Ok(Vec::new());
    }

    let list: List<T> = unsafe { List::adopt(api, ptr, true, None) };
    list.to_vec()
}
