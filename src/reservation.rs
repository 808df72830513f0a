// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

/*! Advance reservations.

Reservation sessions follow the same create, open, close and destroy
rules as job sessions. Not every DRMS supports them; check
`supports(Capability::AdvanceReservation)`.

*/

use libc::{c_void, time_t};
use std::convert::TryFrom;
use std::fmt;
use std::rc::Rc;
use sys::{self, Drmaa2Api};

use crate::enums::{Cpu, ListType, Os};
use crate::error::{check_register, last_error, Error, Result};
use crate::extension::{Extensible, RecordKind};
use crate::fields::{read_num, Overlay};
use crate::handle::NativeHandle;
use crate::library;
use crate::list::{Keepalive, List, ListEntry};
use crate::session::{create_or_open_with, string_list_result, unique_name};
use crate::string::{opt_ptr, read_borrowed_string, read_owned_string, to_cstring, to_opt_cstring};

/// The slots reserved on one machine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SlotInfo {
    pub machine_name: String,
    pub slots: Option<i64>,
}

impl ListEntry for SlotInfo {
    const LIST_TYPE: ListType = ListType::SlotInfoList;
    type Key = (String, Option<i64>);

    unsafe fn entry_key(_api: &Drmaa2Api, entry: *const c_void) -> (String, Option<i64>) {
        let si = &*(entry as *const sys::drmaa2_slotinfo_s);
        (read_borrowed_string(si.machineName).unwrap_or_default(), read_num(si.slots))
    }

    unsafe fn from_void(api: &'static Drmaa2Api, entry: *const c_void, _keep: &Keepalive) -> SlotInfo {
        let (machine_name, slots) = Self::entry_key(api, entry);
        SlotInfo { machine_name, slots }
    }
}


pub struct ReservationTemplate {
    handle: NativeHandle<sys::drmaa2_rtemplate_s>,
    overlay: Overlay,
}

impl ReservationTemplate {
    pub fn new() -> Result<ReservationTemplate> {
        let api = library::api()?;
        let ptr = unsafe { (api.drmaa2_rtemplate_create)() };

        if ptr.is_null() {
            return Err(last_error(api));
        }

        Ok(unsafe { Self::adopt(api, ptr) })
    }

    pub(crate) unsafe fn adopt(api: &'static Drmaa2Api, ptr: sys::drmaa2_rtemplate) -> ReservationTemplate {
        ReservationTemplate {
            handle: NativeHandle::owned(api, ptr, api.drmaa2_rtemplate_free, "reservation template"),
            overlay: Overlay::default(),
        }
    }

    fn api(&self) -> &'static Drmaa2Api {
        self.handle.api()
    }

    fn raw(&self) -> &sys::drmaa2_rtemplate_s {
        unsafe { &*self.handle.as_ptr() }
    }

    fn raw_mut(&mut self) -> *mut sys::drmaa2_rtemplate_s {
        self.handle.as_ptr()
    }

    string_field! { reservation_name, set_reservation_name, reservationName }
    time_field! { start_time, set_start_time, startTime }
    time_field! { end_time, set_end_time, endTime }

    /// The length of the reservation, in seconds.
    pub fn duration(&self) -> Option<i64> {
        match self.raw().duration {
            sys::DRMAA2_UNSET_TIME => None,
            d => Some(d as i64),
        }
    }

    /// Negative durations are rejected, since they collide with the
    /// library's magic time values.
    pub fn set_duration(&mut self, seconds: Option<i64>) -> Result<()> {
        let raw = match seconds {
            Some(s) if s < 0 => return Err(Error::OutOfRange { field: "duration", value: s.to_string() }),
            Some(s) => time_t::try_from(s).map_err(|_| Error::OutOfRange { field: "duration", value: s.to_string() })?,
            None => sys::DRMAA2_UNSET_TIME,
        };

        unsafe { (*self.raw_mut()).duration = raw };
        Ok(())
    }

    num_field! { min_slots, set_min_slots, minSlots }
    num_field! { max_slots, set_max_slots, maxSlots }
    string_field! { job_category, set_job_category, jobCategory }
    string_list_field! {
        /// Users allowed to submit into the reservation.
        users_acl, set_users_acl, usersACL
    }
    string_list_field! { candidate_machines, set_candidate_machines, candidateMachines }
    num_field! { min_phys_memory, set_min_phys_memory, minPhysMemory }
    enum_field! { machine_os, set_machine_os, machineOS, Os }
    enum_field! { machine_arch, set_machine_arch, machineArch, Cpu }
}

impl Extensible for ReservationTemplate {
    const RECORD_KIND: RecordKind = RecordKind::ReservationTemplate;

    fn extension_api(&self) -> &'static Drmaa2Api {
        self.api()
    }

    fn instance(&self) -> *mut c_void {
        self.handle.as_ptr() as *mut c_void
    }
}

impl Drop for ReservationTemplate {
    fn drop(&mut self) {
        unsafe { self.overlay.detach() };
    }
}

impl fmt::Debug for ReservationTemplate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ReservationTemplate")
            .field("reservation_name", &self.reservation_name())
            .field("start_time", &self.start_time())
            .field("end_time", &self.end_time())
            .field("min_slots", &self.min_slots())
            .finish()
    }
}


pub struct ReservationInfo {
    handle: NativeHandle<sys::drmaa2_rinfo_s>,
    overlay: Overlay,
}

impl ReservationInfo {
    pub(crate) unsafe fn adopt(api: &'static Drmaa2Api, ptr: sys::drmaa2_rinfo) -> ReservationInfo {
        ReservationInfo {
            handle: NativeHandle::owned(api, ptr, api.drmaa2_rinfo_free, "reservation info"),
            overlay: Overlay::default(),
        }
    }

    fn api(&self) -> &'static Drmaa2Api {
        self.handle.api()
    }

    fn raw(&self) -> &sys::drmaa2_rinfo_s {
        unsafe { &*self.handle.as_ptr() }
    }

    fn raw_mut(&mut self) -> *mut sys::drmaa2_rinfo_s {
        self.handle.as_ptr()
    }

    string_field! { reservation_id, set_reservation_id, reservationId }
    string_field! { reservation_name, set_reservation_name, reservationName }
    time_field! { reserved_start_time, set_reserved_start_time, reservedStartTime }
    time_field! { reserved_end_time, set_reserved_end_time, reservedEndTime }
    string_list_field! { users_acl, set_users_acl, usersACL }
    num_field! { reserved_slots, set_reserved_slots, reservedSlots }

    /// Where the slots were reserved.
    pub fn reserved_machines(&self) -> Result<Vec<SlotInfo>> {
        let ptr = self.raw().reservedMachines;

        if ptr.is_null() {
            return Ok(Vec::new());
        }

        let list: List<SlotInfo> = unsafe { List::adopt(self.api(), ptr, false, None) };
        list.to_vec()
    }
}

impl Extensible for ReservationInfo {
    const RECORD_KIND: RecordKind = RecordKind::ReservationInfo;

    fn extension_api(&self) -> &'static Drmaa2Api {
        self.api()
    }

    fn instance(&self) -> *mut c_void {
        self.handle.as_ptr() as *mut c_void
    }
}

impl Drop for ReservationInfo {
    fn drop(&mut self) {
        unsafe { self.overlay.detach() };
    }
}

impl fmt::Debug for ReservationInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ReservationInfo")
            .field("reservation_id", &self.reservation_id())
            .field("reservation_name", &self.reservation_name())
            .field("reserved_slots", &self.reserved_slots())
            .finish()
    }
}


/// A reservation granted by the DRMS.
#[derive(Clone)]
pub struct Reservation {
    id: String,
    session_name: String,
    handle: Rc<NativeHandle<sys::drmaa2_r_s>>,
}

impl Reservation {
    unsafe fn from_handle(handle: NativeHandle<sys::drmaa2_r_s>) -> Reservation {
        let api = handle.api();
        let r = handle.as_ptr();

        Reservation {
            id: read_owned_string(api, (api.drmaa2_r_get_id)(r)).unwrap_or_default(),
            session_name: read_owned_string(api, (api.drmaa2_r_get_session_name)(r)).unwrap_or_default(),
            handle: Rc::new(handle),
        }
    }

    /// Take ownership of a reservation handle. Builds of the library that
    /// lack `drmaa2_r_free` leave us no way to free it.
    pub(crate) unsafe fn adopt(api: &'static Drmaa2Api, ptr: sys::drmaa2_r) -> Reservation {
        let handle = match api.drmaa2_r_free {
            Some(free) => NativeHandle::owned(api, ptr, free, "reservation"),
            None => {
                debug!("library has no drmaa2_r_free; reservation handle will leak");
                NativeHandle::borrowed(api, ptr, "reservation")
            }
        };

        Self::from_handle(handle)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    fn live(&self) -> Result<(&'static Drmaa2Api, sys::drmaa2_r)> {
        Ok((self.handle.api(), self.handle.live()?))
    }

    pub fn template(&self) -> Result<ReservationTemplate> {
        let (api, r) = self.live()?;
        let ptr = unsafe { (api.drmaa2_r_get_reservation_template)(r) };

        if ptr.is_null() {
            return Err(last_error(api));
        }

        Ok(unsafe { ReservationTemplate::adopt(api, ptr) })
    }

    pub fn info(&self) -> Result<ReservationInfo> {
        let (api, r) = self.live()?;
        let ptr = unsafe { (api.drmaa2_r_get_info)(r) };

        if ptr.is_null() {
            return Err(last_error(api));
        }

        Ok(unsafe { ReservationInfo::adopt(api, ptr) })
    }

    pub fn terminate(&self) -> Result<()> {
        let (api, r) = self.live()?;
        dtry!(api, (api.drmaa2_r_terminate)(r));
        Ok(())
    }
}

impl PartialEq for Reservation {
    fn eq(&self, other: &Reservation) -> bool {
        self.id == other.id && self.session_name == other.session_name
    }
}

impl fmt::Debug for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Reservation")
            .field("id", &self.id)
            .field("session_name", &self.session_name)
            .finish()
    }
}

impl ListEntry for Reservation {
    const LIST_TYPE: ListType = ListType::ReservationList;
    type Key = Option<String>;

    unsafe fn entry_key(api: &Drmaa2Api, entry: *const c_void) -> Option<String> {
        read_owned_string(api, (api.drmaa2_r_get_id)(entry as sys::drmaa2_r))
    }

    unsafe fn from_void(api: &'static Drmaa2Api, entry: *const c_void, keep: &Keepalive) -> Reservation {
        Self::from_handle(NativeHandle::within(api, entry as sys::drmaa2_r, keep.rc(), "reservation"))
    }
}


pub struct ReservationSession {
    handle: NativeHandle<sys::drmaa2_rsession_s>,
    name: String,
    open: bool,
}

impl ReservationSession {
    /// Create a session, falling back to opening an existing one of the
    /// same name.
    pub fn create_or_open(name: Option<&str>, contact: Option<&str>) -> Result<ReservationSession> {
        let api = library::api()?;
        let name = name.map(|s| s.to_owned()).unwrap_or_else(unique_name);
        let cname = to_cstring(&name)?;
        let ccontact = to_opt_cstring(contact)?;

        let ptr = create_or_open_with(
            api,
            &cname,
            |n| unsafe { (api.drmaa2_create_rsession)(n, opt_ptr(&ccontact)) },
            |n| unsafe { (api.drmaa2_open_rsession)(n) },
        )?;

        Ok(Self::adopt(api, ptr, name))
    }

    pub fn open(name: &str) -> Result<ReservationSession> {
        let api = library::api()?;
        let cname = to_cstring(name)?;
        let ptr = unsafe { (api.drmaa2_open_rsession)(cname.as_ptr()) };

        if ptr.is_null() {
            return Err(last_error(api));
        }

        Ok(Self::adopt(api, ptr, name.to_owned()))
    }

    fn adopt(api: &'static Drmaa2Api, ptr: sys::drmaa2_rsession, name: String) -> ReservationSession {
        ReservationSession {
            handle: NativeHandle::owned(api, ptr, api.drmaa2_rsession_free, "reservation session"),
            name,
            open: true,
        }
    }

    pub fn names() -> Result<Vec<String>> {
        let api = library::api()?;
        string_list_result(api, unsafe { (api.drmaa2_get_rsession_names)() })
    }

    pub fn destroy_named(name: &str) -> Result<()> {
        let api = library::api()?;
        let cname = to_cstring(name)?;
        dtry!(api, (api.drmaa2_destroy_rsession)(cname.as_ptr()));
        debug!(name, "destroyed reservation session");
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn live(&self) -> Result<(&'static Drmaa2Api, sys::drmaa2_rsession)> {
        let rs = self.handle.live()?;

        if !self.open {
            return Err(Error::SessionClosed(self.name.clone()));
        }

        Ok((self.handle.api(), rs))
    }

    pub fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }

        let api = self.handle.api();
        let rs = self.handle.live()?;
        dtry!(api, (api.drmaa2_close_rsession)(rs));
        self.open = false;
        Ok(())
    }

    pub fn free(&mut self) {
        self.handle.release();
        self.open = false;
    }

    pub fn contact(&self) -> Result<Option<String>> {
        let (api, rs) = self.live()?;
        let ptr = unsafe { (api.drmaa2_rsession_get_contact)(rs) };

        if ptr.is_null() {
            check_register(api)?;
        }

        Ok(unsafe { read_owned_string(api, ptr) })
    }

    pub fn request_reservation(&self, template: &ReservationTemplate) -> Result<Reservation> {
        let (api, rs) = self.live()?;
        let ptr = unsafe { (api.drmaa2_rsession_request_reservation)(rs, template.handle.as_ptr()) };

        if ptr.is_null() {
            return Err(last_error(api));
        }

        Ok(unsafe { Reservation::adopt(api, ptr) })
    }

    pub fn reservation(&self, id: &str) -> Result<Reservation> {
        let (api, rs) = self.live()?;
        let cid = to_cstring(id)?;
        let ptr = unsafe { (api.drmaa2_rsession_get_reservation)(rs, cid.as_ptr() as *mut _) };

        if ptr.is_null() {
            return Err(last_error(api));
        }

        Ok(unsafe { Reservation::adopt(api, ptr) })
    }

    pub fn reservations(&self) -> Result<Vec<Reservation>> {
        let (api, rs) = self.live()?;
        let ptr = unsafe { (api.drmaa2_rsession_get_reservations)(rs) };

        if ptr.is_null() {
            check_register(api)?;
            return Ok(Vec::new());
        }

        let list: List<Reservation> = unsafe { List::adopt(api, ptr, true, None) };
        list.to_vec()
    }
}

impl Drop for ReservationSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(name = %self.name, error = %e, "failed to close reservation session");
        }
    }
}

impl fmt::Debug for ReservationSession {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ReservationSession({}, open={})", self.name, self.open)
    }
}
