// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

/*! Event notification.

The DRMS can call back into the process when a job changes state. There is
one callback slot per process: registering a handler replaces the previous
one. The library calls us on a thread of its own, so handlers must be
`Send + Sync`. A panicking handler is caught and logged; it never unwinds
into the library.

Not every DRMS delivers events; check `supports(Capability::Callback)`.

*/

use once_cell::sync::Lazy;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Once};

use crate::enums::{Event, JobState};
use crate::error::{check_code, Result};
use crate::library;
use crate::string::read_borrowed_string;

/// One event, copied out of the library's notification record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    pub event: Option<Event>,
    pub job_id: Option<String>,
    pub session_name: Option<String>,
    pub job_state: Option<JobState>,
}

type Handler = Arc<dyn Fn(Notification) + Send + Sync>;

static HANDLER: Lazy<Mutex<Option<Handler>>> = Lazy::new(|| Mutex::new(None));
static AT_EXIT: Once = Once::new();

fn slot() -> MutexGuard<'static, Option<Handler>> {
    HANDLER.lock().unwrap_or_else(|e| e.into_inner())
}

/// Install `handler` to receive job events, replacing any earlier one.
pub fn register_event_notification<F>(handler: F) -> Result<()>
where
    F: Fn(Notification) + Send + Sync + 'static,
{
    let api = library::api()?;
    let previous = slot().replace(Arc::new(handler));

    let code = unsafe { (api.drmaa2_register_event_notification)(Some(trampoline)) };

    if let Err(e) = check_code(api, code) {
        *slot() = previous;
        return Err(e);
    }

    AT_EXIT.call_once(|| {
        if unsafe { libc::atexit(unregister_at_exit) } != 0 {
            warn!("could not arrange to unregister event notification at exit");
        }
    });

    debug!("registered event notification handler");
    Ok(())
}

/// Stop receiving events.
pub fn unregister_event_notification() -> Result<()> {
    let api = library::api()?;
    dtry!(api, (api.drmaa2_register_event_notification)(None));
    slot().take();
    debug!("unregistered event notification handler");
    Ok(())
}

extern "C" fn unregister_at_exit() {
    // Never load the library this late.
    if let Some(api) = library::loaded() {
        unsafe { (api.drmaa2_register_event_notification)(None) };
    }

    slot().take();
}

/// Takes ownership of the notification and frees it.
unsafe extern "C" fn trampoline(notification: *mut sys::drmaa2_notification) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| dispatch(notification)));

    if outcome.is_err() {
        error!("event notification handler panicked");
    }
}

unsafe fn dispatch(notification: *mut sys::drmaa2_notification) {
    if notification.is_null() || (*notification).is_null() {
        return;
    }

    let n = {
        let raw = &**notification;
        Notification {
            event: Event::from_raw(raw.event),
            job_id: read_borrowed_string(raw.jobId),
            session_name: read_borrowed_string(raw.sessionName),
            job_state: JobState::from_raw(raw.jobState),
        }
    };

    if let Some(api) = library::loaded() {
        (api.drmaa2_notification_free)(notification);
    }

    trace!(event = ?n.event, job = ?n.job_id, "event notification");

    // Call without holding the lock, so a handler may re-register.
    let handler = slot().clone();

    if let Some(handler) = handler {
        handler(n);
    }
}
