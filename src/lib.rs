// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

/*! Interface to DRMAA2 batch-job schedulers, chiefly Univa Grid Engine.

The C library is loaded at runtime, on first use, from the path given by
`$DRMAA2_LIBRARY` or from below `$SGE_ROOT`. See the `library` functions
`init` and `init_from` to control this.

Everything the library hands out is wrapped in a type that knows whether
we own it. Owned objects are freed exactly once, when dropped. Objects
that live inside another object (the entries of a list, the jobs of a job
array) keep their container alive for as long as they are in use, so
there are no dangling handles to worry about.

```no_run
use drmaa2::{JobSession, JobTemplate, Timeout};

let session = JobSession::create_or_open(Some("example"), None)?;
let mut jt = JobTemplate::new()?;
jt.set_remote_command(Some("/bin/sleep"))?;
jt.set_args(&["10"])?;

let job = session.run(&jt)?;
job.wait_terminated(Timeout::Infinite)?;
println!("{} finished: {:?}", job.id(), job.state()?);
# Ok::<(), drmaa2::Error>(())
```

*/

extern crate drmaa2_sys as sys;
#[macro_use] extern crate failure_derive;
#[macro_use] extern crate tracing;

#[macro_use] mod error;
#[macro_use] mod fields;
mod dict;
mod enums;
mod extension;
mod handle;
mod info;
mod job;
mod library;
mod list;
mod monitor;
mod notification;
mod reservation;
mod session;
mod string;
mod template;
mod time;

#[cfg(test)]
mod fake;

pub use crate::dict::Dict;
pub use crate::enums::{Capability, Cpu, Event, JobState, ListType, Os};
pub use crate::error::{DrmsError, Error, ErrorKind, Result};
pub use crate::extension::{implementation_specific_names, Extensible, RecordKind};
pub use crate::info::JobInfo;
pub use crate::job::{Job, JobArray};
pub use crate::library::{init, init_from, library_path, LIBRARY_ENV, ROOT_ENV};
pub use crate::list::{IntoListEntry, Keepalive, List, ListEntry};
pub use crate::monitor::{MachineInfo, MonitorSession, QueueInfo, Version};
pub use crate::notification::{register_event_notification, unregister_event_notification, Notification};
pub use crate::reservation::{Reservation, ReservationInfo, ReservationSession, ReservationTemplate, SlotInfo};
pub use crate::session::{JobSession, TerminatedJobs};
pub use crate::template::{JobTemplate, HOME_DIR, PARAMETRIC_INDEX, WORKING_DIR};
pub use crate::time::{TimeValue, Timeout};

use crate::error::last_error;
use crate::string::read_owned_string;


/// The name of the DRMS behind the library, e.g. "UGE".
pub fn drms_name() -> Result<String> {
    let api = library::api()?;
    let ptr = unsafe { (api.drmaa2_get_drms_name)() };

    if ptr.is_null() {
        return Err(last_error(api));
    }

    Ok(unsafe { read_owned_string(api, ptr) }.unwrap_or_default())
}

/// The version of the DRMS behind the library.
pub fn drms_version() -> Result<Version> {
    let api = library::api()?;
    let mut ptr = unsafe { (api.drmaa2_get_drms_version)() };

    if ptr.is_null() {
        return Err(last_error(api));
    }

    let version = unsafe { Version::read(ptr) }.unwrap_or_default();
    unsafe { (api.drmaa2_version_free)(&mut ptr) };
    Ok(version)
}

/// Whether the DRMS offers an optional feature.
pub fn supports(capability: Capability) -> Result<bool> {
    let api = library::api()?;
    Ok(unsafe { (api.drmaa2_supports)(capability.to_raw()) } == sys::DRMAA2_TRUE)
}
