// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

/*! The enumerated types of the DRMAA2 interface.

On the wire these are plain C ints, with -1 meaning "unset". Unset is
represented as `None` on our side, never as a variant.

*/

use libc::c_int;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($kind:expr) {
            $($(#[$vmeta:meta])* $variant:ident = $raw:path => $text:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)*
        }

        impl $name {
            /// Decode a wire value. Unset and unknown values give None.
            pub fn from_raw(raw: c_int) -> Option<$name> {
                match raw {
                    $(x if x == $raw => Some($name::$variant),)*
                    _ => None,
                }
            }

            pub fn to_raw(self) -> c_int {
                match self {
                    $($name::$variant => $raw,)*
                }
            }

            /// The symbolic name of this value.
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)*
                }
            }

            #[allow(dead_code)]
            pub(crate) fn raw_or_unset(value: Option<$name>) -> c_int {
                value.map(|v| v.to_raw()).unwrap_or(sys::DRMAA2_UNSET_ENUM)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Error> {
                match s {
                    $($text => Ok($name::$variant),)*
                    _ => Err(Error::UnknownSymbol { kind: $kind, name: s.to_owned() }),
                }
            }
        }
    };
}

wire_enum! {
    /// Optional features a DRMS may or may not provide.
    pub enum Capability ("capability") {
        AdvanceReservation = sys::DRMAA2_ADVANCE_RESERVATION => "advance-reservation",
        ReserveSlots = sys::DRMAA2_RESERVE_SLOTS => "reserve-slots",
        Callback = sys::DRMAA2_CALLBACK => "callback",
        BulkJobsMaxParallel = sys::DRMAA2_BULK_JOBS_MAXPARALLEL => "bulk-jobs-maxparallel",
        JtEmail = sys::DRMAA2_JT_EMAIL => "jt-email",
        JtStaging = sys::DRMAA2_JT_STAGING => "jt-staging",
        JtDeadline = sys::DRMAA2_JT_DEADLINE => "jt-deadline",
        JtMaxSlots = sys::DRMAA2_JT_MAXSLOTS => "jt-maxslots",
        JtAccountingId = sys::DRMAA2_JT_ACCOUNTINGID => "jt-accountingid",
        RtStartNow = sys::DRMAA2_RT_STARTNOW => "rt-startnow",
        RtDuration = sys::DRMAA2_RT_DURATION => "rt-duration",
        RtMachineOs = sys::DRMAA2_RT_MACHINEOS => "rt-machineos",
        RtMachineArch = sys::DRMAA2_RT_MACHINEARCH => "rt-machinearch",
    }
}

wire_enum! {
    /// Processor architectures.
    pub enum Cpu ("CPU") {
        Other = sys::DRMAA2_OTHER_CPU => "other",
        Alpha = sys::DRMAA2_ALPHA => "alpha",
        Arm = sys::DRMAA2_ARM => "arm",
        Arm64 = sys::DRMAA2_ARM64 => "arm64",
        Cell = sys::DRMAA2_CELL => "cell",
        ParIsc = sys::DRMAA2_PARISC => "parisc",
        ParIsc64 = sys::DRMAA2_PARISC64 => "parisc64",
        X86 = sys::DRMAA2_X86 => "x86",
        X64 = sys::DRMAA2_X64 => "x64",
        Ia64 = sys::DRMAA2_IA64 => "ia64",
        Mips = sys::DRMAA2_MIPS => "mips",
        Mips64 = sys::DRMAA2_MIPS64 => "mips64",
        Ppc = sys::DRMAA2_PPC => "ppc",
        Ppc64 = sys::DRMAA2_PPC64 => "ppc64",
        Sparc = sys::DRMAA2_SPARC => "sparc",
        Sparc64 = sys::DRMAA2_SPARC64 => "sparc64",
    }
}

wire_enum! {
    /// Operating systems.
    pub enum Os ("operating system") {
        Other = sys::DRMAA2_OTHER_OS => "other",
        Aix = sys::DRMAA2_AIX => "aix",
        Bsd = sys::DRMAA2_BSD => "bsd",
        Linux = sys::DRMAA2_LINUX => "linux",
        HpUx = sys::DRMAA2_HPUX => "hpux",
        Irix = sys::DRMAA2_IRIX => "irix",
        MacOs = sys::DRMAA2_MACOS => "macos",
        SunOs = sys::DRMAA2_SUNOS => "sunos",
        Tru64 = sys::DRMAA2_TRU64 => "tru64",
        UnixWare = sys::DRMAA2_UNIXWARE => "unixware",
        Win = sys::DRMAA2_WIN => "win",
        WinNt = sys::DRMAA2_WINNT => "winnt",
    }
}

wire_enum! {
    /// Kinds of event notification.
    pub enum Event ("event") {
        NewState = sys::DRMAA2_NEW_STATE => "new-state",
        Migrated = sys::DRMAA2_MIGRATED => "migrated",
        AttributeChange = sys::DRMAA2_ATTRIBUTE_CHANGE => "attribute-change",
    }
}

wire_enum! {
    /// The state of a job.
    pub enum JobState ("job state") {
        Undetermined = sys::DRMAA2_UNDETERMINED => "undetermined",
        Queued = sys::DRMAA2_QUEUED => "queued",
        QueuedHeld = sys::DRMAA2_QUEUED_HELD => "queued-held",
        Running = sys::DRMAA2_RUNNING => "running",
        Suspended = sys::DRMAA2_SUSPENDED => "suspended",
        Requeued = sys::DRMAA2_REQUEUED => "requeued",
        RequeuedHeld = sys::DRMAA2_REQUEUED_HELD => "requeued-held",
        Done = sys::DRMAA2_DONE => "done",
        Failed = sys::DRMAA2_FAILED => "failed",
    }
}

impl JobState {
    /// Whether the job has finished, one way or another.
    pub fn is_terminal(self) -> bool {
        match self {
            JobState::Done | JobState::Failed => true,
            _ => false,
        }
    }
}

wire_enum! {
    /// What the entries of a native list are.
    pub enum ListType ("list type") {
        StringList = sys::DRMAA2_STRINGLIST => "stringlist",
        JobList = sys::DRMAA2_JOBLIST => "joblist",
        QueueInfoList = sys::DRMAA2_QUEUEINFOLIST => "queueinfolist",
        MachineInfoList = sys::DRMAA2_MACHINEINFOLIST => "machineinfolist",
        SlotInfoList = sys::DRMAA2_SLOTINFOLIST => "slotinfolist",
        ReservationList = sys::DRMAA2_RESERVATIONLIST => "reservationlist",
    }
}
