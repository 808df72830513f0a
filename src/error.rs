// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

/*! Errors, and the bridge to the library's last-error register.

Most DRMAA2 calls either return a `drmaa2_error` code directly or signal
failure with a null pointer and leave the details in a process-global
register (`drmaa2_lasterror` / `drmaa2_lasterror_text`). The register is
overwritten by the next call, so it has to be read right after the call
that failed. The text it hands back is owned by us and must be released
with `drmaa2_string_free`.

The register is *not* reset by successful calls. In particular, when
`drmaa2_create_jsession` fails because the name is taken and the follow-up
`drmaa2_open_jsession` succeeds, the register still holds the create
failure. Code here therefore consults the register only after a call has
actually reported failure.

*/

use std::fmt;
use std::result;
use sys::{self, Drmaa2Api};

use crate::string::read_owned_string;

/// The kinds of failure the DRMS can report.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    DeniedByDrms,
    DrmCommunication,
    TryLater,
    SessionManagement,
    Timeout,
    Internal,
    InvalidArgument,
    InvalidSession,
    InvalidState,
    OutOfResource,
    UnsupportedAttribute,
    UnsupportedOperation,
    ImplementationSpecific,

    /// A code outside the standard set.
    Other(i32),
}

impl ErrorKind {
    /// Map a raw error code. Returns None for `DRMAA2_SUCCESS` and for the
    /// unset value.
    pub fn from_code(code: sys::drmaa2_error) -> Option<ErrorKind> {
        Some(match code {
            sys::DRMAA2_SUCCESS | sys::DRMAA2_UNSET_ERROR => return None,
            sys::DRMAA2_DENIED_BY_DRMS => ErrorKind::DeniedByDrms,
            sys::DRMAA2_DRM_COMMUNICATION => ErrorKind::DrmCommunication,
            sys::DRMAA2_TRY_LATER => ErrorKind::TryLater,
            sys::DRMAA2_SESSION_MANAGEMENT => ErrorKind::SessionManagement,
            sys::DRMAA2_TIMEOUT => ErrorKind::Timeout,
            sys::DRMAA2_INTERNAL => ErrorKind::Internal,
            sys::DRMAA2_INVALID_ARGUMENT => ErrorKind::InvalidArgument,
            sys::DRMAA2_INVALID_SESSION => ErrorKind::InvalidSession,
            sys::DRMAA2_INVALID_STATE => ErrorKind::InvalidState,
            sys::DRMAA2_OUT_OF_RESOURCE => ErrorKind::OutOfResource,
            sys::DRMAA2_UNSUPPORTED_ATTRIBUTE => ErrorKind::UnsupportedAttribute,
            sys::DRMAA2_UNSUPPORTED_OPERATION => ErrorKind::UnsupportedOperation,
            sys::DRMAA2_IMPLEMENTATION_SPECIFIC => ErrorKind::ImplementationSpecific,
            other => ErrorKind::Other(other),
        })
    }

    pub fn code(self) -> sys::drmaa2_error {
        match self {
            ErrorKind::DeniedByDrms => sys::DRMAA2_DENIED_BY_DRMS,
            ErrorKind::DrmCommunication => sys::DRMAA2_DRM_COMMUNICATION,
            ErrorKind::TryLater => sys::DRMAA2_TRY_LATER,
            ErrorKind::SessionManagement => sys::DRMAA2_SESSION_MANAGEMENT,
            ErrorKind::Timeout => sys::DRMAA2_TIMEOUT,
            ErrorKind::Internal => sys::DRMAA2_INTERNAL,
            ErrorKind::InvalidArgument => sys::DRMAA2_INVALID_ARGUMENT,
            ErrorKind::InvalidSession => sys::DRMAA2_INVALID_SESSION,
            ErrorKind::InvalidState => sys::DRMAA2_INVALID_STATE,
            ErrorKind::OutOfResource => sys::DRMAA2_OUT_OF_RESOURCE,
            ErrorKind::UnsupportedAttribute => sys::DRMAA2_UNSUPPORTED_ATTRIBUTE,
            ErrorKind::UnsupportedOperation => sys::DRMAA2_UNSUPPORTED_OPERATION,
            ErrorKind::ImplementationSpecific => sys::DRMAA2_IMPLEMENTATION_SPECIFIC,
            ErrorKind::Other(code) => code,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ErrorKind::DeniedByDrms => f.write_str("denied by DRMS"),
            ErrorKind::DrmCommunication => f.write_str("DRM communication failure"),
            ErrorKind::TryLater => f.write_str("try again later"),
            ErrorKind::SessionManagement => f.write_str("session management error"),
            ErrorKind::Timeout => f.write_str("timed out"),
            ErrorKind::Internal => f.write_str("internal error"),
            ErrorKind::InvalidArgument => f.write_str("invalid argument"),
            ErrorKind::InvalidSession => f.write_str("invalid session"),
            ErrorKind::InvalidState => f.write_str("invalid state"),
            ErrorKind::OutOfResource => f.write_str("out of resource"),
            ErrorKind::UnsupportedAttribute => f.write_str("unsupported attribute"),
            ErrorKind::UnsupportedOperation => f.write_str("unsupported operation"),
            ErrorKind::ImplementationSpecific => f.write_str("implementation-specific error"),
            ErrorKind::Other(code) => write!(f, "DRMAA2 error code {}", code),
        }
    }
}

/// An error reported by the DRMS, with its message text if it gave one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DrmsError {
    pub kind: ErrorKind,
    pub message: Option<String>,
}

impl fmt::Display for DrmsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.message {
            Some(ref m) => write!(f, "{}: {}", self.kind, m),
            None => write!(f, "{}", self.kind),
        }
    }
}

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "{}", _0)]
    Drms(DrmsError),

    #[fail(display = "failed to load the DRMAA2 library \"{}\": {}", path, cause)]
    Load { path: String, cause: String },

    #[fail(display = "{} has no live native handle", _0)]
    NullHandle(&'static str),

    #[fail(display = "index {} is out of range for a list of length {}", index, len)]
    IndexOutOfRange { index: usize, len: usize },

    #[fail(display = "session \"{}\" has been closed", _0)]
    SessionClosed(String),

    #[fail(display = "no implementation-specific attribute named \"{}\"", _0)]
    AttributeNotFound(String),

    #[fail(display = "string contains an interior NUL byte: {:?}", _0)]
    InteriorNul(String),

    #[fail(display = "\"{}\" is not a valid {} name", name, kind)]
    UnknownSymbol { kind: &'static str, name: String },

    #[fail(display = "{} cannot be stored in the {} field", value, field)]
    OutOfRange { field: &'static str, value: String },

    #[fail(display = "wait returned job {} which is not in the waited-on set", _0)]
    WaitSetMismatch(String),
}

impl Error {
    /// The DRMS error kind, if this error came from the library.
    pub fn kind(&self) -> Option<ErrorKind> {
        match *self {
            Error::Drms(ref e) => Some(e.kind),
            _ => None,
        }
    }

    /// The library's own message text, if any.
    pub fn drms_message(&self) -> Option<&str> {
        match *self {
            Error::Drms(ref e) => e.message.as_ref().map(|s| s.as_str()),
            _ => None,
        }
    }
}

pub type Result<T> = result::Result<T, Error>;


/// Read the current error code without touching the text.
pub(crate) fn last_error_code(api: &Drmaa2Api) -> sys::drmaa2_error {
    unsafe { (api.drmaa2_lasterror)() }
}

/// Build an error for a failure signalled by `code`, fetching and freeing
/// the register's text.
pub(crate) fn error_for_code(api: &Drmaa2Api, code: sys::drmaa2_error) -> Error {
    let message = unsafe { read_owned_string(api, (api.drmaa2_lasterror_text)()) };

    // A call can fail without the library filling in the register.
    let kind = ErrorKind::from_code(code).unwrap_or(ErrorKind::Internal);
    debug!(code, %kind, message = ?message, "DRMAA2 call failed");
    Error::Drms(DrmsError { kind, message })
}

/// Build an error for a call that signalled failure by returning null.
pub(crate) fn last_error(api: &Drmaa2Api) -> Error {
    error_for_code(api, last_error_code(api))
}

/// Turn a returned error code into a Result.
pub(crate) fn check_code(api: &Drmaa2Api, code: sys::drmaa2_error) -> Result<()> {
    if code == sys::DRMAA2_SUCCESS {
        Ok(())
    } else {
        Err(error_for_code(api, code))
    }
}

/// For calls where a null return is legitimate (an empty list, say), ask
/// the register whether the null was actually a failure.
///
/// Only call this right after such a null return: the register is sticky
/// and may otherwise report an unrelated earlier failure.
pub(crate) fn check_register(api: &Drmaa2Api) -> Result<()> {
    match last_error_code(api) {
        sys::DRMAA2_SUCCESS | sys::DRMAA2_UNSET_ERROR => Ok(()),
        code => Err(error_for_code(api, code)),
    }
}

/// Call a function returning `drmaa2_error` and bail out with `?` if it
/// failed.
macro_rules! dtry {
    ($api:expr, $op:expr) => {{
        let code = unsafe { $op };
        $crate::error::check_code($api, code)?
    }};
}
