// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

/*! Describe the DRMS: its version, optional features and the
implementation-specific attributes of each record type.
 */

#[macro_use] extern crate clap;
extern crate drmaa2;
extern crate failure;
extern crate tracing_subscriber;

use clap::{App, Arg};
use drmaa2::{Capability, Extensible, JobSession, JobTemplate, RecordKind};
use failure::Error;
use std::process;
use tracing_subscriber::EnvFilter;

const KINDS: &[RecordKind] = &[
    RecordKind::JobTemplate,
    RecordKind::JobInfo,
    RecordKind::ReservationTemplate,
    RecordKind::ReservationInfo,
    RecordKind::QueueInfo,
    RecordKind::MachineInfo,
    RecordKind::Notification,
];

const CAPABILITIES: &[Capability] = &[
    Capability::AdvanceReservation,
    Capability::ReserveSlots,
    Capability::Callback,
    Capability::BulkJobsMaxParallel,
    Capability::JtEmail,
    Capability::JtStaging,
    Capability::JtDeadline,
    Capability::JtMaxSlots,
    Capability::JtAccountingId,
    Capability::RtStartNow,
    Capability::RtDuration,
    Capability::RtMachineOs,
    Capability::RtMachineArch,
];

fn main() {
    let matches = App::new("template-info")
        .version(crate_version!())
        .about("Describe the DRMS and its implementation-specific attributes")
        .arg(Arg::with_name("library")
             .long("library")
             .help("Path to libdrmaa2, instead of the default location")
             .takes_value(true))
        .get_matches();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    process::exit(match inner(matches.value_of("library")) {
        Ok(code) => code,

        Err(e) => {
            eprintln!("fatal error in template-info");
            for cause in e.iter_chain() {
                eprintln!("  caused by: {}", cause);
            }
            1
        },
    });
}


fn inner(library: Option<&str>) -> Result<i32, Error> {
    match library {
        Some(path) => drmaa2::init_from(path)?,
        None => drmaa2::init()?,
    }

    println!("DRMS: {} {}", drmaa2::drms_name()?, drmaa2::drms_version()?);

    println!("Capabilities:");
    for c in CAPABILITIES {
        println!("  {:24} {}", c.name(), if drmaa2::supports(*c)? { "yes" } else { "no" });
    }

    println!("Implementation-specific attributes:");
    for kind in KINDS {
        let names = drmaa2::implementation_specific_names(*kind)?;

        if names.is_empty() {
            println!("  {}: (none)", kind);
        } else {
            println!("  {}: {}", kind, names.join(", "));
        }
    }

    let jt = JobTemplate::new()?;
    for name in jt.extension_names()? {
        println!("  {}: {}", name, jt.describe_extension(&name)?);
    }

    println!("Job sessions:");
    for name in JobSession::names()? {
        println!("  {}", name);
    }

    Ok(0)
}
