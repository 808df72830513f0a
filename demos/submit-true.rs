// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

/*! Submit a trivial job and wait for it to finish.
 */

#[macro_use] extern crate clap;
extern crate drmaa2;
extern crate failure;
extern crate tracing_subscriber;

use clap::{App, Arg};
use drmaa2::{JobSession, JobTemplate, Timeout};
use failure::Error;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() {
    let matches = App::new("submit-true")
        .version(crate_version!())
        .about("Submit /bin/true and wait for it to finish")
        .arg(Arg::with_name("session")
             .long("session")
             .help("The name of the job session to use")
             .takes_value(true)
             .default_value("submit-true"))
        .arg(Arg::with_name("timeout")
             .long("timeout")
             .help("How many seconds to wait for the job")
             .takes_value(true)
             .default_value("300"))
        .get_matches();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let session = matches.value_of("session").unwrap_or("submit-true");
    let timeout = matches.value_of("timeout").unwrap_or("300");

    process::exit(match inner(session, timeout) {
        Ok(code) => code,

        Err(e) => {
            eprintln!("failed to run job");
            for cause in e.iter_chain() {
                eprintln!("  caused by: {}", cause);
            }
            1
        },
    });
}


fn inner(session_name: &str, timeout: &str) -> Result<i32, Error> {
    let timeout = Timeout::After(Duration::from_secs(timeout.parse()?));

    let session = JobSession::create_or_open(Some(session_name), None)?;
    let mut jt = JobTemplate::new()?;
    jt.set_remote_command(Some("/bin/true"))?;
    jt.set_job_name(Some("submit-true"))?;

    let job = session.run(&jt)?;
    println!("new job id: {}", job.id());

    if !job.wait_terminated(timeout)? {
        println!("job {} did not finish in time", job.id());
        return Ok(1);
    }

    let info = job.info()?;
    println!("state: {}", info.job_state().map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_owned()));
    println!("exit status: {}", info.exit_status().map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_owned()));
    job.reap()?;
    session.close_and_destroy()?;
    Ok(0)
}
