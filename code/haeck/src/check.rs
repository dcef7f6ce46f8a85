/// Checks over the facts extracted by haelib.  Every check reports its outcome to the status sink,
/// IGNORE for "nothing to do", RECOMMENDED for a configuration the operator should look at.
use anyhow::Result;
use haelib::SbdRecord;
use scautils::{Bundle, Severity, StatusCollector, StatusSink};
use std::collections::HashMap;
use std::io;

pub fn run_checks(bundle: &Bundle, file_name: &str, msgwait_min: i64, status: &mut dyn StatusSink) {
    let records = haelib::read_sbd_info(bundle, file_name, status);
    check_msgwait(&records, msgwait_min, status);
    let cluster = haelib::read_cluster_config(bundle, file_name, status);
    check_cluster(&cluster, status);
}

pub fn print(output: &mut dyn io::Write, status: &StatusCollector) -> Result<()> {
    for (severity, message) in status.messages() {
        writeln!(output, "{severity}: {message}")?;
    }
    Ok(())
}

/// The smallest known msgwait across the devices must be at least `msgwait_min`.  Devices whose
/// dump did not report a msgwait are not considered.

fn check_msgwait(records: &[SbdRecord], msgwait_min: i64, status: &mut dyn StatusSink) {
    if records.is_empty() {
        status.update_status(Severity::Ignore, "No SBD devices found");
        return;
    }
    match records.iter().map(|r| r.msg_wait).filter(|n| *n >= 0).min() {
        None => status.update_status(Severity::Ignore, "No SBD msgwait values found"),
        Some(n) if n < msgwait_min => {
            status.update_status(Severity::Recommended, "Consider changing your msgwait time")
        }
        Some(_) => status.update_status(Severity::Ignore, "The msgwait is sufficient"),
    }
}

fn check_cluster(cluster: &HashMap<String, String>, status: &mut dyn StatusSink) {
    status.update_status(
        Severity::Ignore,
        &format!("Found {} cluster properties", cluster.len()),
    );
    if let Some(v) = cluster.get("stonith-enabled") {
        if v.eq_ignore_ascii_case("false") {
            status.update_status(Severity::Recommended, "STONITH is disabled");
        }
    }
}

#[cfg(test)]
fn record_with_msgwait(device: &str, msg_wait: i64) -> SbdRecord {
    let mut r = SbdRecord::new(device);
    r.msg_wait = msg_wait;
    r
}

#[test]
fn test_msgwait() {
    let mut status = StatusCollector::new();
    check_msgwait(&[], 300, &mut status);
    assert!(status.messages()[0] == (Severity::Ignore, "No SBD devices found".to_string()));

    let mut status = StatusCollector::new();
    let records = vec![
        record_with_msgwait("/dev/sdb1", 30),
        record_with_msgwait("/dev/sdc1", 10),
        record_with_msgwait("/dev/sdd1", -1),
    ];
    check_msgwait(&records, 20, &mut status);
    assert!(status.worst() == Some(Severity::Recommended));

    let mut status = StatusCollector::new();
    check_msgwait(&records, 10, &mut status);
    assert!(status.messages()[0] == (Severity::Ignore, "The msgwait is sufficient".to_string()));

    let mut status = StatusCollector::new();
    check_msgwait(&[record_with_msgwait("/dev/sdd1", -1)], 10, &mut status);
    assert!(status.messages()[0] == (Severity::Ignore, "No SBD msgwait values found".to_string()));
}

#[test]
fn test_stonith() {
    let mut cluster = HashMap::new();
    cluster.insert("stonith-enabled".to_string(), "false".to_string());
    let mut status = StatusCollector::new();
    check_cluster(&cluster, &mut status);
    assert!(status.messages().len() == 2);
    assert!(status.worst() == Some(Severity::Recommended));

    cluster.insert("stonith-enabled".to_string(), "true".to_string());
    let mut status = StatusCollector::new();
    check_cluster(&cluster, &mut status);
    assert!(status.worst() == Some(Severity::Ignore));
}

#[test]
fn test_run_checks() {
    let bundle = Bundle::new("../tests/haelib");
    let mut status = StatusCollector::new();
    run_checks(&bundle, "ha.txt", 300, &mut status);
    let mut out = Vec::new();
    print(&mut out, &status).unwrap();
    assert!(
        String::from_utf8(out).unwrap()
            == "RECOMMENDED: Consider changing your msgwait time\nIGNORE: Found 5 cluster properties\n"
    );

    let mut status = StatusCollector::new();
    run_checks(&bundle, "no-such-file.txt", 300, &mut status);
    assert!(status.has_errors());
    assert!(status.messages()[0] == (Severity::Error, "ERROR: Cannot open no-such-file.txt".to_string()));
}
