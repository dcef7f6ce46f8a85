/// Extract split brain detection (SBD) device information from the HA data of a bundle.
///
/// The HA file holds, among other things, the output of `sbd -d <device> dump` for every
/// configured SBD device and a copy of /etc/sysconfig/sbd.  A dump block looks like this:
///
///   # /usr/sbin/sbd -d /dev/sdb1 dump
///   ==Dumping header on disk /dev/sdb1
///   Header version     : 2.1
///   UUID               : 5c7eb1ab-6e4c-4e6a-9b6a-3f2c9b6b2a11
///   Number of slots    : 255
///   Sector size        : 512
///   Timeout (watchdog) : 5
///   Timeout (allocate) : 2
///   Timeout (loop)     : 1
///   Timeout (msgwait)  : 10
///   ==Header on disk /dev/sdb1 is dumped
///   #==[ Command ]======================================#
///
/// When the device is not a valid SBD partition, the dump output contains a usage ("Syntax")
/// message instead, and no record is produced for the device.
///
/// The sysconfig settings SBD_DEVICE and SBD_OPTS are global, so every record gets the same values
/// irrespective of where the sysconfig copy is relative to the dump blocks.  If there are several
/// sysconfig copies the last setting of each variable wins.
use crate::SbdRecord;

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use regex::Regex;
use scautils::{is_section_boundary, Bundle, Severity, StatusSink};
use std::str::FromStr;

const SYSCONFIG_HEADER: &str = "# /etc/sysconfig/sbd";

impl SbdRecord {
    /// A record for `device` with nothing known about it yet.

    pub fn new(device: &str) -> SbdRecord {
        SbdRecord {
            device: device.to_string(),
            sbd_device: "".to_string(),
            sbd_opts: "".to_string(),
            version: "".to_string(),
            slots: -1,
            sector_size: -1,
            watchdog: -1,
            allocate: -1,
            loop_timeout: -1,
            msg_wait: -1,
        }
    }
}

/// Read the bundle's HA file and parse it with `parse_sbd_info`.  If the file can't be read then
/// an error is reported to `status` and the result is empty.

pub fn read_sbd_info(bundle: &Bundle, file_name: &str, status: &mut dyn StatusSink) -> Vec<SbdRecord> {
    match bundle.read_lines(file_name) {
        Ok(lines) => parse_sbd_info(lines),
        Err(e) => {
            debug!("{:#}", e);
            status.update_status(Severity::Error, &format!("ERROR: Cannot open {file_name}"));
            vec![]
        }
    }
}

/// Parse the SBD dump blocks and sysconfig settings in `lines` into one record per valid device,
/// in the order the dump blocks appear.  Blocks with a syntax error message or with an unparseable
/// number are dropped; the latter is logged as a warning.  A block that is not terminated by a
/// section marker before the input ends is also dropped.

pub fn parse_sbd_info<I, S>(lines: I) -> Vec<SbdRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    enum State {
        Idle,
        Sysconfig,
        Dump(SbdRecord),
    }

    // The command may be logged with or without its full path and the comment prefix.
    let dump_cmd = Regex::new(r"sbd -d (\S+) dump").expect("Static regex");

    let mut records = vec![];
    let mut sbd_device = "".to_string();
    let mut sbd_opts = "".to_string();
    let mut state = State::Idle;

    for line in lines {
        let line = line.as_ref().trim_end_matches(['\n', '\r']);
        state = match state {
            State::Dump(mut record) => {
                if is_section_boundary(line) {
                    records.push(record);
                    State::Idle
                } else if line.to_lowercase().contains("syntax") {
                    debug!("Dropping SBD dump for {}: invalid device", record.device);
                    State::Idle
                } else {
                    match update_record(&mut record, line) {
                        Ok(()) => State::Dump(record),
                        Err(e) => {
                            warn!("Dropping SBD dump for {}: {:#}", record.device, e);
                            State::Idle
                        }
                    }
                }
            }
            State::Sysconfig => {
                if is_section_boundary(line) {
                    State::Idle
                } else {
                    if line.starts_with("SBD_DEVICE") {
                        sbd_device = sysconfig_value(line);
                    } else if line.starts_with("SBD_OPTS") {
                        sbd_opts = sysconfig_value(line);
                    }
                    State::Sysconfig
                }
            }
            State::Idle => {
                if line.starts_with(SYSCONFIG_HEADER) {
                    State::Sysconfig
                } else if let Some(caps) = dump_cmd.captures(line) {
                    State::Dump(SbdRecord::new(&caps[1]))
                } else {
                    State::Idle
                }
            }
        }
    }

    if let State::Dump(record) = state {
        debug!("Dropping SBD dump for {}: no end of section", record.device);
    }

    for record in records.iter_mut() {
        record.sbd_device = sbd_device.clone();
        record.sbd_opts = sbd_opts.clone();
    }
    records
}

// The tests are ordered: "Timeout (msgwait)" must not be taken for a loop timeout, and so on.
// Lines without a colon carry no field, eg "==Dumping header on disk /dev/loop0".

fn update_record(record: &mut SbdRecord, line: &str) -> Result<()> {
    if !line.contains(':') {
        return Ok(());
    }
    if line.starts_with("Header") {
        record.version = field_text(line).to_string();
    } else if line.starts_with("Number") {
        record.slots = field_number(line)?;
    } else if line.starts_with("Sector") {
        record.sector_size = field_number(line)?;
    } else if line.contains("watchdog") {
        record.watchdog = field_number(line)?;
    } else if line.contains("allocate") {
        record.allocate = field_number(line)?;
    } else if line.contains("loop") {
        record.loop_timeout = field_number(line)?;
    } else if line.contains("msgwait") {
        record.msg_wait = field_number(line)?;
    }
    Ok(())
}

// The text between the first and second colon, which for the dump output is everything after the
// first colon.

fn field_text(line: &str) -> &str {
    line.split(':').nth(1).unwrap_or("").trim()
}

fn field_number(line: &str) -> Result<i64> {
    let text = field_text(line);
    if text.is_empty() {
        bail!("No value in '{line}'");
    }
    i64::from_str(text).with_context(|| format!("Bad number in '{line}'"))
}

// KEY=value with all quotes removed.  Only the text up to a second '=' is the value.

fn sysconfig_value(line: &str) -> String {
    line.split('=')
        .nth(1)
        .unwrap_or("")
        .chars()
        .filter(|c| *c != '"' && *c != '\'')
        .collect::<String>()
        .trim_end()
        .to_string()
}

#[cfg(test)]
fn example_dump(device: &str) -> Vec<String> {
    vec![
        format!("/usr/sbin/sbd -d {device} dump"),
        "Header version     : 2.1".to_string(),
        "Number of slots    : 255".to_string(),
        "Sector size         : 512".to_string(),
        "Timeout (watchdog) : 5".to_string(),
        "Timeout (allocate) : 2".to_string(),
        "Timeout (loop)      : 1".to_string(),
        "Timeout (msgwait)   : 10".to_string(),
        "#==[ end ]==#".to_string(),
    ]
}

#[test]
fn test_single_dump() {
    let records = parse_sbd_info(example_dump("/dev/sdb1"));
    assert!(records.len() == 1);
    let r = &records[0];
    assert!(r.device == "/dev/sdb1");
    assert!(r.sbd_device == "");
    assert!(r.sbd_opts == "");
    assert!(r.version == "2.1");
    assert!(r.slots == 255);
    assert!(r.sector_size == 512);
    assert!(r.watchdog == 5);
    assert!(r.allocate == 2);
    assert!(r.loop_timeout == 1);
    assert!(r.msg_wait == 10);
}

#[test]
fn test_sysconfig_applies_to_all() {
    let sysconfig = vec![
        "#==[ Configuration File ]===========================#".to_string(),
        "# /etc/sysconfig/sbd".to_string(),
        "SBD_DEVICE=\"/dev/sdb1;/dev/sdc1\"".to_string(),
        "SBD_OPTS='-W'".to_string(),
        "#==[ Command ]======================================#".to_string(),
    ];

    // Sysconfig first
    let mut lines = sysconfig.clone();
    lines.extend(example_dump("/dev/sdb1"));
    lines.extend(example_dump("/dev/sdc1"));
    let before = parse_sbd_info(&lines);

    // Sysconfig between and after the dumps
    let mut lines = example_dump("/dev/sdb1");
    lines.extend(sysconfig.clone());
    lines.extend(example_dump("/dev/sdc1"));
    let between = parse_sbd_info(&lines);

    let mut lines = example_dump("/dev/sdb1");
    lines.extend(example_dump("/dev/sdc1"));
    lines.extend(sysconfig.clone());
    let after = parse_sbd_info(&lines);

    for records in [&before, &between, &after] {
        assert!(records.len() == 2);
        assert!(records[0].device == "/dev/sdb1");
        assert!(records[1].device == "/dev/sdc1");
        for r in records.iter() {
            assert!(r.sbd_device == "/dev/sdb1;/dev/sdc1");
            assert!(r.sbd_opts == "-W");
            assert!(r.msg_wait == 10);
        }
    }
}

#[test]
fn test_last_sysconfig_wins() {
    let mut lines = vec![
        "# /etc/sysconfig/sbd".to_string(),
        "SBD_DEVICE=\"/dev/sdb1\"".to_string(),
        "SBD_OPTS=\"-W\"".to_string(),
        "#==[ Configuration File ]===========================#".to_string(),
    ];
    lines.extend(example_dump("/dev/sdb1"));
    lines.extend([
        "# /etc/sysconfig/sbd".to_string(),
        "SBD_DEVICE=\"/dev/sdc1\"".to_string(),
        "#==[ Command ]======================================#".to_string(),
    ]);
    let records = parse_sbd_info(&lines);
    assert!(records.len() == 1);
    assert!(records[0].sbd_device == "/dev/sdc1");
    // Not set again, so the first value stands.
    assert!(records[0].sbd_opts == "-W");
}

#[test]
fn test_device_name_like_field() {
    let records = parse_sbd_info([
        "# /usr/sbin/sbd -d /dev/loop0 dump",
        "==Dumping header on disk /dev/loop0",
        "Header version     : 2.1",
        "Timeout (loop)     : 1",
        "Timeout (msgwait)  : 10",
        "==Header on disk /dev/loop0 is dumped",
        "#==[ Command ]==#",
        "# /usr/sbin/sbd -d /dev/mapper/msgwait-watchdog dump",
        "==Dumping header on disk /dev/mapper/msgwait-watchdog",
        "Timeout (watchdog) : 5",
        "==Header on disk /dev/mapper/msgwait-watchdog is dumped",
        "#==[ Command ]==#",
    ]);
    assert!(records.len() == 2);
    assert!(records[0].device == "/dev/loop0");
    assert!(records[0].version == "2.1");
    assert!(records[0].loop_timeout == 1);
    assert!(records[0].msg_wait == 10);
    assert!(records[1].device == "/dev/mapper/msgwait-watchdog");
    assert!(records[1].watchdog == 5);
    assert!(records[1].msg_wait == -1);
}

#[test]
fn test_syntax_error_discards_block() {
    let mut lines = vec![
        "# /usr/sbin/sbd -d /dev/sdd1 dump".to_string(),
        "Header version     : 2.1".to_string(),
        "Number of slots    : 255".to_string(),
        "sbd failed; please check the logs.".to_string(),
        "Syntax: sbd <options> <command> <cmdarguments>".to_string(),
        "Timeout (msgwait)   : 10".to_string(),
        "#==[ Command ]======================================#".to_string(),
    ];
    lines.extend(example_dump("/dev/sdb1"));
    let records = parse_sbd_info(&lines);
    assert!(records.len() == 1);
    assert!(records[0].device == "/dev/sdb1");

    // Case does not matter
    let records = parse_sbd_info([
        "/usr/sbin/sbd -d /dev/sde dump",
        "Header version     : 2.1",
        "invalid SYNTAX",
        "#==[ Command ]==#",
    ]);
    assert!(records.is_empty());
}

#[test]
fn test_missing_fields_default() {
    let records = parse_sbd_info([
        "/usr/sbin/sbd -d /dev/sdf dump",
        "Header version     : 2.1",
        "Timeout (msgwait)   : 20",
        "#==[ Command ]==#",
    ]);
    assert!(records.len() == 1);
    let r = &records[0];
    assert!(r.version == "2.1");
    assert!(r.msg_wait == 20);
    assert!(r.slots == -1);
    assert!(r.sector_size == -1);
    assert!(r.watchdog == -1);
    assert!(r.allocate == -1);
    assert!(r.loop_timeout == -1);
}

#[test]
fn test_bad_number_discards_block() {
    let mut lines = vec![
        "/usr/sbin/sbd -d /dev/sdg dump".to_string(),
        "Header version     : 2.1".to_string(),
        "Number of slots    : lots".to_string(),
        "Timeout (msgwait)   : 10".to_string(),
        "#==[ Command ]==#".to_string(),
        "/usr/sbin/sbd -d /dev/sdh dump".to_string(),
        "Timeout (watchdog) :".to_string(),
        "#==[ Command ]==#".to_string(),
    ];
    lines.extend(example_dump("/dev/sdb1"));
    let records = parse_sbd_info(&lines);
    assert!(records.len() == 1);
    assert!(records[0].device == "/dev/sdb1");
    assert!(records[0].msg_wait == 10);
}

#[test]
fn test_unterminated_block() {
    let mut lines = example_dump("/dev/sdb1");
    lines.pop();
    assert!(parse_sbd_info(&lines).is_empty());
    assert!(parse_sbd_info(Vec::<String>::new()).is_empty());
}

#[test]
fn test_line_terminators() {
    let lines = example_dump("/dev/sdb1")
        .into_iter()
        .map(|l| l + "\r\n")
        .collect::<Vec<String>>();
    let records = parse_sbd_info(&lines);
    assert!(records.len() == 1);
    assert!(records[0].device == "/dev/sdb1");
    assert!(records[0].version == "2.1");
    assert!(records[0].msg_wait == 10);
}

#[test]
fn test_sysconfig_value() {
    assert!(sysconfig_value("SBD_DEVICE=\"/dev/sdb1\"") == "/dev/sdb1");
    assert!(sysconfig_value("SBD_OPTS='-W -P'") == "-W -P");
    assert!(sysconfig_value("SBD_OPTS=") == "");
    assert!(sysconfig_value("SBD_OPTS") == "");
}

#[test]
fn test_read_sbd_info() {
    let bundle = Bundle::new("../tests/haelib");
    let mut status = scautils::StatusCollector::new();
    let records = read_sbd_info(&bundle, "ha.txt", &mut status);
    assert!(status.messages().is_empty());
    assert!(records.len() == 2);

    assert!(records[0].device == "/dev/disk/by-id/scsi-sbd-part1");
    assert!(records[1].device == "/dev/disk/by-id/scsi-sbd2-part1");
    for r in &records {
        assert!(r.sbd_device == "/dev/disk/by-id/scsi-sbd-part1;/dev/disk/by-id/scsi-sbd2-part1");
        assert!(r.sbd_opts == "-W");
        assert!(r.version == "2.1");
        assert!(r.slots == 255);
        assert!(r.sector_size == 512);
    }
    assert!(records[0].watchdog == 15);
    assert!(records[0].msg_wait == 30);
    assert!(records[1].watchdog == 5);
    assert!(records[1].allocate == 2);
    assert!(records[1].loop_timeout == 1);
    assert!(records[1].msg_wait == 10);
}

#[test]
fn test_read_sbd_info_not_utf8() {
    let bundle = Bundle::new("../tests/haelib");
    let mut status = scautils::StatusCollector::new();
    let records = read_sbd_info(&bundle, "ha-latin1.txt", &mut status);
    assert!(status.messages().is_empty());
    assert!(records.len() == 2);
    assert!(records[0].msg_wait == 30);
    assert!(records[1].msg_wait == 10);
    assert!(records[1].sbd_opts == "-W");
}

#[test]
fn test_read_sbd_info_missing_file() {
    let bundle = Bundle::new("../tests/haelib");
    let mut status = scautils::StatusCollector::new();
    let records = read_sbd_info(&bundle, "no-such-file.txt", &mut status);
    assert!(records.is_empty());
    assert!(status.messages().len() == 1);
    assert!(status.messages()[0] == (Severity::Error, "ERROR: Cannot open no-such-file.txt".to_string()));
}
