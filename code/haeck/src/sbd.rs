use crate::format;
use crate::PrintArgs;

use anyhow::Result;
use haelib::SbdRecord;
use std::collections::HashMap;
use std::io;

pub fn print(output: &mut dyn io::Write, print_args: &PrintArgs, records: &[SbdRecord]) -> Result<()> {
    let (formatters, aliases) = my_formatters();
    let spec = if let Some(ref fmt) = print_args.fmt {
        fmt
    } else {
        FMT_DEFAULTS
    };
    let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
    let opts = format::standard_options(&others);
    format::format_data(output, &fields, &formatters, &opts, records)
}

pub fn fmt_help() -> format::Help {
    let (formatters, aliases) = my_formatters();
    format::Help {
        fields: formatters.keys().cloned().collect::<Vec<String>>(),
        aliases: aliases
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<Vec<(String, Vec<String>)>>(),
        defaults: FMT_DEFAULTS.to_string(),
    }
}

const FMT_DEFAULTS: &str = "device,version,slots,sector,watchdog,allocate,loop,msgwait";

type Formatter = fn(&SbdRecord) -> String;

fn my_formatters() -> (HashMap<String, Formatter>, HashMap<String, Vec<String>>) {
    let mut formatters: HashMap<String, Formatter> = HashMap::new();
    let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
    formatters.insert("device".to_string(), |r| r.device.clone());
    formatters.insert("sbd_device".to_string(), |r| r.sbd_device.clone());
    formatters.insert("sbd_opts".to_string(), |r| r.sbd_opts.clone());
    formatters.insert("version".to_string(), |r| r.version.clone());
    formatters.insert("slots".to_string(), |r| format_number(r.slots));
    formatters.insert("sector".to_string(), |r| format_number(r.sector_size));
    formatters.insert("watchdog".to_string(), |r| format_number(r.watchdog));
    formatters.insert("allocate".to_string(), |r| format_number(r.allocate));
    formatters.insert("loop".to_string(), |r| format_number(r.loop_timeout));
    formatters.insert("msgwait".to_string(), |r| format_number(r.msg_wait));

    aliases.insert(
        "timeouts".to_string(),
        vec![
            "watchdog".to_string(),
            "allocate".to_string(),
            "loop".to_string(),
            "msgwait".to_string(),
        ],
    );
    aliases.insert(
        "sysconfig".to_string(),
        vec!["sbd_device".to_string(), "sbd_opts".to_string()],
    );
    aliases.insert(
        "all".to_string(),
        vec![
            "device".to_string(),
            "sbd_device".to_string(),
            "sbd_opts".to_string(),
            "version".to_string(),
            "slots".to_string(),
            "sector".to_string(),
            "watchdog".to_string(),
            "allocate".to_string(),
            "loop".to_string(),
            "msgwait".to_string(),
        ],
    );

    (formatters, aliases)
}

// Unknown values are printed as "unknown" rather than -1.

fn format_number(n: i64) -> String {
    if n < 0 {
        "unknown".to_string()
    } else {
        n.to_string()
    }
}

#[cfg(test)]
fn test_record() -> SbdRecord {
    let mut r = SbdRecord::new("/dev/sdb1");
    r.sbd_device = "/dev/sdb1".to_string();
    r.sbd_opts = "-W".to_string();
    r.version = "2.1".to_string();
    r.slots = 255;
    r.msg_wait = 10;
    r
}

#[test]
fn test_print_csv() {
    let mut out = Vec::new();
    let args = PrintArgs {
        fmt: Some("device,sysconfig,slots,watchdog,msgwait,csv".to_string()),
    };
    print(&mut out, &args, &[test_record()]).unwrap();
    assert!(String::from_utf8(out).unwrap() == "/dev/sdb1,/dev/sdb1,-W,255,unknown,10\n");
}

#[test]
fn test_print_defaults() {
    let mut out = Vec::new();
    print(&mut out, &PrintArgs::default(), &[test_record()]).unwrap();
    let s = String::from_utf8(out).unwrap();
    let lines = s.lines().collect::<Vec<&str>>();
    assert!(lines.len() == 2);
    assert!(lines[0].starts_with("device"));
    assert!(lines[0].ends_with("msgwait"));
    assert!(lines[1].starts_with("/dev/sdb1"));
    assert!(lines[1].ends_with("10"));
}

#[test]
fn test_print_bad_fmt() {
    let mut out = Vec::new();
    let args = PrintArgs {
        fmt: Some("csv,nonsense".to_string()),
    };
    assert!(print(&mut out, &args, &[test_record()]).is_err());
}
