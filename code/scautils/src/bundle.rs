/// Access to the files of an unpacked support bundle.
///
/// A bundle is a directory of text files.  Each file is a concatenation of captured command output
/// and copied configuration files, and every captured item is introduced by a marker line followed
/// by a comment line naming the command or file:
///
///   #==[ Command ]======================================#
///   # /usr/sbin/cibadmin -Q
///   <cib crm_feature_set="3.0.9" ...>
///   ...
///   #==[ Configuration File ]===========================#
///   # /etc/sysconfig/sbd
///   SBD_DEVICE="/dev/sdb1"
///
/// The marker lines all contain the token `#==[`, which is what delimits one item from the next.
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// The file holding the High Availability data in a bundle.

pub const HA_FILE: &str = "ha.txt";

const SECTION_MARKER: &str = "#==[";

/// Lines of one captured item, keyed by their index within the section.

pub type Section = BTreeMap<usize, String>;

pub fn is_section_boundary(line: &str) -> bool {
    line.contains(SECTION_MARKER)
}

#[derive(Debug, Clone)]
pub struct Bundle {
    dir: PathBuf,
}

impl Bundle {
    pub fn new<P: AsRef<Path>>(dir: P) -> Bundle {
        Bundle {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Read all lines of a bundle file, without line terminators.  Captured output is not
    /// guaranteed to be UTF-8, so invalid bytes are replaced rather than failing the read.  The
    /// file is closed before returning, also on error.

    pub fn read_lines(&self, file_name: &str) -> Result<Vec<String>> {
        let path = self.file_path(file_name);
        let file = File::open(&path).with_context(|| format!("Cannot open {}", path.display()))?;
        let mut reader = BufReader::new(file);
        let mut lines = vec![];
        let mut buf = vec![];
        loop {
            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .with_context(|| format!("Cannot read {}", path.display()))?;
            if n == 0 {
                break;
            }
            while let Some(b'\n' | b'\r') = buf.last() {
                buf.pop();
            }
            lines.push(String::from_utf8_lossy(&buf).into_owned());
        }
        Ok(lines)
    }

    /// Extract the captured output of one item.  `tag` is a regular expression that is matched
    /// against the comment lines (those starting with `#`) of the file; the first match starts
    /// the section, which then runs to the next marker line.  Blank lines and comment lines within
    /// the section are dropped.  Returns Ok(None) if no comment line matches.

    pub fn get_section(&self, file_name: &str, tag: &str) -> Result<Option<Section>> {
        let tag_re = Regex::new(tag)?;
        Ok(extract_section(self.read_lines(file_name)?, &tag_re))
    }
}

fn extract_section(lines: Vec<String>, tag_re: &Regex) -> Option<Section> {
    let mut content = BTreeMap::new();
    let mut found = false;
    for line in lines {
        if found {
            if is_section_boundary(&line) {
                break;
            }
            if is_comment(&line) || line.trim().is_empty() {
                continue;
            }
            content.insert(content.len(), line);
        } else if is_comment(&line) && !is_section_boundary(&line) && tag_re.is_match(&line) {
            found = true;
        }
    }
    if found {
        Some(content)
    } else {
        None
    }
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

#[test]
fn test_section_boundary() {
    assert!(is_section_boundary("#==[ Command ]======================================#"));
    assert!(is_section_boundary("  #==[ Configuration File ]==#"));
    assert!(!is_section_boundary("# /usr/sbin/cibadmin -Q"));
    assert!(!is_section_boundary("#==] "));
}

#[test]
fn test_get_section() {
    let bundle = Bundle::new("../tests/scautils");
    let cib = bundle.get_section("sections.txt", "cibadmin -Q").unwrap().unwrap();
    assert!(cib.len() == 3);
    assert!(cib[&0] == "<cib epoch=\"5\">");
    assert!(cib[&1] == "  <configuration>");
    assert!(cib[&2] == "</cib>");

    // Comment and blank lines within the section are dropped, the section ends at the marker.
    let sbd = bundle.get_section("sections.txt", "/etc/sysconfig/sbd").unwrap().unwrap();
    assert!(sbd.len() == 2);
    assert!(sbd[&0] == "SBD_DEVICE=\"/dev/sdb1\"");
    assert!(sbd[&1] == "SBD_OPTS=\"-W\"");

    // Present but empty
    let empty = bundle.get_section("sections.txt", "crm_mon").unwrap().unwrap();
    assert!(empty.is_empty());

    assert!(bundle.get_section("sections.txt", "corosync-cfgtool").unwrap().is_none());
}

#[test]
fn test_missing_file() {
    let bundle = Bundle::new("../tests/scautils");
    assert!(bundle.read_lines("no-such-file.txt").is_err());
    assert!(bundle.get_section("no-such-file.txt", "cibadmin").is_err());
}

#[test]
fn test_read_lines_not_utf8() {
    let bundle = Bundle::new("../tests/haelib");
    let lines = bundle.read_lines("ha-latin1.txt").unwrap();
    assert!(lines.iter().any(|l| l == "node caf\u{FFFD}"));
    assert!(lines.iter().any(|l| l == "Timeout (msgwait)  : 10"));
    assert!(lines.iter().all(|l| !l.ends_with('\r')));
    let cib = bundle.get_section("ha-latin1.txt", "cibadmin -Q").unwrap().unwrap();
    assert!(cib[&0].starts_with("<cib "));
}

#[test]
fn test_bad_tag() {
    let bundle = Bundle::new("../tests/scautils");
    assert!(bundle.get_section("sections.txt", "cibadmin (").is_err());
}
