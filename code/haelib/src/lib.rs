/// Facts about a High Availability Extension (HAE) cluster, extracted from a support bundle.
///
/// A support bundle is a directory of text files that capture command output and configuration
/// files from a system at one point in time.  The HA data live in a single file (normally
/// `ha.txt`), where every captured item is framed by section marker lines (see scautils).  This
/// library reads two kinds of facts from that file:
///
/// - The split brain detection (SBD) fencing devices: the header of each device as reported by
///   `sbd -d <device> dump`, combined with the global settings in /etc/sysconfig/sbd.
///
/// - The cluster-wide properties of the cluster information base (CIB), as found in the bootstrap
///   options block of the `cibadmin -Q` output.
///
/// Neither reader fails.  Unreadable input is reported to a status sink and produces an empty
/// result; malformed device dumps are dropped.  Deciding what the facts mean is left to the
/// caller.
mod cib;
mod sbd;

// Read the SBD records of a bundle, reporting an unreadable file to a status sink.

pub use sbd::read_sbd_info;

// Parse SBD dump blocks and sysconfig settings from a sequence of lines.

pub use sbd::parse_sbd_info;

// Read the cluster properties of a bundle, reporting an unreadable file to a status sink.

pub use cib::read_cluster_config;

// Extract the bootstrap cluster properties from the lines of a `cibadmin -Q` section.

pub use cib::extract_cluster_config;

// The section tag of the `cibadmin -Q` output.

pub use cib::CIBADMIN_SECTION;

/// One SBD device, as described by its dump and the global sysconfig settings.  Numeric fields are
/// -1 when the dump did not report them.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SbdRecord {
    /// Path of the device, from the dump command line.
    pub device: String,

    /// SBD_DEVICE from /etc/sysconfig/sbd, the same for all records.
    pub sbd_device: String,

    /// SBD_OPTS from /etc/sysconfig/sbd, the same for all records.
    pub sbd_opts: String,

    /// The on-disk header version, eg "2.1".
    pub version: String,

    pub slots: i64,

    /// Bytes.
    pub sector_size: i64,

    /// The timeouts are all in seconds.
    pub watchdog: i64,
    pub allocate: i64,
    pub loop_timeout: i64,
    pub msg_wait: i64,
}
