// Misc utilities useful to both haelib and haeck.

mod bundle;
mod configs;
mod status;

// A support bundle directory, and the files and command sections within it.

pub use bundle::Bundle;

// The ordered line-index-to-text map produced by section extraction.

pub use bundle::Section;

// True iff the line is the marker that separates one captured command or file from the next.

pub use bundle::is_section_boundary;

// The name of the file that holds the HA data within a bundle.

pub use bundle::HA_FILE;

// Settings for the checks run against a bundle.

pub use configs::CheckConfig;

// Read check settings from a file.

pub use configs::read_check_config;

// Severity of a reported finding.

pub use status::Severity;

// Write-only destination for findings.

pub use status::StatusSink;

// A sink that simply remembers what it was told.

pub use status::StatusCollector;
