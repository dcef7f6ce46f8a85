/// Status reporting.  Pattern code reports what it finds to a sink as (severity, message) pairs;
/// the sink decides what to do with them.  The library code in haelib only ever reports errors
/// (unreadable input), while the checks built on top of it report recommendations or nothing of
/// interest.
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Ignore = 0,
    Recommended = 1,
    Error = 2,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Ignore => "IGNORE",
            Severity::Recommended => "RECOMMENDED",
            Severity::Error => "ERROR",
        };
        f.write_str(s)
    }
}

pub trait StatusSink {
    fn update_status(&mut self, severity: Severity, message: &str);
}

/// Collects every status update in order.

#[derive(Debug, Default)]
pub struct StatusCollector {
    messages: Vec<(Severity, String)>,
}

impl StatusCollector {
    pub fn new() -> StatusCollector {
        StatusCollector { messages: vec![] }
    }

    pub fn messages(&self) -> &[(Severity, String)] {
        &self.messages
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|(s, _)| *s == Severity::Error)
    }

    /// The most severe status seen so far, None if nothing was reported.

    pub fn worst(&self) -> Option<Severity> {
        self.messages.iter().map(|(s, _)| *s).max()
    }
}

impl StatusSink for StatusCollector {
    fn update_status(&mut self, severity: Severity, message: &str) {
        self.messages.push((severity, message.to_string()));
    }
}

#[test]
fn test_collector() {
    let mut c = StatusCollector::new();
    assert!(c.worst().is_none());
    assert!(!c.has_errors());

    c.update_status(Severity::Ignore, "nothing to see");
    c.update_status(Severity::Recommended, "change this");
    assert!(c.worst() == Some(Severity::Recommended));
    assert!(!c.has_errors());

    c.update_status(Severity::Error, "ERROR: Cannot open ha.txt");
    c.update_status(Severity::Ignore, "more");
    assert!(c.has_errors());
    assert!(c.worst() == Some(Severity::Error));
    assert!(c.messages().len() == 4);
    assert!(c.messages()[1] == (Severity::Recommended, "change this".to_string()));
}

#[test]
fn test_severity_display() {
    assert!(Severity::Error.to_string() == "ERROR");
    assert!(Severity::Recommended.to_string() == "RECOMMENDED");
    assert!(Severity::Ignore.to_string() == "IGNORE");
}
