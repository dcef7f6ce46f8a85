/// Extract the cluster properties from the `cibadmin -Q` output in a bundle.
///
/// The CIB is an XML document but it is not parsed as such; the dump in a bundle is routinely
/// truncated or interleaved with error messages.  Instead the lines are scanned for the first
/// property set, which is the bootstrap options block:
///
///   <cib crm_feature_set="3.0.9" validate-with="pacemaker-2.3" epoch="25" ...>
///     <configuration>
///       <crm_config>
///         <cluster_property_set id="cib-bootstrap-options">
///           <nvpair id="cib-bootstrap-options-stonith-enabled" name="stonith-enabled" value="true"/>
///           <nvpair id="cib-bootstrap-options-cluster-infrastructure" name="cluster-infrastructure" value="corosync"/>
///         </cluster_property_set>
///
/// Each nvpair on its own line is turned into a name -> value entry.  Values containing spaces are
/// cut at the first space.
use log::debug;
use scautils::{Bundle, Section, Severity, StatusSink};
use std::collections::HashMap;

const PROPERTY_SET_OPEN: &str = "<cluster_property_set";
const PROPERTY_SET_CLOSE: &str = "</cluster_property_set>";
const NVPAIR: &str = "<nvpair";
const CIB_OPEN: &str = "<cib ";

/// Regex identifying the `cibadmin -Q` section in the HA file.

pub const CIBADMIN_SECTION: &str = "cibadmin -Q";

/// Find the `cibadmin -Q` section of the bundle's HA file and extract the cluster properties from
/// it.  A missing section yields an empty map; an unreadable file is reported to `status` as an
/// error and also yields an empty map.

pub fn read_cluster_config(
    bundle: &Bundle,
    file_name: &str,
    status: &mut dyn StatusSink,
) -> HashMap<String, String> {
    match bundle.get_section(file_name, CIBADMIN_SECTION) {
        Ok(Some(section)) => extract_cluster_config(&section),
        Ok(None) => {
            debug!("No '{CIBADMIN_SECTION}' section in {file_name}");
            HashMap::new()
        }
        Err(e) => {
            debug!("{:#}", e);
            status.update_status(Severity::Error, &format!("ERROR: Cannot open {file_name}"));
            HashMap::new()
        }
    }
}

/// Extract the name/value pairs of the first property set in `section`.  Scanning stops at the end
/// of that set.  A name that appears more than once gets the last value.

pub fn extract_cluster_config(section: &Section) -> HashMap<String, String> {
    let mut cluster = HashMap::new();
    let mut in_bootstrap = false;
    for line in section.values() {
        if in_bootstrap {
            if line.contains(PROPERTY_SET_CLOSE) {
                break;
            }
            if line.contains(NVPAIR) {
                if let Some((name, value)) = parse_nvpair(line) {
                    cluster.insert(name, value);
                }
            }
        } else if line.contains(PROPERTY_SET_OPEN) {
            in_bootstrap = true;
        } else if line.contains(CIB_OPEN) {
            debug!("cib attributes: {:?}", cib_attributes(line));
        }
    }
    cluster
}

// The attribute tokens of the root element, with the tag itself removed.

fn cib_attributes(line: &str) -> Vec<String> {
    line.replace("<cib", "")
        .replace('>', "")
        .split_whitespace()
        .map(|s| s.to_string())
        .collect::<Vec<String>>()
}

// Returns None unless both a name and a value attribute are present.  Attributes are matched on
// the part before the `=`, so `id="...-cluster-name"` is not taken for the name.

fn parse_nvpair(line: &str) -> Option<(String, String)> {
    let unquoted = line.replace('"', "");
    let mut name = None;
    let mut value = None;
    for token in unquoted.split_whitespace() {
        let Some((attr, text)) = token.split_once('=') else {
            continue;
        };
        let attr = attr.to_lowercase();
        if attr.contains("name") {
            name = Some(text.to_string());
        } else if attr.contains("value") {
            let text = match text.find("/>") {
                Some(ix) => &text[..ix],
                None => text,
            };
            value = Some(text.to_string());
        }
    }
    match (name, value) {
        (Some(name), Some(value)) => Some((name, value)),
        _ => None,
    }
}

#[cfg(test)]
fn make_section(lines: &[&str]) -> Section {
    lines
        .iter()
        .enumerate()
        .map(|(i, l)| (i, l.to_string()))
        .collect::<Section>()
}

#[test]
fn test_nvpair() {
    let section = make_section(&[
        "<cib crm_feature_set=\"3.0.9\" epoch=\"25\">",
        "  <cluster_property_set id=\"cib-bootstrap-options\">",
        "    <nvpair name=\"cluster-infrastructure\" value=\"corosync\"/>",
        "  </cluster_property_set>",
    ]);
    let cluster = extract_cluster_config(&section);
    assert!(cluster.len() == 1);
    assert!(cluster["cluster-infrastructure"] == "corosync");
}

#[test]
fn test_no_property_set() {
    assert!(extract_cluster_config(&Section::new()).is_empty());
    let section = make_section(&[
        "<cib epoch=\"25\">",
        "  <nvpair name=\"stonith-enabled\" value=\"true\"/>",
        "</cib>",
    ]);
    assert!(extract_cluster_config(&section).is_empty());
}

#[test]
fn test_first_set_only() {
    let section = make_section(&[
        "<cluster_property_set id=\"cib-bootstrap-options\">",
        "<nvpair id=\"cib-bootstrap-options-stonith-enabled\" name=\"stonith-enabled\" value=\"true\"/>",
        "</cluster_property_set>",
        "<cluster_property_set id=\"other-options\">",
        "<nvpair id=\"other-options-stonith-enabled\" name=\"stonith-enabled\" value=\"false\"/>",
        "<nvpair id=\"other-options-maintenance-mode\" name=\"maintenance-mode\" value=\"true\"/>",
        "</cluster_property_set>",
    ]);
    let cluster = extract_cluster_config(&section);
    assert!(cluster.len() == 1);
    assert!(cluster["stonith-enabled"] == "true");
}

#[test]
fn test_duplicate_name() {
    let section = make_section(&[
        "<cluster_property_set id=\"cib-bootstrap-options\">",
        "<nvpair name=\"no-quorum-policy\" value=\"stop\"/>",
        "<nvpair name=\"stonith-timeout\" value=\"150s\"/>",
        "<nvpair name=\"no-quorum-policy\" value=\"ignore\"/>",
        "</cluster_property_set>",
    ]);
    let cluster = extract_cluster_config(&section);
    assert!(cluster.len() == 2);
    assert!(cluster["no-quorum-policy"] == "ignore");
    assert!(cluster["stonith-timeout"] == "150s");
}

#[test]
fn test_parse_nvpair() {
    assert!(
        parse_nvpair("<nvpair id=\"cib-bootstrap-options-cluster-name\" name=\"cluster-name\" value=\"hacluster\"/>")
            == Some(("cluster-name".to_string(), "hacluster".to_string()))
    );
    // Value that looks like an attribute name
    assert!(
        parse_nvpair("<nvpair name=\"placement-strategy\" value=\"hostname\" />")
            == Some(("placement-strategy".to_string(), "hostname".to_string()))
    );
    // Trailing text after the element is dropped
    assert!(
        parse_nvpair("<nvpair name=\"dc-version\" value=\"1.1.12-ad083a8\"/> <!-- x -->")
            == Some(("dc-version".to_string(), "1.1.12-ad083a8".to_string()))
    );
    assert!(parse_nvpair("<nvpair name=\"dc-version\"/>").is_none());
    assert!(parse_nvpair("<nvpair value=\"x\"/>").is_none());
}

#[test]
fn test_cib_attributes() {
    let attrs = cib_attributes("<cib crm_feature_set=\"3.0.9\" epoch=\"25\">");
    assert!(attrs == vec!["crm_feature_set=\"3.0.9\"", "epoch=\"25\""]);
}

#[test]
fn test_read_cluster_config() {
    let bundle = Bundle::new("../tests/haelib");
    let mut status = scautils::StatusCollector::new();
    let cluster = read_cluster_config(&bundle, "ha.txt", &mut status);
    assert!(status.messages().is_empty());
    assert!(cluster.len() == 5);
    assert!(cluster["stonith-enabled"] == "true");
    assert!(cluster["cluster-infrastructure"] == "corosync");
    assert!(cluster["cluster-name"] == "hacluster");
    assert!(cluster["dc-version"] == "1.1.12-ad083a8");
    assert!(cluster["stonith-timeout"] == "150s");
    assert!(cluster.get("is-managed-default").is_none());
}

#[test]
fn test_read_cluster_config_not_utf8() {
    let bundle = Bundle::new("../tests/haelib");
    let mut status = scautils::StatusCollector::new();
    let cluster = read_cluster_config(&bundle, "ha-latin1.txt", &mut status);
    assert!(status.messages().is_empty());
    assert!(cluster.len() == 5);
    assert!(cluster["cluster-name"] == "hacluster");
}

#[test]
fn test_read_cluster_config_no_section() {
    let bundle = Bundle::new("../tests/haelib");
    let mut status = scautils::StatusCollector::new();
    let cluster = read_cluster_config(&bundle, "ha-nocib.txt", &mut status);
    assert!(cluster.is_empty());
    assert!(status.messages().is_empty());

    let cluster = read_cluster_config(&bundle, "no-such-file.txt", &mut status);
    assert!(cluster.is_empty());
    assert!(status.messages().len() == 1);
    assert!(status.messages()[0].0 == Severity::Error);
}
