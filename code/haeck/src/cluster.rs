use crate::format;
use crate::PrintArgs;

use anyhow::Result;
use std::collections::HashMap;
use std::io;

struct Property {
    name: String,
    value: String,
}

/// Print the properties sorted by name.

pub fn print(
    output: &mut dyn io::Write,
    print_args: &PrintArgs,
    mut cluster: HashMap<String, String>,
) -> Result<()> {
    let (formatters, aliases) = my_formatters();
    let spec = if let Some(ref fmt) = print_args.fmt {
        fmt
    } else {
        FMT_DEFAULTS
    };
    let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
    let opts = format::standard_options(&others);
    let mut data = cluster
        .drain()
        .map(|(name, value)| Property { name, value })
        .collect::<Vec<Property>>();
    data.sort_by(|a, b| a.name.cmp(&b.name));
    format::format_data(output, &fields, &formatters, &opts, &data)
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

const FMT_DEFAULTS: &str = "name,value";

type Formatter = fn(&Property) -> String;

fn my_formatters() -> (HashMap<String, Formatter>, HashMap<String, Vec<String>>) {
    let mut formatters: HashMap<String, Formatter> = HashMap::new();
    let aliases: HashMap<String, Vec<String>> = HashMap::new();
    formatters.insert("name".to_string(), |p| p.name.clone());
    formatters.insert("value".to_string(), |p| p.value.clone());
    (formatters, aliases)
}

#[test]
fn test_print_sorted() {
    let mut cluster = HashMap::new();
    cluster.insert("stonith-enabled".to_string(), "true".to_string());
    cluster.insert("cluster-name".to_string(), "hacluster".to_string());
    cluster.insert("dc-version".to_string(), "1.1.12-ad083a8".to_string());
    let mut out = Vec::new();
    let args = PrintArgs {
        fmt: Some("csvnamed".to_string() + ",name,value"),
    };
    print(&mut out, &args, cluster).unwrap();
    assert!(
        String::from_utf8(out).unwrap()
            == "name=cluster-name,value=hacluster\nname=dc-version,value=1.1.12-ad083a8\nname=stonith-enabled,value=true\n"
    );
}

#[test]
fn test_print_empty() {
    let mut out = Vec::new();
    print(&mut out, &PrintArgs::default(), HashMap::new()).unwrap();
    assert!(String::from_utf8(out).unwrap() == "name  value\n");
}
