/// Generic formatting code for a set of data extracted from a data structure to be presented
/// columnar, as csv, or as json, and (except for json) with or without a header and with or without
/// named fields.
use anyhow::{bail, Result};
use std::collections::{HashMap, HashSet};
use std::io;

pub struct Help {
    pub fields: Vec<String>,
    pub aliases: Vec<(String, Vec<String>)>,
    pub defaults: String,
}

pub fn maybe_help<F>(output: &mut dyn io::Write, fmt: &Option<String>, f: F) -> Result<bool>
where
    F: Fn() -> Help,
{
    if let Some(ref s) = fmt {
        if s.starts_with("help") {
            let mut help = f();
            writeln!(output, "Syntax:\n  --fmt=(field|alias|control),...")?;
            writeln!(output, "\nFields:")?;
            help.fields.sort();
            for f in help.fields {
                writeln!(output, "  {f}")?;
            }
            if !help.aliases.is_empty() {
                writeln!(output, "\nAliases:")?;
                help.aliases.sort();
                for (name, mut fields) in help.aliases {
                    fields.sort();
                    let explication = fields.join(",");
                    writeln!(output, "  {name} --> {explication}")?;
                }
            }
            writeln!(output, "\nDefaults:\n  {}", help.defaults)?;
            writeln!(output, "\nControl:\n  csv\n  csvnamed\n  fixed\n  json\n  header\n  noheader")?;
            return Ok(true);
        }
    }
    Ok(false)
}

/// Return a vector of the known fields in `spec` wrt the formatters, and a HashSet of any other
/// strings found in `spec`.  It returns an error if zero output fields were selected.

pub fn parse_fields<'a, DataT>(
    spec: &'a str,
    formatters: &HashMap<String, fn(&DataT) -> String>,
    aliases: &'a HashMap<String, Vec<String>>,
) -> Result<(Vec<&'a str>, HashSet<&'a str>)> {
    let mut others = HashSet::new();
    let mut fields = vec![];
    for x in spec.split(',') {
        if formatters.contains_key(x) {
            fields.push(x);
        } else if let Some(aliases) = aliases.get(x) {
            for alias in aliases {
                if formatters.contains_key(alias) {
                    fields.push(alias.as_ref());
                } else {
                    others.insert(alias.as_ref());
                }
            }
        } else {
            others.insert(x);
        }
    }
    if fields.is_empty() {
        bail!("No output fields were selected")
    }
    Ok((fields, others))
}

pub struct FormatOptions {
    pub json: bool,   // json explicitly requested
    pub csv: bool,    // csv or csvnamed explicitly requested
    pub named: bool,  // csvnamed explicitly requested
    pub header: bool, // true if nothing requested b/c fixed+header is default
}

pub fn standard_options(others: &HashSet<&str>) -> FormatOptions {
    let csvnamed = others.contains("csvnamed");
    let csv = others.contains("csv") || csvnamed;
    let json = others.contains("json") && !csv;
    // json gets no header, even if one is requested
    let header =
        (!csv && !json && !others.contains("noheader")) || (csv && others.contains("header"));
    FormatOptions {
        csv,
        json,
        header,
        named: csvnamed,
    }
}

/// The `fields` are the names of formatting functions to get from the `formatters`, these are
/// applied to the `data`.  Set `opts.header` to true to print a first row with field names as a
/// header (independent of csv).  Set `opts.csv` to true to get CSV output instead of fixed-format.

pub fn format_data<DataT>(
    output: &mut dyn io::Write,
    fields: &[&str],
    formatters: &HashMap<String, fn(&DataT) -> String>,
    opts: &FormatOptions,
    data: &[DataT],
) -> Result<()> {
    let mut cols = Vec::<Vec<String>>::new();
    cols.resize(fields.len(), vec![]);

    for x in data {
        for (i, kwd) in fields.iter().enumerate() {
            // parse_fields only returns names present in `formatters`.
            if let Some(f) = formatters.get(*kwd) {
                cols[i].push(f(x));
            }
        }
    }

    if opts.csv {
        format_csv(output, fields, opts, &cols)
    } else if opts.json {
        format_json(output, fields, &cols)
    } else {
        format_fixed_width(output, fields, opts, &cols)
    }
}

fn format_fixed_width(
    output: &mut dyn io::Write,
    fields: &[&str],
    opts: &FormatOptions,
    cols: &[Vec<String>],
) -> Result<()> {
    // The column width is the max across all the entries in the column (including header,
    // if present).
    let mut widths = vec![0; fields.len()];
    if opts.header {
        for (i, kwd) in fields.iter().enumerate() {
            widths[i] = usize::max(widths[i], kwd.len());
        }
    }
    for (i, col) in cols.iter().enumerate() {
        for val in col {
            widths[i] = usize::max(widths[i], val.len());
        }
    }

    if opts.header {
        let mut s = "".to_string();
        for (i, kwd) in fields.iter().enumerate() {
            let w = widths[i];
            s += format!("{:w$}  ", kwd).as_str();
        }
        writeln!(output, "{}", s.trim_end())?;
    }

    for row in 0..nrows(cols) {
        let mut s = "".to_string();
        for (i, col) in cols.iter().enumerate() {
            let w = widths[i];
            s += format!("{:w$}  ", col[row]).as_str();
        }
        writeln!(output, "{}", s.trim_end())?;
    }
    Ok(())
}

fn format_csv(
    output: &mut dyn io::Write,
    fields: &[&str],
    opts: &FormatOptions,
    cols: &[Vec<String>],
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(output);

    if opts.header {
        writer.write_record(fields)?;
    }

    for row in 0..nrows(cols) {
        let mut out_fields = Vec::new();
        for (i, col) in cols.iter().enumerate() {
            let val = &col[row];
            if opts.named {
                out_fields.push(format!("{}={}", fields[i], val));
            } else {
                out_fields.push(val.clone());
            }
        }
        writer.write_record(out_fields)?;
    }

    writer.flush()?;
    Ok(())
}

fn format_json(output: &mut dyn io::Write, fields: &[&str], cols: &[Vec<String>]) -> Result<()> {
    let mut objects = vec![];
    for row in 0..nrows(cols) {
        let mut obj = json::JsonValue::new_object();
        for (i, col) in cols.iter().enumerate() {
            obj[fields[i]] = col[row].clone().into();
        }
        objects.push(obj);
    }
    writeln!(output, "{}", json::stringify(objects))?;
    Ok(())
}

fn nrows(cols: &[Vec<String>]) -> usize {
    cols.first().map(|c| c.len()).unwrap_or(0)
}

#[cfg(test)]
fn test_formatters() -> HashMap<String, fn(&(String, usize)) -> String> {
    let mut formatters: HashMap<String, fn(&(String, usize)) -> String> = HashMap::new();
    formatters.insert("name".to_string(), |d| d.0.clone());
    formatters.insert("count".to_string(), |d| d.1.to_string());
    formatters
}

#[cfg(test)]
fn render(spec: &str) -> String {
    let formatters = test_formatters();
    let mut aliases = HashMap::new();
    aliases.insert("all".to_string(), vec!["name".to_string(), "count".to_string()]);
    let data = vec![("alpha".to_string(), 1), ("b".to_string(), 255)];
    let (fields, others) = parse_fields(spec, &formatters, &aliases).unwrap();
    let opts = standard_options(&others);
    let mut out = Vec::new();
    format_data(&mut out, &fields, &formatters, &opts, &data).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_fixed() {
    assert!(render("name,count") == "name   count\nalpha  1\nb      255\n");
    assert!(render("all,noheader") == "alpha  1\nb      255\n");
}

#[test]
fn test_csv() {
    assert!(render("name,count,csv") == "alpha,1\nb,255\n");
    assert!(render("count,csv,header") == "count\n1\n255\n");
    assert!(render("all,csvnamed") == "name=alpha,count=1\nname=b,count=255\n");
}

#[test]
fn test_json() {
    assert!(
        render("all,json") == "[{\"name\":\"alpha\",\"count\":\"1\"},{\"name\":\"b\",\"count\":\"255\"}]\n"
    );
}

#[test]
fn test_no_fields() {
    let formatters = test_formatters();
    let aliases = HashMap::new();
    assert!(parse_fields("csv,header", &formatters, &aliases).is_err());
}

#[test]
fn test_help() {
    let mut out = Vec::new();
    let help = || Help {
        fields: vec!["b".to_string(), "a".to_string()],
        aliases: vec![],
        defaults: "a,b".to_string(),
    };
    assert!(!maybe_help(&mut out, &None, help).unwrap());
    assert!(!maybe_help(&mut out, &Some("a,b".to_string()), help).unwrap());
    assert!(out.is_empty());
    assert!(maybe_help(&mut out, &Some("help".to_string()), help).unwrap());
    let s = String::from_utf8(out).unwrap();
    assert!(s.contains("Fields:\n  a\n  b\n"));
    assert!(s.contains("Defaults:\n  a,b\n"));
}
