use crate::model::{Classification, PortScanResult, ScanReport};
use crate::{Error, Result};
use colored::Colorize;
use serde_json::to_string_pretty;
use std::collections::BTreeSet;
use std::fmt::Write as FmtWrite;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

// region:        --- Exporting utils

pub fn ensure_dir(dir: &Path) -> Result<bool> {
    if dir.as_os_str().is_empty() || dir.is_dir() {
        Ok(false)
    } else {
        fs::create_dir_all(dir)?;
        Ok(true)
    }
}

/// One header comment line, then one hostname per line in sorted order.
pub fn render_text(domain: &str, hosts: &BTreeSet<String>) -> String {
    let mut content = format!("# Subdomains for {}\n", domain);
    for host in hosts {
        content.push_str(host);
        content.push('\n');
    }
    content
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    let to_output_error = |err: std::io::Error| Error::OutputWrite {
        path: path.to_path_buf(),
        reason: err.to_string(),
    };

    if let Some(parent) = path.parent() {
        ensure_dir(parent).map_err(|err| Error::OutputWrite {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
    }
    let mut file = File::create(path).map_err(to_output_error)?;
    file.write_all(content.as_bytes()).map_err(to_output_error)?;
    Ok(())
}

pub fn export_to_text(domain: &str, hosts: &BTreeSet<String>, path: &Path) -> Result<()> {
    write_file(path, &render_text(domain, hosts))
}

pub fn export_to_json(report: &ScanReport, path: &Path) -> Result<()> {
    let json = to_string_pretty(report)?;
    write_file(path, &json)
}

/// Picks the sink from the extension: `.json` gets the full report, any
/// other path the plain host list.
pub fn export(report: &ScanReport, path: &Path) -> Result<()> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        export_to_json(report, path)
    } else {
        let hosts: BTreeSet<String> = report
            .classification
            .valid
            .iter()
            .chain(&report.classification.invalid)
            .chain(&report.classification.wildcard)
            .cloned()
            .collect();
        export_to_text(&report.domain, &hosts, path)
    }
}

// endregion:     --- Exporting utils

// region:        --- Console

pub fn render_console(classification: &Classification, open_ports: &PortScanResult) -> Result<String> {
    let mut out = String::new();

    writeln!(
        &mut out,
        "\n{} Found {} unique subdomains:\n",
        "[+]".green(),
        classification.total()
    )?;

    writeln!(
        &mut out,
        "{} Valid Subdomains ({}):",
        "[+]".green(),
        classification.valid.len()
    )?;
    for host in &classification.valid {
        match open_ports.get(host) {
            Some(ports) => {
                let ports: Vec<String> = ports.iter().map(|port| port.to_string()).collect();
                writeln!(
                    &mut out,
                    "{} (Open Ports: {})",
                    host.bold(),
                    ports.join(", ").cyan()
                )?;
            }
            None => writeln!(&mut out, "{}", host)?,
        }
    }

    writeln!(
        &mut out,
        "\n{} Invalid Subdomains ({}):",
        "[-]".red(),
        classification.invalid.len()
    )?;
    for host in &classification.invalid {
        writeln!(&mut out, "{}", host.dimmed())?;
    }

    writeln!(
        &mut out,
        "\n{} Wildcard Subdomains ({}):",
        "[*]".yellow(),
        classification.wildcard.len()
    )?;
    for host in &classification.wildcard {
        writeln!(&mut out, "{}", host.yellow())?;
    }

    Ok(out)
}

pub fn write_to_console(classification: &Classification, open_ports: &PortScanResult) -> Result<()> {
    let out = render_console(classification, open_ports)?;
    print!("{}", out);
    Ok(())
}

// endregion:     --- Console
