use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_table<const N: usize>(header: [&str; N], rows: Vec<[String; N]>) {
    let mut builder = Builder::default();
    builder.push_record(header);
    for row in rows {
        builder.push_record(row);
    }
    let table = builder.build().with(Style::rounded()).to_string();
    println!("{table}");
}

/// Two-column metric/value table.
pub fn print_pairs(rows: Vec<(&str, String)>) {
    print_table(
        ["Metric", "Value"],
        rows.into_iter()
            .map(|(name, value)| [name.to_string(), value])
            .collect(),
    );
}

pub fn status_mark(healthy: bool) -> String {
    if healthy {
        "healthy".green().to_string()
    } else {
        "unhealthy".red().to_string()
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
