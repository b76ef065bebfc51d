use std::io::Write;

use super::source::UaIpPair;
use crate::error::Result;

pub const HEADER: [&str; 2] = ["user_agent", "ip_address"];

/// Write the header row followed by one row per pair. Returns the number of data rows.
pub fn write_pairs<'a, W, I>(writer: &mut W, pairs: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a UaIpPair>,
{
    write_row(writer, &HEADER)?;

    let mut rows = 0;
    for pair in pairs {
        write_row(writer, &[pair.user_agent.as_str(), pair.ip_address.as_str()])?;
        rows += 1;
    }
    writer.flush()?;
    Ok(rows)
}

fn write_row<W: Write>(writer: &mut W, values: &[&str]) -> Result<()> {
    let line = values
        .iter()
        .map(|v| escape_csv_value(v))
        .collect::<Vec<_>>()
        .join(",");
    // RFC 4180 line endings
    write!(writer, "{}\r\n", line)?;
    Ok(())
}

fn escape_csv_value(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
