// InfluxQL text for the two read modes.

use crate::config::{ReadMode, ReadSpec};

/// Query text for one uid.
///
/// Time-range reads come back oldest first. Last-n reads are fetched newest
/// first so `LIMIT` keeps the most recent points; callers re-sort them.
pub fn build(uid: &str, field_key: &str, spec: &ReadSpec) -> String {
    let field = quote_ident(field_key);
    let measurement = quote_ident(uid);
    match spec.mode {
        ReadMode::TimeRange => format!(
            "SELECT {field} AS value FROM {measurement} WHERE time > now() - {}{} ORDER BY time ASC",
            spec.time_range.duration, spec.time_range.unit
        ),
        ReadMode::LastN => format!(
            "SELECT {field} AS value FROM {measurement} ORDER BY time DESC LIMIT {}",
            spec.last_n.count
        ),
    }
}

fn quote_ident(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 2);
    out.push('"');
    for c in ident.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
