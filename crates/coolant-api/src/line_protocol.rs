// InfluxDB line protocol encoding.
//
// `measurement,tag=v field=1.5 1700000000000000000`
// Measurements escape commas and spaces; tag keys, tag values and field
// keys additionally escape `=`.

use std::fmt::Write as _;

use crate::types::Point;

/// Encode points into a newline-separated line-protocol body.
///
/// Points without fields are skipped, the store would reject them.
pub fn encode(points: &[Point]) -> String {
    let mut body = String::new();
    for point in points.iter().filter(|p| !p.fields.is_empty()) {
        if !body.is_empty() {
            body.push('\n');
        }
        encode_point(&mut body, point);
    }
    body
}

fn encode_point(out: &mut String, point: &Point) {
    escape_into(out, &point.measurement, &[',', ' ']);

    for (key, value) in &point.tags {
        if value.is_empty() {
            continue;
        }
        out.push(',');
        escape_into(out, key, &[',', '=', ' ']);
        out.push('=');
        escape_into(out, value, &[',', '=', ' ']);
    }

    out.push(' ');
    for (i, (key, value)) in point.fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        escape_into(out, key, &[',', '=', ' ']);
        // f64's Display never uses exponent notation, which the protocol rejects.
        let _ = write!(out, "={value}");
    }

    let _ = write!(out, " {}", point.timestamp_ns);
}

fn escape_into(out: &mut String, raw: &str, special: &[char]) {
    for c in raw.chars() {
        if c == '\\' || special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}
