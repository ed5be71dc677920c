//! Generated file contents
//!
//! Traefik static/dynamic configuration and the Docker Compose files are
//! rendered here as plain strings; writing them to disk is the caller's job.

pub mod compose;
pub mod traefik;

/// Name of the ACME resolver referenced by router labels
pub const RESOLVER_NAME: &str = "letsencrypt";

/// Quote a value as a double-quoted YAML scalar
pub fn yaml_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
