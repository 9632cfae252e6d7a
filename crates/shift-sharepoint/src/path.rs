//! Encoding of server-relative paths passed as `@p1` parameters.

/// Encode a server-relative path for use inside a quoted OData parameter.
///
/// Each segment is percent-encoded on its own so the separators survive, and
/// single quotes are doubled after encoding because the value is wrapped in
/// `'...'` on the wire.
pub fn encode_path_parameter(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).replace("%27", "%27%27"))
        .collect::<Vec<_>>()
        .join("/")
}

/// `'{encoded}'`, ready to be appended as `@p1=`.
pub(crate) fn quoted_parameter(path: &str) -> String {
    format!("'{}'", encode_path_parameter(path))
}
