//! Binary downloads and `Content-Disposition` filename extraction

use std::path::{Path, PathBuf};

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Download {
    /// Write the payload into `dir`, named after the server-provided filename
    /// or `fallback` when there is none.
    pub fn save_to(&self, dir: &Path, fallback: &str) -> ApiResult<PathBuf> {
        let name = self
            .file_name
            .as_deref()
            .map(sanitize_file_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| fallback.to_string());
        let path = dir.join(name);
        std::fs::write(&path, &self.bytes)
            .map_err(|e| ApiError::Storage(format!("cannot write {}: {}", path.display(), e)))?;
        Ok(path)
    }
}

/// Strip any directory components a server might sneak into the name.
fn sanitize_file_name(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Split header parameters on `;`, leaving quoted strings intact.
fn split_params(header: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in header.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                params.push(header[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(header[start..].trim());
    params
}

/// Value of a parameter, with quotes and backslash escapes removed.
fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            other => out.push(other),
        }
    }
    out
}

/// Filename from a `Content-Disposition` header.
///
/// RFC 5987 `filename*=charset'lang'value` wins over plain `filename=`.
pub fn parse_content_disposition(header: &str) -> Option<String> {
    let mut plain = None;

    for param in split_params(header) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        if key == "filename*" {
            let encoded = match value.splitn(3, '\'').collect::<Vec<_>>().as_slice() {
                [_charset, _lang, encoded] => *encoded,
                _ => value,
            };
            if let Ok(decoded) = urlencoding::decode(encoded.trim_matches('"')) {
                if !decoded.is_empty() {
                    return Some(decoded.into_owned());
                }
            }
        } else if key == "filename" && plain.is_none() {
            let unquoted = unquote(value);
            if !unquoted.is_empty() {
                plain = Some(unquoted);
            }
        }
    }

    plain
}
