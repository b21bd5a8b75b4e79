use url::Url;

const FALLBACK_NAME: &str = "artifact";

/// Local file name for a downloaded artifact.
///
/// Prefers the server's `Content-Disposition` filename, then the last URL
/// path segment. The result is always a single safe path component.
pub fn artifact_filename(url: &Url, content_disposition: Option<&str>) -> String {
    let from_header = content_disposition.and_then(content_disposition_filename);
    let from_path = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(ToOwned::to_owned);

    from_header
        .into_iter()
        .chain(from_path)
        .map(|name| sanitize(&name))
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}

/// Extracts `filename=` from a Content-Disposition value (quoted or bare token).
pub fn content_disposition_filename(header_value: &str) -> Option<String> {
    header_value.split(';').find_map(|param| {
        let (name, value) = param.trim().split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let value = value.trim();
        let unquoted = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .map(|v| v.replace("\\\"", "\""))
            .unwrap_or_else(|| value.to_string());
        (!unquoted.is_empty()).then_some(unquoted)
    })
}

fn sanitize(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);

    // Collapse multiple underscores
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    if compacted.len() > 120 {
        let mut cut = 120;
        while !compacted.is_char_boundary(cut) {
            cut -= 1;
        }
        compacted.truncate(cut);
    }
    compacted
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}
