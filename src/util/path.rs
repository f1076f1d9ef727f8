/// Normalize the configured Dropbox root folder.
///
/// Dropbox addresses its root folder as the empty string and everything
/// else as an absolute, `/`-separated path without a trailing slash.
pub fn normalize_remote_root(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Append a relative path (or a single name) to a Dropbox path.
pub fn join_remote(base: &str, relative: &str) -> String {
    let relative = relative.trim_matches('/');
    if relative.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{relative}")
    }
}

/// Extend a walker-relative path with one child directory name.
pub fn join_relative(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Display form of a walker-relative path.
pub fn display_relative(relative: &str) -> &str {
    if relative.is_empty() { "." } else { relative }
}

/// Check whether a base name matches any of the exclude masks.
pub fn matches_exclude(name: &str, masks: &[String]) -> bool {
    masks.iter().any(|mask| wildcard_match(mask, name))
}

/// Shell-style wildcard match over a single name: `*` matches any run of
/// characters (including none), `?` matches exactly one character.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `*` seen and the text index it is currently
    // absorbing up to; used to backtrack on mismatch.
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
