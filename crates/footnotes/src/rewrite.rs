/// The text appended to a footnote line once an archive link is known.
pub fn annotation(archive_url: &str) -> String {
    format!(" [Archived]({archive_url}) ")
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

/// Whether `line` starts the definition of footnote `label`.
fn defines(line: &str, label: &str) -> bool {
    line.strip_prefix("[^")
        .and_then(|rest| rest.split_once("]:"))
        .is_some_and(|(found, _)| found.to_lowercase() == label.to_lowercase())
}

fn opens(c: char) -> bool {
    c.is_whitespace() || matches!(c, '<' | '[' | '(')
}

fn closes(c: char) -> bool {
    c.is_whitespace() || matches!(c, '>' | ']' | ')')
}

/// Whether `url` appears in `line` as a whole token rather than as the
/// prefix or suffix of a longer URL.
fn contains_token(line: &str, url: &str) -> bool {
    if url.is_empty() {
        return false;
    }
    line.match_indices(url).any(|(start, _)| {
        let before = line[..start].chars().next_back();
        let after = line[start + url.len()..].chars().next();
        before.is_none_or(opens) && after.is_none_or(closes)
    })
}

/// Append an archive link to the definition line of footnote `label`.
///
/// The first line that starts `[^label]:` and cites `primary_url` as a whole
/// token has its trailing whitespace trimmed and the [`annotation`] appended
/// before its original line ending. Returns `None` when no line qualifies,
/// for example when the URL sits on a continuation line.
pub fn rewrite(text: &str, label: &str, primary_url: &str, archive_url: &str) -> Option<String> {
    let mut output = String::with_capacity(text.len() + archive_url.len() + 16);
    let mut patched = false;
    for line in text.split_inclusive('\n') {
        let (body, ending) = split_line_ending(line);
        if !patched && defines(body, label) && contains_token(body, primary_url) {
            output.push_str(body.trim_end());
            output.push_str(&annotation(archive_url));
            output.push_str(ending);
            patched = true;
        } else {
            output.push_str(line);
        }
    }
    patched.then_some(output)
}
