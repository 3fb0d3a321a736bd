/// Render the model's lightweight markup into plain display text.
///
/// The analysis service answers in a small markdown subset: `#` headings,
/// `-`/`*` bullets, `**bold**`, `*italic*` and `` `code` `` spans. The chat
/// panel shows the rendered form, but only the raw text is ever stored in
/// the conversation log or sent back as history. Stateless, so it can be
/// swapped or tested without touching the append logic.
pub fn render_markup(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, line) in raw.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&render_line(line));
    }
    out
}

fn render_line(line: &str) -> String {
    let trimmed = line.trim_start();
    let indent = &line[..line.len() - trimmed.len()];

    if let Some(heading) = strip_heading(trimmed) {
        return format!("{indent}{}", strip_inline(heading));
    }
    if let Some(item) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
    {
        return format!("{indent}• {}", strip_inline(item));
    }
    format!("{indent}{}", strip_inline(trimmed))
}

fn strip_heading(line: &str) -> Option<&str> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    line[hashes..].strip_prefix(' ')
}

fn strip_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                // Collapse both `**` and `*` markers.
                while chars.peek() == Some(&'*') {
                    chars.next();
                }
            }
            '`' => {}
            _ => out.push(c),
        }
    }
    out
}
