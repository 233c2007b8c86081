//! Text helpers shared by the providers and the client.

const FENCE: &str = "```";

/// Trim an answer and remove a surrounding markdown code fence.
pub fn clean_answer(text: &str) -> String {
    let trimmed = text.trim();
    let unfenced = if trimmed.len() >= FENCE.len() * 2
        && trimmed.starts_with(FENCE)
        && trimmed.ends_with(FENCE)
    {
        &trimmed[FENCE.len()..trimmed.len() - FENCE.len()]
    } else {
        trimmed.strip_prefix(FENCE).filter(|rest| rest.is_empty()).unwrap_or(trimmed)
    };
    unfenced.trim().to_string()
}

/// Fill `%s` placeholders in order. `%%` is a literal percent sign.
///
/// Arguments without a matching placeholder are appended after a blank line,
/// so a template missing `%s` never drops the diff.
pub fn format_prompt(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len() + args.iter().map(|a| a.len()).sum::<usize>());
    let mut args = args.iter();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('s') => {
                chars.next();
                if let Some(arg) = args.next() {
                    out.push_str(arg);
                }
            }
            Some('%') => {
                chars.next();
                out.push('%');
            }
            _ => out.push('%'),
        }
    }

    for extra in args {
        out.push_str("\n\n");
        out.push_str(extra);
    }
    out
}
