/// Collapse whitespace and cap the length of a protocol rejection reason for log lines.
pub fn compact_error_message(message: &str, max_len: usize) -> String {
    let raw = match message.split_once("\nStack backtrace:") {
        Some((prefix, _)) => prefix,
        None => message,
    };

    let mut compact = String::with_capacity(raw.len().min(max_len.saturating_add(16)));
    let mut prev_ws = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            if !prev_ws && !compact.is_empty() {
                compact.push(' ');
            }
            prev_ws = true;
            continue;
        }
        compact.push(ch);
        prev_ws = false;
        if compact.len() > max_len {
            break;
        }
    }
    let compact = compact.trim_end().to_string();
    if compact.len() <= max_len {
        compact
    } else {
        let mut cut = max_len;
        while !compact.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...(truncated)", &compact[..cut])
    }
}
