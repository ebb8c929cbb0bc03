use std::fmt::Display;

pub const LOG_ERROR_MAX_LEN: usize = 320;
const HEX_BLOB_KEEP_CHARS: usize = 18;

/// Single-line rendering of an error for log output.
pub fn compact_error(err: &dyn Display) -> String {
    compact_error_message(&err.to_string(), LOG_ERROR_MAX_LEN)
}

/// Collapses whitespace, drops backtraces and shortens long `0x` payloads
/// (raw transactions, calldata) so a failure fits on one log line.
pub fn compact_error_message(message: &str, max_len: usize) -> String {
    let raw = match message.split_once("Stack backtrace:") {
        Some((prefix, _)) => prefix,
        None => message,
    };

    let mut compact = String::with_capacity(raw.len().min(max_len.saturating_add(16)));
    for word in raw.split_whitespace() {
        if !compact.is_empty() {
            compact.push(' ');
        }
        compact.push_str(&elide_hex_blob(word));
        if compact.len() > max_len {
            break;
        }
    }

    if compact.len() <= max_len {
        return compact;
    }
    let mut cut = max_len;
    while !compact.is_char_boundary(cut) {
        cut -= 1;
    }
    compact.truncate(cut);
    compact.push_str("...(truncated)");
    compact
}

fn elide_hex_blob(word: &str) -> String {
    let Some(body) = word.strip_prefix("0x") else {
        return word.to_string();
    };
    let hex_len = body.chars().take_while(|c| c.is_ascii_hexdigit()).count();
    // Hashes (64 hex chars) stay readable; anything longer is payload.
    if hex_len <= 64 {
        return word.to_string();
    }
    format!(
        "0x{}..<{} hex chars>{}",
        &body[..HEX_BLOB_KEEP_CHARS],
        hex_len,
        &body[hex_len..]
    )
}

#[cfg(test)]
mod tests {
    use super::compact_error_message;

    #[test]
    fn test_compact_error_message_drops_backtrace_and_newlines() {
        let raw = "server returned an error response:\n  error code -32000\nStack backtrace:\n 0: frame";
        let compact = compact_error_message(raw, 260);
        assert_eq!(
            compact,
            "server returned an error response: error code -32000"
        );
    }

    #[test]
    fn test_compact_error_message_elides_raw_transaction_payload() {
        let payload = format!("0x{}", "ab".repeat(300));
        let raw = format!("nonce too low for {payload}");
        let compact = compact_error_message(&raw, 260);
        assert!(compact.contains("<600 hex chars>"));
        assert!(compact.len() < 120);
    }

    #[test]
    fn test_compact_error_message_keeps_tx_hashes() {
        let hash = format!("0x{}", "1f".repeat(32));
        let compact = compact_error_message(&format!("transaction {hash} reverted"), 260);
        assert!(compact.contains(&hash));
    }

    #[test]
    fn test_compact_error_message_truncates() {
        let raw = "word ".repeat(200);
        let compact = compact_error_message(&raw, 40);
        assert!(compact.ends_with("...(truncated)"));
        assert!(compact.len() <= 40 + "...(truncated)".len());
    }
}
