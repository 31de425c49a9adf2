//! Error text as stored on a failed `SiteComparisonResult`.

use crate::config::MAX_ERROR_MESSAGE_LENGTH;

/// Renders remote error text as a single printable line of bounded length.
///
/// Line breaks and tabs become spaces, other control characters are dropped.
/// Text beyond `MAX_ERROR_MESSAGE_LENGTH` characters is cut and marked with `…`.
pub fn stored_error_message(message: &str) -> String {
    let mut line = String::with_capacity(message.len().min(MAX_ERROR_MESSAGE_LENGTH));
    for (count, c) in message
        .chars()
        .filter_map(|c| match c {
            '\n' | '\r' | '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .enumerate()
    {
        if count == MAX_ERROR_MESSAGE_LENGTH {
            line.push('…');
            break;
        }
        line.push(c);
    }
    line.trim_end().to_string()
}
