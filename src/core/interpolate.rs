//! Positional argument interpolation for message text
//!
//! Patterns use `{0}`, `{1}`, ... to refer to arguments by index. `{{`
//! produces a literal `{`. A placeholder whose index has no matching argument
//! is kept verbatim. A `{` that is never closed, or that encloses anything
//! other than an index, is an error.
//!
//! This is the only formatting pass. Single quotes are ordinary characters,
//! not a quoting syntax, and a lone `}` is copied through. `%s` style
//! specifiers are left untouched.

use super::error::{LoggerError, Result};

/// Replace every `{n}` in `pattern` with `args[n]`.
///
/// # Examples
///
/// ```
/// use stellar_logging::core::interpolate;
///
/// let text = interpolate("{0} joined {1}", &["alice".to_string(), "#rust".to_string()]).unwrap();
/// assert_eq!(text, "alice joined #rust");
/// ```
pub fn interpolate(pattern: &str, args: &[String]) -> Result<String> {
    let mut output = String::with_capacity(pattern.len());
    let mut chars = pattern.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if c != '{' {
            output.push(c);
            continue;
        }

        if matches!(chars.peek(), Some((_, '{'))) {
            chars.next();
            output.push('{');
            continue;
        }

        let mut index = String::new();
        let mut closed = false;
        for (_, inner) in chars.by_ref() {
            if inner == '}' {
                closed = true;
                break;
            }
            index.push(inner);
        }

        if !closed {
            return Err(LoggerError::formatter(
                pattern,
                format!("unclosed placeholder at byte {}", start),
            ));
        }

        let position: usize = index.trim().parse().map_err(|_| {
            LoggerError::formatter(pattern, format!("'{{{}}}' is not a positional placeholder", index))
        })?;

        match args.get(position) {
            Some(arg) => output.push_str(arg),
            None => {
                output.push('{');
                output.push_str(&index);
                output.push('}');
            }
        }
    }

    Ok(output)
}
