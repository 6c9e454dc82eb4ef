//! String quoting utilities for SQL statement text.

/// Quote a string by doubling every occurrence of `quote_char`.
///
/// NUL characters are copied as is; callers building statement text reject
/// them first (see [`contains_nul`]).
///
/// # Arguments
/// * `s` - The string to quote
/// * `quote_char` - The quote character ('\'' for literals, '"' for identifiers)
pub fn quote_with(s: &str, quote_char: char) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    result.push(quote_char);
    for c in s.chars() {
        match c {
            c if c == quote_char => {
                result.push(c);
                result.push(c);
            }
            c => result.push(c),
        }
    }
    result.push(quote_char);
    result
}

/// Whether `s` holds a character neither SQLite nor PostgreSQL accept in
/// statement text.
#[inline]
pub fn contains_nul(s: &str) -> bool {
    s.contains('\0')
}

/// Quote a string as a standard SQL string literal.
#[inline]
pub fn quote_literal(s: &str) -> String {
    quote_with(s, '\'')
}

/// Quote a string as a SQL identifier (table or column name).
#[inline]
pub fn quote_identifier(s: &str) -> String {
    quote_with(s, '"')
}
