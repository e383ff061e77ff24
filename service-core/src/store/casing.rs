//! Column (snake_case) and domain (camelCase) key conversion.

use super::Row;

pub fn to_snake_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 4);
    for c in field.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Only `_` followed by a lowercase letter folds; other underscores stay.
pub fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('_', Some(next)) if next.is_ascii_lowercase() => {
                out.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

pub fn row_to_camel(row: Row) -> Row {
    row.into_iter().map(|(k, v)| (to_camel_case(&k), v)).collect()
}

pub fn row_to_snake(row: Row) -> Row {
    row.into_iter().map(|(k, v)| (to_snake_case(&k), v)).collect()
}
