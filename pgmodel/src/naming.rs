//! Name conversions used for table-name inference, code generation and SQL
//! identifier quoting.

use std::sync::LazyLock;

use regex::Regex;

static WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[A-Z])[a-z]+").expect("word pattern is valid"));

/// Converts a CamelCase name to its snake_case equivalent.
///
/// Words are runs of lowercase letters, optionally led by one uppercase letter.
/// Only when at least two words are found are they joined with `_`; otherwise
/// the input is returned with its first letter lowercased. Characters outside
/// of the matched words (digits, acronym runs) are dropped in the joined form.
///
/// ```
/// use pgmodel::naming::camel_to_snake;
///
/// assert_eq!(camel_to_snake("UserGroup"), "user_group");
/// assert_eq!(camel_to_snake("Option"), "option");
/// ```
pub fn camel_to_snake(camel: &str) -> String {
    let words: Vec<&str> = WORDS.find_iter(camel).map(|m| m.as_str()).collect();

    if words.len() > 1 {
        words.into_iter().map(lcfirst).collect::<Vec<_>>().join("_")
    } else {
        lcfirst(camel)
    }
}

/// Converts a snake_case name to its CamelCase equivalent.
pub fn snake_to_camel(snake: &str) -> String {
    snake.split('_').map(ucfirst).collect()
}

/// Quotes an identifier for interpolation into SQL.
///
/// Each `.`-separated part is quoted on its own so `schema.table` keeps
/// addressing the table inside the schema.
pub fn quote_identifier(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

fn lcfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
