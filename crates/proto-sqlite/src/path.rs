use super::Error;

/// One step of a parsed `$.a.b[i]` path.
///
/// Paths always begin with the `Root` sentinel; a bare `$` addresses
/// the root message itself. Indices are signed, and negative values
/// count from the end of a repeated field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Root,
    Field(String),
    IndexedField(String, i64),
}

/// Parse a path expression: `path := "$" step*`, `step := "." ident
/// ("[" int "]")?`. The entire input must be consumed.
pub fn parse_path(path: &str) -> Result<Vec<Step>, Error> {
    let invalid = || Error::InvalidPath {
        path: path.to_string(),
    };

    let mut rest = path.strip_prefix('$').ok_or_else(invalid)?;
    let mut steps = vec![Step::Root];

    while !rest.is_empty() {
        rest = rest.strip_prefix('.').ok_or_else(invalid)?;

        // An identifier runs to the next '.' or '[' delimiter.
        let end = rest.find(|c| c == '.' || c == '[').unwrap_or(rest.len());
        let name = &rest[..end];
        if name.is_empty() {
            return Err(invalid());
        }
        rest = &rest[end..];

        match rest.strip_prefix('[') {
            None => steps.push(Step::Field(name.to_string())),
            Some(after) => {
                let close = after.find(']').ok_or_else(invalid)?;
                let index = parse_index(&after[..close]).ok_or_else(invalid)?;
                steps.push(Step::IndexedField(name.to_string(), index));
                rest = &after[close + 1..];
            }
        }
    }

    Ok(steps)
}

// Strictly `-?[0-9]+`: no leading '+', no interior signs.
fn parse_index(text: &str) -> Option<i64> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
