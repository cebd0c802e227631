//! A small standard global scope
//!
//! Macros: `echo`, `join`. Filters: `uppercase`, `lowercase`, `trim`,
//! `truncate`.

use crate::handler::{MacroError, ObjectHandler, Params};

/// Default ellipsis appended by `truncate`
pub const DEFAULT_ELLIPSIS: &str = "...";

/// Global handler with the standard macros and filters
pub fn standard_global() -> ObjectHandler {
    ObjectHandler::new("global")
        .with_returning("echo", echo)
        .with_returning("join", join)
        .with_filter("uppercase", |s, _| Ok(s.to_uppercase()))
        .with_filter("lowercase", |s, _| Ok(s.to_lowercase()))
        .with_filter("trim", |s, _| Ok(s.trim().to_string()))
        .with_filter("truncate", truncate)
}

/// `what=` if given, else the positional values separated by spaces
fn echo(params: &Params) -> Result<String, MacroError> {
    Ok(match params.get("what") {
        Some(what) => what.to_string(),
        None => params.positional().join(" "),
    })
}

/// Positional values joined with `separator=` (default: none)
fn join(params: &Params) -> Result<String, MacroError> {
    Ok(params.positional().join(params.get("separator").unwrap_or("")))
}

/// Cut the input to `limit` characters, appending `ellipsis` when cut
fn truncate(input: &str, params: &Params) -> Result<String, MacroError> {
    let limit: usize = params
        .parse("limit")?
        .ok_or_else(|| MacroError::MissingParameter("limit".to_string()))?;
    if input.chars().count() <= limit {
        return Ok(input.to_string());
    }
    let ellipsis = params.get("ellipsis").unwrap_or(DEFAULT_ELLIPSIS);
    let mut out: String = input.chars().take(limit).collect();
    out.push_str(ellipsis);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo() {
        assert_eq!(echo(&Params::new().with("what", "hi")).unwrap(), "hi");
        assert_eq!(
            echo(&Params::new().with_positional("a").with_positional("b")).unwrap(),
            "a b"
        );
        assert_eq!(echo(&Params::new()).unwrap(), "");
    }

    #[test]
    fn test_join() {
        let params = Params::new()
            .with_positional("a")
            .with_positional("b")
            .with("separator", ", ");
        assert_eq!(join(&params).unwrap(), "a, b");
    }

    #[test]
    fn test_truncate() {
        let params = Params::new().with("limit", "3");
        assert_eq!(truncate("abcdef", &params).unwrap(), "abc...");
        assert_eq!(truncate("ab", &params).unwrap(), "ab");
        assert_eq!(
            truncate("äöüß", &params.clone().with("ellipsis", "~")).unwrap(),
            "äöü~"
        );
    }

    #[test]
    fn test_truncate_needs_valid_limit() {
        assert_eq!(
            truncate("x", &Params::new()),
            Err(MacroError::MissingParameter("limit".to_string()))
        );
        assert!(matches!(
            truncate("x", &Params::new().with("limit", "many")),
            Err(MacroError::InvalidParameter { .. })
        ));
    }
}
