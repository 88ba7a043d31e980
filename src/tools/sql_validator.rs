//! Statement classification and policy enforcement for the `query` tool.
//!
//! Classification is lexical: only the leading keyword of a statement is
//! inspected. Statement bodies are never parsed, so a CTE that ends in a write
//! (`WITH x AS (...) INSERT ...`) classifies as read-only. The read role is a
//! guard against accidental mutation, not a security boundary.

use crate::models::Role;
use std::borrow::Cow;

/// Leading keywords of statements admitted under the read role.
pub const READ_ONLY_KEYWORDS: &[&str] = &["select", "show", "explain", "with"];

/// Read-only keywords whose statements can be wrapped in a bounding subquery.
const BOUNDABLE_KEYWORDS: &[&str] = &["select", "with"];

/// Error returned when the read role submits a mutating statement.
pub const WRITE_IN_READ_ROLE: &str = "write operation not allowed in read role";

/// Error returned when the read role submits more than one statement.
pub const STACKED_IN_READ_ROLE: &str = "multiple statements not allowed in read role";

/// Alias used for the bounding subquery.
pub const BOUND_ALIAS: &str = "_sub";

/// Lowercased leading keyword of a statement.
///
/// Takes the first whitespace-delimited token and keeps its leading run of
/// ASCII letters, so `SELECT(1)` yields `select`. Returns `None` for empty input.
pub fn leading_keyword(sql: &str) -> Option<String> {
    let token = sql.split_whitespace().next()?;
    let keyword: String = token
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if keyword.is_empty() {
        None
    } else {
        Some(keyword)
    }
}

/// Whether a statement is safe to run under the read role.
///
/// The rule is [`leading_keyword`] equality: the leading ASCII letters of the
/// first whitespace-delimited token must be exactly one of
/// [`READ_ONLY_KEYWORDS`]. `SELECT(1)` and `with_x` therefore qualify while
/// `selectx` does not. Empty and whitespace-only statements are not read-only.
pub fn is_read_only(sql: &str) -> bool {
    leading_keyword(sql).is_some_and(|kw| READ_ONLY_KEYWORDS.contains(&kw.as_str()))
}

/// Admission rule: the write role admits everything, the read role admits
/// only read-only statements.
pub fn admit(sql: &str, role: Role) -> bool {
    match role {
        Role::Write => true,
        Role::Read => is_read_only(sql),
    }
}

/// Cap the rows a read-only statement can return.
///
/// Statements whose text mentions `limit` anywhere are returned unchanged.
/// The check is a plain substring match, so an identifier such as
/// `rate_limit` also suppresses bounding. Mutating statements and read-only
/// statements that cannot appear in a subquery (`SHOW`, `EXPLAIN`) are never
/// rewritten.
pub fn bound_rows(sql: &str, limit: u32) -> Cow<'_, str> {
    let boundable =
        leading_keyword(sql).is_some_and(|kw| BOUNDABLE_KEYWORDS.contains(&kw.as_str()));
    if !boundable || sql.to_lowercase().contains("limit") {
        return Cow::Borrowed(sql);
    }

    let inner = sql.trim().trim_end_matches(';').trim_end();
    Cow::Owned(format!(
        "SELECT * FROM ({}) AS {} LIMIT {}",
        inner, BOUND_ALIAS, limit
    ))
}

/// Whether the text holds at most one statement.
///
/// A `;` may only be followed by whitespace, further `;` or comments. Quoted
/// strings and identifiers (`'`, `"`, `` ` ``, `[...]`), `--` line comments
/// and `/* */` block comments are skipped. Dollar-quoted bodies are not
/// recognized, so a `;` inside one counts as a terminator.
pub fn is_single_statement(sql: &str) -> bool {
    let mut chars = sql.chars().peekable();
    let mut terminated = false;

    while let Some(c) = chars.next() {
        match c {
            '-' if chars.peek() == Some(&'-') => {
                chars.find(|&c| c == '\n');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                skip_block_comment(&mut chars);
            }
            c if c.is_whitespace() => {}
            ';' => terminated = true,
            _ if terminated => return false,
            '\'' | '"' | '`' => {
                chars.find(|&next| next == c);
            }
            '[' => {
                chars.find(|&next| next == ']');
            }
            _ => {}
        }
    }
    true
}

fn skip_block_comment(chars: &mut impl Iterator<Item = char>) {
    let mut prev = '\0';
    for c in chars {
        if prev == '*' && c == '/' {
            return;
        }
        prev = c;
    }
}

/// Normalize statement text for responses and log lines.
///
/// Collapses every whitespace run (including newlines) into a single space
/// and trims both ends.
pub fn redact(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_statements() {
        assert!(is_read_only("select 1"));
        assert!(is_read_only("  SELECT 1"));
        assert!(is_read_only("with x as (select 1) select * from x"));
        assert!(is_read_only("EXPLAIN select 1"));
        assert!(is_read_only("show search_path"));
        assert!(is_read_only("\n\tSelect\n*\nfrom t"));
        assert!(is_read_only("SELECT(1)"));
        assert!(is_read_only("with_x"));
    }

    #[test]
    fn test_mutating_statements() {
        assert!(!is_read_only("insert into t values (1)"));
        assert!(!is_read_only("UPDATE t SET a = 1"));
        assert!(!is_read_only("delete from t"));
        assert!(!is_read_only("drop table t"));
        assert!(!is_read_only("create table t (id int)"));
        assert!(!is_read_only("selectx from t"));
    }

    #[test]
    fn test_empty_statement_is_not_read_only() {
        assert!(!is_read_only(""));
        assert!(!is_read_only("   \n  "));
        assert!(!is_read_only("(select 1)"));
    }

    #[test]
    fn test_cte_write_is_misclassified_as_read_only() {
        // Known limitation of lexical classification.
        assert!(is_read_only(
            "WITH x AS (SELECT 1) INSERT INTO t SELECT * FROM x"
        ));
    }

    #[test]
    fn test_leading_keyword() {
        assert_eq!(leading_keyword("  SeLeCt 1").as_deref(), Some("select"));
        assert_eq!(leading_keyword("").as_deref(), None);
        assert_eq!(leading_keyword("123").as_deref(), None);
    }

    #[test]
    fn test_admit() {
        assert!(admit("delete from t", Role::Write));
        assert!(admit("", Role::Write));
        assert!(admit("select 1", Role::Read));
        assert!(!admit("delete from t", Role::Read));
        assert!(!admit("", Role::Read));
    }

    #[test]
    fn test_bound_rows_wraps_unlimited_select() {
        let bounded = bound_rows("select * from t", 50);
        assert!(bounded.eq_ignore_ascii_case("select * from (select * from t) as _sub LIMIT 50"));
        assert_eq!(bounded, "SELECT * FROM (select * from t) AS _sub LIMIT 50");
    }

    #[test]
    fn test_bound_rows_keeps_existing_limit() {
        assert_eq!(
            bound_rows("select * from t limit 10", 50),
            "select * from t limit 10"
        );
        assert_eq!(
            bound_rows("SELECT * FROM t LIMIT 10", 50),
            "SELECT * FROM t LIMIT 10"
        );
    }

    #[test]
    fn test_bound_rows_substring_check_is_coarse() {
        // A column named rate_limit suppresses bounding.
        assert_eq!(
            bound_rows("select rate_limit from plans", 50),
            "select rate_limit from plans"
        );
    }

    #[test]
    fn test_bound_rows_strips_trailing_semicolon() {
        assert_eq!(
            bound_rows("select 1;\n", 5),
            "SELECT * FROM (select 1) AS _sub LIMIT 5"
        );
    }

    #[test]
    fn test_bound_rows_wraps_cte() {
        assert_eq!(
            bound_rows("with x as (select 1) select * from x", 7),
            "SELECT * FROM (with x as (select 1) select * from x) AS _sub LIMIT 7"
        );
    }

    #[test]
    fn test_bound_rows_skips_non_boundable_statements() {
        assert_eq!(bound_rows("delete from t", 50), "delete from t");
        assert_eq!(bound_rows("show search_path", 50), "show search_path");
        assert_eq!(bound_rows("explain select 1", 50), "explain select 1");
    }

    #[test]
    fn test_single_statements() {
        assert!(is_single_statement("select 1"));
        assert!(is_single_statement("select 1;"));
        assert!(is_single_statement("select 1 ;; \n"));
        assert!(is_single_statement("select 1; -- done"));
        assert!(is_single_statement("select 1; /* done */"));
        assert!(is_single_statement("select ';' as s"));
        assert!(is_single_statement("select \"a;b\" from [c;d]"));
        assert!(is_single_statement("select 1 /* ; drop table t */ from t"));
        assert!(is_single_statement("select 1 -- ; drop table t"));
        assert!(is_single_statement(""));
    }

    #[test]
    fn test_stacked_statements() {
        assert!(!is_single_statement("select 1 limit 1; delete from users"));
        assert!(!is_single_statement("show x;delete from users"));
        assert!(!is_single_statement("select 1; pragma query_only = off"));
        assert!(!is_single_statement("select 1; /* c */ drop table t"));
        assert!(!is_single_statement("select 1;\n-- c\ndrop table t"));
        assert!(!is_single_statement("select 1; 'x'"));
        assert!(!is_single_statement("select 'a'';' ; delete from t"));
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("select *\nfrom t"), "select * from t");
        assert_eq!(redact("  select\r\n\t1  "), "select 1");
        assert_eq!(redact(""), "");
    }
}
