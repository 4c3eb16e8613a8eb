//! Treeherder symbol algebra
//!
//! A symbol is either bare (`"X"`) or grouped (`"G(X)"`). The bare form
//! belongs to the placeholder group `"?"`.

use std::fmt::Display;

/// Group used for symbols that have none
pub const NO_GROUP: &str = "?";

/// Split a symbol into `(group, symbol)`
///
/// `"ab(xy)"` becomes `("ab", "xy")`; anything without a parenthesised suffix
/// becomes `("?", s)`.
pub fn split_symbol(symbol: &str) -> (String, String) {
    if let Some(inner) = symbol.strip_suffix(')') {
        if let Some((group, member)) = inner.split_once('(') {
            if !member.contains('(') && !member.contains(')') && !group.contains(')') {
                return (group.to_string(), member.to_string());
            }
        }
    }
    (NO_GROUP.to_string(), symbol.to_string())
}

/// Join a group and a symbol
pub fn join_symbol(group: &str, symbol: &str) -> String {
    if group == NO_GROUP {
        symbol.to_string()
    } else {
        format!("{}({})", group, symbol)
    }
}

/// Append a suffix to the member part of a symbol
pub fn add_suffix(symbol: &str, suffix: impl Display) -> String {
    let (group, member) = split_symbol(symbol);
    join_symbol(&group, &format!("{}{}", member, suffix))
}

/// Replace the group of a symbol, keeping its member
pub fn replace_group(symbol: &str, group: &str) -> String {
    let (_, member) = split_symbol(symbol);
    join_symbol(group, &member)
}
