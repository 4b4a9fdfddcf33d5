//! Build identifier extraction from Steam KeyValues text.
//!
//! Two sources carry a `"buildid"`: the `app_info_print` output of steamcmd
//! (one per branch, nested under `"branches"`) and the local
//! `appmanifest_<id>.acf` file (a single top-level entry). Both parsers are
//! pure functions over text; running steamcmd and reading files lives in
//! [`crate::update`].

use std::fmt;

/// Numeric build identifier, kept as text exactly as Steam prints it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildId(String);

impl BuildId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn parse(value: &str) -> Option<Self> {
        (!value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())).then(|| Self(value.to_string()))
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One meaningful line of KeyValues text.
#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Open,
    Close,
    Key(&'a str),
    Pair(&'a str, &'a str),
}

fn tokenize(line: &str) -> Option<Token<'_>> {
    let line = line.trim();
    match line {
        "{" => return Some(Token::Open),
        "}" => return Some(Token::Close),
        _ => {}
    }
    // Quoted strings sit at the odd positions of a split on '"'.
    let mut quoted = line.split('"').skip(1).step_by(2);
    let key = quoted.next()?;
    Some(match quoted.next() {
        Some(value) => Token::Pair(key, value),
        None => Token::Key(key),
    })
}

/// Position of the scanner within `app_info_print` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    /// Looking for the `"branches"` key.
    Searching,
    /// Inside the branches block; `depth` counts open braces.
    InBranches { depth: usize },
    /// Inside the requested branch block.
    InTarget { depth: usize },
}

/// Extract the build id of `branch` from steamcmd `app_info_print` output.
///
/// Returns `None` when the branches block or the branch is missing, or the
/// branch has no numeric build id. Build ids outside the branches block
/// (depots, other branches) are ignored.
pub fn latest_build_id<'a, I>(lines: I, branch: &str) -> Option<BuildId>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut state = Scan::Searching;

    for line in lines {
        let Some(token) = tokenize(line) else {
            continue;
        };

        state = match (state, token) {
            (Scan::Searching, Token::Key(k)) if k.eq_ignore_ascii_case("branches") => {
                Scan::InBranches { depth: 0 }
            }
            (Scan::Searching, _) => Scan::Searching,

            (Scan::InBranches { depth }, Token::Open) => Scan::InBranches { depth: depth + 1 },
            (Scan::InBranches { depth }, Token::Close) => {
                if depth <= 1 {
                    // Left the branches block without meeting the branch.
                    return None;
                }
                Scan::InBranches { depth: depth - 1 }
            }
            (Scan::InBranches { depth: 1 }, Token::Key(k)) if k == branch => {
                Scan::InTarget { depth: 0 }
            }
            (s @ Scan::InBranches { .. }, _) => s,

            (Scan::InTarget { depth }, Token::Open) => Scan::InTarget { depth: depth + 1 },
            (Scan::InTarget { depth }, Token::Close) => {
                if depth <= 1 {
                    return None;
                }
                Scan::InTarget { depth: depth - 1 }
            }
            (Scan::InTarget { depth: 1 }, Token::Pair(k, v)) if k.eq_ignore_ascii_case("buildid") => {
                return BuildId::parse(v);
            }
            (s @ Scan::InTarget { .. }, _) => s,
        };
    }

    None
}

/// Extract the installed build id from an `appmanifest_<id>.acf` file.
pub fn manifest_build_id(content: &str) -> Option<BuildId> {
    content.lines().find_map(|line| match tokenize(line) {
        Some(Token::Pair(k, v)) if k.eq_ignore_ascii_case("buildid") => BuildId::parse(v),
        _ => None,
    })
}
