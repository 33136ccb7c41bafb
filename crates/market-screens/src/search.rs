use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMatch {
    pub code: String,
    pub name: String,
}

/// Case-insensitive symbol search over `(code, name)` listings.
///
/// Results are grouped by match quality: exact code, code prefix, name
/// prefix, code substring, name substring. Each listing lands in its best
/// group only; order within a group follows the listings.
pub fn search_symbols<'a>(
    listings: impl IntoIterator<Item = (&'a str, &'a str)>,
    query: &str,
    limit: usize,
) -> Vec<SymbolMatch> {
    let needle = query.trim().to_uppercase();
    if needle.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut groups: [Vec<SymbolMatch>; 5] = Default::default();
    for (code, name) in listings {
        let code_upper = code.to_uppercase();
        let name_upper = name.to_uppercase();

        let group = if code_upper == needle {
            0
        } else if code_upper.starts_with(&needle) {
            1
        } else if name_upper.starts_with(&needle) {
            2
        } else if code_upper.contains(&needle) {
            3
        } else if name_upper.contains(&needle) {
            4
        } else {
            continue;
        };

        groups[group].push(SymbolMatch {
            code: code.to_string(),
            name: name.to_string(),
        });
    }

    groups.into_iter().flatten().take(limit).collect()
}
