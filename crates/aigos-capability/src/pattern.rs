//! Pattern matcher: exact, glob (`*` over non-slash runs, `*.` over host
//! subdomains) or regex (strings beginning with `^`). Patterns are compiled
//! once when a [`PatternSet`] is built; `matches` only scans, it never
//! compiles or allocates intermediate collections.

use regex::Regex;

#[derive(Clone, Debug)]
enum Pattern {
    Literal(String),
    Glob(String),
    Regex(Regex),
}

impl Pattern {
    fn compile(raw: &str) -> Pattern {
        if raw.starts_with('^') {
            match Regex::new(raw) {
                Ok(re) => Pattern::Regex(re),
                Err(_) => Pattern::Literal(raw.to_string()),
            }
        } else if raw.contains('*') {
            Pattern::Glob(raw.to_string())
        } else {
            Pattern::Literal(raw.to_string())
        }
    }

    fn matches(&self, input: &str) -> bool {
        match self {
            Pattern::Literal(lit) => lit == input,
            Pattern::Glob(glob) => glob_matches(glob, input),
            Pattern::Regex(re) => re.is_match(input),
        }
    }
}

/// A compiled, immutable list of patterns. Build once per capability
/// manifest; `matches` runs in the hot path of policy checks.
#[derive(Clone, Debug, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn compile<S: AsRef<str>>(raw: &[S]) -> Self {
        Self {
            patterns: raw.iter().map(|p| Pattern::compile(p.as_ref())).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns true on the first matching pattern.
    pub fn matches(&self, input: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(input))
    }
}

fn glob_matches(pattern: &str, input: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix("*.") {
        return input == suffix || input.ends_with(&format!(".{suffix}"));
    }
    non_slash_glob_match(pattern, input)
}

fn non_slash_glob_match(pattern: &str, input: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.split('/').collect();
    let input_segments: Vec<&str> = input.split('/').collect();
    if pattern_segments.len() != input_segments.len() {
        return false;
    }
    pattern_segments
        .iter()
        .zip(input_segments.iter())
        .all(|(p, s)| segment_glob_match(p, s))
}

/// Classic single-segment wildcard matcher: `*` matches zero or more
/// characters within the segment.
fn segment_glob_match(pattern: &str, input: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let s: Vec<char> = input.chars().collect();
    let (plen, slen) = (p.len(), s.len());

    let mut dp = vec![false; slen + 1];
    dp[0] = true;
    for j in 1..=slen {
        dp[j] = false;
    }

    let mut prev = dp.clone();
    for i in 1..=plen {
        let mut cur = vec![false; slen + 1];
        cur[0] = prev[0] && p[i - 1] == '*';
        for j in 1..=slen {
            cur[j] = if p[i - 1] == '*' {
                prev[j] || cur[j - 1]
            } else {
                prev[j - 1] && p[i - 1] == s[j - 1]
            };
        }
        prev = cur;
    }
    prev[slen]
}

/// True when `allow_list` is empty (wildcard-allow) or `allow_list`
/// contains at least one pattern matching `input`.
pub fn wildcard_allow_or_matches(allow_list: &PatternSet, input: &str) -> bool {
    allow_list.is_empty() || allow_list.matches(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_exact_match_only() {
        let set = PatternSet::compile(&["read_file"]);
        assert!(set.matches("read_file"));
        assert!(!set.matches("read_file2"));
    }

    #[test]
    fn glob_matches_prefix_star() {
        let set = PatternSet::compile(&["search_*"]);
        assert!(set.matches("search_docs"));
        assert!(!set.matches("delete_docs"));
    }

    #[test]
    fn glob_star_does_not_cross_slash() {
        let set = PatternSet::compile(&["a/*"]);
        assert!(set.matches("a/b"));
        assert!(!set.matches("a/b/c"));
    }

    #[test]
    fn subdomain_glob_matches_host_and_subdomains() {
        let set = PatternSet::compile(&["*.example.com"]);
        assert!(set.matches("example.com"));
        assert!(set.matches("api.example.com"));
        assert!(!set.matches("evilexample.com"));
    }

    #[test]
    fn regex_pattern_begins_with_caret() {
        let set = PatternSet::compile(&["^read_[a-z]+$"]);
        assert!(set.matches("read_docs"));
        assert!(!set.matches("read_123"));
    }

    #[test]
    fn empty_allow_list_is_wildcard_allow() {
        let set = PatternSet::compile::<&str>(&[]);
        assert!(wildcard_allow_or_matches(&set, "anything"));
    }

    #[test]
    fn first_hit_wins_scan_order_independent_of_result() {
        let set = PatternSet::compile(&["search_*", "read_*"]);
        assert!(set.matches("read_docs"));
    }
}
