//! Deterministic post-processing of model output.
//!
//! Every piece of string surgery applied to completions lives here, so it
//! can be tested without a model. Nothing in this module performs I/O.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;

/// Sentinel written by prompts when there is nothing to report.
pub const SENTINEL: &str = "NONE";

/// Longest accepted canonical email pattern.
pub const DEFAULT_MAX_PATTERN_LEN: usize = 5;

lazy_static! {
    static ref HTTP_LINK: Regex =
        Regex::new(r"https?://(?:[a-zA-Z]|[0-9]|[$-_@.&+]|[!*\(\),]|%[0-9a-fA-F]{2})+")
            .expect("valid link regex");
    static ref EMPTY_BRACKETS: Regex = Regex::new(r"\[\s*\]").expect("valid bracket regex");
    static ref WORDLESS_BRACKETS: Regex = Regex::new(r"\[[^\w]*\]").expect("valid bracket regex");
    static ref SPACE_RUN: Regex = Regex::new(r"[^\S\n]+").expect("valid space regex");
    static ref NEWLINE_RUN: Regex = Regex::new(r"\s*\n\s*").expect("valid newline regex");
    static ref INITIAL_COUNT: Regex =
        Regex::new(r"\[\s*\d+\s*(?:initials?)?\s*\]").expect("valid count regex");
    static ref SECTION_HEADING: Regex = Regex::new(r"^\s*(\d+)\.").expect("valid heading regex");
    static ref GENERATED_HEADING: Regex =
        Regex::new(r"(?i)^\s*(\d+)\.\s*information about\b").expect("valid heading regex");
    static ref DOMAIN_BULLET: Regex = Regex::new(r"\s*-\s*(\S+)").expect("valid bullet regex");
}

/// Long-form phrase to canonical token. Order matters: a phrase must come
/// before every phrase it contains.
const PATTERN_REPLACEMENTS: &[(&str, &str)] = &[
    ("first name initial of last name", "l1"),
    ("first letter of last name", "l1"),
    ("first initial of last name", "l1"),
    ("initial of last name", "l1"),
    ("first letter of first name", "f1"),
    ("first initial of first name", "f1"),
    ("initial of first name", "f1"),
    ("last name initials", "l1"),
    ("last name initial", "l1"),
    ("lastname initials", "l1"),
    ("lastname initial", "l1"),
    ("last initials", "l1"),
    ("last initial", "l1"),
    ("first name initials", "f1"),
    ("first name initial", "f1"),
    ("firstname initials", "f1"),
    ("firstname initial", "f1"),
    ("first initials", "f1"),
    ("first initial", "f1"),
    ("first name", "f"),
    ("firstname", "f"),
    ("last name", "l"),
    ("lastname", "l"),
    ("surname", "l"),
    ("first", "f"),
    ("last", "l"),
];

/// Substrings that carry no pattern information.
const PATTERN_NOISE: &[&str] = &["company domain", "company_domain"];

/// True when a completion is the "nothing found" sentinel.
pub fn is_sentinel(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case(SENTINEL)
}

/// Split a comma-separated answer into trimmed, non-empty items.
pub fn parse_comma_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reduce a free-text pattern description to a canonical token.
///
/// `"[First Name].[Last Name]@acme.com"` becomes `"f.l"`. Returns `None`
/// when the result is empty, longer than `max_len`, or contains anything
/// outside `{f, l, f1, l1, ".", "-", "_"}`.
pub fn canonicalize_pattern(phrase: &str, max_len: usize) -> Option<String> {
    let lowered = phrase.trim().to_lowercase();
    let local = lowered.split('@').next().unwrap_or_default();
    let local = local.rsplit(':').next().unwrap_or_default();

    let mut text: String = local
        .chars()
        .map(|c| match c {
            '{' | '(' => '[',
            '}' | ')' => ']',
            other => other,
        })
        .collect();

    for noise in PATTERN_NOISE {
        text = text.replace(noise, "");
    }
    text = INITIAL_COUNT.replace_all(&text, "").into_owned();

    for (phrase, token) in PATTERN_REPLACEMENTS {
        text = text.replace(phrase, token);
    }

    let token: String = text
        .chars()
        .filter(|c| !matches!(c, '+' | '[' | ']' | '"' | '\'' | '`') && !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if token.is_empty() || token.chars().count() > max_len || !is_canonical(&token) {
        return None;
    }
    Some(token)
}

/// Whether a token is built only from the canonical alphabet.
fn is_canonical(token: &str) -> bool {
    let mut prev: Option<char> = None;
    for c in token.chars() {
        let ok = match c {
            'f' | 'l' | '.' | '-' | '_' => true,
            '1' => matches!(prev, Some('f') | Some('l')),
            _ => false,
        };
        if !ok {
            return false;
        }
        prev = Some(c);
    }
    token.contains(|c| c == 'f' || c == 'l')
}

/// Strip links, empty bracket pairs and redundant whitespace from scraped text.
pub fn clean_scraped_text(text: &str) -> String {
    let text = HTTP_LINK.replace_all(text, "");
    let text = EMPTY_BRACKETS.replace_all(&text, "");
    let text = WORDLESS_BRACKETS.replace_all(&text, "");
    let text = SPACE_RUN.replace_all(&text, " ");
    let text = NEWLINE_RUN.replace_all(&text, "\n");
    text.trim().to_string()
}

/// The "Sections" block for map and reduce prompts.
///
/// Exactly one numbered heading per keyword, in keyword order, so that
/// [`parse_numbered_sections`] can map headings back positionally.
pub fn extraction_list(company: &str, keywords: &[String]) -> String {
    keywords
        .iter()
        .enumerate()
        .map(|(i, keyword)| format!("{}. Information about {} for {}:", i + 1, keyword, company))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split a reduced answer into one entry per keyword.
///
/// Headings are the `N. Information about ...` lines written by
/// [`extraction_list`]; numbered lists inside a body stay in that body.
/// Only when the answer contains none of those does any line starting with
/// `N.` count as a heading. Either way N must be in range and greater than
/// the open section. The heading up to its first colon is dropped; body
/// lines are joined and trimmed. A body equal to the sentinel, or a section
/// the model never wrote, maps to an empty string.
pub fn parse_numbered_sections(text: &str, keywords: &[String]) -> IndexMap<String, String> {
    let mut bodies: Vec<Vec<&str>> = vec![Vec::new(); keywords.len()];
    let mut current: Option<usize> = None;

    let heading_re: &Regex = if text
        .lines()
        .any(|line| heading_number(&GENERATED_HEADING, line, keywords.len(), None).is_some())
    {
        &GENERATED_HEADING
    } else {
        &SECTION_HEADING
    };

    for line in text.lines() {
        match heading_number(heading_re, line, keywords.len(), current) {
            Some(n) => {
                current = Some(n - 1);
                if let Some((_, rest)) = line.split_once(':') {
                    if !rest.trim().is_empty() {
                        bodies[n - 1].push(rest.trim());
                    }
                }
            }
            None => {
                if let Some(idx) = current {
                    bodies[idx].push(line);
                }
            }
        }
    }

    keywords
        .iter()
        .zip(bodies)
        .map(|(keyword, lines)| {
            let body = lines.join("\n").trim().to_string();
            let body = if is_sentinel(&body) { String::new() } else { body };
            (keyword.clone(), body)
        })
        .collect()
}

/// 1-based section number if `line` opens a section after `current`.
fn heading_number(re: &Regex, line: &str, sections: usize, current: Option<usize>) -> Option<usize> {
    re.captures(line)
        .and_then(|caps| caps[1].parse::<usize>().ok())
        .filter(|n| (1..=sections).contains(n) && current.map_or(true, |c| *n > c + 1))
}

/// Pull `- domain` bullet items from the last colon-delimited block of text.
pub fn parse_domain_bullets(text: &str) -> Vec<String> {
    let tail = text.rsplit(':').next().unwrap_or_default();
    DOMAIN_BULLET
        .captures_iter(tail)
        .map(|caps| caps[1].replace('@', ""))
        .filter(|domain| !domain.is_empty() && !domain.eq_ignore_ascii_case("none"))
        .collect()
}

/// True for entries worth sending to the model: non-blank with at least
/// one alphabetic character.
pub fn is_translatable(entry: &str) -> bool {
    entry.chars().any(char::is_alphabetic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn keywords(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sentinel_detection() {
        assert!(is_sentinel("NONE"));
        assert!(is_sentinel("  none\n"));
        assert!(is_sentinel("None"));
        assert!(!is_sentinel("NONE found"));
        assert!(!is_sentinel(""));
    }

    #[test]
    fn test_comma_list() {
        assert_eq!(
            parse_comma_list(" a@x.com, b@x.com ,, "),
            vec!["a@x.com", "b@x.com"]
        );
        assert!(parse_comma_list("").is_empty());
    }

    #[test]
    fn test_canonical_phrases() {
        let cases = [
            ("first name.last name", "f.l"),
            ("firstname initial", "f1"),
            ("last name", "l"),
            ("first initial of last name", "l1"),
            ("first", "f"),
            ("first name initial of last name", "l1"),
            ("[First Name].[Last Name]@acme.com", "f.l"),
            ("[First Name Initial][Last Name]", "f1l"),
            ("[last name]_[first name initials (2 initials)]@nlmk.com", "l_f1"),
            ("{first name}-{last name}", "f-l"),
            ("+[first name],[last name]", "f.l"),
            ("Most frequently repeated email structure: [firstname].[last name]@x.com", "f.l"),
        ];
        for (phrase, expected) in cases {
            assert_eq!(
                canonicalize_pattern(phrase, DEFAULT_MAX_PATTERN_LEN).as_deref(),
                Some(expected),
                "phrase: {phrase}"
            );
        }
    }

    #[test]
    fn test_canonical_is_idempotent() {
        for token in ["f.l", "f1l", "l_f1", "f-l", "f", "l1.f"] {
            assert_eq!(
                canonicalize_pattern(token, DEFAULT_MAX_PATTERN_LEN).as_deref(),
                Some(token)
            );
        }
    }

    #[test]
    fn test_canonical_rejects_long_or_foreign() {
        // "f1.l1.f" is 7 characters
        assert!(canonicalize_pattern("first initial.last initial.first", 5).is_none());
        assert!(canonicalize_pattern("[title].[last name]@x.com", 5).is_none());
        assert!(canonicalize_pattern("contact@x.com", 5).is_none());
        assert!(canonicalize_pattern("NONE", 5).is_none());
        assert!(canonicalize_pattern("", 5).is_none());
    }

    #[test]
    fn test_clean_scraped_text() {
        let raw = "Visit https://acme.com/about?x=1 now [ ] [--]  for   details\n\n\nNext [Link]";
        assert_eq!(
            clean_scraped_text(raw),
            "Visit now for details\nNext [Link]"
        );
    }

    #[test]
    fn test_extraction_list() {
        let list = extraction_list("Acme", &keywords(&["production sites", "email domains"]));
        assert_eq!(
            list,
            "1. Information about production sites for Acme:\n\
             2. Information about email domains for Acme:"
        );
    }

    #[test]
    fn test_numbered_sections() {
        let text = "1. Information...\n...text A...\n2. Information...\nNONE";
        let parsed = parse_numbered_sections(text, &keywords(&["production sites", "email domains"]));

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["production sites"], "...text A...");
        assert_eq!(parsed["email domains"], "");
        assert_eq!(
            parsed.keys().collect::<Vec<_>>(),
            vec!["production sites", "email domains"]
        );
    }

    #[test]
    fn test_numbered_sections_missing_and_inline() {
        let text = "Preamble\n1. Information about sites for Acme: Linz, Graz\nAlso Wels\n3. stray";
        let parsed = parse_numbered_sections(text, &keywords(&["sites", "process"]));

        assert_eq!(parsed["sites"], "Linz, Graz\nAlso Wels\n3. stray");
        assert_eq!(parsed["process"], "");
    }

    #[test]
    fn test_numbered_list_stays_in_its_section() {
        let text = "1. Information about production sites for Acme:\n1. Linz\n2. Graz\n\
                    2. Information about products for Acme:\nsteel coils\n\
                    3. Information about email domains for Acme:\nacme.com";
        let parsed = parse_numbered_sections(
            text,
            &keywords(&["production sites", "products", "email domains"]),
        );

        assert_eq!(parsed["production sites"], "1. Linz\n2. Graz");
        assert_eq!(parsed["products"], "steel coils");
        assert_eq!(parsed["email domains"], "acme.com");
    }

    #[test]
    fn test_bare_numbers_used_without_generated_headings() {
        let text = "1. Sites:\nLinz\n3. Process: EAF\n2. stray";
        let parsed = parse_numbered_sections(text, &keywords(&["sites", "products", "process"]));

        // Headings must increase, so "2." after "3." is body text
        assert_eq!(parsed["sites"], "Linz");
        assert_eq!(parsed["products"], "");
        assert_eq!(parsed["process"], "EAF\n2. stray");
    }

    #[test]
    fn test_domain_bullets() {
        let summary = "Email domains used by Acme:\n- @acme.com\n- acme.de\n- NONE";
        assert_eq!(parse_domain_bullets(summary), vec!["acme.com", "acme.de"]);
        assert!(parse_domain_bullets("nothing here").is_empty());
    }

    #[test]
    fn test_translatable() {
        assert!(is_translatable("Geschäftsführer"));
        assert!(!is_translatable("   "));
        assert!(!is_translatable("123 - 456"));
    }

    proptest! {
        #[test]
        fn prop_canonical_output_is_bounded(phrase in ".{0,40}") {
            if let Some(token) = canonicalize_pattern(&phrase, DEFAULT_MAX_PATTERN_LEN) {
                prop_assert!(token.chars().count() <= DEFAULT_MAX_PATTERN_LEN);
                prop_assert!(is_canonical(&token));
            }
        }

        #[test]
        fn prop_canonical_tokens_are_fixed_points(token in "(f1|l1|f|l)([._-]?(f1|l1|f|l))?") {
            if let Some(once) = canonicalize_pattern(&token, DEFAULT_MAX_PATTERN_LEN) {
                prop_assert_eq!(canonicalize_pattern(&once, DEFAULT_MAX_PATTERN_LEN), Some(once));
            }
        }
    }
}
