/// Fixed table of domain abbreviations expanded during normalization.
/// Token-level only; "w/" variants are handled separately because the
/// slash glues onto the following word in vendor text.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("stl", "steel"),
    ("galv", "galvanized"),
    ("asst", "assorted"),
    ("pk", "pack"),
    ("ea", "each"),
];

/// Canonicalize raw line-item text for comparison and storage.
///
/// Lowercases, trims, collapses whitespace, expands the abbreviation table
/// and tightens hyphen/slash/x usage around numeric dimension tokens so
/// "5/16 - 18 x 2-1/2" and "5/16-18X2-1/2" compare equal.
///
/// Empty or whitespace-only input yields an empty string, never an error.
/// Deterministic and side-effect free; the same function runs on the read
/// path and before every training write so future equality checks hold.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();

    let mut tokens: Vec<String> = Vec::new();
    for token in lowered.split_whitespace() {
        if token == "w/" {
            tokens.push("with".to_string());
            continue;
        }
        if token == "w/o" {
            tokens.push("without".to_string());
            continue;
        }
        if let Some(rest) = token.strip_prefix("w/") {
            tokens.push("with".to_string());
            tokens.push(rest.to_string());
            continue;
        }
        match ABBREVIATIONS.iter().find(|(abbr, _)| *abbr == token) {
            Some((_, expansion)) => tokens.push((*expansion).to_string()),
            None => tokens.push(token.to_string()),
        }
    }

    tighten_dimensions(&tokens.join(" "))
}

/// Remove spaces around '-', '/' and 'x' when they sit between parts of a
/// numeric dimension token, e.g. thread pitch "5/16 - 18" or length "x 2-1/2".
fn tighten_dimensions(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());

    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' {
            let prev = if i > 0 { Some(chars[i - 1]) } else { None };
            let next = chars.get(i + 1).copied();
            let glue_after_digit = matches!(prev, Some(p) if p.is_ascii_digit())
                && matches!(next, Some(n) if is_dimension_joint(n));
            let glue_before_digit = matches!(prev, Some(p) if is_dimension_joint(p))
                && matches!(next, Some(n) if n.is_ascii_digit());
            if glue_after_digit || glue_before_digit {
                continue;
            }
        }
        out.push(c);
    }

    out
}

fn is_dimension_joint(c: char) -> bool {
    c == '-' || c == '/' || c == 'x'
}

/// Extract numeric spec tokens (thread pitch, length) from normalized text.
/// A token qualifies when it carries at least one digit alongside a
/// dimension joint, e.g. "5/16-18", "2-1/2", "10x50".
pub fn dimension_tokens(normalized: &str) -> Vec<&str> {
    normalized
        .split_whitespace()
        .filter(|token| {
            token.chars().any(|c| c.is_ascii_digit())
                && token.chars().any(is_dimension_joint)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_trim_collapse() {
        assert_eq!(normalize("  HEX   Bolt  "), "hex bolt");
    }

    #[test]
    fn test_empty_input_is_empty_output() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t "), "");
    }

    #[test]
    fn test_abbreviation_expansion() {
        assert_eq!(normalize("washer w/ gasket"), "washer with gasket");
        assert_eq!(normalize("bolt w/o nut"), "bolt without nut");
        assert_eq!(normalize("w/nylon insert"), "with nylon insert");
        assert_eq!(normalize("STL washer galv"), "steel washer galvanized");
    }

    #[test]
    fn test_dimension_tightening() {
        assert_eq!(normalize("5/16 - 18 x 2-1/2"), "5/16-18x2-1/2");
        assert_eq!(normalize("bolt 1/4 - 20"), "bolt 1/4-20");
    }

    #[test]
    fn test_plain_hyphen_between_words_kept() {
        assert_eq!(normalize("self - tapping screw"), "self - tapping screw");
    }

    #[test]
    fn test_industrial_part_description() {
        assert_eq!(
            normalize("GR. 8 HX HD CAP SCR 5/16-18X2-1/2"),
            "gr. 8 hx hd cap scr 5/16-18x2-1/2"
        );
    }

    #[test]
    fn test_deterministic() {
        let a = normalize("Washer W/ Gasket 1/4 - 20");
        let b = normalize("Washer W/ Gasket 1/4 - 20");
        assert_eq!(a, b);
    }

    #[test]
    fn test_dimension_tokens() {
        let text = normalize("gr. 8 hx hd cap scr 5/16-18x2-1/2");
        assert_eq!(dimension_tokens(&text), vec!["5/16-18x2-1/2"]);

        let text = normalize("flat washer 1/4-20 x 2");
        assert_eq!(dimension_tokens(&text), vec!["1/4-20x2"]);

        assert!(dimension_tokens("safety goggles").is_empty());
    }
}
