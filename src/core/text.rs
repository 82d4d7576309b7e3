//! Text normalization shared by keyword search and classification.

/// Split text into lowercase words on every non-alphanumeric character,
/// apostrophes included.
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Words joined by single spaces, for matching multi-word phrases.
pub fn normalized(text: &str) -> String {
    words(text).join(" ")
}

/// Case-insensitive substring test. `haystack_lower` must already be
/// lowercased; blank needles never match.
pub fn contains_term(haystack_lower: &str, term: &str) -> bool {
    let term = term.trim();
    !term.is_empty() && haystack_lower.contains(&term.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_split_on_punctuation() {
        assert_eq!(
            words("She felt devastated -- and betrayed!"),
            vec!["she", "felt", "devastated", "and", "betrayed"]
        );
        assert_eq!(words("What does it cost?"), vec!["what", "does", "it", "cost"]);
        assert!(words("  ...  ").is_empty());
    }

    #[test]
    fn normalized_collapses_spacing() {
        assert_eq!(normalized("Give   UP,\nnow"), "give up now");
    }

    #[test]
    fn contains_term_ignores_case_and_blanks() {
        let hay = "the betrayal at dawn";
        assert!(contains_term(hay, "Betrayal"));
        assert!(contains_term(hay, "tray"));
        assert!(!contains_term(hay, ""));
        assert!(!contains_term(hay, "   "));
        assert!(!contains_term(hay, "trust"));
    }
}
