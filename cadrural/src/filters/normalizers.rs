//! Text normalization shared by every filter strategy and by the stores.
//!
//! All functions here are pure and never fail: empty input yields empty output.

/// Replaces each accented Latin-1 letter (both cases), `ç`/`Ç` and `ñ`/`Ñ` with its
/// unaccented ASCII base letter. Every other character passes through unchanged.
pub fn remove_accents(text: &str) -> String {
    text.chars().map(fold_accent).collect()
}

fn fold_accent(ch: char) -> char {
    match ch {
        'á' | 'à' | 'ã' | 'â' | 'ä' => 'a',
        'Á' | 'À' | 'Ã' | 'Â' | 'Ä' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'õ' | 'ô' | 'ö' => 'o',
        'Ó' | 'Ò' | 'Õ' | 'Ô' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        other => other,
    }
}

/// Canonical comparable form: accents folded, lowercased, whitespace runs collapsed
/// to one space and trimmed.
pub fn normalize(text: &str) -> String {
    let folded = remove_accents(text).to_lowercase();
    let mut normalized = String::with_capacity(folded.len());
    for word in folded.split_whitespace() {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        normalized.push_str(word);
    }
    normalized
}

/// Normalizes `text` and splits it into non-empty search tokens, preserving order.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keeps only ASCII digits, for tax-id and phone comparisons.
pub fn digits_only(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// Uppercases the first character, leaving the rest untouched.
pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_accents_in_both_cases() {
        assert_eq!(remove_accents("Açúcar Ñandu ÉÈÊË"), "Acucar Nandu EEEE");
        assert_eq!(remove_accents("São João"), "Sao Joao");
    }

    #[test]
    fn normalize_is_accent_and_case_invariant() {
        assert_eq!(normalize("José"), "jose");
        assert_eq!(normalize("JOSÉ"), normalize("jose"));
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("  Fazenda \t Boa\n\nVista  "), "fazenda boa vista");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in ["  São   Paulo ", "MARACUJÁ", "Cana-de-açúcar", "", "ÖÜ ñ  ç"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn normalize_is_idempotent_beyond_the_accent_table() {
        let inputs = [
            "Boa\u{a0}Vista",
            "\u{2003}Sítio\u{3000}\u{2009}Ipê\u{a0}",
            "ŸVONNE",
            "STRAẞE",
            "İTAPEVA",
            "\u{212a}ELVIN \u{212b}",
            "zero\u{200b}width",
            "ǅ ǈ ǋ",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input {input:?}");
            assert!(!once.starts_with(' ') && !once.ends_with(' '), "input {input:?}");
            assert!(!once.contains("  "), "input {input:?}");
        }
        assert_eq!(normalize("Boa\u{a0}Vista"), "boa vista");
        assert_eq!(normalize("STRAẞE"), "straße");
    }

    #[test]
    fn tokenize_drops_empty_tokens() {
        assert_eq!(tokenize("  São   Paulo "), vec!["sao", "paulo"]);
        assert!(tokenize("").is_empty());
        assert!(tokenize(" \t ").is_empty());
    }

    #[test]
    fn digits_only_strips_punctuation() {
        assert_eq!(digits_only("111.222.333-44"), "11122233344");
        assert_eq!(digits_only("(11) 98765-4321"), "11987654321");
        assert_eq!(digits_only("abc"), "");
    }

    #[test]
    fn capitalize_first_handles_accented_and_empty() {
        assert_eq!(capitalize_first("suíno"), "Suíno");
        assert_eq!(capitalize_first("élan"), "Élan");
        assert_eq!(capitalize_first(""), "");
    }
}
