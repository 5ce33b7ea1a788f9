//! modkit_normalize
//!
//! Deterministic text normalization. No language
//! dependency: the same fixed pipeline runs over every input.
//!
//! 1. Unicode NFKC.
//! 2. Strip zero-width characters.
//! 3. Fold homoglyphs (Cyrillic/Greek/math look-alikes) to Latin lowercase.
//! 4. Fold leetspeak digits/symbols to letters.
//! 5. Collapse whitespace runs to a single space; trim.
//!
//! The pipeline is idempotent: `normalize(normalize(x)) == normalize(x)`.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

const ZERO_WIDTH: [char; 7] = [
    '\u{200B}', '\u{200C}', '\u{200D}', '\u{200E}', '\u{200F}', '\u{2060}', '\u{FEFF}',
];

static HOMOGLYPHS: Lazy<HashMap<char, char>> = Lazy::new(|| {
    // Cyrillic and Greek look-alikes, plus a handful of mathematical
    // alphanumeric look-alikes, folded to their Latin lowercase equivalent.
    [
        ('а', 'a'), ('А', 'a'), // Cyrillic a
        ('е', 'e'), ('Е', 'e'), // Cyrillic e
        ('о', 'o'), ('О', 'o'), // Cyrillic o
        ('р', 'p'), ('Р', 'p'), // Cyrillic er
        ('с', 'c'), ('С', 'c'), // Cyrillic es
        ('у', 'y'), ('У', 'y'), // Cyrillic u
        ('х', 'x'), ('Х', 'x'), // Cyrillic ha
        ('і', 'i'), ('І', 'i'), // Cyrillic/Ukrainian i
        ('ѕ', 's'),             // Cyrillic dze
        ('ԁ', 'd'),             // Cyrillic d look-alike
        ('α', 'a'), ('Α', 'a'), // Greek alpha
        ('β', 'b'), ('Β', 'b'), // Greek beta
        ('ο', 'o'), ('Ο', 'o'), // Greek omicron
        ('ρ', 'p'), ('Ρ', 'p'), // Greek rho
        ('ν', 'v'), ('Ν', 'v'), // Greek nu
        ('κ', 'k'), ('Κ', 'k'), // Greek kappa
    ]
    .into_iter()
    .collect()
});

static LEETSPEAK: Lazy<HashMap<char, char>> = Lazy::new(|| {
    [
        ('0', 'o'),
        ('1', 'l'),
        ('3', 'e'),
        ('4', 'a'),
        ('5', 's'),
        ('7', 't'),
        ('@', 'a'),
        ('$', 's'),
        ('!', 'i'),
    ]
    .into_iter()
    .collect()
});

/// Runs the full normalization pipeline.
pub fn normalize(input: &str) -> String {
    let nfkc: String = input.nfkc().collect();
    let stripped: String = nfkc.chars().filter(|c| !ZERO_WIDTH.contains(c)).collect();
    let folded: String = stripped
        .chars()
        .map(|c| {
            let c = HOMOGLYPHS.get(&c).copied().unwrap_or(c);
            LEETSPEAK.get(&c).copied().unwrap_or(c)
        })
        .collect();
    collapse_whitespace(&folded)
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_idempotent() {
        let input = "h\u{200B}4t3  sp\u{200D}33ch";
        let once = normalize(input);
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn leetspeak_and_zero_width_fold_to_plain_text() {
        assert_eq!(normalize("h\u{200B}4t3  sp\u{200D}33ch"), normalize("hate speech"));
    }

    #[test]
    fn cyrillic_homoglyphs_fold_to_latin() {
        // Cyrillic "а" and "е" in place of Latin a/e.
        assert_eq!(normalize("сats аnd dogs"), normalize("cats and dogs"));
    }

    #[test]
    fn whitespace_runs_collapse_and_trim() {
        assert_eq!(normalize("  hello   world  \n\t"), "hello world");
    }

    #[test]
    fn empty_input_normalizes_to_empty_string() {
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn unmapped_latin_letters_keep_their_case() {
        assert_eq!(normalize("Hello World"), "Hello World");
    }
}
