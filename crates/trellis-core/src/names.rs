//! Identifier mapping between the two naming conventions.
//!
//! The typed side names its methods in camel case (`getTitle`,
//! `PixelInterleavedSampleModel`) while the foreign side uses lower-case
//! words joined by underscores (`get_title`, `pixel_interleaved_sample_model`).
//! The mapping is purely lexical and works on Unicode code points.

/// Separator placed between words on the foreign side.
pub const SEPARATOR: char = '_';

/// Convert a camel-case identifier to its foreign, separator-joined form.
///
/// A new word starts wherever an upper-case code point directly follows a
/// lower-case one. The first character of each word is lower-cased only when
/// the next character of that word is lower-case, so runs of capitals such as
/// acronyms survive unchanged. A one-character first word is lower-cased:
///
/// ```
/// use trellis_core::names::to_foreign_name;
///
/// assert_eq!(to_foreign_name("PixelInterleavedSampleModel"), "pixel_interleaved_sample_model");
/// assert_eq!(to_foreign_name("getURL"), "get_URL");
/// assert_eq!(to_foreign_name("getX"), "get_X");
/// assert_eq!(to_foreign_name("X"), "x");
/// assert_eq!(to_foreign_name(""), "");
/// ```
pub fn to_foreign_name(identifier: &str) -> String {
    let chars: Vec<char> = identifier.chars().collect();
    let mut out = String::with_capacity(identifier.len() + 4);
    let mut start = 0;
    for i in 1..=chars.len() {
        let boundary =
            i == chars.len() || (chars[i].is_uppercase() && chars[i - 1].is_lowercase());
        if boundary {
            push_word(&mut out, &chars[start..i], start == 0);
            out.push(SEPARATOR);
            start = i;
        }
    }
    let kept = out
        .trim_end_matches(|c: char| c == SEPARATOR || c.is_whitespace())
        .len();
    out.truncate(kept);
    out
}

/// Append one word, lower-casing its first character unless it opens a run of capitals.
fn push_word(out: &mut String, word: &[char], first_word: bool) {
    let Some((&first, rest)) = word.split_first() else {
        return;
    };
    let opens_lower_run = rest.first().map_or(first_word, |c| c.is_lowercase());
    if opens_lower_run {
        out.extend(first.to_lowercase());
    } else {
        out.push(first);
    }
    out.extend(rest);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn class_names() {
        assert_eq!(
            to_foreign_name("PixelInterleavedSampleModel"),
            "pixel_interleaved_sample_model"
        );
        assert_eq!(to_foreign_name("Citation"), "citation");
    }

    #[test]
    fn method_names() {
        assert_eq!(to_foreign_name("getTitle"), "get_title");
        assert_eq!(to_foreign_name("toString"), "to_string");
        assert_eq!(to_foreign_name("getAlternateTitles"), "get_alternate_titles");
    }

    #[test]
    fn single_letter_words() {
        assert_eq!(to_foreign_name("getX"), "get_X");
        assert_eq!(to_foreign_name("getXY"), "get_XY");
        assert_eq!(to_foreign_name("getXAxis"), "get_XAxis");
        assert_eq!(to_foreign_name("setX"), "set_X");
        assert_eq!(to_foreign_name("X"), "x");
    }

    #[test]
    fn acronyms_keep_their_case() {
        assert_eq!(to_foreign_name("getURL"), "get_URL");
        assert_eq!(to_foreign_name("getISBN"), "get_ISBN");
    }

    #[test]
    fn degenerate_inputs() {
        assert_eq!(to_foreign_name(""), "");
        assert_eq!(to_foreign_name("X"), "x");
        assert_eq!(to_foreign_name("title"), "title");
        assert_eq!(to_foreign_name("title  "), "title");
    }

    #[test]
    fn non_ascii_code_points() {
        assert_eq!(to_foreign_name("getÉtendue"), "get_étendue");
        assert_eq!(to_foreign_name("étéÉcole"), "été_école");
    }

    proptest! {
        #[test]
        fn never_leaves_lower_before_upper(id in "[A-Za-z0-9]{0,24}") {
            let mapped = to_foreign_name(&id);
            let chars: Vec<char> = mapped.chars().collect();
            for pair in chars.windows(2) {
                prop_assert!(!(pair[0].is_lowercase() && pair[1].is_uppercase()), "{mapped}");
            }
        }

        #[test]
        fn only_inserts_separators(id in "[A-Za-z0-9]{0,24}") {
            let mapped = to_foreign_name(&id);
            let stripped: String = mapped.chars().filter(|&c| c != SEPARATOR).collect();
            prop_assert_eq!(stripped.to_lowercase(), id.to_lowercase());
        }

        #[test]
        fn lower_case_words_are_fixed_points(id in "[a-z][a-z0-9_]{0,16}[a-z0-9]") {
            prop_assert_eq!(to_foreign_name(&id), id);
        }
    }
}
