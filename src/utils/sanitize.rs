/// Strips every tag from user-supplied text, keeping the readable content.
///
/// The result is plain text: ammonia re-serializes text nodes as HTML, so
/// the entities it emits are folded back into the characters the user typed.
/// The output never has more characters than the input.
pub fn clean_text(input: &str) -> String {
    let serialized = ammonia::Builder::empty().clean(input).to_string();
    decode_text_entities(&serialized).trim().to_string()
}

pub fn clean_optional(input: Option<String>) -> Option<String> {
    input.map(|text| clean_text(&text)).filter(|text| !text.is_empty())
}

/// Cleans a mandatory field, `None` when nothing readable is left.
pub fn clean_required(input: &str) -> Option<String> {
    Some(clean_text(input)).filter(|text| !text.is_empty())
}

// Text nodes only ever carry these escapes; `&amp;` goes last so that a
// literal "&lt;" typed by the user survives as written.
fn decode_text_entities(serialized: &str) -> String {
    serialized
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup() {
        assert_eq!(clean_text("<script>alert(1)</script>Hello <b>there</b>"), "Hello there");
    }

    #[test]
    fn blank_optional_becomes_none() {
        assert_eq!(clean_optional(Some("   ".to_string())), None);
        assert_eq!(clean_optional(Some("<i></i>".to_string())), None);
    }

    #[test]
    fn ordinary_punctuation_is_kept_verbatim() {
        assert_eq!(clean_text("Smith & Sons"), "Smith & Sons");
        assert_eq!(clean_text("5 > 3 and 2 < 4"), "5 > 3 and 2 < 4");
        assert_eq!(clean_text("Fish \"n\" chips"), "Fish \"n\" chips");
    }

    #[test]
    fn typed_entities_are_not_decoded_twice() {
        assert_eq!(clean_text("use &amp;lt; for <"), "use &lt; for <");
    }

    #[test]
    fn cleaning_never_grows_the_text() {
        let ampersands = "&".repeat(150);
        let cleaned = clean_text(&ampersands);
        assert_eq!(cleaned.chars().count(), 150);

        let mixed = "a <b>bold</b> & <em>brave</em> > claim".repeat(10);
        assert!(clean_text(&mixed).chars().count() <= mixed.chars().count());
    }

    #[test]
    fn markup_only_required_field_is_rejected() {
        assert_eq!(clean_required("<img src=x onerror=alert(1)>"), None);
        assert_eq!(clean_required(" Plumbing "), Some("Plumbing".to_string()));
    }
}
