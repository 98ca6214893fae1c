/// Strips markup from creator-supplied text (titles, descriptions and question
/// texts) before it is stored. Options are left verbatim since answers are
/// matched against them exactly.
///
/// Whitelist-based: safe inline tags such as `<b>` survive, `<script>` is
/// removed together with its content, event-handler attributes are dropped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_are_removed() {
        assert_eq!(clean_html("Hi<script>alert(1)</script>"), "Hi");
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(clean_html("How satisfied are you?"), "How satisfied are you?");
    }
}
