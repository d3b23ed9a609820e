// src/utils/html.rs

/// Sanitizes admin-supplied question text.
///
/// Whitelist based: formatting tags such as <b>, <sub>, <sup> survive (handy
/// for formulas), <script>, <iframe> and event-handler attributes are removed.
/// Only the question prompt goes through here; options and answers are
/// compared byte for byte and must stay untouched.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_script_keeps_formatting() {
        let cleaned = clean_html("H<sub>2</sub>O <script>alert(1)</script>");
        assert!(cleaned.contains("H<sub>2</sub>O"));
        assert!(!cleaned.contains("script"));
    }
}
