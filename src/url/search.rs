use url::form_urlencoded;

/// Builds the search URL for a keyword
///
/// `template` contains a `{keyword}` placeholder which is replaced by the
/// form-encoded keyword.
///
/// # Examples
///
/// ```
/// use parts_harvester::url::build_search_url;
///
/// let url = build_search_url("https://apecauto.com/search/?pcode={keyword}", "brake pad");
/// assert_eq!(url, "https://apecauto.com/search/?pcode=brake+pad");
/// ```
pub fn build_search_url(template: &str, keyword: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(keyword.as_bytes()).collect();
    template.replace("{keyword}", &encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_characters_are_encoded() {
        assert_eq!(
            build_search_url("https://x.com/s?q={keyword}", "a&b=c/d"),
            "https://x.com/s?q=a%26b%3Dc%2Fd"
        );
    }

    #[test]
    fn test_part_numbers_pass_through() {
        assert_eq!(
            build_search_url("https://x.com/s?q={keyword}", "0986494104"),
            "https://x.com/s?q=0986494104"
        );
    }
}
