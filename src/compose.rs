//! URL composition from a base URL, a templated path and call parameters.

use crate::params::RequestParams;
use chrono::{DateTime, Utc};

/// Joins `base_url` and `function_path`, fills `{name}` placeholders and
/// appends the query parameters.
///
/// Placeholder values and query keys and values are percent-encoded.
/// Placeholders without a matching segment are left as they are. Query
/// parameters keep their insertion order and are joined to any query string
/// already present in `function_path`.
///
/// # Examples
///
/// ```
/// use xphttp::{compose_url, RequestParams};
///
/// let params = RequestParams::new().segment("id", 42).query("active", true);
/// let url = compose_url(
///     "https://api.example.com",
///     "/users/{id}",
///     &params,
///     &|d| d.format("%Y-%m-%d").to_string(),
/// );
/// assert_eq!(url, "https://api.example.com/users/42?active=true");
/// ```
pub fn compose_url(
    base_url: &str,
    function_path: &str,
    params: &RequestParams,
    date_formatter: &dyn Fn(&DateTime<Utc>) -> String,
) -> String {
    let mut url = format!("{}{}", base_url, function_path);

    for (name, value) in params.segments() {
        let placeholder = format!("{{{}}}", name);
        if url.contains(&placeholder) {
            let rendered = value.render(date_formatter);
            url = url.replace(&placeholder, &urlencoding::encode(&rendered));
        }
    }

    for (key, value) in params.query_params() {
        append_query_pair(&mut url, key, &value.render(date_formatter));
    }

    url
}

/// Appends `key=value` (both percent-encoded) to `url`, choosing `?` or `&`
/// depending on what the URL already carries.
pub(crate) fn append_query_pair(url: &mut String, key: &str, value: &str) {
    if !url.contains('?') {
        url.push('?');
    } else if !url.ends_with('?') && !url.ends_with('&') {
        url.push('&');
    }
    url.push_str(&urlencoding::encode(key));
    url.push('=');
    url.push_str(&urlencoding::encode(value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn iso(date: &DateTime<Utc>) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    #[test]
    fn test_segment_and_query() {
        let params = RequestParams::new().segment("id", 42).query("active", true);
        let url = compose_url("https://api.example.com", "/users/{id}", &params, &iso);
        assert_eq!(url, "https://api.example.com/users/42?active=true");
    }

    #[test]
    fn test_every_placeholder_replaced() {
        let params = RequestParams::new()
            .segment("org", "acme")
            .segment("repo", "widgets")
            .segment("n", 7);
        let url = compose_url("http://h", "/{org}/{repo}/issues/{n}/{org}", &params, &iso);
        assert_eq!(url, "http://h/acme/widgets/issues/7/acme");
        assert!(!url.contains('{'));
    }

    #[test]
    fn test_segment_values_are_percent_encoded() {
        let params = RequestParams::new().segment("name", "a b/c?");
        let url = compose_url("http://h", "/files/{name}", &params, &iso);
        assert_eq!(url, "http://h/files/a%20b%2Fc%3F");
    }

    #[test]
    fn test_missing_segment_left_verbatim() {
        let params = RequestParams::new().segment("other", 1);
        let url = compose_url("http://h", "/users/{id}", &params, &iso);
        assert_eq!(url, "http://h/users/{id}");
    }

    #[test]
    fn test_query_appended_to_existing_query() {
        let params = RequestParams::new().query("b", 2).query("c", "x y");
        let url = compose_url("http://h", "/search?a=1", &params, &iso);
        assert_eq!(url, "http://h/search?a=1&b=2&c=x%20y");

        let url = compose_url("http://h", "/search?", &params, &iso);
        assert_eq!(url, "http://h/search?b=2&c=x%20y");
    }

    #[test]
    fn test_query_order_and_repeats() {
        let params = RequestParams::new()
            .query("tag", "z")
            .query("tag", "a")
            .query("q&x", "1=2");
        let url = compose_url("http://h", "/t", &params, &iso);
        assert_eq!(url, "http://h/t?tag=z&tag=a&q%26x=1%3D2");
    }

    #[test]
    fn test_dates_use_formatter() {
        let date = Utc.with_ymd_and_hms(2015, 6, 1, 8, 30, 0).unwrap();
        let params = RequestParams::new()
            .date_segment("day", date)
            .date_query("since", date);
        let url = compose_url("http://h", "/log/{day}", &params, &iso);
        assert_eq!(url, "http://h/log/2015-06-01?since=2015-06-01");
    }
}
