/// Hidden form field the page templates render the token into.
pub const CSRF_FORM_FIELD: &str = "csrfmiddlewaretoken";
/// Cookie carrying the token when no form is on the page.
pub const CSRF_COOKIE: &str = "csrftoken";

/// Picks the CSRF token: form field, then cookie, then empty.
///
/// An empty token is still sent; the server decides what to do with it.
pub fn resolve_csrf_token(form_value: Option<&str>, cookies: Option<&str>) -> String {
    form_value
        .filter(|value| !value.is_empty())
        .or_else(|| cookies.and_then(|jar| cookie_value(jar, CSRF_COOKIE)))
        .unwrap_or_default()
        .to_string()
}

/// Looks up one cookie in a `name=value; name2=value2` string.
pub fn cookie_value<'a>(cookies: &'a str, name: &str) -> Option<&'a str> {
    cookies
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
