//! Parameter Encoding
//!
//! RFC 3986 percent-encoding and `application/x-www-form-urlencoded`
//! helpers shared by the OAuth1 signer and the OAuth2 client.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters that must be percent-encoded (everything except unreserved).
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Media type of form-encoded bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Ordered list of key/value pairs.
pub type Params = Vec<(String, String)>;

/// Percent-encode a value (RFC 3986, unreserved characters left intact).
pub fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Percent-decode a value, replacing invalid UTF-8 sequences.
pub fn percent_decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// Encode pairs as an `application/x-www-form-urlencoded` body.
pub fn form_urlencode<K, V>(params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        serializer.append_pair(key.as_ref(), value.as_ref());
    }
    serializer.finish()
}

/// Decode a form-encoded string, returning `None` when it is not one.
///
/// A string is only considered form-encoded when it is made up of URL-safe
/// characters and every `%` starts a valid escape.
pub fn decode_form(body: &str) -> Option<Params> {
    if !is_form_encoded(body) {
        return None;
    }
    Some(
        url::form_urlencoded::parse(body.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
    )
}

fn is_form_encoded(body: &str) -> bool {
    let allowed = |c: char| c.is_ascii_alphanumeric() || "_.-=&;:%+~,*@!()/?'$".contains(c);
    if !body.chars().all(allowed) {
        return false;
    }

    let bytes = body.as_bytes();
    bytes.iter().enumerate().all(|(i, b)| {
        *b != b'%'
            || (bytes.get(i + 1).map_or(false, u8::is_ascii_hexdigit)
                && bytes.get(i + 2).map_or(false, u8::is_ascii_hexdigit))
    })
}

/// Decoded query parameters of a URL, in order of appearance.
pub fn query_params(url: &str) -> Params {
    let without_fragment = url.split('#').next().unwrap_or_default();
    match without_fragment.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        None => Vec::new(),
    }
}

/// Decoded fragment parameters of a URL.
pub fn fragment_params(url: &str) -> Params {
    match url.split_once('#') {
        Some((_, fragment)) => url::form_urlencoded::parse(fragment.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        None => Vec::new(),
    }
}

/// Append parameters to the query component of a URL, keeping any fragment.
pub fn add_params_to_url<K, V>(url: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if params.is_empty() {
        return url.to_string();
    }

    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };

    let encoded = params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k.as_ref()), percent_encode(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&");

    let mut result = String::from(base);
    match base.split_once('?') {
        Some((_, query)) if !query.is_empty() => {
            if !query.ends_with('&') {
                result.push('&');
            }
        }
        Some(_) => {}
        None => result.push('?'),
    }
    result.push_str(&encoded);

    if let Some(fragment) = fragment {
        result.push('#');
        result.push_str(fragment);
    }
    result
}

/// Look up the first value for a key.
pub fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_encode_unreserved() {
        assert_eq!(percent_encode("abcXYZ019-._~"), "abcXYZ019-._~");
        assert_eq!(percent_encode("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(percent_encode("啦"), "%E5%95%A6");
        assert_eq!(percent_encode("="), "%3D");
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("%E5%95%A6%20x"), "啦 x");
    }

    #[test]
    fn test_decode_form_keeps_blank_values() {
        let params = decode_form("this=really&is=&+form=encoded").unwrap();
        assert_eq!(
            params,
            vec![
                ("this".to_string(), "really".to_string()),
                ("is".to_string(), String::new()),
                (" form".to_string(), "encoded".to_string()),
            ]
        );
    }

    #[test]
    fn test_decode_form_rejects_non_form() {
        assert!(decode_form("{\"json\": true}").is_none());
        assert!(decode_form("<xml/>").is_none());
        assert!(decode_form("a=%zz").is_none());
        assert!(decode_form("a=%4").is_none());
        assert_eq!(decode_form("").unwrap(), Vec::new());
    }

    #[test]
    fn test_add_params_to_url() {
        let params = [("a", "1"), ("b", "x y")];
        assert_eq!(
            add_params_to_url("https://i.b/path", &params),
            "https://i.b/path?a=1&b=x%20y"
        );
        assert_eq!(
            add_params_to_url("https://i.b/path?foo=bar#frag", &params),
            "https://i.b/path?foo=bar&a=1&b=x%20y#frag"
        );
        assert_eq!(
            add_params_to_url("https://i.b/path?", &params),
            "https://i.b/path?a=1&b=x%20y"
        );
    }

    #[test]
    fn test_query_and_fragment_params() {
        let url = "https://i.b/cb?code=abc&state=xyz#access_token=t&token_type=Bearer";
        let query = query_params(url);
        assert_eq!(param(&query, "code"), Some("abc"));
        assert_eq!(param(&query, "state"), Some("xyz"));

        let fragment = fragment_params(url);
        assert_eq!(param(&fragment, "access_token"), Some("t"));
        assert!(query_params("https://i.b/cb").is_empty());
    }

    #[test]
    fn test_form_urlencode() {
        let body = form_urlencode(&[("grant_type", "password"), ("username", "a b")]);
        assert_eq!(body, "grant_type=password&username=a+b");
    }
}
