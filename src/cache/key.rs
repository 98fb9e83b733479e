//! Cache key derivation
//!
//! Identical logical queries must share one cache entry, so parameters are
//! sorted before they are folded into the key. Distinct queries must never
//! share one, so names and values are form-encoded.

use url::form_urlencoded;

/// Strips leading and trailing slashes from an endpoint path
///
/// The upstream client resolves URLs with the same normalisation, so two
/// endpoints that share a key also share a request URL.
pub fn normalize_endpoint(endpoint: &str) -> &str {
    endpoint.trim_matches('/')
}

/// Builds the cache key for an upstream endpoint and its query parameters
///
/// Leading and trailing slashes on the endpoint are ignored. Parameters are
/// ordered by name, then by value, so `a=1&b=2` and `b=2&a=1` map to the same
/// key. A `&` or `=` inside a name or value is percent-encoded and cannot be
/// mistaken for a separator.
///
/// # Examples
/// ```
/// use govdata::cache::cache_key;
///
/// let params = [("semester_id", "20241"), ("kode_wilayah", "000000")];
/// assert_eq!(
///     cache_key("/rekap/dataSekolah", &params),
///     "rekap/dataSekolah?kode_wilayah=000000&semester_id=20241"
/// );
/// ```
pub fn cache_key<K, V>(endpoint: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let endpoint = normalize_endpoint(endpoint);
    if params.is_empty() {
        return endpoint.to_string();
    }

    let mut pairs: Vec<(&str, &str)> = params
        .iter()
        .map(|(k, v)| (k.as_ref(), v.as_ref()))
        .collect();
    pairs.sort_unstable();

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();

    format!("{}?{}", endpoint, query)
}
