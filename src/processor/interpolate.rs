//! `${name}` scanning for string values.

use crate::error::Result;

/// Expand `${name}` tokens in `src` left to right.
///
/// `$${name}` emits the literal `${name}`. A token with no closing brace is
/// kept as-is, along with everything after it.
pub(super) fn expand(src: &str, mut resolve: impl FnMut(&str) -> Result<String>) -> Result<String> {
    let bytes = src.as_bytes();
    let mut out = String::with_capacity(src.len());
    // Start of the literal run not yet copied to `out`.
    let mut start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'$' {
            pos += 1;
            continue;
        }

        if bytes.get(pos + 1) == Some(&b'{') {
            let Some(len) = src[pos + 2..].find('}') else {
                break;
            };
            out.push_str(&src[start..pos]);
            out.push_str(&resolve(&src[pos + 2..pos + 2 + len])?);
            pos += len + 3;
            start = pos;
            continue;
        }

        if bytes.get(pos + 1) == Some(&b'$') && bytes.get(pos + 2) == Some(&b'{') {
            let Some(len) = src[pos + 3..].find('}') else {
                break;
            };
            out.push_str(&src[start..pos]);
            out.push_str(&src[pos + 1..pos + len + 4]);
            pos += len + 4;
            start = pos;
            continue;
        }

        pos += 1;
    }

    out.push_str(&src[start..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_upper(src: &str) -> String {
        expand(src, |name| Ok(name.to_uppercase())).unwrap()
    }

    #[test]
    fn test_plain_string_untouched() {
        assert_eq!(expand_upper("no vars here $ { }"), "no vars here $ { }");
    }

    #[test]
    fn test_expands_tokens() {
        assert_eq!(expand_upper("${a.b}/x/${c}"), "A.B/x/C");
        assert_eq!(expand_upper("pre-${x}-post"), "pre-X-post");
    }

    #[test]
    fn test_escape_is_literal() {
        assert_eq!(expand_upper("$${a.b}"), "${a.b}");
        assert_eq!(expand_upper("foo:$${moo.jar}:bar"), "foo:${moo.jar}:bar");
        assert_eq!(expand_upper("$$${a}"), "$${a}");
    }

    #[test]
    fn test_empty_token() {
        let mut seen = Vec::new();
        let out = expand("[${}]", |name| {
            seen.push(name.to_string());
            Ok("root".to_string())
        })
        .unwrap();
        assert_eq!(out, "[root]");
        assert_eq!(seen, [""]);
    }

    #[test]
    fn test_unterminated_token_is_literal() {
        assert_eq!(expand_upper("a ${b} ${c"), "a B ${c");
        assert_eq!(expand_upper("$${open"), "$${open");
    }

    #[test]
    fn test_multibyte_text() {
        assert_eq!(expand_upper("é${x}ü"), "éXü");
    }

    #[test]
    fn test_resolver_error_propagates() {
        let err = expand("${boom}", |_| {
            Err(crate::error::ConfError::new(
                crate::error::ErrorCode::ReferenceCycle,
                "boom",
            ))
        });
        assert!(err.is_err());
    }
}
