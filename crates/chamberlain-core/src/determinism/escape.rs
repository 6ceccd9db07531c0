//! Delimiter escaping for textual identities.
//!
//! Config ids join condition pairs with `:` and `,`. A key or value is
//! percent-encoded only when it contains one of those delimiters, or text that
//! would otherwise read back as an escape (`%25`, `%2C`, `%3A`). Everything
//! else, including a bare `%` as in `50%`, encodes to itself, so ids for
//! ordinary conditions stay byte-identical to the plain `key:value` format.
//!
//! Decoding turns the three escapes back into their characters and leaves any
//! other `%` untouched.

const RESERVED: [(char, &str); 3] = [('%', "%25"), (',', "%2C"), (':', "%3A")];

/// Returns true if `s` must be encoded to survive a round trip.
pub fn needs_escape(s: &str) -> bool {
    s.contains([',', ':']) || RESERVED.iter().any(|(_, enc)| s.contains(enc))
}

/// Percent-encode the identity delimiters in `s`.
pub fn escape_component(s: &str) -> String {
    if !needs_escape(s) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        match RESERVED.iter().find(|(r, _)| *r == c) {
            Some((_, enc)) => out.push_str(enc),
            None => out.push(c),
        }
    }
    out
}

/// Reverse [`escape_component`]. Never fails: a `%` that does not start one of
/// the known escapes is kept as a literal character.
pub fn unescape_component(s: &str) -> String {
    if !s.contains('%') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match RESERVED.iter().find(|(_, enc)| tail.starts_with(enc)) {
            Some((c, enc)) => {
                out.push(*c);
                rest = &tail[enc.len()..];
            }
            None => {
                out.push('%');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_components_are_untouched() {
        assert_eq!(escape_component("prod"), "prod");
        assert_eq!(unescape_component("prod"), "prod");
    }

    #[test]
    fn delimiters_round_trip() {
        let raw = "a:b,c%d";
        let enc = escape_component(raw);
        assert_eq!(enc, "a%3Ab%2Cc%25d");
        assert_eq!(unescape_component(&enc), raw);
    }

    #[test]
    fn bare_percent_is_literal() {
        assert_eq!(escape_component("50%"), "50%");
        assert_eq!(unescape_component("50%"), "50%");
        assert_eq!(unescape_component("%2"), "%2");
        assert_eq!(unescape_component("%41"), "%41");
        assert_eq!(unescape_component("100%%"), "100%%");
    }

    #[test]
    fn escape_lookalikes_are_encoded() {
        let raw = "a%2Cb";
        let enc = escape_component(raw);
        assert_eq!(enc, "a%252Cb");
        assert_eq!(unescape_component(&enc), raw);

        // Lowercase forms are not escapes and pass through both ways.
        assert_eq!(escape_component("a%2cb"), "a%2cb");
        assert_eq!(unescape_component("a%2cb"), "a%2cb");
    }

    #[test]
    fn multibyte_text_survives() {
        let raw = "环境:生产%";
        assert_eq!(unescape_component(&escape_component(raw)), raw);
    }
}
