//! Types and functions for parsing and formatting MediaWiki title strings.

use html_escape::decode_html_entities;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, PercentEncode, percent_decode_str, utf8_percent_encode};
use std::{borrow::Cow, fmt};

/// Characters which are percent-encoded in an article URL path.
const PATH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/')
    .remove(b':');

/// Characters which are percent-encoded in a query string value.
const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b':');

/// The canonical form of a title.
///
/// ```text
/// :interwiki:Namespace:Title
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct CanonicalTitle {
    /// The namespace, in its registered display case. Empty for the main
    /// namespace.
    pub namespace: String,
    /// The title text, without the namespace.
    pub title: String,
    /// The interwiki prefix, or empty if there is none.
    pub interwiki: String,
}

impl CanonicalTitle {
    /// The namespace and title, joined by a colon. The interwiki prefix is not
    /// included.
    pub fn full_title(&self) -> String {
        if self.namespace.is_empty() {
            self.title.clone()
        } else {
            format!("{}:{}", self.namespace, self.title)
        }
    }

    /// The full title in the form used in URLs.
    pub fn link(&self) -> String {
        self.full_title().replace(' ', "_")
    }
}

impl fmt::Display for CanonicalTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.interwiki.is_empty() {
            write!(f, ":{}:", self.interwiki)?;
        }
        if !self.namespace.is_empty() {
            write!(f, "{}:", self.namespace)?;
        }
        f.write_str(&self.title)
    }
}

/// Splits a raw title into its canonical parts.
///
/// The namespace part is passed to `namespace` so the caller can map it to a
/// registered display name. Unrecognised namespaces (`None`) are kept as-is.
/// `default_namespace` is used when the title has no namespace part.
pub fn canonicalize<'a, F>(title: &str, default_namespace: &str, namespace: F) -> CanonicalTitle
where
    F: FnOnce(&str) -> Option<&'a str>,
{
    let title = normalize(title);
    let has_interwiki = title.starts_with(':');
    let parts = title.split(':').collect::<Vec<_>>();

    let (interwiki, ns, rest) = match parts.as_slice() {
        [_, interwiki, ns, rest @ ..] if has_interwiki && !rest.is_empty() => {
            (*interwiki, (*ns).to_string(), rest.join(":"))
        }
        [_, interwiki, rest] if has_interwiki => {
            (*interwiki, default_namespace.to_string(), (*rest).to_string())
        }
        [ns, rest @ ..] if !rest.is_empty() => ("", (*ns).to_string(), rest.join(":")),
        _ => ("", default_namespace.to_string(), title.to_string()),
    };

    CanonicalTitle {
        namespace: namespace(ns.trim()).unwrap_or(ns.trim()).to_string(),
        title: ucfirst(rest.trim()).into_owned(),
        interwiki: interwiki.trim().to_string(),
    }
}

/// Normalises title text by decoding percent-encoding and HTML entities, and
/// converting runs of whitespace + underscore to a single space character.
pub fn normalize(text: &str) -> Cow<'_, str> {
    let decoded = decode(text);
    if is_normal(&decoded) {
        return decoded;
    }

    let mut out = String::with_capacity(decoded.len());
    let mut space = false;
    for c in decoded.chars() {
        // Bidi markers get stripped because “Sometimes they slip into
        // cut-n-pasted page titles”
        if bidi(c) {
            continue;
        } else if spacelike(c) {
            space = !out.is_empty();
        } else {
            if space {
                out.push(' ');
                space = false;
            }
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Normalises an article key: whitespace is normalised and the first character
/// is made upper-case.
pub fn normalize_key(text: &str) -> String {
    ucfirst(&normalize(text)).into_owned()
}

/// Returns the text with its first character made upper-case.
pub fn ucfirst(text: &str) -> Cow<'_, str> {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if !first.to_uppercase().eq([first]) => {
            Cow::Owned(first.to_uppercase().chain(chars).collect())
        }
        _ => Cow::Borrowed(text),
    }
}

/// Percent-encodes a title link for use in a URL path.
pub(crate) fn encode_path(link: &str) -> PercentEncode<'_> {
    utf8_percent_encode(link, PATH)
}

/// Percent-encodes a title link for use in a query string.
pub(crate) fn encode_query(link: &str) -> PercentEncode<'_> {
    utf8_percent_encode(link, QUERY)
}

/// The most times [`decode`] will unwrap nested encodings.
const MAX_DECODE_ROUNDS: usize = 16;

/// Decodes percent-encoding, then HTML entities, repeatedly until the text
/// stops changing, so that a decoded title never decodes further.
fn decode(text: &str) -> Cow<'_, str> {
    let mut decoded = decode_once(text);
    for _ in 1..MAX_DECODE_ROUNDS {
        let next = match &decoded {
            Cow::Borrowed(_) => break,
            Cow::Owned(previous) => match decode_once(previous) {
                Cow::Borrowed(_) => break,
                Cow::Owned(next) => next,
            },
        };
        decoded = Cow::Owned(next);
    }
    decoded
}

/// Decodes one layer of percent-encoding, then HTML entities.
fn decode_once(text: &str) -> Cow<'_, str> {
    match percent_decode_str(text).decode_utf8_lossy() {
        Cow::Borrowed(text) => decode_html_entities(text),
        Cow::Owned(text) => Cow::Owned(decode_html_entities(&text).into_owned()),
    }
}

/// Returns true if the text has no characters which [`normalize`] would
/// change.
fn is_normal(text: &str) -> bool {
    !text.starts_with(trimmable)
        && !text.ends_with(trimmable)
        && !text.contains("  ")
        && !text.contains(|c: char| bidi(c) || (spacelike(c) && c != ' '))
}

/// Returns true if the given character `c` is a bidirectional text control
/// character.
fn bidi(c: char) -> bool {
    ('\u{200e}'..='\u{200f}').contains(&c) || ('\u{202a}'..='\u{202e}').contains(&c)
}

/// Returns true if the character `c` is considered like whitespace in title
/// text.
fn spacelike(c: char) -> bool {
    c == '_' || c.is_whitespace()
}

/// Returns true if the character `c` is trimmable in title text.
fn trimmable(c: char) -> bool {
    bidi(c) || spacelike(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(title: &str, default_namespace: &str) -> CanonicalTitle {
        canonicalize(title, default_namespace, |_| None)
    }

    fn parts(ns: &str, title: &str, interwiki: &str) -> CanonicalTitle {
        CanonicalTitle {
            namespace: ns.into(),
            title: title.into(),
            interwiki: interwiki.into(),
        }
    }

    #[test]
    fn normalize() {
        assert_eq!(super::normalize("A b"), Cow::Borrowed("A b"));
        assert_eq!(super::normalize("A_b"), "A b");
        assert_eq!(super::normalize("A_______b"), "A b");
        assert_eq!(super::normalize("A__  __b"), "A b");
        assert_eq!(super::normalize("   A b   "), "A b");
        assert_eq!(super::normalize(" \t A b"), "A b");
        assert_eq!(super::normalize("\u{200e}A b   \u{202e}"), "A b");
        assert_eq!(super::normalize("d&eacute;partement"), "département");
        assert_eq!(super::normalize("%40"), "@");
        assert_eq!(super::normalize("Foo%26amp;"), "Foo&");
        assert_eq!(super::normalize("%2541"), "A");
        assert_eq!(super::normalize("&amp;lt;x"), "<x");
    }

    #[test]
    fn ucfirst() {
        assert_eq!(super::ucfirst("foo bar"), "Foo bar");
        assert_eq!(super::ucfirst("Foo"), Cow::Borrowed("Foo"));
        assert_eq!(super::ucfirst("été"), "Été");
        assert_eq!(super::ucfirst("1a"), Cow::Borrowed("1a"));
        assert_eq!(super::ucfirst(""), Cow::Borrowed(""));
    }

    #[test]
    fn split() {
        assert_eq!(canon("foo", ""), parts("", "Foo", ""));
        assert_eq!(canon("foo", "Template"), parts("Template", "Foo", ""));
        assert_eq!(canon(":main page", ""), parts("", "Main page", ""));
        assert_eq!(canon("Help:foo", ""), parts("Help", "Foo", ""));
        assert_eq!(canon("a:b:c", ""), parts("a", "B:c", ""));
        assert_eq!(canon(":en:foo", "Default"), parts("Default", "Foo", "en"));
        assert_eq!(canon("%3Ade%3AFoo", ""), parts("", "Foo", "de"));
        assert_eq!(
            canon("__:__en__:__Template__:__foo_bar___", ""),
            parts("Template", "Foo bar", "en")
        );
        assert_eq!(canon("a:b:c:d", ""), parts("a", "B:c:d", ""));
    }

    #[test]
    fn canonicalize_is_idempotent() {
        for title in [
            "foo",
            "foo_bar",
            ":main page",
            "Help: foo",
            "a:b:c",
            ":en:Template:foo_bar",
            "Foo: Bar: Baz: Qux",
            "d&eacute;partement",
            "Foo:",
            "",
            "%2541",
            "&amp;lt;x",
            "&amp;#37;41b",
            "%25252541",
        ] {
            let once = canon(title, "");
            let twice = canon(&once.to_string(), "");
            assert_eq!(once, twice, "{title}");
        }
    }

    #[test]
    fn links() {
        let title = parts("Help", "Foo bar", "");
        assert_eq!(title.full_title(), "Help:Foo bar");
        assert_eq!(title.link(), "Help:Foo_bar");
        assert_eq!(encode_path("Help:Foo_bar/ü?").to_string(), "Help:Foo_bar/%C3%BC%3F");
        assert_eq!(encode_query("A/B&C").to_string(), "A%2FB%26C");
    }
}
