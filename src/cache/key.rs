// Cache key derivation.
// Templates such as "/repos/{owner}/{repo}/branches" are filled from call arguments.

use std::fmt;
use std::str::FromStr;

use super::CacheError;

/// A value that can be substituted into a key template.
pub trait KeyPart {
    fn key_part(&self) -> String;
}

macro_rules! display_key_part {
    ($($t:ty),* $(,)?) => {
        $(
            impl KeyPart for $t {
                fn key_part(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

display_key_part!(
    String, str, bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize,
);

impl<T: KeyPart + ?Sized> KeyPart for &T {
    fn key_part(&self) -> String {
        (**self).key_part()
    }
}

/// `None` renders as an empty string.
impl<T: KeyPart> KeyPart for Option<T> {
    fn key_part(&self) -> String {
        self.as_ref().map(KeyPart::key_part).unwrap_or_default()
    }
}

/// Arguments of a memoized call, looked up by placeholder name.
///
/// Positional placeholders use the argument index (`"0"`, `"1"`, ...).
/// Named placeholders are answered by argument structs.
pub trait KeyArgs {
    fn key_value(&self, name: &str) -> Option<String>;
}

macro_rules! single_key_args {
    ($($t:ty),* $(,)?) => {
        $(
            impl KeyArgs for $t {
                fn key_value(&self, name: &str) -> Option<String> {
                    (name == "0").then(|| self.key_part())
                }
            }
        )*
    };
}

single_key_args!(
    String, str, bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize,
);

impl<T: KeyPart> KeyArgs for Option<T> {
    fn key_value(&self, name: &str) -> Option<String> {
        (name == "0").then(|| self.key_part())
    }
}

impl<T: KeyArgs + ?Sized> KeyArgs for &T {
    fn key_value(&self, name: &str) -> Option<String> {
        (**self).key_value(name)
    }
}

macro_rules! tuple_key_args {
    ($(($($name:ident : $idx:tt),+)),+ $(,)?) => {
        $(
            impl<$($name: KeyPart),+> KeyArgs for ($($name,)+) {
                fn key_value(&self, name: &str) -> Option<String> {
                    $(
                        if name == stringify!($idx) {
                            return Some(self.$idx.key_part());
                        }
                    )+
                    None
                }
            }
        )+
    };
}

tuple_key_args!(
    (A: 0),
    (A: 0, B: 1),
    (A: 0, B: 1, C: 2),
    (A: 0, B: 1, C: 2, D: 3),
);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// A parsed key template.
///
/// `{name}` and `{0}` are placeholders, `{}` takes the next positional
/// argument, and `{{` / `}}` are literal braces. A template numbers its
/// positional placeholders either automatically or explicitly, never both.
/// Names are used as written, whitespace included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl KeyTemplate {
    pub fn parse(raw: &str) -> Result<Self, CacheError> {
        let invalid = |reason: &str| CacheError::InvalidTemplate {
            template: raw.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut next_positional = 0usize;
        let mut explicit_positional = false;
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') => return Err(invalid("nested '{' in placeholder")),
                            Some(ch) => name.push(ch),
                            None => return Err(invalid("unclosed '{'")),
                        }
                    }
                    if name.is_empty() {
                        name = next_positional.to_string();
                        next_positional += 1;
                    } else if name.bytes().all(|b| b.is_ascii_digit()) {
                        explicit_positional = true;
                    }
                    if explicit_positional && next_positional > 0 {
                        return Err(invalid(
                            "cannot mix automatic and explicit placeholder numbering",
                        ));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(name));
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(invalid("unmatched '}'")),
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Fill the template from `args`.
    pub fn render<A: KeyArgs + ?Sized>(&self, args: &A) -> Result<String, CacheError> {
        let mut key = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => key.push_str(text),
                Segment::Field(name) => {
                    let value =
                        args.key_value(name)
                            .ok_or_else(|| CacheError::UnknownPlaceholder {
                                template: self.raw.clone(),
                                name: name.clone(),
                            })?;
                    key.push_str(&value);
                }
            }
        }
        Ok(key)
    }

    /// Placeholder names, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Field(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for KeyTemplate {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for KeyTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RepoArgs {
        owner: &'static str,
        repo: &'static str,
    }

    impl KeyArgs for RepoArgs {
        fn key_value(&self, name: &str) -> Option<String> {
            match name {
                "owner" | "0" => Some(self.owner.to_string()),
                "repo" | "1" => Some(self.repo.to_string()),
                _ => None,
            }
        }
    }

    #[test]
    fn test_positional_placeholder() {
        let template = KeyTemplate::parse("myfunc/{0}").unwrap();
        assert_eq!(template.render(&3u32).unwrap(), "myfunc/3");
        assert_eq!(template.render("abc").unwrap(), "myfunc/abc");
    }

    #[test]
    fn test_named_placeholders() {
        let template = KeyTemplate::parse("/repos/{owner}/{repo}/branches").unwrap();
        let args = RepoArgs {
            owner: "rshk",
            repo: "lulz-history",
        };
        assert_eq!(
            template.render(&args).unwrap(),
            "/repos/rshk/lulz-history/branches"
        );
        assert_eq!(
            template.placeholders().collect::<Vec<_>>(),
            vec!["owner", "repo"]
        );
    }

    #[test]
    fn test_tuple_and_auto_numbering() {
        let template = KeyTemplate::parse("{}:{}/{}").unwrap();
        let key = template.render(&("a", 7u8, Some("main"))).unwrap();
        assert_eq!(key, "a:7/main");

        let none: Option<&str> = None;
        assert_eq!(template.render(&("a", 7u8, none)).unwrap(), "a:7/");
    }

    #[test]
    fn test_auto_numbering_mixes_with_names() {
        let template = KeyTemplate::parse("{owner}/{}").unwrap();
        assert_eq!(template.placeholders().collect::<Vec<_>>(), vec!["owner", "0"]);
    }

    #[test]
    fn test_names_are_not_trimmed() {
        let template = KeyTemplate::parse("repo_pics:{ owner }").unwrap();
        assert_eq!(template.placeholders().collect::<Vec<_>>(), vec![" owner "]);

        let args = RepoArgs {
            owner: "rshk",
            repo: "lulz-pics",
        };
        assert!(matches!(
            template.render(&args),
            Err(CacheError::UnknownPlaceholder { name, .. }) if name == " owner "
        ));
    }

    #[test]
    fn test_escaped_braces() {
        let template = KeyTemplate::parse("{{literal}}-{0}").unwrap();
        assert_eq!(template.render(&1i32).unwrap(), "{literal}-1");
    }

    #[test]
    fn test_invalid_templates() {
        for raw in ["open{0", "close}", "{a{b}}", "{}/{0}", "{1}/{}"] {
            let err = KeyTemplate::parse(raw).unwrap_err();
            assert!(
                matches!(err, CacheError::InvalidTemplate { .. }),
                "{raw} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn test_unknown_placeholder() {
        let template = KeyTemplate::parse("repo_pics:{owner}/{name}").unwrap();
        let args = RepoArgs {
            owner: "rshk",
            repo: "lulz-pics",
        };
        assert_eq!(
            template.render(&args).unwrap_err(),
            CacheError::UnknownPlaceholder {
                template: "repo_pics:{owner}/{name}".to_string(),
                name: "name".to_string(),
            }
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let template: KeyTemplate = "k/{0}/{1}".parse().unwrap();
        let args = ("x".to_string(), 2u64);
        assert_eq!(template.render(&args), template.render(&args));
        assert_eq!(template.to_string(), "k/{0}/{1}");
    }
}
