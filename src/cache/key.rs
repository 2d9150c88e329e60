//! Cache key construction.
//!
//! A key is the operation name followed by every argument rendered as
//! `name=value`, sorted by name and joined with `|`:
//!
//! ```text
//! searchApartments|beds=_|city=Vienna|rooms=2
//! ```
//!
//! Text values starting with `_` or `\` get a leading `\`, so no text
//! value renders like an absent argument. Separator characters inside
//! values are not escaped, so a value containing `|` or `=` can collide
//! with a differently shaped argument set.

use std::collections::BTreeMap;
use std::fmt;

/// Separator between the operation name and each `name=value` pair.
pub const KEY_SEPARATOR: &str = "|";

/// Rendering of an absent argument.
pub const ABSENT_SENTINEL: &str = "_";

/// Prepended to text values that would otherwise read as [`ABSENT_SENTINEL`].
const TEXT_ESCAPE: char = '\\';

/// A single cache key argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyArg {
    Text(String),
    Int(i64),
    Absent,
}

impl fmt::Display for KeyArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyArg::Text(s) => {
                if s.starts_with(ABSENT_SENTINEL) || s.starts_with(TEXT_ESCAPE) {
                    write!(f, "{TEXT_ESCAPE}")?;
                }
                f.write_str(s)
            }
            KeyArg::Int(n) => write!(f, "{n}"),
            KeyArg::Absent => f.write_str(ABSENT_SENTINEL),
        }
    }
}

impl From<&str> for KeyArg {
    fn from(value: &str) -> Self {
        KeyArg::Text(value.to_string())
    }
}

impl From<String> for KeyArg {
    fn from(value: String) -> Self {
        KeyArg::Text(value)
    }
}

impl From<&String> for KeyArg {
    fn from(value: &String) -> Self {
        KeyArg::Text(value.clone())
    }
}

impl From<i64> for KeyArg {
    fn from(value: i64) -> Self {
        KeyArg::Int(value)
    }
}

impl From<i32> for KeyArg {
    fn from(value: i32) -> Self {
        KeyArg::Int(i64::from(value))
    }
}

impl From<u32> for KeyArg {
    fn from(value: u32) -> Self {
        KeyArg::Int(i64::from(value))
    }
}

impl<T: Into<KeyArg>> From<Option<T>> for KeyArg {
    fn from(value: Option<T>) -> Self {
        value.map_or(KeyArg::Absent, Into::into)
    }
}

/// Build the canonical key for `operation` called with `args`.
///
/// Argument order does not matter. If the same name appears twice the
/// last value wins.
pub fn build_key<'a, I>(operation: &str, args: I) -> String
where
    I: IntoIterator<Item = (&'a str, KeyArg)>,
{
    let sorted: BTreeMap<&str, KeyArg> = args.into_iter().collect();

    let body = sorted
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR);

    format!("{operation}{KEY_SEPARATOR}{body}")
}

/// Prefix shared by every key of `operation`.
pub fn operation_prefix(operation: &str) -> String {
    format!("{operation}{KEY_SEPARATOR}")
}

/// Fluent collector for key arguments.
///
/// ```rust
/// use rentcache::cache::KeyArgs;
///
/// let key = KeyArgs::new()
///     .arg("city", Some("Vienna"))
///     .arg("rooms", None::<i64>)
///     .build("searchApartments");
/// assert_eq!(key, "searchApartments|city=Vienna|rooms=_");
/// ```
#[derive(Debug, Clone, Default)]
pub struct KeyArgs {
    args: BTreeMap<String, KeyArg>,
}

impl KeyArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument (builder pattern).
    #[must_use]
    pub fn arg(mut self, name: &str, value: impl Into<KeyArg>) -> Self {
        self.args.insert(name.to_string(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Render the key for `operation`.
    pub fn build(&self, operation: &str) -> String {
        build_key(
            operation,
            self.args.iter().map(|(k, v)| (k.as_str(), v.clone())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sorted_rendering() {
        let key = build_key(
            "searchApartments",
            [
                ("rooms", KeyArg::Int(2)),
                ("city", KeyArg::from("Vienna")),
                ("beds", KeyArg::Absent),
            ],
        );
        assert_eq!(key, "searchApartments|beds=_|city=Vienna|rooms=2");
    }

    #[test]
    fn test_zero_arguments() {
        assert_eq!(build_key("ping", Vec::<(&str, KeyArg)>::new()), "ping|");
        assert_eq!(KeyArgs::new().build("ping"), "ping|");
    }

    #[test]
    fn test_absent_is_distinct() {
        let absent = build_key("op", [("a", KeyArg::Absent)]);
        let empty = build_key("op", [("a", KeyArg::from(""))]);
        let zero = build_key("op", [("a", KeyArg::Int(0))]);

        assert_eq!(absent, "op|a=_");
        assert_ne!(absent, empty);
        assert_ne!(absent, zero);
        assert_ne!(empty, zero);
    }

    #[test]
    fn test_underscore_text_is_not_absent() {
        let absent = build_key("searchApartments", [("city", KeyArg::Absent)]);
        let underscore = build_key("searchApartments", [("city", KeyArg::from("_"))]);

        assert_eq!(absent, "searchApartments|city=_");
        assert_eq!(underscore, "searchApartments|city=\\_");
        assert_ne!(absent, underscore);

        // Escaped forms stay distinct from each other
        assert_eq!(KeyArg::from("\\_").to_string(), "\\\\_");
        assert_ne!(KeyArg::from("_").to_string(), KeyArg::from("\\_").to_string());
        assert_eq!(KeyArg::from("_x").to_string(), "\\_x");
        assert_eq!(KeyArg::from("Vienna").to_string(), "Vienna");
    }

    #[test]
    fn test_negative_int() {
        assert_eq!(build_key("op", [("n", KeyArg::Int(-42))]), "op|n=-42");
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(KeyArg::from(None::<i32>), KeyArg::Absent);
        assert_eq!(KeyArg::from(Some(3_i32)), KeyArg::Int(3));
        assert_eq!(KeyArg::from(Some("x")), KeyArg::Text("x".to_string()));
    }

    #[test]
    fn test_builder_matches_function() {
        let built = KeyArgs::new()
            .arg("userId", "u-1")
            .build("bookingsByUser");
        assert_eq!(built, build_key("bookingsByUser", [("userId", KeyArg::from("u-1"))]));
        assert!(built.starts_with(&operation_prefix("bookingsByUser")));
    }

    // Separators are not escaped; these two argument sets collide.
    #[test]
    fn test_unescaped_separator_collision() {
        let a = build_key("op", [("a", KeyArg::from("1|b=2"))]);
        let b = build_key("op", [("a", KeyArg::from("1")), ("b", KeyArg::from("2"))]);
        assert_eq!(a, b);
    }

    fn arg_strategy() -> impl Strategy<Value = KeyArg> {
        prop_oneof![
            "[a-zA-Z0-9 _\\\\]{0,12}".prop_map(KeyArg::Text),
            any::<i64>().prop_map(KeyArg::Int),
            Just(KeyArg::Absent),
        ]
    }

    proptest! {
        #[test]
        fn prop_order_independent(
            args in proptest::collection::btree_map("[a-z]{1,8}", arg_strategy(), 0..6),
            seed in any::<u64>(),
        ) {
            let forward: Vec<(String, KeyArg)> = args.into_iter().collect();
            let mut shuffled = forward.clone();
            // Deterministic rotation + reversal driven by the seed
            if !shuffled.is_empty() {
                let len = shuffled.len();
                shuffled.rotate_left((seed as usize) % len);
            }
            if seed % 2 == 0 {
                shuffled.reverse();
            }

            let a = build_key("op", forward.iter().map(|(k, v)| (k.as_str(), v.clone())));
            let b = build_key("op", shuffled.iter().map(|(k, v)| (k.as_str(), v.clone())));
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_text_never_renders_absent(text in "[a-z_\\\\]{0,6}") {
            prop_assert_ne!(KeyArg::Text(text).to_string(), ABSENT_SENTINEL);
        }
    }
}
