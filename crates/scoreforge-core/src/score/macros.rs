//! Declarative macros for level-based score types.
//!
//! Every score type here is a struct of named `i64` levels. The macros derive
//! ordering, arithmetic, scaling and the slash-separated textual form from
//! the level list so each type only spells out its constructors.

/// Generates `Ord`, `PartialOrd`, `Add`, `Sub` and `Neg` for a level-based
/// score. Levels compare in the order listed.
macro_rules! impl_score_ops {
    ($type:ident { $($field:ident),+ } => $ctor:ident) => {
        impl Ord for $type {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                std::cmp::Ordering::Equal
                    $( .then_with(|| self.$field.cmp(&other.$field)) )+
            }
        }

        impl PartialOrd for $type {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl std::ops::Add for $type {
            type Output = Self;

            fn add(self, other: Self) -> Self {
                $type::$ctor( $(self.$field.saturating_add(other.$field)),+ )
            }
        }

        impl std::ops::Sub for $type {
            type Output = Self;

            fn sub(self, other: Self) -> Self {
                $type::$ctor( $(self.$field.saturating_sub(other.$field)),+ )
            }
        }

        impl std::ops::Neg for $type {
            type Output = Self;

            fn neg(self) -> Self {
                $type::$ctor( $(self.$field.saturating_neg()),+ )
            }
        }
    };
}

/// Generates `scale`, `abs`, `to_level_numbers` and `from_level_numbers`
/// inside an `impl Score for Type { ... }` block.
macro_rules! impl_score_levels {
    ($type:ident { $($field:ident),+ } => $ctor:ident) => {
        fn scale(&self, factor: i64) -> Self {
            $type::$ctor( $( self.$field.saturating_mul(factor) ),+ )
        }

        fn abs(&self) -> Self {
            $type::$ctor( $( self.$field.saturating_abs() ),+ )
        }

        fn to_level_numbers(&self) -> Vec<i64> {
            vec![ $(self.$field),+ ]
        }

        fn from_level_numbers(levels: &[i64]) -> Option<Self> {
            let mut it = levels.iter().copied();
            let score = $type::$ctor( $( { let $field = it.next()?; $field } ),+ );
            match it.next() {
                Some(_) => None,
                None => Some(score),
            }
        }
    };
}

/// Generates `Display` and `ParseableScore` for the `"Xhard/Ysoft"` format.
macro_rules! impl_score_parse {
    ($type:ident { $($field:ident => $suffix:literal),+ } => $ctor:ident) => {
        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&$crate::score::ParseableScore::to_string_repr(self))
            }
        }

        impl $crate::score::ParseableScore for $type {
            fn parse(s: &str) -> Result<Self, $crate::score::ScoreParseError> {
                let s = s.trim();
                let mut parts = s.split('/');
                $(
                    let $field = {
                        let part = parts.next().map(str::trim).ok_or_else(|| {
                            $crate::score::ScoreParseError {
                                message: format!(
                                    "{} '{}' is missing its {} level",
                                    stringify!($type), s, $suffix
                                ),
                            }
                        })?;
                        let digits = part.strip_suffix($suffix).ok_or_else(|| {
                            $crate::score::ScoreParseError {
                                message: format!("level '{}' must end with '{}'", part, $suffix),
                            }
                        })?;
                        digits.parse::<i64>().map_err(|e| $crate::score::ScoreParseError {
                            message: format!("invalid {} level '{}': {}", $suffix, digits, e),
                        })?
                    };
                )+
                if parts.next().is_some() {
                    return Err($crate::score::ScoreParseError {
                        message: format!("{} '{}' has too many levels", stringify!($type), s),
                    });
                }
                Ok($type::$ctor( $($field),+ ))
            }

            fn to_string_repr(&self) -> String {
                let parts: Vec<String> = vec![ $( format!("{}{}", self.$field, $suffix) ),+ ];
                parts.join("/")
            }
        }
    };
}
