//! Macro for implementing string conversions on unit-variant enums
//!
//! Policy and method enums need a stable textual form for configuration
//! files, environment variables and log fields. The wire format is handled
//! separately by serde attributes.
//!
//! # Example
//!
//! ```rust
//! use accountlink_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Mode {
//!     Strict,
//!     Lenient,
//! }
//!
//! impl_domain_status_conversions!(Mode {
//!     Strict => "strict",
//!     Lenient => "lenient",
//! });
//!
//! assert_eq!(Mode::Strict.as_str(), "strict");
//! assert_eq!("LENIENT".parse::<Mode>(), Ok(Mode::Lenient));
//! ```

/// Implements `as_str`, Display and FromStr for unit-variant enums
///
/// The string for every variant must be lowercase: parsing lowercases its
/// input before matching, so `"STOP"`, `"Stop"` and `"stop"` are all
/// accepted.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical lowercase name
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Verb {
        Fetch,
        Store,
        Purge,
    }

    impl_domain_status_conversions!(Verb {
        Fetch => "fetch",
        Store => "store",
        Purge => "purge",
    });

    #[test]
    fn display_uses_canonical_name() {
        assert_eq!(Verb::Fetch.to_string(), "fetch");
        assert_eq!(Verb::Purge.as_str(), "purge");
    }

    #[test]
    fn parsing_ignores_case_and_padding() {
        assert_eq!(Verb::from_str("STORE"), Ok(Verb::Store));
        assert_eq!(Verb::from_str(" Purge "), Ok(Verb::Purge));
    }

    #[test]
    fn unknown_names_report_enum_and_input() {
        let err = Verb::from_str("delete").unwrap_err();
        assert_eq!(err, "Invalid Verb: delete");
        assert!(Verb::from_str("").is_err());
    }

    mod with_local_result_alias {
        use std::str::FromStr;

        #[allow(dead_code)]
        type Result<T> = std::result::Result<T, String>;

        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        enum Mode {
            Strict,
            Lenient,
        }

        impl_domain_status_conversions!(Mode {
            Strict => "strict",
            Lenient => "lenient",
        });

        #[test]
        fn expands_next_to_a_single_parameter_result_alias() {
            assert_eq!(Mode::from_str("Lenient"), Ok(Mode::Lenient));
            assert_eq!(Mode::Strict.to_string(), "strict");
        }
    }
}
