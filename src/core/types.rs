//! core::types
//!
//! Strong types for option values.
//!
//! # Types
//!
//! - [`ValueKind`] - Type tag identifying an option's value type
//! - [`Value`] - Closed, type-erased view of a bound option value
//! - [`OptionValue`] - Built-in conversion from raw tokens to a typed value
//! - [`ConversionError`] - Why a token could not become a value
//!
//! # Validation
//!
//! Conversions never clamp, truncate, or guess. A token that does not
//! denote a value of the target type (including numeric overflow) is an
//! error, and the command that declared the option does not run.
//!
//! # Examples
//!
//! ```
//! use cmdtree::core::types::{OptionValue, Value, ValueKind};
//!
//! let tokens = vec!["42".to_string()];
//! assert_eq!(u32::from_tokens(&tokens).unwrap(), 42);
//! assert_eq!(u32::kind(), ValueKind::UInt32);
//! assert_eq!(42u32.to_value(), Value::UInt(42));
//!
//! // Negative text for an unsigned type is rejected, not wrapped
//! assert!(u32::from_tokens(&["-213".to_string()]).is_err());
//! ```

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;
use uuid::Uuid;

/// Errors from converting raw tokens into option values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("'{token}' is not a valid {kind}: {reason}")]
    InvalidValue {
        kind: ValueKind,
        token: String,
        reason: String,
    },

    #[error("'{token}' is not one of: {expected}")]
    UnknownVariant { token: String, expected: String },

    #[error("expected a single value, got {0}")]
    ExpectedSingleValue(usize),
}

impl ConversionError {
    /// Build an `InvalidValue` error for `token`.
    pub fn invalid(kind: ValueKind, token: &str, reason: impl fmt::Display) -> Self {
        ConversionError::InvalidValue {
            kind,
            token: token.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Type tag for an option's value type.
///
/// The engine compares tags instead of inspecting values at runtime, and
/// help output uses them as the default value placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Bool,
    Text,
    DateTime,
    Date,
    Uuid,
    /// A host enum declared with [`option_enum!`](crate::option_enum).
    Enum(&'static str),
    /// A sequence of values of the inner kind.
    List(Box<ValueKind>),
    /// A host type converted by a custom parser.
    Custom(&'static str),
}

impl ValueKind {
    /// Check if values of this kind are sequences.
    pub fn is_list(&self) -> bool {
        matches!(self, ValueKind::List(_))
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Int8 => write!(f, "int8"),
            ValueKind::Int16 => write!(f, "int16"),
            ValueKind::Int32 => write!(f, "int32"),
            ValueKind::Int64 => write!(f, "int64"),
            ValueKind::UInt8 => write!(f, "uint8"),
            ValueKind::UInt16 => write!(f, "uint16"),
            ValueKind::UInt32 => write!(f, "uint32"),
            ValueKind::UInt64 => write!(f, "uint64"),
            ValueKind::Float32 => write!(f, "float32"),
            ValueKind::Float64 => write!(f, "float64"),
            ValueKind::Bool => write!(f, "bool"),
            ValueKind::Text => write!(f, "string"),
            ValueKind::DateTime => write!(f, "datetime"),
            ValueKind::Date => write!(f, "date"),
            ValueKind::Uuid => write!(f, "uuid"),
            ValueKind::Enum(name) | ValueKind::Custom(name) => {
                write!(f, "{}", short_type_name(name))
            }
            ValueKind::List(inner) => write!(f, "{}...", inner),
        }
    }
}

/// Strip the module path from a `std::any::type_name` result.
fn short_type_name(name: &str) -> &str {
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}

/// A bound option value with its type erased to a closed set of variants.
///
/// Signed integers widen to `Int`, unsigned to `UInt`, and floats to
/// `Float`. Custom values carry their `Debug` rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Text(String),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Uuid(Uuid),
    Enum(&'static str),
    List(Vec<Value>),
    Custom(String),
}

/// A type with a built-in textual conversion.
///
/// Implemented for the integer and float primitives, `bool`, `String`,
/// `chrono::NaiveDateTime`, `chrono::NaiveDate`, `uuid::Uuid`, `Vec<T>` of
/// any of these, and enums declared with [`option_enum!`](crate::option_enum).
/// Types without one use a custom parser instead (see
/// [`Opt::custom`](crate::core::option::Opt::custom)).
pub trait OptionValue: Clone + fmt::Debug + Send + Sync + 'static {
    /// The type tag for this value type.
    fn kind() -> ValueKind;

    /// Convert every token supplied for an option into a value.
    ///
    /// # Errors
    ///
    /// Returns a `ConversionError` if the tokens do not denote a value.
    fn from_tokens(tokens: &[String]) -> Result<Self, ConversionError>;

    /// Erase the value's type.
    fn to_value(&self) -> Value;

    /// Value implied by the option's bare presence (`--flag`), if any.
    fn flag_value() -> Option<Self> {
        None
    }

    /// Value reported when no token and no default provider exist.
    fn zero() -> Option<Self> {
        None
    }
}

/// Require exactly one token.
#[doc(hidden)]
pub fn single_token(tokens: &[String]) -> Result<&str, ConversionError> {
    match tokens {
        [token] => Ok(token.as_str()),
        _ => Err(ConversionError::ExpectedSingleValue(tokens.len())),
    }
}

macro_rules! integer_value {
    ($($ty:ty => $kind:ident, $variant:ident;)*) => {
        $(
            impl OptionValue for $ty {
                fn kind() -> ValueKind {
                    ValueKind::$kind
                }

                fn from_tokens(tokens: &[String]) -> Result<Self, ConversionError> {
                    let token = single_token(tokens)?;
                    token
                        .parse::<$ty>()
                        .map_err(|e| ConversionError::invalid(Self::kind(), token, e))
                }

                fn to_value(&self) -> Value {
                    Value::$variant((*self).into())
                }

                fn zero() -> Option<Self> {
                    Some(0)
                }
            }
        )*
    };
}

integer_value! {
    i8 => Int8, Int;
    i16 => Int16, Int;
    i32 => Int32, Int;
    i64 => Int64, Int;
    u8 => UInt8, UInt;
    u16 => UInt16, UInt;
    u32 => UInt32, UInt;
    u64 => UInt64, UInt;
}

/// Check whether a float token explicitly spells infinity.
fn spells_infinity(token: &str) -> bool {
    let unsigned = token.trim_start_matches(|c: char| c == '+' || c == '-');
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

macro_rules! float_value {
    ($($ty:ty => $kind:ident;)*) => {
        $(
            impl OptionValue for $ty {
                fn kind() -> ValueKind {
                    ValueKind::$kind
                }

                fn from_tokens(tokens: &[String]) -> Result<Self, ConversionError> {
                    let token = single_token(tokens)?;
                    let value = token
                        .parse::<$ty>()
                        .map_err(|e| ConversionError::invalid(Self::kind(), token, e))?;

                    // The standard parser saturates out-of-range text to infinity
                    if value.is_infinite() && !spells_infinity(token) {
                        return Err(ConversionError::invalid(
                            Self::kind(),
                            token,
                            "number out of range",
                        ));
                    }

                    Ok(value)
                }

                fn to_value(&self) -> Value {
                    Value::Float(f64::from(*self))
                }

                fn zero() -> Option<Self> {
                    Some(0.0)
                }
            }
        )*
    };
}

float_value! {
    f32 => Float32;
    f64 => Float64;
}

impl OptionValue for bool {
    fn kind() -> ValueKind {
        ValueKind::Bool
    }

    fn from_tokens(tokens: &[String]) -> Result<Self, ConversionError> {
        let token = single_token(tokens)?;
        if token.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if token.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(ConversionError::invalid(
                Self::kind(),
                token,
                "expected 'true' or 'false'",
            ))
        }
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn flag_value() -> Option<Self> {
        Some(true)
    }

    fn zero() -> Option<Self> {
        Some(false)
    }
}

impl OptionValue for String {
    fn kind() -> ValueKind {
        ValueKind::Text
    }

    fn from_tokens(tokens: &[String]) -> Result<Self, ConversionError> {
        single_token(tokens).map(str::to_string)
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

/// Accepted date-time layouts, tried in order after RFC 3339.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
];

/// Accepted date layouts. A date-time token may also be a bare date.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

fn parse_date(token: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(token, format).ok())
}

fn parse_date_time(token: &str) -> Option<NaiveDateTime> {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(token) {
        return Some(stamp.naive_utc());
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(token, format).ok())
        .or_else(|| parse_date(token).and_then(|date| date.and_hms_opt(0, 0, 0)))
}

fn unix_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1970, 1, 1)
}

impl OptionValue for NaiveDateTime {
    fn kind() -> ValueKind {
        ValueKind::DateTime
    }

    fn from_tokens(tokens: &[String]) -> Result<Self, ConversionError> {
        let token = single_token(tokens)?;
        parse_date_time(token).ok_or_else(|| {
            ConversionError::invalid(Self::kind(), token, "unrecognized date-time format")
        })
    }

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn zero() -> Option<Self> {
        unix_epoch().and_then(|date| date.and_hms_opt(0, 0, 0))
    }
}

impl OptionValue for NaiveDate {
    fn kind() -> ValueKind {
        ValueKind::Date
    }

    fn from_tokens(tokens: &[String]) -> Result<Self, ConversionError> {
        let token = single_token(tokens)?;
        parse_date(token).ok_or_else(|| {
            ConversionError::invalid(Self::kind(), token, "unrecognized date format")
        })
    }

    fn to_value(&self) -> Value {
        Value::Date(*self)
    }

    fn zero() -> Option<Self> {
        unix_epoch()
    }
}

impl OptionValue for Uuid {
    fn kind() -> ValueKind {
        ValueKind::Uuid
    }

    fn from_tokens(tokens: &[String]) -> Result<Self, ConversionError> {
        let token = single_token(tokens)?;
        Uuid::parse_str(token).map_err(|e| ConversionError::invalid(Self::kind(), token, e))
    }

    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }

    fn zero() -> Option<Self> {
        Some(Uuid::nil())
    }
}

impl<E: OptionValue> OptionValue for Vec<E> {
    fn kind() -> ValueKind {
        ValueKind::List(Box::new(E::kind()))
    }

    fn from_tokens(tokens: &[String]) -> Result<Self, ConversionError> {
        tokens
            .iter()
            .map(|token| E::from_tokens(std::slice::from_ref(token)))
            .collect()
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(OptionValue::to_value).collect())
    }

    fn zero() -> Option<Self> {
        Some(Vec::new())
    }
}

/// Declare a fieldless enum usable as an option value.
///
/// Tokens are matched case-sensitively against the variant names. The
/// macro derives `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq` and `Hash`,
/// so do not derive those again.
///
/// # Example
///
/// ```
/// use cmdtree::core::types::OptionValue;
///
/// cmdtree::option_enum! {
///     pub enum Color {
///         Red,
///         Black,
///     }
/// }
///
/// assert_eq!(Color::from_tokens(&["Red".to_string()]).unwrap(), Color::Red);
/// assert!(Color::from_tokens(&["red".to_string()]).is_err());
/// assert_eq!(Color::VARIANTS, &["Red", "Black"]);
/// ```
#[macro_export]
macro_rules! option_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$variant_meta:meta])* $variant:ident),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$variant_meta])* $variant),+
        }

        impl $name {
            /// Names accepted on the command line, in declaration order.
            pub const VARIANTS: &'static [&'static str] = &[$(stringify!($variant)),+];

            /// The command-line name of this variant.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),+
                }
            }
        }

        impl $crate::core::types::OptionValue for $name {
            fn kind() -> $crate::core::types::ValueKind {
                $crate::core::types::ValueKind::Enum(stringify!($name))
            }

            fn from_tokens(
                tokens: &[::std::string::String],
            ) -> ::std::result::Result<Self, $crate::core::types::ConversionError> {
                let token = $crate::core::types::single_token(tokens)?;
                $(
                    if token == stringify!($variant) {
                        return ::std::result::Result::Ok(Self::$variant);
                    }
                )+
                ::std::result::Result::Err($crate::core::types::ConversionError::UnknownVariant {
                    token: token.to_string(),
                    expected: Self::VARIANTS.join(", "),
                })
            }

            fn to_value(&self) -> $crate::core::types::Value {
                $crate::core::types::Value::Enum(self.as_str())
            }
        }
    };
}
