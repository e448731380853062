//! core::option
//!
//! Typed option declarations and their bound values.
//!
//! # Architecture
//!
//! An [`Opt<T>`] is a cheap handle: every clone shares one declaration and
//! one value slot. A host can keep a clone to read the bound value directly
//! while the owning [`Command`](crate::core::command::Command) exposes
//! another clone through name lookup.
//!
//! [`AnyOption`] is the type-erased capability view the command tree works
//! with. Typed access goes back through [`AnyOption::as_any`], which only
//! succeeds for the exact `Opt<T>` the option was declared as.
//!
//! # Binding protocol
//!
//! Values are bound in two phases so an invocation never leaves options
//! half-updated:
//!
//! 1. **Stage**: every option of the matched command converts its tokens
//!    (or falls back to its default). Any failure aborts the invocation.
//! 2. **Commit**: only after all options staged successfully are the value
//!    slots overwritten, immediately before the handler runs.
//!
//! # Example
//!
//! ```
//! use cmdtree::{AnyOption, Opt};
//!
//! let count = Opt::<u32>::builder(["-n", "--count"])
//!     .description("How many items to show")
//!     .default_value(|| 10)
//!     .build();
//!
//! assert_eq!(count.names(), ["-n", "--count"]);
//! // Nothing bound yet: the default provider answers
//! assert_eq!(count.value(), Some(10));
//! assert!(!count.is_set());
//! ```

use std::any::{type_name, Any};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use super::types::{ConversionError, OptionValue, Value, ValueKind};

/// Error type returned by custom parsers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type DefaultFn<T> = Arc<dyn Fn() -> T + Send + Sync>;
type ParseFn<T> = Arc<dyn Fn(&[String]) -> Result<T, BoxError> + Send + Sync>;

enum Converter<T> {
    BuiltIn(fn(&[String]) -> Result<T, ConversionError>),
    Custom(ParseFn<T>),
}

enum Slot<T> {
    Unbound,
    Bound(Option<T>),
}

/// Immutable part of an option declaration.
struct Spec<T> {
    names: Vec<String>,
    description: Option<String>,
    value_help_name: Option<String>,
    allow_multiple: bool,
    required: bool,
    kind: ValueKind,
    converter: Converter<T>,
    default: Option<DefaultFn<T>>,
    flag: Option<T>,
    zero: Option<T>,
    to_value: fn(&T) -> Value,
}

struct Inner<T> {
    spec: Spec<T>,
    slot: RwLock<Slot<T>>,
}

/// A typed command option.
///
/// Create one with [`Opt::new`] / [`Opt::builder`] for types with a built-in
/// conversion, or [`Opt::custom`] / [`Opt::custom_builder`] to supply a
/// converter.
pub struct Opt<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Opt<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn collect_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

fn debug_value<T: fmt::Debug>(value: &T) -> Value {
    Value::Custom(format!("{:?}", value))
}

impl<T: OptionValue> Opt<T> {
    /// Declare an option with default settings.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::builder(names).build()
    }

    /// Start declaring an option using `T`'s built-in conversion.
    pub fn builder<I, S>(names: I) -> OptBuilder<T>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OptBuilder::from_spec(Spec {
            names: collect_names(names),
            description: None,
            value_help_name: None,
            allow_multiple: false,
            required: false,
            kind: T::kind(),
            converter: Converter::BuiltIn(T::from_tokens),
            default: None,
            flag: T::flag_value(),
            zero: T::zero(),
            to_value: T::to_value,
        })
    }
}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> Opt<T> {
    /// Declare an option converted by `parse`.
    ///
    /// `parse` receives every token supplied for the option in one
    /// invocation, in encounter order.
    pub fn custom<I, S, F, E>(names: I, parse: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&[String]) -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::custom_builder(names, parse).build()
    }

    /// Start declaring an option converted by `parse`.
    pub fn custom_builder<I, S, F, E>(names: I, parse: F) -> OptBuilder<T>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&[String]) -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let parse: ParseFn<T> =
            Arc::new(move |tokens: &[String]| parse(tokens).map_err(Into::into));

        OptBuilder::from_spec(Spec {
            names: collect_names(names),
            description: None,
            value_help_name: None,
            allow_multiple: false,
            required: false,
            kind: ValueKind::Custom(type_name::<T>()),
            converter: Converter::Custom(parse),
            default: None,
            flag: None,
            zero: None,
            to_value: debug_value::<T>,
        })
    }

    /// The value bound by the latest invocation.
    ///
    /// Before any invocation this is the default: the provider's result,
    /// or the type's zero value (`0`, `false`, nil UUID, empty list).
    /// `None` when neither exists.
    pub fn value(&self) -> Option<T> {
        match &*self.read_slot() {
            Slot::Bound(value) => value.clone(),
            Slot::Unbound => self.default_value(),
        }
    }

    /// Check if an invocation has bound this option yet.
    pub fn is_set(&self) -> bool {
        matches!(&*self.read_slot(), Slot::Bound(_))
    }

    fn read_slot(&self) -> std::sync::RwLockReadGuard<'_, Slot<T>> {
        self.inner.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn default_value(&self) -> Option<T> {
        let spec = &self.inner.spec;
        match &spec.default {
            Some(provider) => Some(provider()),
            None => spec.zero.clone(),
        }
    }

    fn convert(&self, tokens: &[String]) -> Result<T, StageError> {
        match &self.inner.spec.converter {
            Converter::BuiltIn(convert) => convert(tokens).map_err(StageError::Conversion),
            Converter::Custom(parse) => parse(tokens).map_err(StageError::Custom),
        }
    }
}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> fmt::Debug for Opt<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let spec = &self.inner.spec;
        f.debug_struct("Opt")
            .field("names", &spec.names)
            .field("kind", &spec.kind)
            .field("required", &spec.required)
            .field("allow_multiple", &spec.allow_multiple)
            .field("value", &self.value())
            .finish()
    }
}

/// Builder for [`Opt`].
///
/// Defaults: no description, no value help name, single value (later
/// occurrences replace earlier ones), not required, no default provider.
#[must_use]
pub struct OptBuilder<T> {
    spec: Spec<T>,
}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> OptBuilder<T> {
    fn from_spec(spec: Spec<T>) -> Self {
        Self { spec }
    }

    /// Help text for the option.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = Some(description.into());
        self
    }

    /// Placeholder shown for the option's value in help output.
    pub fn value_help_name(mut self, name: impl Into<String>) -> Self {
        self.spec.value_help_name = Some(name.into());
        self
    }

    /// Accumulate every supplied token instead of keeping the last one.
    pub fn allow_multiple(mut self, allow: bool) -> Self {
        self.spec.allow_multiple = allow;
        self
    }

    /// Refuse to run the command unless the option receives a value.
    pub fn required(mut self, required: bool) -> Self {
        self.spec.required = required;
        self
    }

    /// Value used when the option receives no token.
    pub fn default_value<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.spec.default = Some(Arc::new(provider));
        self
    }

    /// Finish the declaration.
    pub fn build(self) -> Opt<T> {
        Opt {
            inner: Arc::new(Inner {
                spec: self.spec,
                slot: RwLock::new(Slot::Unbound),
            }),
        }
    }
}

/// Type-erased view of an option.
pub trait AnyOption: Send + Sync {
    /// Every alias, in declaration order.
    fn names(&self) -> &[String];

    /// The first declared alias.
    fn primary_name(&self) -> &str {
        self.names().first().map(String::as_str).unwrap_or_default()
    }

    /// Help text.
    fn description(&self) -> Option<&str>;

    /// Value placeholder for help output.
    fn value_help_name(&self) -> Option<&str>;

    /// The value type tag.
    fn kind(&self) -> &ValueKind;

    /// Whether tokens accumulate across occurrences.
    fn allow_multiple(&self) -> bool;

    /// Whether the option must receive a value.
    fn is_required(&self) -> bool;

    /// Whether a default provider was declared.
    fn has_default(&self) -> bool;

    /// Whether a host-supplied parser converts the tokens.
    fn is_custom(&self) -> bool;

    /// Whether bare presence of an alias implies a value.
    fn is_flag(&self) -> bool;

    /// Check if `name` is one of the aliases.
    fn matches(&self, name: &str) -> bool {
        self.names().iter().any(|alias| alias == name)
    }

    /// The current value with its type erased.
    fn raw_value(&self) -> Option<Value>;

    /// Upcast for typed access.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> AnyOption for Opt<T> {
    fn names(&self) -> &[String] {
        &self.inner.spec.names
    }

    fn description(&self) -> Option<&str> {
        self.inner.spec.description.as_deref()
    }

    fn value_help_name(&self) -> Option<&str> {
        self.inner.spec.value_help_name.as_deref()
    }

    fn kind(&self) -> &ValueKind {
        &self.inner.spec.kind
    }

    fn allow_multiple(&self) -> bool {
        self.inner.spec.allow_multiple
    }

    fn is_required(&self) -> bool {
        self.inner.spec.required
    }

    fn has_default(&self) -> bool {
        self.inner.spec.default.is_some()
    }

    fn is_custom(&self) -> bool {
        matches!(self.inner.spec.converter, Converter::Custom(_))
    }

    fn is_flag(&self) -> bool {
        self.inner.spec.flag.is_some()
    }

    fn raw_value(&self) -> Option<Value> {
        self.value().map(|value| (self.inner.spec.to_value)(&value))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A converted value waiting to be committed.
pub(crate) struct Staged(Box<dyn Any + Send>);

/// Why staging an option failed.
#[derive(Debug)]
pub(crate) enum StageError {
    Conversion(ConversionError),
    Custom(BoxError),
}

/// Engine-side hooks of an option.
pub(crate) trait OptionSlot: AnyOption {
    fn as_option(&self) -> &dyn AnyOption;

    /// Check if `token` may serve as the optional value after a bare flag.
    fn accepts_token(&self, token: &str) -> bool;

    /// Convert the tokens of one invocation.
    ///
    /// `None` means no alias occurred; an empty slice means the alias
    /// occurred without a value (a bare flag).
    fn stage(&self, tokens: Option<&[String]>) -> Result<Staged, StageError>;

    fn commit(&self, staged: Staged);
}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> OptionSlot for Opt<T> {
    fn as_option(&self) -> &dyn AnyOption {
        self
    }

    fn accepts_token(&self, token: &str) -> bool {
        self.is_flag() && self.convert(&[token.to_string()]).is_ok()
    }

    fn stage(&self, tokens: Option<&[String]>) -> Result<Staged, StageError> {
        let value = match tokens {
            None => self.default_value(),
            Some([]) => self.inner.spec.flag.clone(),
            Some(tokens) => Some(self.convert(tokens)?),
        };
        Ok(Staged(Box::new(value)))
    }

    fn commit(&self, staged: Staged) {
        if let Ok(value) = staged.0.downcast::<Option<T>>() {
            *self.inner.slot.write().unwrap_or_else(PoisonError::into_inner) = Slot::Bound(*value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Pair {
        left: i32,
        right: bool,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("pair can't be parsed")]
    struct PairError;

    fn parse_pair(tokens: &[String]) -> Result<Pair, PairError> {
        let text = tokens.first().ok_or(PairError)?;
        let mut parts = text.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(left), Some(right), None) => Ok(Pair {
                left: left.parse().map_err(|_| PairError)?,
                right: right.parse().map_err(|_| PairError)?,
            }),
            _ => Err(PairError),
        }
    }

    mod declaration {
        use super::*;

        #[test]
        fn builder_sets_fields() {
            let opt = Opt::<i32>::builder(["-r", "--required", "/Required"])
                .description("must be given")
                .value_help_name("int")
                .required(true)
                .build();

            assert_eq!(opt.names(), ["-r", "--required", "/Required"]);
            assert_eq!(opt.primary_name(), "-r");
            assert_eq!(opt.description(), Some("must be given"));
            assert_eq!(opt.value_help_name(), Some("int"));
            assert!(opt.is_required());
            assert!(!opt.allow_multiple());
            assert!(!opt.has_default());
            assert!(!opt.is_custom());
            assert_eq!(opt.kind(), &ValueKind::Int32);
        }

        #[test]
        fn matches_any_alias() {
            let opt = Opt::<String>::new(["-s", "--str", "/String"]);
            assert!(opt.matches("/String"));
            assert!(opt.matches("-s"));
            assert!(!opt.matches("--string"));
        }

        #[test]
        fn custom_kind_names_type() {
            let opt = Opt::custom(["/Custom"], parse_pair);
            assert!(opt.is_custom());
            assert!(matches!(opt.kind(), ValueKind::Custom(name) if name.ends_with("Pair")));
        }

        #[test]
        fn only_bool_is_flag() {
            assert!(Opt::<bool>::new(["-b"]).is_flag());
            assert!(!Opt::<u32>::new(["-u"]).is_flag());
            assert!(!Opt::<Vec<bool>>::new(["-B"]).is_flag());
        }
    }

    mod defaults {
        use super::*;

        #[test]
        fn provider_wins_over_zero() {
            let opt = Opt::<u32>::builder(["-u"]).default_value(|| 42).build();
            assert_eq!(opt.value(), Some(42));
            assert_eq!(opt.raw_value(), Some(Value::UInt(42)));
        }

        #[test]
        fn zero_without_provider() {
            assert_eq!(Opt::<bool>::new(["-b"]).value(), Some(false));
            assert_eq!(Opt::<Vec<String>>::new(["-E"]).value(), Some(vec![]));
        }

        #[test]
        fn text_and_custom_have_no_zero() {
            assert_eq!(Opt::<String>::new(["-s"]).value(), None);
            assert_eq!(Opt::custom(["-c"], parse_pair).value(), None);
        }
    }

    mod binding {
        use super::*;

        #[test]
        fn commit_is_shared_between_clones() {
            let opt = Opt::<i32>::new(["-i"]);
            let handle = opt.clone();

            let staged = opt.stage(Some(tokens(&["213"]).as_slice())).unwrap();
            assert!(!handle.is_set());
            opt.commit(staged);

            assert!(handle.is_set());
            assert_eq!(handle.value(), Some(213));
        }

        #[test]
        fn absent_option_binds_default() {
            let opt = Opt::<u32>::builder(["-u"]).default_value(|| 7).build();
            let staged = opt.stage(None).unwrap();
            opt.commit(staged);
            assert!(opt.is_set());
            assert_eq!(opt.value(), Some(7));
        }

        #[test]
        fn absent_text_binds_none() {
            let opt = Opt::<String>::new(["-s"]);
            opt.commit(opt.stage(Some(tokens(&["first"]).as_slice())).unwrap());
            assert_eq!(opt.value(), Some("first".to_string()));

            opt.commit(opt.stage(None).unwrap());
            assert_eq!(opt.value(), None);
        }

        #[test]
        fn bare_flag_binds_true() {
            let opt = Opt::<bool>::new(["--bool"]);
            opt.commit(opt.stage(Some(&[][..])).unwrap());
            assert_eq!(opt.value(), Some(true));
        }

        #[test]
        fn conversion_failure_is_not_custom() {
            let opt = Opt::<u32>::new(["--uint"]);
            let err = opt.stage(Some(tokens(&["-213"]).as_slice())).err().unwrap();
            assert!(matches!(err, StageError::Conversion(_)));
            assert_eq!(opt.value(), Some(0));
        }

        #[test]
        fn custom_parser_receives_all_tokens() {
            let opt = Opt::custom_builder(["-p"], |tokens: &[String]| {
                tokens
                    .iter()
                    .map(|t| parse_pair(std::slice::from_ref(t)))
                    .collect::<Result<Vec<_>, _>>()
            })
            .allow_multiple(true)
            .build();

            opt.commit(opt.stage(Some(tokens(&["1 true", "-2 false"]).as_slice())).unwrap());
            assert_eq!(
                opt.value(),
                Some(vec![
                    Pair { left: 1, right: true },
                    Pair { left: -2, right: false },
                ])
            );
        }

        #[test]
        fn custom_failure_keeps_source() {
            let opt = Opt::custom(["/Custom"], parse_pair);
            match opt.stage(Some(tokens(&["1"]).as_slice())) {
                Err(StageError::Custom(source)) => {
                    assert!(source.downcast_ref::<PairError>().is_some())
                }
                _ => panic!("expected custom parser failure"),
            }
        }

        #[test]
        fn flag_accepts_only_literals() {
            let opt = Opt::<bool>::new(["-b"]);
            assert!(opt.accepts_token("False"));
            assert!(!opt.accepts_token("value"));
            assert!(!Opt::<String>::new(["-s"]).accepts_token("true"));
        }
    }

    mod typed_access {
        use super::*;

        #[test]
        fn downcast_requires_exact_type() {
            let opt: Box<dyn AnyOption> = Box::new(Opt::<u32>::new(["-u"]));
            assert!(opt.as_any().downcast_ref::<Opt<u32>>().is_some());
            assert!(opt.as_any().downcast_ref::<Opt<i32>>().is_none());
        }
    }
}
