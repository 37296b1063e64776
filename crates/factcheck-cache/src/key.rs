//! Key canonicalization.
//!
//! Every tier addresses entries by the same canonical string
//! `"namespace:rawkey"`. Memoized calls derive their raw key through
//! [`MemoKey`], never through ad hoc stringification of arguments.

use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::CacheError;

/// Namespace used when callers don't pick one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Namespace-qualified cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: String,
    raw: String,
}

/// Namespaces end at the first `:` of a canonical key, so they may not
/// contain one.
pub fn validate_namespace(namespace: &str) -> Result<(), CacheError> {
    if namespace.contains(':') {
        return Err(CacheError::configuration(format!(
            "namespace {namespace:?} must not contain ':'"
        )));
    }
    Ok(())
}

impl CacheKey {
    /// Build a key; an empty namespace falls back to [`DEFAULT_NAMESPACE`].
    pub fn new(namespace: &str, raw: impl Into<String>) -> Result<Self, CacheError> {
        let namespace = if namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            namespace
        };
        validate_namespace(namespace)?;
        Ok(Self {
            namespace: namespace.to_string(),
            raw: raw.into(),
        })
    }

    /// Split a canonical key at the first `:`.
    ///
    /// Returns `None` for strings that carry no namespace.
    pub fn parse(canonical: &str) -> Option<Self> {
        let (namespace, raw) = canonical.split_once(':')?;
        Some(Self {
            namespace: namespace.to_string(),
            raw: raw.to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The canonical `"namespace:rawkey"` form.
    pub fn canonical(&self) -> String {
        format!("{}:{}", self.namespace, self.raw)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.raw)
    }
}

/// Stable, collision-resistant key for a memoized call.
///
/// The rule: the operation identity is hashed first, then every argument is
/// converted to a `serde_json::Value` (object keys come out sorted, so map
/// iteration order never leaks in), rendered as compact JSON and hashed with
/// an 8-byte length prefix. The raw key is `"<identity>:<sha256 hex>"`.
///
/// JSON has no NaN or infinity and would render them as `null`, so an
/// argument carrying a non-finite float is rejected instead of keyed.
///
/// ```
/// use factcheck_cache::MemoKey;
///
/// let key = MemoKey::new("nlp::classify_claim")
///     .arg(&"The earth is flat")?
///     .arg(&("en", 3))?
///     .finish();
/// assert!(key.starts_with("nlp::classify_claim:"));
/// # Ok::<(), factcheck_cache::CacheError>(())
/// ```
#[derive(Clone, Debug)]
pub struct MemoKey {
    identity: String,
    hasher: Sha256,
}

impl MemoKey {
    pub fn new(identity: impl Into<String>) -> Self {
        let identity = identity.into();
        let mut hasher = Sha256::new();
        hasher.update((identity.len() as u64).to_be_bytes());
        hasher.update(identity.as_bytes());
        Self { identity, hasher }
    }

    /// Append one argument.
    pub fn arg<A: Serialize + ?Sized>(mut self, arg: &A) -> Result<Self, CacheError> {
        finite::check(arg)
            .map_err(|e| CacheError::serialization(format!("argument not canonicalizable: {e}")))?;
        let value = serde_json::to_value(arg)
            .map_err(|e| CacheError::serialization(format!("argument not canonicalizable: {e}")))?;
        let rendered = serde_json::to_vec(&value)
            .map_err(|e| CacheError::serialization(format!("argument not canonicalizable: {e}")))?;
        self.hasher.update((rendered.len() as u64).to_be_bytes());
        self.hasher.update(&rendered);
        Ok(self)
    }

    /// Finish and return the raw key.
    pub fn finish(self) -> String {
        let digest = self.hasher.finalize();
        format!("{}:{}", self.identity, hex::encode(digest))
    }
}

/// Glob pattern (`*`, `?`) compiled to an anchored regex.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    regex: Regex,
}

impl KeyPattern {
    pub fn new(glob: &str) -> Result<Self, CacheError> {
        let mut expr = String::with_capacity(glob.len() + 8);
        expr.push('^');
        for ch in glob.chars() {
            match ch {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        expr.push('$');
        let regex = Regex::new(&expr)
            .map_err(|e| CacheError::configuration(format!("invalid key pattern {glob:?}: {e}")))?;
        Ok(Self { regex })
    }

    pub fn matches(&self, raw: &str) -> bool {
        self.regex.is_match(raw)
    }
}

/// SHA-256 hex digest of a canonical key, used as the FileTier filename stem.
pub fn file_stem(canonical: &str) -> String {
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

/// A serializer that produces nothing and fails on the first NaN or
/// infinite float anywhere in the value.
mod finite {
    use serde::Serialize;
    use serde::ser::{self, Serializer};
    use std::fmt;

    #[derive(Debug)]
    pub(super) struct NonFinite(String);

    impl fmt::Display for NonFinite {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl std::error::Error for NonFinite {}

    impl ser::Error for NonFinite {
        fn custom<T: fmt::Display>(msg: T) -> Self {
            Self(msg.to_string())
        }
    }

    pub(super) fn check<T: Serialize + ?Sized>(value: &T) -> Result<(), NonFinite> {
        value.serialize(FiniteFloats)
    }

    fn float(v: f64) -> Result<(), NonFinite> {
        if v.is_finite() {
            Ok(())
        } else {
            Err(NonFinite(format!("non-finite float {v}")))
        }
    }

    #[derive(Clone, Copy)]
    struct FiniteFloats;

    macro_rules! accept {
        ($($method:ident($ty:ty)),* $(,)?) => {
            $(fn $method(self, _: $ty) -> Result<(), NonFinite> { Ok(()) })*
        };
    }

    impl Serializer for FiniteFloats {
        type Ok = ();
        type Error = NonFinite;
        type SerializeSeq = Self;
        type SerializeTuple = Self;
        type SerializeTupleStruct = Self;
        type SerializeTupleVariant = Self;
        type SerializeMap = Self;
        type SerializeStruct = Self;
        type SerializeStructVariant = Self;

        accept!(
            serialize_bool(bool),
            serialize_i8(i8),
            serialize_i16(i16),
            serialize_i32(i32),
            serialize_i64(i64),
            serialize_i128(i128),
            serialize_u8(u8),
            serialize_u16(u16),
            serialize_u32(u32),
            serialize_u64(u64),
            serialize_u128(u128),
            serialize_char(char),
            serialize_str(&str),
            serialize_bytes(&[u8]),
            serialize_unit_struct(&'static str),
        );

        fn serialize_f32(self, v: f32) -> Result<(), NonFinite> {
            float(f64::from(v))
        }

        fn serialize_f64(self, v: f64) -> Result<(), NonFinite> {
            float(v)
        }

        fn serialize_none(self) -> Result<(), NonFinite> {
            Ok(())
        }

        fn serialize_unit(self) -> Result<(), NonFinite> {
            Ok(())
        }

        fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), NonFinite> {
            value.serialize(self)
        }

        fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Result<(), NonFinite> {
            Ok(())
        }

        fn serialize_newtype_struct<T: Serialize + ?Sized>(
            self,
            _: &'static str,
            value: &T,
        ) -> Result<(), NonFinite> {
            value.serialize(self)
        }

        fn serialize_newtype_variant<T: Serialize + ?Sized>(
            self,
            _: &'static str,
            _: u32,
            _: &'static str,
            value: &T,
        ) -> Result<(), NonFinite> {
            value.serialize(self)
        }

        fn serialize_seq(self, _: Option<usize>) -> Result<Self, NonFinite> {
            Ok(self)
        }

        fn serialize_tuple(self, _: usize) -> Result<Self, NonFinite> {
            Ok(self)
        }

        fn serialize_tuple_struct(self, _: &'static str, _: usize) -> Result<Self, NonFinite> {
            Ok(self)
        }

        fn serialize_tuple_variant(
            self,
            _: &'static str,
            _: u32,
            _: &'static str,
            _: usize,
        ) -> Result<Self, NonFinite> {
            Ok(self)
        }

        fn serialize_map(self, _: Option<usize>) -> Result<Self, NonFinite> {
            Ok(self)
        }

        fn serialize_struct(self, _: &'static str, _: usize) -> Result<Self, NonFinite> {
            Ok(self)
        }

        fn serialize_struct_variant(
            self,
            _: &'static str,
            _: u32,
            _: &'static str,
            _: usize,
        ) -> Result<Self, NonFinite> {
            Ok(self)
        }
    }

    impl ser::SerializeSeq for FiniteFloats {
        type Ok = ();
        type Error = NonFinite;

        fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NonFinite> {
            value.serialize(*self)
        }

        fn end(self) -> Result<(), NonFinite> {
            Ok(())
        }
    }

    impl ser::SerializeTuple for FiniteFloats {
        type Ok = ();
        type Error = NonFinite;

        fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NonFinite> {
            value.serialize(*self)
        }

        fn end(self) -> Result<(), NonFinite> {
            Ok(())
        }
    }

    impl ser::SerializeTupleStruct for FiniteFloats {
        type Ok = ();
        type Error = NonFinite;

        fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NonFinite> {
            value.serialize(*self)
        }

        fn end(self) -> Result<(), NonFinite> {
            Ok(())
        }
    }

    impl ser::SerializeTupleVariant for FiniteFloats {
        type Ok = ();
        type Error = NonFinite;

        fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NonFinite> {
            value.serialize(*self)
        }

        fn end(self) -> Result<(), NonFinite> {
            Ok(())
        }
    }

    impl ser::SerializeMap for FiniteFloats {
        type Ok = ();
        type Error = NonFinite;

        fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), NonFinite> {
            key.serialize(*self)
        }

        fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), NonFinite> {
            value.serialize(*self)
        }

        fn end(self) -> Result<(), NonFinite> {
            Ok(())
        }
    }

    impl ser::SerializeStruct for FiniteFloats {
        type Ok = ();
        type Error = NonFinite;

        fn serialize_field<T: Serialize + ?Sized>(
            &mut self,
            _: &'static str,
            value: &T,
        ) -> Result<(), NonFinite> {
            value.serialize(*self)
        }

        fn end(self) -> Result<(), NonFinite> {
            Ok(())
        }
    }

    impl ser::SerializeStructVariant for FiniteFloats {
        type Ok = ();
        type Error = NonFinite;

        fn serialize_field<T: Serialize + ?Sized>(
            &mut self,
            _: &'static str,
            value: &T,
        ) -> Result<(), NonFinite> {
            value.serialize(*self)
        }

        fn end(self) -> Result<(), NonFinite> {
            Ok(())
        }
    }
}
