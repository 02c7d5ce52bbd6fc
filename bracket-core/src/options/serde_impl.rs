//! JSON shaped encoding of [`OptionValue`]: scalars map to their JSON counterpart, points
//! tables to an object of integers.
use std::collections::BTreeMap;
use std::fmt::{self, Formatter};

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::OptionValue;

impl Serialize for OptionValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::I64(v) => serializer.serialize_i64(*v),
            Self::U64(v) => serializer.serialize_u64(*v),
            Self::F64(v) => serializer.serialize_f64(*v),
            Self::String(v) => serializer.serialize_str(v),
            Self::Table(v) => {
                let mut map = serializer.serialize_map(Some(v.len()))?;
                for (key, value) in v {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for OptionValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(OptionValueVisitor)
    }
}

struct OptionValueVisitor;

impl<'de> Visitor<'de> for OptionValueVisitor {
    type Value = OptionValue;

    #[inline]
    fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter.write_str("a bool, number, string or a map of integers")
    }

    #[inline]
    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(OptionValue::Bool(v))
    }

    #[inline]
    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(OptionValue::I64(v))
    }

    #[inline]
    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(OptionValue::U64(v))
    }

    #[inline]
    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(OptionValue::F64(v))
    }

    #[inline]
    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(OptionValue::String(v.to_owned()))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut table = BTreeMap::new();
        while let Some((key, value)) = map.next_entry::<String, i64>()? {
            table.insert(key, value);
        }

        Ok(OptionValue::Table(table))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_test::{assert_tokens, Token};

    use super::OptionValue;

    #[test]
    fn test_option_value_serde() {
        assert_tokens(&OptionValue::Bool(true), &[Token::Bool(true)]);
        assert_tokens(&OptionValue::U64(123), &[Token::U64(123)]);
        assert_tokens(&OptionValue::I64(-456), &[Token::I64(-456)]);
        assert_tokens(&OptionValue::F64(0.25), &[Token::F64(0.25)]);
        assert_tokens(&OptionValue::from("Hi"), &[Token::Str("Hi")]);
        assert_tokens(
            &OptionValue::Table(BTreeMap::from([
                (String::from("1"), 10),
                (String::from("default"), 0),
            ])),
            &[
                Token::Map { len: Some(2) },
                Token::Str("1"),
                Token::I64(10),
                Token::Str("default"),
                Token::I64(0),
                Token::MapEnd,
            ],
        );
    }
}
