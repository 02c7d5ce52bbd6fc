//! # Tournament Options
//!
//! Most tournament formats accept additional configuration that changes the behavoir of the
//! format. An example would be including a match for the third place in a single elimination
//! tournament, or defining the rounds played in a swiss tournament.
//!
//! Options arrive as an untyped key-value map ([`TournamentOptionValues`]), usually parsed from
//! the stored JSON blob of a tournament. Every format describes the keys it accepts together
//! with their defaults as [`TournamentOptions`]. [`TournamentOptionValues::merge`] validates the
//! supplied values against that schema before the format converts them into its typed options
//! struct.
//!
//! [`OptionValue`] contains all types supported.
#[cfg(feature = "serde")]
mod serde_impl;

use std::collections::{
    hash_map::{Iter, Keys},
    BTreeMap, HashMap,
};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("missing key {0}")]
    MissingKey(String),
    #[error("unknown key {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: expected {expected}, found {found}")]
    InvalidValue {
        key: String,
        found: &'static str,
        expected: &'static str,
    },
    #[error("value {value} is out of range for {key}: expected {expected}")]
    OutOfRange {
        key: String,
        value: String,
        expected: &'static str,
    },
    #[error("malformed options: {0}")]
    Malformed(String),
    #[error("duplicate key {0}")]
    DuplicateKey(String),
}

impl Error {
    pub(crate) fn out_of_range<T>(key: &str, value: T, expected: &'static str) -> Self
    where
        T: ToString,
    {
        Self::OutOfRange {
            key: key.to_owned(),
            value: value.to_string(),
            expected,
        }
    }
}

/// A list of options for a tournament. `TournamentOptions` includes the human readable names and
/// default values and should be used to describe a list of options. [`TournamentOptionValues`]
/// should be used when just expecting a list of key-value pairs.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TournamentOptions(HashMap<String, TournamentOption>);

impl TournamentOptions {
    /// Creates a new [`Builder`].
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Returns the option with the given `key`. Returns `None` if the given key does not exist
    pub fn get(&self, key: &str) -> Option<&TournamentOption> {
        self.0.get(key)
    }

    /// Inserts a new [`TournamentOption`] with the provided `key`, overwriting the previous value
    /// if it exists.
    pub fn insert<K>(&mut self, key: K, option: TournamentOption)
    where
        K: ToString,
    {
        self.0.insert(key.to_string(), option);
    }

    /// Returns an iterator over all keys.
    pub fn keys(&self) -> Keys<'_, String, TournamentOption> {
        self.0.keys()
    }

    /// Returns an iterator over all [`TournamentOption`]s.
    pub fn iter(&self) -> Iter<'_, String, TournamentOption> {
        self.0.iter()
    }
}

impl From<TournamentOptions> for TournamentOptionValues {
    fn from(this: TournamentOptions) -> Self {
        Self(
            this.0
                .into_iter()
                .map(|(key, option)| (key, option.value))
                .collect(),
        )
    }
}

/// A list of key-values for a tournament which only contains the values.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TournamentOptionValues(HashMap<String, OptionValue>);

impl TournamentOptionValues {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the values from a JSON object. camelCase keys are converted into snake_case. An
    /// empty string or `null` results in no values.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Error> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }

        let values: Option<HashMap<String, OptionValue>> =
            serde_json::from_str(json).map_err(|err| Error::Malformed(err.to_string()))?;

        let mut map = HashMap::new();
        for (key, value) in values.unwrap_or_default() {
            let key = snake_case(&key);
            // `fooBar` and `foo_bar` name the same option.
            if map.contains_key(&key) {
                return Err(Error::DuplicateKey(key));
            }

            map.insert(key, value);
        }

        Ok(Self(map))
    }

    /// Returns the [`OptionValue`] with the given `key`. Returns `None` if no value exist for the
    /// given `key`.
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    pub fn take(&mut self, key: &str) -> Option<OptionValue> {
        self.0.remove(key)
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: ToString,
        V: Into<OptionValue>,
    {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn iter(&self) -> Iter<'_, String, OptionValue> {
        self.0.iter()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Validates the values against `options` and fills all missing keys with their defaults.
    ///
    /// Numbers are coerced into the type of the default value where this is lossless: unsigned
    /// and signed integers into each other and integers into floats.
    pub fn merge(mut self, mut options: TournamentOptions) -> Result<Self, Error> {
        for (key, value) in self.0.iter_mut() {
            let default_value = match options.0.remove(key) {
                Some(value) => value.value,
                None => return Err(Error::UnknownKey(key.to_owned())),
            };

            if let Some(coerced) = value.coerce(&default_value) {
                *value = coerced;
            }

            if default_value.value_type() != value.value_type() {
                return Err(Error::InvalidValue {
                    key: key.to_owned(),
                    found: value.value_type(),
                    expected: default_value.value_type(),
                });
            }
        }

        // Fill the unassigned fields with defaults.
        for (key, option) in options.0.into_iter() {
            self.0.insert(key, option.value);
        }

        Ok(self)
    }

    fn take_value(&mut self, key: &str) -> Result<OptionValue, Error> {
        self.take(key)
            .ok_or_else(|| Error::MissingKey(key.to_owned()))
    }

    /// Removes the [`Bool`] value with the given `key`.
    ///
    /// [`Bool`]: OptionValue::Bool
    pub fn take_bool(&mut self, key: &str) -> Result<bool, Error> {
        match self.take_value(key)? {
            OptionValue::Bool(val) => Ok(val),
            val => Err(mismatch(key, &val, "bool")),
        }
    }

    /// Removes the [`U64`] value with the given `key`.
    ///
    /// [`U64`]: OptionValue::U64
    pub fn take_u64(&mut self, key: &str) -> Result<u64, Error> {
        match self.take_value(key)? {
            OptionValue::U64(val) => Ok(val),
            val => Err(mismatch(key, &val, "u64")),
        }
    }

    /// Removes the [`U64`] value with the given `key` and checks that it fits into an `u32`.
    ///
    /// [`U64`]: OptionValue::U64
    pub fn take_u32(&mut self, key: &str) -> Result<u32, Error> {
        let value = self.take_u64(key)?;
        u32::try_from(value).map_err(|_| Error::out_of_range(key, value, "a 32-bit integer"))
    }

    /// Removes the [`F64`] value with the given `key`.
    ///
    /// [`F64`]: OptionValue::F64
    pub fn take_f64(&mut self, key: &str) -> Result<f64, Error> {
        match self.take_value(key)? {
            OptionValue::F64(val) => Ok(val),
            val => Err(mismatch(key, &val, "f64")),
        }
    }

    /// Removes the [`String`] value with the given `key`.
    ///
    /// [`String`]: OptionValue::String
    pub fn take_string(&mut self, key: &str) -> Result<String, Error> {
        match self.take_value(key)? {
            OptionValue::String(val) => Ok(val),
            val => Err(mismatch(key, &val, "string")),
        }
    }

    /// Removes the string value with the given `key` and parses it.
    pub fn take_parsed<T>(&mut self, key: &str) -> Result<T, Error>
    where
        T: FromStr<Err = Error>,
    {
        self.take_string(key)?.parse().map_err(|err| match err {
            Error::OutOfRange {
                value, expected, ..
            } => Error::OutOfRange {
                key: key.to_owned(),
                value,
                expected,
            },
            err => err,
        })
    }

    /// Removes the [`Table`] value with the given `key` and converts it into a [`PointsTable`].
    ///
    /// [`Table`]: OptionValue::Table
    pub fn take_points_table(&mut self, key: &str) -> Result<PointsTable, Error> {
        match self.take_value(key)? {
            OptionValue::Table(table) => PointsTable::from_table(key, &table),
            val => Err(mismatch(key, &val, "table")),
        }
    }
}

fn mismatch(key: &str, value: &OptionValue, expected: &'static str) -> Error {
    Error::InvalidValue {
        key: key.to_owned(),
        found: value.value_type(),
        expected,
    }
}

/// Converts a camelCase `key` into snake_case. Keys already in snake_case are unchanged.
fn snake_case(key: &str) -> String {
    let mut buf = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            buf.push('_');
            buf.push(c.to_ascii_lowercase());
        } else {
            buf.push(c);
        }
    }

    buf
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TournamentOption {
    pub name: String,
    pub value: OptionValue,
}

/// The value of a [`TournamentOption`].
#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    String(String),
    /// A map of integers, used for points tables.
    Table(BTreeMap<String, i64>),
}

impl OptionValue {
    /// Returns the name of the type of this value.
    pub fn value_type(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::I64(_) => "i64",
            Self::U64(_) => "u64",
            Self::F64(_) => "f64",
            Self::String(_) => "string",
            Self::Table(_) => "table",
        }
    }

    /// Converts `self` into the number type of `target` if that conversion is lossless.
    fn coerce(&self, target: &Self) -> Option<Self> {
        match (self, target) {
            (Self::U64(val), Self::I64(_)) => i64::try_from(*val).ok().map(Self::I64),
            (Self::I64(val), Self::U64(_)) => u64::try_from(*val).ok().map(Self::U64),
            (Self::U64(val), Self::F64(_)) => Some(Self::F64(*val as f64)),
            (Self::I64(val), Self::F64(_)) => Some(Self::F64(*val as f64)),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    #[inline]
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for OptionValue {
    #[inline]
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<u64> for OptionValue {
    #[inline]
    fn from(value: u64) -> Self {
        Self::U64(value)
    }
}

impl From<f64> for OptionValue {
    #[inline]
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl<'a> From<&'a str> for OptionValue {
    #[inline]
    fn from(value: &'a str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for OptionValue {
    #[inline]
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<BTreeMap<String, i64>> for OptionValue {
    #[inline]
    fn from(value: BTreeMap<String, i64>) -> Self {
        Self::Table(value)
    }
}

impl From<&PointsTable> for OptionValue {
    fn from(value: &PointsTable) -> Self {
        let mut table: BTreeMap<String, i64> = value
            .points
            .iter()
            .map(|(position, points)| (position.to_string(), *points))
            .collect();
        table.insert(String::from("default"), value.default);

        Self::Table(table)
    }
}

/// A builder for [`TournamentOptions`].
#[derive(Clone, Debug, Default)]
pub struct Builder {
    options: TournamentOptions,
}

impl Builder {
    /// Inserts a new [`TournamentOption`]. If the `key` already exists, it is overwritten.
    pub fn option<T, V>(mut self, key: &'static str, name: T, value: V) -> Self
    where
        T: ToString,
        V: Into<OptionValue>,
    {
        self.options.insert(
            key,
            TournamentOption {
                name: name.to_string(),
                value: value.into(),
            },
        );
        self
    }

    /// Consumes the `Builder`, returning the collected [`TournamentOptions`].
    #[inline]
    pub fn build(self) -> TournamentOptions {
        self.options
    }
}

/// Maps a finishing position to the points awarded for it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointsTable {
    points: BTreeMap<u32, i64>,
    /// The points for all positions not in the table.
    default: i64,
}

impl PointsTable {
    pub fn new(points: BTreeMap<u32, i64>, default: i64) -> Self {
        Self { points, default }
    }

    /// Returns the points awarded for finishing at `position`.
    #[inline]
    pub fn points(&self, position: u32) -> i64 {
        self.points.get(&position).copied().unwrap_or(self.default)
    }

    /// Builds a `PointsTable` from a table value. Keys are either positions starting at 1 or
    /// `default`.
    fn from_table(key: &str, table: &BTreeMap<String, i64>) -> Result<Self, Error> {
        let mut this = Self {
            points: BTreeMap::new(),
            default: 0,
        };

        for (position, points) in table {
            if position == "default" {
                this.default = *points;
                continue;
            }

            match position.parse::<u32>() {
                Ok(position) if position > 0 => {
                    this.points.insert(position, *points);
                }
                _ => {
                    return Err(Error::out_of_range(
                        key,
                        position,
                        "a position starting at 1 or \"default\"",
                    ))
                }
            }
        }

        Ok(this)
    }
}

impl Default for PointsTable {
    fn default() -> Self {
        Self {
            points: BTreeMap::from([(1, 10), (2, 6), (3, 3), (4, 1)]),
            default: 0,
        }
    }
}

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $value:expr),+ $(,)?
        }
        expected = $expected:expr;
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $value),+
                }
            }
        }

        impl Display for $name {
            #[inline]
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok(Self::$variant),)+
                    _ => Err(Error::out_of_range(stringify!($name), s, $expected)),
                }
            }
        }
    };
}

string_enum! {
    /// Whether the grand final of a double elimination bracket can be reset.
    pub enum GrandFinalsModifier {
        /// The grand final is played once.
        Single => "single",
        /// A reset match is played if the losers bracket champion wins the grand final.
        Double => "double",
    }
    expected = "\"single\" or \"double\"";
}

string_enum! {
    /// How byes are distributed in elimination brackets.
    pub enum ByeStrategy {
        /// The top seeds receive the byes.
        Traditional => "traditional",
    }
    expected = "\"traditional\"";
}

string_enum! {
    /// The tie-break used after match wins in round robin standings.
    pub enum RankedBy {
        MatchWins => "match_wins",
        GameWins => "game_wins",
        GameWinPercentage => "game_win_percentage",
        PointsDifference => "points_difference",
    }
    expected = "\"match_wins\", \"game_wins\", \"game_win_percentage\" or \"points_difference\"";
}

string_enum! {
    /// The bracket played after the group stage of a two stage tournament.
    pub enum KnockoutFormat {
        SingleElimination => "single_elimination",
        DoubleElimination => "double_elimination",
    }
    expected = "\"single_elimination\" or \"double_elimination\"";
}
