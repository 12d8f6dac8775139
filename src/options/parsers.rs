//! Value parsers turning raw flag text into typed values.
//!
//! Parsers report failures as plain messages; the schema attaches the flag
//! name when it converts them into [`super::ArgumentError::Malformed`].

use std::fmt;

use serde::Serialize;

const KIB: u64 = 1 << 10;
const MIB: u64 = 1 << 20;
const GIB: u64 = 1 << 30;
const TIB: u64 = 1 << 40;
const PIB: u64 = 1 << 50;

/// A size in bytes produced by [`BinarySize`].
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ByteSize(u64);

impl ByteSize {
    /// Wraps a raw byte count.
    #[must_use]
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Builds a size from whole gibibytes, saturating on overflow.
    #[must_use]
    pub const fn from_gb(gigabytes: u64) -> Self {
        Self(gigabytes.saturating_mul(GIB))
    }

    /// Returns the size in bytes.
    #[must_use]
    pub const fn bytes(self) -> u64 {
        self.0
    }

    /// Returns the size in whole gibibytes, rounding down.
    #[must_use]
    pub const fn whole_gb(self) -> u64 {
        match self.0.checked_div(GIB) {
            Some(value) => value,
            None => 0,
        }
    }

    /// Returns the size in whole mebibytes, rounding down.
    #[must_use]
    pub const fn whole_mb(self) -> u64 {
        match self.0.checked_div(MIB) {
            Some(value) => value,
            None => 0,
        }
    }

    /// Returns `true` when this size is an exact multiple of `unit`.
    #[must_use]
    pub const fn is_multiple_of(self, unit: Self) -> bool {
        matches!(self.0.checked_rem(unit.0), Some(0))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = [
            (PIB, "PB"),
            (TIB, "TB"),
            (GIB, "GB"),
            (MIB, "MB"),
            (KIB, "KB"),
        ];
        for (size, suffix) in units {
            if self.0 != 0 && matches!(self.0.checked_rem(size), Some(0)) {
                let magnitude = self.0.checked_div(size).unwrap_or_default();
                return write!(f, "{magnitude}{suffix}");
            }
        }
        write!(f, "{}B", self.0)
    }
}

/// Unit assumed for a size written without a suffix.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SizeUnit {
    /// Bytes.
    Byte,
    /// Kibibytes, written `KB`.
    Kilo,
    /// Mebibytes, written `MB`.
    Mega,
    /// Gibibytes, written `GB`.
    Giga,
    /// Tebibytes, written `TB`.
    Tera,
}

impl SizeUnit {
    const fn multiplier(self) -> u64 {
        match self {
            Self::Byte => 1,
            Self::Kilo => KIB,
            Self::Mega => MIB,
            Self::Giga => GIB,
            Self::Tera => TIB,
        }
    }
}

fn suffix_multiplier(suffix: &str) -> Option<u64> {
    let upper = suffix.trim().to_ascii_uppercase();
    let stem = upper
        .strip_suffix("IB")
        .or_else(|| upper.strip_suffix('B'))
        .unwrap_or(&upper);
    match stem {
        "" => Some(1),
        "K" => Some(KIB),
        "M" => Some(MIB),
        "G" => Some(GIB),
        "T" => Some(TIB),
        "P" => Some(PIB),
        _ => None,
    }
}

/// Parser for sizes written as a whole number plus an optional unit suffix.
///
/// Units are binary: `1KB` is 1024 bytes and `1GB` is 2^30 bytes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BinarySize {
    lower_bound: Option<ByteSize>,
    upper_bound: Option<ByteSize>,
    granularity: Option<ByteSize>,
    default_unit: SizeUnit,
}

impl Default for BinarySize {
    fn default() -> Self {
        Self::new()
    }
}

impl BinarySize {
    /// Creates an unbounded parser defaulting to gigabytes.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lower_bound: None,
            upper_bound: None,
            granularity: None,
            default_unit: SizeUnit::Giga,
        }
    }

    /// Rejects sizes below `bound`.
    #[must_use]
    pub const fn lower_bound(mut self, bound: ByteSize) -> Self {
        self.lower_bound = Some(bound);
        self
    }

    /// Rejects sizes above `bound`.
    #[must_use]
    pub const fn upper_bound(mut self, bound: ByteSize) -> Self {
        self.upper_bound = Some(bound);
        self
    }

    /// Rejects sizes that are not an exact multiple of `step`.
    #[must_use]
    pub const fn granularity(mut self, step: ByteSize) -> Self {
        self.granularity = Some(step);
        self
    }

    /// Sets the unit used when the input has no suffix.
    #[must_use]
    pub const fn default_unit(mut self, unit: SizeUnit) -> Self {
        self.default_unit = unit;
        self
    }

    /// Parses `raw` into a [`ByteSize`].
    ///
    /// # Errors
    ///
    /// Returns a description of the expected shape when the magnitude or unit
    /// cannot be read, or when the value falls outside the declared bounds or
    /// granularity.
    pub fn parse(&self, raw: &str) -> Result<ByteSize, String> {
        let trimmed = raw.trim();
        let split_at = trimmed
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, suffix) = trimmed.split_at(split_at);
        let shape = || {
            format!(
                "expected a whole number followed by an optional size unit \
                 (KB, MB, GB, TB, PB); received: {raw}"
            )
        };
        let magnitude: u64 = digits.parse().map_err(|_| shape())?;
        let multiplier = if suffix.trim().is_empty() {
            self.default_unit.multiplier()
        } else {
            suffix_multiplier(suffix).ok_or_else(shape)?
        };
        let size = magnitude
            .checked_mul(multiplier)
            .map(ByteSize)
            .ok_or_else(|| format!("size is too large to represent; received: {raw}"))?;

        if let Some(bound) = self.lower_bound
            && size < bound
        {
            return Err(format!(
                "value must be greater than or equal to {bound}; received: {raw}"
            ));
        }
        if let Some(bound) = self.upper_bound
            && size > bound
        {
            return Err(format!(
                "value must be less than or equal to {bound}; received: {raw}"
            ));
        }
        if let Some(step) = self.granularity
            && !size.is_multiple_of(step)
        {
            return Err(format!("value must be a multiple of {step}; received: {raw}"));
        }
        Ok(size)
    }
}

/// Case normalisation applied to enumeration values before membership checks.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Case {
    /// Keep the value as typed.
    Preserve,
    /// Convert to upper case.
    Upper,
    /// Convert to lower case.
    Lower,
}

impl Case {
    /// Applies the normalisation to `raw`.
    #[must_use]
    pub fn apply(self, raw: &str) -> String {
        match self {
            Self::Preserve => raw.to_owned(),
            Self::Upper => raw.to_ascii_uppercase(),
            Self::Lower => raw.to_ascii_lowercase(),
        }
    }
}

/// Fixed set of allowed values with an associated normalisation.
///
/// Help text is deliberately not part of the set; only the accepted values
/// are declared here.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChoiceSet {
    allowed: &'static [&'static str],
    case: Case,
}

impl ChoiceSet {
    /// Declares the allowed values; input is matched as typed.
    #[must_use]
    pub const fn new(allowed: &'static [&'static str]) -> Self {
        Self {
            allowed,
            case: Case::Preserve,
        }
    }

    /// Normalises input with `case` before checking membership.
    #[must_use]
    pub const fn normalized(mut self, case: Case) -> Self {
        self.case = case;
        self
    }

    /// Returns the allowed values in declaration order.
    #[must_use]
    pub const fn allowed(&self) -> &'static [&'static str] {
        self.allowed
    }

    /// Returns `true` when the (already normalised) value is allowed.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.allowed.contains(&value)
    }

    /// Renders the allowed set as `[a, b]`.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("[{}]", self.allowed.join(", "))
    }

    /// Normalises and checks `raw`, returning the normalised value.
    ///
    /// # Errors
    ///
    /// Returns a message naming the value and the allowed set when the value
    /// is not a member.
    pub fn parse(&self, raw: &str) -> Result<String, String> {
        let value = self.case.apply(raw);
        if self.contains(&value) {
            Ok(value)
        } else {
            Err(format!(
                "must be one of {}, not [{value}]",
                self.describe()
            ))
        }
    }
}

/// Parser for delimiter-separated lists.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ArgList {
    delimiter: char,
    min_length: usize,
    max_length: Option<usize>,
}

impl Default for ArgList {
    fn default() -> Self {
        Self::new()
    }
}

impl ArgList {
    /// Comma-separated list with no length constraints.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            delimiter: ',',
            min_length: 0,
            max_length: None,
        }
    }

    /// Uses `delimiter` instead of a comma.
    #[must_use]
    pub const fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Requires at least `length` elements. A minimum of one or more also
    /// drops empty segments before counting.
    #[must_use]
    pub const fn min_length(mut self, length: usize) -> Self {
        self.min_length = length;
        self
    }

    /// Rejects lists with more than `length` elements.
    #[must_use]
    pub const fn max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self
    }

    /// Splits `raw` into its elements. A single trailing delimiter is
    /// ignored, so `a,` yields one element.
    ///
    /// # Errors
    ///
    /// Returns a message when the element count is outside the declared
    /// bounds.
    pub fn parse(&self, raw: &str) -> Result<Vec<String>, String> {
        let mut items: Vec<String> = if raw.is_empty() {
            Vec::new()
        } else {
            raw.strip_suffix(self.delimiter)
                .unwrap_or(raw)
                .split(self.delimiter)
                .map(str::to_owned)
                .collect()
        };
        if self.min_length > 0 {
            items.retain(|item| !item.trim().is_empty());
        }
        if items.len() < self.min_length {
            return Err(format!(
                "expected at least {} element(s) separated by [{}]; received: [{raw}]",
                self.min_length, self.delimiter
            ));
        }
        if let Some(max) = self.max_length
            && items.len() > max
        {
            return Err(format!(
                "expected at most {max} element(s); received {} in [{raw}]",
                items.len()
            ));
        }
        Ok(items)
    }
}

/// Parser attached to a single key of a dictionary-valued flag.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyParser {
    /// Free text.
    Text,
    /// Signed integer.
    Integer,
    /// Size with unit.
    Size(BinarySize),
    /// Free text with case normalisation only; membership is checked later.
    Normalized(Case),
    /// Enumeration checked at parse time.
    Choice(ChoiceSet),
    /// Key that takes no value (for example `no-address`).
    Presence,
}

/// One declared key of a dictionary-valued flag.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DictKey {
    name: &'static str,
    parser: KeyParser,
    required: bool,
}

impl DictKey {
    /// Declares an optional key using `parser`.
    #[must_use]
    pub const fn new(name: &'static str, parser: KeyParser) -> Self {
        Self {
            name,
            parser,
            required: false,
        }
    }

    /// Declares an optional free-text key.
    #[must_use]
    pub const fn text(name: &'static str) -> Self {
        Self::new(name, KeyParser::Text)
    }

    /// Marks the key as mandatory.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Returns the key name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// Typed value of one dictionary key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DictScalar {
    /// Text, possibly normalised.
    Text(String),
    /// Integer.
    Integer(i64),
    /// Size.
    Size(ByteSize),
    /// Key given without a value.
    Present,
}

/// Parsed `key=value` pairs in input order; repeated keys keep the last value.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DictValue {
    entries: Vec<(String, DictScalar)>,
}

impl DictValue {
    fn insert(&mut self, key: &str, value: DictScalar) {
        if let Some(slot) = self.entries.iter_mut().find(|(name, _)| name == key) {
            slot.1 = value;
        } else {
            self.entries.push((key.to_owned(), value));
        }
    }

    /// Returns the value stored for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&DictScalar> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    /// Returns `true` when `key` was given, with or without a value.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the text stored for `key`.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(DictScalar::Text(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns the integer stored for `key`.
    #[must_use]
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            Some(DictScalar::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    /// Returns the size stored for `key`.
    #[must_use]
    pub fn size(&self, key: &str) -> Option<ByteSize> {
        match self.get(key) {
            Some(DictScalar::Size(value)) => Some(*value),
            _ => None,
        }
    }

    /// Iterates over keys and values in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DictScalar)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

/// Statically declared key list for a dictionary-valued flag.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DictSpec {
    keys: &'static [DictKey],
    open: bool,
}

impl DictSpec {
    /// Accepts exactly the declared keys.
    #[must_use]
    pub const fn new(keys: &'static [DictKey]) -> Self {
        Self { keys, open: false }
    }

    /// Accepts any key with a text value.
    #[must_use]
    pub const fn open() -> Self {
        Self {
            keys: &[],
            open: true,
        }
    }

    fn key(&self, name: &str) -> Option<&DictKey> {
        self.keys.iter().find(|key| key.name == name)
    }

    fn key_names(&self) -> String {
        self.keys
            .iter()
            .map(DictKey::name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Parses `key=value[,key=value...]`.
    ///
    /// # Errors
    ///
    /// Returns a message naming the key when a key is unknown, lacks a
    /// required value, carries a value it does not accept, fails its
    /// sub-parser, or is required but absent.
    pub fn parse(&self, raw: &str) -> Result<DictValue, String> {
        let mut value = DictValue::default();
        for segment in raw.split(',').filter(|segment| !segment.is_empty()) {
            let (key, text) = match segment.split_once('=') {
                Some((key, text)) => (key.trim(), Some(text)),
                None => (segment.trim(), None),
            };
            if self.open {
                value.insert(key, DictScalar::Text(text.unwrap_or_default().to_owned()));
                continue;
            }
            let spec = self.key(key).ok_or_else(|| {
                format!(
                    "valid keys are [{}]; received: {key}",
                    self.key_names()
                )
            })?;
            value.insert(key, Self::parse_key(spec, text)?);
        }
        if let Some(missing) = self
            .keys
            .iter()
            .find(|key| key.required && !value.has(key.name))
        {
            return Err(format!("key [{}] is required", missing.name));
        }
        Ok(value)
    }

    fn parse_key(spec: &DictKey, text: Option<&str>) -> Result<DictScalar, String> {
        let key = spec.name;
        match (spec.parser, text) {
            (KeyParser::Presence, None) => Ok(DictScalar::Present),
            (KeyParser::Presence, Some(_)) => Err(format!("key [{key}] does not take a value")),
            (_, None) => Err(format!("key [{key}] requires a value")),
            (KeyParser::Text, Some(text)) => Ok(DictScalar::Text(text.to_owned())),
            (KeyParser::Normalized(case), Some(text)) => Ok(DictScalar::Text(case.apply(text))),
            (KeyParser::Integer, Some(text)) => text
                .trim()
                .parse()
                .map(DictScalar::Integer)
                .map_err(|_| format!("key [{key}] expects an integer; received: {text}")),
            (KeyParser::Size(parser), Some(text)) => parser
                .parse(text)
                .map(DictScalar::Size)
                .map_err(|message| format!("key [{key}]: {message}")),
            (KeyParser::Choice(choices), Some(text)) => choices
                .parse(text)
                .map(DictScalar::Text)
                .map_err(|message| format!("key [{key}] {message}")),
        }
    }
}
