use std::fmt;
use std::rc::Rc;

/// Handle to a heap slot. The generation distinguishes a live object from a
/// later occupant of the same slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    pub index: u32,
    pub generation: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Object(ObjectId),
}

/// Immutable UTF-16 code unit string, shared between holders.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsString {
    code_units: Rc<[u16]>,
}

impl JsString {
    pub fn from_str(s: &str) -> Self {
        Self {
            code_units: s.encode_utf16().collect::<Vec<_>>().into(),
        }
    }

    pub fn from_units(units: Vec<u16>) -> Self {
        Self {
            code_units: units.into(),
        }
    }

    pub fn empty() -> Self {
        Self::from_units(Vec::new())
    }

    pub fn as_units(&self) -> &[u16] {
        &self.code_units
    }

    pub fn is_empty(&self) -> bool {
        self.code_units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.code_units.len()
    }

    pub fn to_rust_string(&self) -> String {
        String::from_utf16_lossy(&self.code_units)
    }

    pub fn concat(&self, other: &JsString) -> JsString {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut units = Vec::with_capacity(self.len() + other.len());
        units.extend_from_slice(&self.code_units);
        units.extend_from_slice(&other.code_units);
        JsString::from_units(units)
    }

    // §15.5.4.7 indexOf core
    pub fn index_of(&self, search: &JsString, from: usize) -> Option<usize> {
        let s_len = self.code_units.len();
        let search_len = search.code_units.len();
        if search_len == 0 {
            return if from <= s_len { Some(from) } else { None };
        }
        if from + search_len > s_len {
            return None;
        }
        (from..=(s_len - search_len))
            .find(|&i| self.code_units[i..i + search_len] == search.code_units[..])
    }

    // §15.5.4.8 lastIndexOf core
    pub fn last_index_of(&self, search: &JsString, from: usize) -> Option<usize> {
        let s_len = self.code_units.len();
        let search_len = search.code_units.len();
        if search_len == 0 {
            return Some(from.min(s_len));
        }
        if search_len > s_len {
            return None;
        }
        let max_start = from.min(s_len - search_len);
        (0..=max_start)
            .rev()
            .find(|&i| self.code_units[i..i + search_len] == search.code_units[..])
    }

    pub fn slice_utf16(&self, start: usize, end: usize) -> JsString {
        let s = start.min(self.code_units.len());
        let e = end.min(self.code_units.len());
        if s >= e {
            return JsString::empty();
        }
        JsString::from_units(self.code_units[s..e].to_vec())
    }

    /// Parses the string as an array index (a canonical uint32 below 2^32 - 1).
    pub fn as_array_index(&self) -> Option<u32> {
        let units = self.as_units();
        if units.is_empty() || units.len() > 10 {
            return None;
        }
        if units.len() > 1 && units[0] == u16::from(b'0') {
            return None;
        }
        let mut value: u64 = 0;
        for &u in units {
            if !(u16::from(b'0')..=u16::from(b'9')).contains(&u) {
                return None;
            }
            value = value * 10 + u64::from(u - u16::from(b'0'));
        }
        if value >= u64::from(u32::MAX) {
            return None;
        }
        Some(value as u32)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rust_string())
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_rust_string())
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString::from_str(s)
    }
}

impl JsValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsValue::Null)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_))
    }

    pub fn is_primitive(&self) -> bool {
        !self.is_object()
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            JsValue::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn string(s: &str) -> JsValue {
        JsValue::String(JsString::from_str(s))
    }

    // §11.4.3 typeof, minus the callable check which needs the object model
    pub fn type_name(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "object",
            JsValue::Boolean(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Object(_) => "object",
        }
    }
}

/// Primitives display as their ToString conversion; objects, which need the
/// interpreter for that, display as `[object]`.
impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => f.write_str("undefined"),
            JsValue::Null => f.write_str("null"),
            JsValue::Boolean(b) => write!(f, "{b}"),
            JsValue::Number(n) => f.write_str(&number_ops::to_string(*n)),
            JsValue::String(s) => write!(f, "{s}"),
            JsValue::Object(_) => f.write_str("[object]"),
        }
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<JsString> for JsValue {
    fn from(s: JsString) -> Self {
        JsValue::String(s)
    }
}

// §8.5 / §9.3 / §9.5-9.7 number operations
pub mod number_ops {
    const TWO_32: f64 = 4294967296.0;

    fn modulo_2_32(x: f64) -> f64 {
        let m = x.trunc() % TWO_32;
        if m < 0.0 { m + TWO_32 } else { m }
    }

    // §9.5 ToInt32
    pub fn to_int32(x: f64) -> i32 {
        if !x.is_finite() || x == 0.0 {
            return 0;
        }
        modulo_2_32(x) as u32 as i32
    }

    // §9.6 ToUint32
    pub fn to_uint32(x: f64) -> u32 {
        if !x.is_finite() || x == 0.0 {
            return 0;
        }
        modulo_2_32(x) as u32
    }

    // §9.7 ToUint16
    pub fn to_uint16(x: f64) -> u16 {
        if !x.is_finite() || x == 0.0 {
            return 0;
        }
        let m = x.trunc() % 65536.0;
        (if m < 0.0 { m + 65536.0 } else { m }) as u16
    }

    // §9.4 ToInteger
    pub fn to_integer(x: f64) -> f64 {
        if x.is_nan() {
            0.0
        } else if x.is_infinite() {
            x
        } else {
            x.trunc()
        }
    }

    pub fn left_shift(x: f64, y: f64) -> f64 {
        let shift = to_uint32(y) & 0x1F;
        f64::from(to_int32(x).wrapping_shl(shift))
    }

    pub fn signed_right_shift(x: f64, y: f64) -> f64 {
        let shift = to_uint32(y) & 0x1F;
        f64::from(to_int32(x).wrapping_shr(shift))
    }

    pub fn unsigned_right_shift(x: f64, y: f64) -> f64 {
        let shift = to_uint32(y) & 0x1F;
        f64::from(to_uint32(x).wrapping_shr(shift))
    }

    pub fn bitwise_and(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) & to_int32(y))
    }

    pub fn bitwise_xor(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) ^ to_int32(y))
    }

    pub fn bitwise_or(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) | to_int32(y))
    }

    pub fn bitwise_not(x: f64) -> f64 {
        f64::from(!to_int32(x))
    }

    // §9.8.1 ToString applied to the Number type
    pub fn to_string(x: f64) -> String {
        if x.is_nan() {
            return "NaN".to_string();
        }
        if x == 0.0 {
            return "0".to_string();
        }
        if x.is_infinite() {
            return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
        }
        let mut buf = ryu_js::Buffer::new();
        buf.format_finite(x).to_string()
    }

    /// Integer formatting in radix 2..=36; fractional values fall back to radix 10.
    pub fn to_string_radix(x: f64, radix: u32) -> String {
        if radix == 10 || !x.is_finite() || x.fract() != 0.0 || x.abs() >= 9007199254740992.0 {
            return to_string(x);
        }
        let negative = x < 0.0;
        let mut n = x.abs() as u64;
        if n == 0 {
            return "0".to_string();
        }
        let mut digits = Vec::new();
        while n > 0 {
            let d = (n % u64::from(radix)) as u32;
            digits.push(char::from_digit(d, radix).unwrap_or('?'));
            n /= u64::from(radix);
        }
        if negative {
            digits.push('-');
        }
        digits.iter().rev().collect()
    }

    pub fn is_str_whitespace(c: u16) -> bool {
        matches!(
            c,
            0x09 | 0x0A | 0x0B | 0x0C | 0x0D | 0x20 | 0xA0 | 0x2028 | 0x2029 | 0xFEFF
        ) || (c > 0x7F && char::from_u32(u32::from(c)).is_some_and(char::is_whitespace))
    }

    // §9.3.1 ToNumber applied to the String type
    pub fn from_string(units: &[u16]) -> f64 {
        let start = units.iter().position(|&c| !is_str_whitespace(c));
        let Some(start) = start else {
            return 0.0;
        };
        let end = units
            .iter()
            .rposition(|&c| !is_str_whitespace(c))
            .map_or(start, |e| e + 1);
        let Ok(s) = String::from_utf16(&units[start..end]) else {
            return f64::NAN;
        };
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return f64::NAN;
            }
            return hex
                .bytes()
                .fold(0.0, |acc, b| acc * 16.0 + f64::from((b as char).to_digit(16).unwrap_or(0)));
        }
        let (sign, body) = match s.as_bytes().first() {
            Some(b'-') => (-1.0, &s[1..]),
            Some(b'+') => (1.0, &s[1..]),
            _ => (1.0, s.as_str()),
        };
        if body == "Infinity" {
            return sign * f64::INFINITY;
        }
        if !is_decimal_literal(body) {
            return f64::NAN;
        }
        body.parse::<f64>().map_or(f64::NAN, |v| sign * v)
    }

    /// StrUnsignedDecimalLiteral without the Infinity case.
    pub fn is_decimal_literal(s: &str) -> bool {
        let b = s.as_bytes();
        let mut i = 0;
        let int_start = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        let mut digits = i - int_start;
        if i < b.len() && b[i] == b'.' {
            i += 1;
            let frac_start = i;
            while i < b.len() && b[i].is_ascii_digit() {
                i += 1;
            }
            digits += i - frac_start;
        }
        if digits == 0 {
            return false;
        }
        if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
            i += 1;
            if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
                i += 1;
            }
            let exp_start = i;
            while i < b.len() && b[i].is_ascii_digit() {
                i += 1;
            }
            if i == exp_start {
                return false;
            }
        }
        i == b.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn units(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    #[test]
    fn js_string_index_of() {
        let s = JsString::from_str("hello world");
        let search = JsString::from_str("world");
        assert_eq!(s.index_of(&search, 0), Some(6));
        assert_eq!(s.index_of(&search, 7), None);

        let empty = JsString::from_str("");
        assert_eq!(s.index_of(&empty, 5), Some(5));
    }

    #[test]
    fn js_string_last_index_of() {
        let s = JsString::from_str("abcabc");
        let search = JsString::from_str("abc");
        assert_eq!(s.last_index_of(&search, 5), Some(3));
        assert_eq!(s.last_index_of(&search, 2), Some(0));
    }

    #[test]
    fn array_index_parsing() {
        assert_eq!(JsString::from_str("0").as_array_index(), Some(0));
        assert_eq!(JsString::from_str("42").as_array_index(), Some(42));
        assert_eq!(JsString::from_str("042").as_array_index(), None);
        assert_eq!(JsString::from_str("4294967294").as_array_index(), Some(4294967294));
        assert_eq!(JsString::from_str("4294967295").as_array_index(), None);
        assert_eq!(JsString::from_str("-1").as_array_index(), None);
        assert_eq!(JsString::from_str("").as_array_index(), None);
    }

    #[test]
    fn number_special_values() {
        assert_eq!(number_ops::to_string(f64::NAN), "NaN");
        assert_eq!(number_ops::to_string(0.0), "0");
        assert_eq!(number_ops::to_string(-0.0), "0");
        assert_eq!(number_ops::to_string(f64::INFINITY), "Infinity");
        assert_eq!(number_ops::to_string(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(number_ops::to_string(1.5), "1.5");
        assert_eq!(number_ops::to_string(1e21), "1e+21");
    }

    #[test]
    fn int32_conversions_wrap_modulo_2_32() {
        assert_eq!(number_ops::to_int32(4294967296.0), 0);
        assert_eq!(number_ops::to_int32(-1.0), -1);
        assert_eq!(number_ops::to_uint32(-1.0), 4294967295);
        assert_eq!(number_ops::to_int32(2147483648.0), -2147483648);
        assert_eq!(number_ops::to_int32(1e20), 1661992960);
        assert_eq!(number_ops::to_int32(f64::NAN), 0);
        assert_eq!(number_ops::to_int32(-42.9), -42);
        assert_eq!(number_ops::to_uint16(65537.0), 1);
        assert_eq!(number_ops::to_uint16(-1.0), 65535);
    }

    #[test]
    fn shift_ops() {
        assert_eq!(number_ops::left_shift(1.0, 4.0), 16.0);
        assert_eq!(number_ops::left_shift(1.0, 33.0), 2.0);
        assert_eq!(number_ops::signed_right_shift(-16.0, 2.0), -4.0);
        assert_eq!(number_ops::unsigned_right_shift(-1.0, 0.0), 4294967295.0);
    }

    #[test]
    fn string_to_number() {
        assert_eq!(number_ops::from_string(&units("")), 0.0);
        assert_eq!(number_ops::from_string(&units("  \n ")), 0.0);
        assert_eq!(number_ops::from_string(&units(" 42 ")), 42.0);
        assert_eq!(number_ops::from_string(&units("0x1F")), 31.0);
        assert_eq!(number_ops::from_string(&units("-Infinity")), f64::NEG_INFINITY);
        assert_eq!(number_ops::from_string(&units(".5e1")), 5.0);
        assert!(number_ops::from_string(&units("12px")).is_nan());
        assert!(number_ops::from_string(&units("1e")).is_nan());
        assert!(number_ops::from_string(&units(".")).is_nan());
        assert!(number_ops::from_string(&units("-0x10")).is_nan());
    }

    #[test]
    fn radix_formatting() {
        assert_eq!(number_ops::to_string_radix(255.0, 16), "ff");
        assert_eq!(number_ops::to_string_radix(-8.0, 2), "-1000");
        assert_eq!(number_ops::to_string_radix(0.5, 2), "0.5");
    }

    proptest! {
        #[test]
        fn to_int32_agrees_with_to_uint32(x in any::<f64>()) {
            prop_assert_eq!(number_ops::to_int32(x) as u32, number_ops::to_uint32(x));
        }

        #[test]
        fn to_uint32_is_periodic(k in -1000i64..1000, n in any::<u32>()) {
            let x = f64::from(n) + (k as f64) * 4294967296.0;
            prop_assert_eq!(number_ops::to_uint32(x), n);
        }

        #[test]
        fn to_int32_is_identity_on_int32(n in any::<i32>()) {
            prop_assert_eq!(number_ops::to_int32(f64::from(n)), n);
        }
    }
}
