//! Dynamic CSV headers
//!
//! A header template mixes literal text with printf-style directives
//! (`"Element [%s] %d"`). Each directive takes the argument at its own
//! position; directives without an argument render as empty text. The
//! rendered header is tidied up (single spaces, trimmed, no padding inside
//! brackets, `%%` unescaped) and memoized per key.

use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// One positional header argument
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HeaderArg {
    Int(i64),
    Str(String),
}

impl fmt::Display for HeaderArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderArg::Int(n) => write!(f, "{}", n),
            HeaderArg::Str(s) => f.write_str(s),
        }
    }
}

macro_rules! int_arg {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for HeaderArg {
                fn from(value: $ty) -> Self {
                    HeaderArg::Int(value as i64)
                }
            }

            impl From<$ty> for HeaderKey {
                fn from(value: $ty) -> Self {
                    HeaderKey(vec![HeaderArg::from(value)])
                }
            }
        )*
    };
}

int_arg!(i8, u8, i16, u16, i32, u32, i64, usize);

impl From<&str> for HeaderArg {
    fn from(value: &str) -> Self {
        HeaderArg::Str(value.to_string())
    }
}

impl From<String> for HeaderArg {
    fn from(value: String) -> Self {
        HeaderArg::Str(value)
    }
}

/// Lookup key: a scalar or a list of scalars, flattened into arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct HeaderKey(pub Vec<HeaderArg>);

impl From<&str> for HeaderKey {
    fn from(value: &str) -> Self {
        HeaderKey(vec![value.into()])
    }
}

impl From<String> for HeaderKey {
    fn from(value: String) -> Self {
        HeaderKey(vec![value.into()])
    }
}

impl From<HeaderArg> for HeaderKey {
    fn from(value: HeaderArg) -> Self {
        HeaderKey(vec![value])
    }
}

impl From<Vec<HeaderArg>> for HeaderKey {
    fn from(value: Vec<HeaderArg>) -> Self {
        HeaderKey(value)
    }
}

impl<const N: usize> From<[HeaderArg; N]> for HeaderKey {
    fn from(value: [HeaderArg; N]) -> Self {
        HeaderKey(value.to_vec())
    }
}

/// Memoizing header builder for one template
#[derive(Debug)]
pub struct DynamicHeader {
    format: String,
    cache: Mutex<HashMap<HeaderKey, Arc<str>>>,
    renders: AtomicUsize,
}

impl DynamicHeader {
    pub fn new(format: impl Into<String>) -> Self {
        DynamicHeader {
            format: format.into(),
            cache: Mutex::new(HashMap::new()),
            renders: AtomicUsize::new(0),
        }
    }

    /// Process-wide header for a static template, so every schema that
    /// names the template shares one memo
    pub fn shared(format: &'static str) -> Arc<DynamicHeader> {
        static SHARED: OnceLock<Mutex<HashMap<&'static str, Arc<DynamicHeader>>>> = OnceLock::new();

        let mut shared = SHARED.get_or_init(|| Mutex::new(HashMap::new())).lock();
        Arc::clone(
            shared
                .entry(format)
                .or_insert_with(|| Arc::new(DynamicHeader::new(format))),
        )
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Header for `key`, rendered once per distinct key
    pub fn get(&self, key: impl Into<HeaderKey>) -> Arc<str> {
        let key = key.into();
        let mut cache = self.cache.lock();
        if let Some(header) = cache.get(&key) {
            return Arc::clone(header);
        }

        self.renders.fetch_add(1, Ordering::Relaxed);
        let header: Arc<str> = Arc::from(render(&self.format, &key.0));
        cache.insert(key, Arc::clone(&header));
        header
    }

    /// How many times the template has been substituted
    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::Relaxed)
    }
}

/// Substitute and tidy a template without memoization
pub fn render(format: &str, args: &[HeaderArg]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut index = 0;
    let mut rest = format;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if rest.starts_with("%%") {
            out.push_str("%%");
            rest = &rest[2..];
            continue;
        }

        match Directive::parse(rest) {
            Some((directive, len)) => {
                if let Some(arg) = args.get(index) {
                    out.push_str(&directive.apply(arg));
                }
                index += 1;
                rest = &rest[len..];
            }
            None => {
                out.push('%');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);

    tidy(&out)
}

fn tidy(text: &str) -> String {
    static SPACES: OnceLock<Regex> = OnceLock::new();
    static OPEN: OnceLock<Regex> = OnceLock::new();
    static CLOSE: OnceLock<Regex> = OnceLock::new();

    let spaces = SPACES.get_or_init(|| Regex::new(" +").expect("static regex"));
    let open = OPEN.get_or_init(|| Regex::new(r"\[ +").expect("static regex"));
    let close = CLOSE.get_or_init(|| Regex::new(r" +\]").expect("static regex"));

    let text = spaces.replace_all(text, " ");
    let text = text.trim();
    let text = open.replace(text, "[");
    let text = close.replace(&text, "]");
    text.replacen("%%", "%", 1)
}

/// A parsed printf conversion
#[derive(Debug, Clone, Copy, Default)]
struct Directive {
    flag: Option<char>,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: char,
}

impl Directive {
    const FLAGS: &'static str = "-+0 #";
    const CONVERSIONS: &'static str = "AacdEeFfGginopsuXx";

    /// Parse a directive at the start of `text`, returning it with its length
    fn parse(text: &str) -> Option<(Self, usize)> {
        let bytes = text.as_bytes();
        let mut pos = 1;
        let mut directive = Directive::default();

        if let Some(&b) = bytes.get(pos) {
            if Self::FLAGS.as_bytes().contains(&b) {
                directive.flag = Some(b as char);
                pos += 1;
            }
        }

        if bytes.get(pos) == Some(&b'*') {
            pos += 1;
        } else {
            let start = pos;
            while bytes.get(pos).is_some_and(u8::is_ascii_digit) {
                pos += 1;
            }
            if pos > start {
                directive.width = text[start..pos].parse().ok();
            }
        }

        if bytes.get(pos) == Some(&b'.') {
            if bytes.get(pos + 1) == Some(&b'*') {
                pos += 2;
            } else {
                let start = pos + 1;
                let mut end = start;
                while bytes.get(end).is_some_and(u8::is_ascii_digit) {
                    end += 1;
                }
                if end == start {
                    return None;
                }
                directive.precision = text[start..end].parse().ok();
                pos = end;
            }
        }

        for length in ["hh", "ll", "h", "l", "j", "L", "t", "z"] {
            if text[pos..].starts_with(length) {
                pos += length.len();
                break;
            }
        }

        let conversion = *bytes.get(pos)? as char;
        if !Self::CONVERSIONS.contains(conversion) {
            return None;
        }
        directive.conversion = conversion;

        Some((directive, pos + 1))
    }

    fn apply(&self, arg: &HeaderArg) -> String {
        let int = || match arg {
            HeaderArg::Int(n) => Some(*n),
            HeaderArg::Str(s) => s.trim().parse::<i64>().ok(),
        };

        let (sign, body) = match self.conversion {
            'd' | 'i' | 'u' => match int() {
                Some(n) => (self.sign(n < 0), n.unsigned_abs().to_string()),
                None => return self.pad(String::new(), arg.to_string(), false),
            },
            'x' | 'X' | 'o' => match int() {
                Some(n) => {
                    let digits = match self.conversion {
                        'x' => format!("{:x}", n.unsigned_abs()),
                        'X' => format!("{:X}", n.unsigned_abs()),
                        _ => format!("{:o}", n.unsigned_abs()),
                    };
                    let prefix = match (self.flag, self.conversion) {
                        (Some('#'), 'x') => "0x",
                        (Some('#'), 'X') => "0X",
                        (Some('#'), _) => "0",
                        _ => "",
                    };
                    let sign = format!("{}{}", self.sign(n < 0), prefix);
                    let digits = match self.precision {
                        Some(p) if digits.len() < p => format!("{:0>p$}", digits, p = p),
                        _ => digits,
                    };
                    (sign, digits)
                }
                None => return self.pad(String::new(), arg.to_string(), false),
            },
            'c' => {
                let c = match arg {
                    HeaderArg::Int(n) => char::from_u32(*n as u32).map(String::from),
                    HeaderArg::Str(s) => s.chars().next().map(String::from),
                };
                return self.pad(String::new(), c.unwrap_or_default(), false);
            }
            'f' | 'F' | 'e' | 'E' | 'g' | 'G' | 'a' | 'A' => {
                let value = match arg {
                    HeaderArg::Int(n) => *n as f64,
                    HeaderArg::Str(s) => s.trim().parse::<f64>().unwrap_or(0.0),
                };
                let precision = self.precision.unwrap_or(6);
                let body = match self.conversion {
                    'f' | 'F' => format!("{:.*}", precision, value.abs()),
                    'e' | 'a' => exponent(value.abs(), precision, false),
                    'E' | 'A' => exponent(value.abs(), precision, true),
                    _ => general(value.abs(), precision, self.conversion == 'G'),
                };
                (self.sign(value.is_sign_negative() && value != 0.0), body)
            }
            'n' => return String::new(),
            _ => {
                let mut text = arg.to_string();
                if let Some(p) = self.precision {
                    text = text.chars().take(p).collect();
                }
                return self.pad(String::new(), text, false);
            }
        };

        self.pad(sign, body, true)
    }

    fn sign(&self, negative: bool) -> String {
        match (negative, self.flag) {
            (true, _) => "-".to_string(),
            (false, Some('+')) => "+".to_string(),
            (false, Some(' ')) => " ".to_string(),
            _ => String::new(),
        }
    }

    fn pad(&self, sign: String, body: String, numeric: bool) -> String {
        let len = sign.chars().count() + body.chars().count();
        let width = self.width.unwrap_or(0);
        if len >= width {
            return sign + &body;
        }

        let fill = width - len;
        match self.flag {
            Some('-') => format!("{}{}{}", sign, body, " ".repeat(fill)),
            Some('0') if numeric => format!("{}{}{}", sign, "0".repeat(fill), body),
            _ => format!("{}{}{}", " ".repeat(fill), sign, body),
        }
    }
}

/// C-style `%e`: mantissa, `e`, signed exponent with at least two digits
fn exponent(value: f64, precision: usize, upper: bool) -> String {
    let text = format!("{:.*e}", precision, value);
    let (mantissa, exp) = text.split_once('e').unwrap_or((&text, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    let e = if upper { 'E' } else { 'e' };
    format!("{}{}{}{:02}", mantissa, e, sign, exp.abs())
}

/// C-style `%g`: shortest of `%e` and `%f` without trailing zeros
fn general(value: f64, precision: usize, upper: bool) -> String {
    let precision = precision.max(1);
    if value == 0.0 {
        return "0".to_string();
    }

    let exp = value.log10().floor() as i32;
    if exp < -4 || exp >= precision as i32 {
        let text = exponent(value, precision - 1, upper);
        let (mantissa, rest) = text.split_at(text.find(['e', 'E']).unwrap_or(text.len()));
        format!("{}{}", strip_zeros(mantissa), rest)
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        strip_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn strip_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[HeaderArg]) -> Vec<HeaderArg> {
        values.to_vec()
    }

    #[test]
    fn test_positional_substitution() {
        let header = DynamicHeader::new("Element [%s] %d");
        assert_eq!(
            &*header.get([HeaderArg::from("Fire"), HeaderArg::from(3)]),
            "Element [Fire] 3"
        );
    }

    #[test]
    fn test_missing_argument_renders_empty() {
        assert_eq!(render("Item [%d] %s", &args(&[HeaderArg::Int(2)])), "Item [2]");
        assert_eq!(render("Item [%d]", &[]), "Item []");
        assert_eq!(render("  Name   %s  ", &[]), "Name");
    }

    #[test]
    fn test_bracket_padding_and_percent() {
        assert_eq!(render("Rate [ %d%% ]", &args(&[HeaderArg::Int(50)])), "Rate [50%]");
        assert_eq!(render("100%% Hit", &[]), "100% Hit");
    }

    #[test]
    fn test_format_flags() {
        assert_eq!(render("%03d", &args(&[HeaderArg::Int(7)])), "007");
        assert_eq!(render("%#x", &args(&[HeaderArg::Int(255)])), "0xff");
        assert_eq!(render("%02X", &args(&[HeaderArg::Int(10)])), "0A");
        assert_eq!(render("[%-4s]", &args(&[HeaderArg::from("ab")])), "[ab]");
        assert_eq!(render("%+d", &args(&[HeaderArg::Int(4)])), "+4");
        assert_eq!(render("%.2f", &args(&[HeaderArg::Int(1)])), "1.00");
        assert_eq!(render("%.3s", &args(&[HeaderArg::from("Weapon")])), "Wea");
        assert_eq!(render("%e", &args(&[HeaderArg::Int(150)])), "1.500000e+02");
        assert_eq!(render("%g", &args(&[HeaderArg::Int(150)])), "150");
    }

    #[test]
    fn test_unknown_directive_is_literal() {
        assert_eq!(render("50%w", &[]), "50%w");
    }

    #[test]
    fn test_memoization() {
        let header = DynamicHeader::new("Weapon %d");
        let first = header.get(1);
        let second = header.get(1);

        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(header.renders(), 1);

        let other = header.get(2);
        assert_eq!(&*other, "Weapon 2");
        assert_eq!(header.renders(), 2);

        let list = header.get(vec![HeaderArg::Int(1)]);
        assert!(Arc::ptr_eq(&first, &list));
        assert_eq!(header.renders(), 2);
    }

    #[test]
    fn test_shared_template() {
        let a = DynamicHeader::shared("Shared Slot %d");
        let b = DynamicHeader::shared("Shared Slot %d");
        assert!(Arc::ptr_eq(&a, &b));

        a.get(4);
        b.get(4);
        assert_eq!(b.renders(), 1);
    }
}
