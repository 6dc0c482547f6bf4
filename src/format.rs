//! Runtime printf-style formatting for log templates.
//!
//! Log call sites pass a template and an ordered slice of loosely typed
//! [`Value`]s. The template vocabulary (widths, precision, verbose forms) is
//! only known at runtime, so it cannot go through `format!`. Formatting never
//! fails: argument mismatches are written into the output as markers such as
//! `%!d(MISSING)` or `%!(EXTRA int=5)`.
use rusqlite::types::{Value as SqlValue, ValueRef};
use std::fmt::{self, Write};
use std::iter::Peekable;
use std::str::Chars;

/// A loosely typed argument to a log template or a query.
#[derive(Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Short type name used in mismatch markers.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Text(_) => "string",
            Value::Bytes(_) => "bytes",
        }
    }
}

/// Plain form, used by `%v`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::UInt(u) => write!(f, "{}", u),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
            Value::Bytes(b) => write!(f, "<BLOB: {} bytes>", b.len()),
        }
    }
}

/// Verbose form, used by `%#v` and by the query report's argument line.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Bytes(b) => write!(f, "X'{}'", hex(b, true)),
            other => fmt::Display::fmt(other, f),
        }
    }
}

macro_rules! value_from {
    ($variant:ident, $target:ty, $($t:ty),+) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$variant(v as $target)
            }
        })+
    };
}

value_from!(Int, i64, i8, i16, i32, i64, isize);
value_from!(UInt, u64, u8, u16, u32, u64, usize);
value_from!(Float, f64, f32, f64);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<SqlValue> for Value {
    fn from(v: SqlValue) -> Self {
        match v {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(i) => Value::Int(i),
            SqlValue::Real(f) => Value::Float(f),
            SqlValue::Text(t) => Value::Text(t),
            SqlValue::Blob(b) => Value::Bytes(b),
        }
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Int(i),
            ValueRef::Real(f) => Value::Float(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
        }
    }
}

/// Builds a `Vec<Value>` from heterogeneous expressions.
///
/// ```
/// let args = querylog::args![5, "users", None::<i64>];
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    () => { ::std::vec::Vec::<$crate::format::Value>::new() };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::format::Value::from($arg)),+]
    };
}

#[derive(Debug, Default)]
struct Directive {
    minus: bool,
    plus: bool,
    sharp: bool,
    zero: bool,
    space: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

/// Largest width or precision a directive may ask for.
const MAX_FIELD: usize = u16::MAX as usize;

/// Substitutes `args` into `template`.
///
/// Supported verbs: `%v %d %s %q %f %F %e %g %x %X %o %b %t` and `%%`, with the
/// flags `- + # 0` and space, a width, and a `.precision`.
pub fn sprintf(template: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(template.len() + 16 * args.len());
    let mut chars = template.chars().peekable();
    let mut next_arg = 0;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut directive = Directive::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => directive.minus = true,
                '+' => directive.plus = true,
                '#' => directive.sharp = true,
                '0' => directive.zero = true,
                ' ' => directive.space = true,
                _ => break,
            }
            chars.next();
        }
        let mut bad_width = false;
        match read_number(&mut chars) {
            Some(width) if width > MAX_FIELD => bad_width = true,
            width => directive.width = width,
        }
        let mut bad_precision = false;
        if chars.peek() == Some(&'.') {
            chars.next();
            match read_number(&mut chars).unwrap_or(0) {
                precision if precision > MAX_FIELD => bad_precision = true,
                precision => directive.precision = Some(precision),
            }
        }

        let Some(verb) = chars.next() else {
            out.push_str("%!(NOVERB)");
            break;
        };
        if verb == '%' {
            out.push('%');
            continue;
        }
        if bad_width {
            out.push_str("%!(BADWIDTH)");
        }
        if bad_precision {
            out.push_str("%!(BADPREC)");
        }

        match args.get(next_arg) {
            Some(arg) => {
                next_arg += 1;
                write_arg(&mut out, verb, &directive, arg);
            }
            None => {
                let _ = write!(out, "%!{}(MISSING)", verb);
            }
        }
    }

    if next_arg < args.len() {
        out.push_str("%!(EXTRA ");
        for (i, arg) in args[next_arg..].iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{}={}", arg.type_name(), arg);
        }
        out.push(')');
    }

    out
}

fn read_number(chars: &mut Peekable<Chars<'_>>) -> Option<usize> {
    let mut number: Option<usize> = None;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        number = Some(number.unwrap_or(0).saturating_mul(10).saturating_add(digit as usize));
        chars.next();
    }
    number
}

/// Renders one directive. Numbers come back as (sign, digits) so zero padding
/// can be inserted between them.
fn write_arg(out: &mut String, verb: char, directive: &Directive, arg: &Value) {
    let rendered: Option<(&'static str, String)> = match (verb, arg) {
        ('v', Value::Float(x)) if directive.precision.is_some() && !directive.sharp => {
            Some(float_parts(*x, 'f', directive))
        }
        ('v', Value::Float(x)) if !directive.sharp => Some(float_parts(*x, 'v', directive)),
        ('v', Value::Int(i)) if !directive.sharp => Some(signed_parts(*i as i128, directive)),
        ('v', Value::Text(s)) if !directive.sharp => Some(("", truncate(s, directive.precision))),
        ('v', v) if directive.sharp => Some(("", format!("{:?}", v))),
        ('v', v) => Some(("", v.to_string())),
        ('d', Value::Int(i)) => Some(signed_parts(*i as i128, directive)),
        ('d', Value::UInt(u)) => Some(signed_parts(*u as i128, directive)),
        ('s', Value::Text(s)) => Some(("", truncate(s, directive.precision))),
        ('s', Value::Bytes(b)) => {
            let text = String::from_utf8_lossy(b);
            Some(("", truncate(&text, directive.precision)))
        }
        ('q', Value::Text(s)) => Some(("", format!("{:?}", s))),
        ('f' | 'F' | 'e' | 'E' | 'g' | 'G', Value::Float(x)) => {
            Some(float_parts(*x, verb, directive))
        }
        ('x' | 'X' | 'o' | 'b', Value::Int(i)) => Some(radix_parts(*i as i128, verb, directive)),
        ('x' | 'X' | 'o' | 'b', Value::UInt(u)) => Some(radix_parts(*u as i128, verb, directive)),
        ('x' | 'X', Value::Text(s)) => Some(("", hex(s.as_bytes(), verb == 'X'))),
        ('x' | 'X', Value::Bytes(b)) => Some(("", hex(b, verb == 'X'))),
        ('t', Value::Bool(b)) => Some(("", b.to_string())),
        _ => None,
    };

    let Some((sign, body)) = rendered else {
        let _ = write!(out, "%!{}({}={})", verb, arg.type_name(), arg);
        return;
    };

    let len = sign.chars().count() + body.chars().count();
    let pad = directive.width.unwrap_or(0).saturating_sub(len);
    if directive.minus {
        out.push_str(sign);
        out.push_str(&body);
        out.extend(std::iter::repeat(' ').take(pad));
    } else if directive.zero {
        out.push_str(sign);
        out.extend(std::iter::repeat('0').take(pad));
        out.push_str(&body);
    } else {
        out.extend(std::iter::repeat(' ').take(pad));
        out.push_str(sign);
        out.push_str(&body);
    }
}

fn sign_of(negative: bool, directive: &Directive) -> &'static str {
    if negative {
        "-"
    } else if directive.plus {
        "+"
    } else if directive.space {
        " "
    } else {
        ""
    }
}

fn signed_parts(n: i128, directive: &Directive) -> (&'static str, String) {
    (sign_of(n < 0, directive), n.unsigned_abs().to_string())
}

fn radix_parts(n: i128, verb: char, directive: &Directive) -> (&'static str, String) {
    let magnitude = n.unsigned_abs();
    let (prefix, digits) = match verb {
        'x' => ("0x", format!("{:x}", magnitude)),
        'X' => ("0X", format!("{:X}", magnitude)),
        'o' => ("0", format!("{:o}", magnitude)),
        _ => ("0b", format!("{:b}", magnitude)),
    };
    let body = if directive.sharp {
        format!("{}{}", prefix, digits)
    } else {
        digits
    };
    (sign_of(n < 0, directive), body)
}

fn float_parts(x: f64, verb: char, directive: &Directive) -> (&'static str, String) {
    let sign = sign_of(x.is_sign_negative() && x != 0.0, directive);
    let magnitude = x.abs();
    let body = match verb {
        'e' | 'E' => {
            let rendered = exponent(magnitude, directive.precision.unwrap_or(6));
            if verb == 'E' {
                rendered.to_uppercase()
            } else {
                rendered
            }
        }
        'v' => magnitude.to_string(),
        'g' | 'G' => match directive.precision {
            Some(p) => format!("{:.*}", p, magnitude),
            None => magnitude.to_string(),
        },
        _ => format!("{:.*}", directive.precision.unwrap_or(6), magnitude),
    };
    (sign, body)
}

/// `1.5e0` in Rust notation becomes `1.500000e+00`.
fn exponent(x: f64, precision: usize) -> String {
    let rendered = format!("{:.*e}", precision, x);
    match rendered.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => rendered,
    }
}

fn truncate(s: &str, precision: Option<usize>) -> String {
    match precision {
        Some(p) => s.chars().take(p).collect(),
        None => s.to_string(),
    }
}

fn hex(bytes: &[u8], upper: bool) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut acc, b| {
        let _ = if upper {
            write!(acc, "{:02X}", b)
        } else {
            write!(acc, "{:02x}", b)
        };
        acc
    })
}
