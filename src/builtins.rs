//! Native functions seeded into the global scope before any user code runs.

use std::fs;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use log::{debug, info};
use regex::{Captures, Regex};

use crate::array::LoxArray;
use crate::callable::{NativeFn, NativeFunction};
use crate::environment::Env;
use crate::value::Value;

type NativeResult = std::result::Result<Value, String>;

const BUILTINS: &[(&str, usize, NativeFn)] = &[
    ("abs", 1, abs),
    ("array", 1, array),
    ("ceil", 1, ceil),
    ("clock", 0, clock),
    ("divmod", 2, divmod),
    ("floor", 1, floor),
    ("input", 1, input),
    ("len", 1, len),
    ("max", 2, max),
    ("mean", 1, mean),
    ("median", 1, median),
    ("min", 2, min),
    ("mode", 1, mode),
    ("ord", 1, ord),
    ("re_findall", 2, re_findall),
    ("re_match", 2, re_match),
    ("re_search", 2, re_search),
    ("re_sub", 3, re_sub),
    ("read_text", 1, read_text),
    ("std", 1, stdev),
    ("str2num", 1, str2num),
    ("string_array", 1, string_array),
];

/// Define every builtin in `globals`.
pub fn load_builtins(globals: &Env) {
    let mut scope = globals.borrow_mut();

    for &(name, arity, func) in BUILTINS {
        debug!("Defining builtin '{}'", name);

        scope.define(name, Value::Native(Rc::new(NativeFunction { name, arity, func })));
    }

    info!("Loaded {} builtins", BUILTINS.len());
}

fn expected_number(value: &Value) -> String {
    format!("Expected a number but got {}.", value.type_name())
}

/// Seconds since the Unix epoch.
fn clock(_args: &[Value]) -> NativeResult {
    let micros: i64 = chrono::Utc::now().timestamp_micros();

    Ok(Value::Float(micros as f64 / 1_000_000.0))
}

fn abs(args: &[Value]) -> NativeResult {
    match &args[0] {
        Value::Int(n) => Ok(n
            .checked_abs()
            .map_or(Value::Float((*n as f64).abs()), Value::Int)),
        Value::Float(n) => Ok(Value::Float(n.abs())),
        other => Err(expected_number(other)),
    }
}

/// Whole floats come back as integers when they fit.
fn rounded(n: f64) -> Value {
    if n.is_finite() && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Value::Int(n as i64)
    } else {
        Value::Float(n)
    }
}

fn ceil(args: &[Value]) -> NativeResult {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(n) => Ok(rounded(n.ceil())),
        other => Err(expected_number(other)),
    }
}

fn floor(args: &[Value]) -> NativeResult {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(n) => Ok(rounded(n.floor())),
        other => Err(expected_number(other)),
    }
}

fn len(args: &[Value]) -> NativeResult {
    match &args[0] {
        Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
        Value::Array(array) => Ok(Value::Int(array.len() as i64)),
        other => Err(format!(
            "Object of type '{}' has no length.",
            other.type_name()
        )),
    }
}

/// Pick between two numbers; `first_wins` decides ties and ordering.
fn pick(args: &[Value], first_wins: fn(f64, f64) -> bool) -> NativeResult {
    let (a, b) = (&args[0], &args[1]);

    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => Ok(if first_wins(x, y) { a.clone() } else { b.clone() }),
        (None, _) => Err(expected_number(a)),
        (_, None) => Err(expected_number(b)),
    }
}

fn max(args: &[Value]) -> NativeResult {
    pick(args, |x, y| x >= y)
}

fn min(args: &[Value]) -> NativeResult {
    pick(args, |x, y| x <= y)
}

fn ord(args: &[Value]) -> NativeResult {
    let Value::Str(s) = &args[0] else {
        return Err(format!(
            "ord() expected a string of length 1, but {} found.",
            args[0].type_name()
        ));
    };

    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Value::Int(c as i64)),
        _ => Err(format!(
            "ord() expected a character, but string of length {} found.",
            s.chars().count()
        )),
    }
}

fn read_text(args: &[Value]) -> NativeResult {
    let Value::Str(path) = &args[0] else {
        return Err(format!(
            "Expected a file path but got {}.",
            args[0].type_name()
        ));
    };

    fs::read_to_string(path).map(Value::Str).map_err(|e| format!("Could not read '{}': {}", path, e))
}

fn expected_string(value: &Value) -> String {
    format!("Expected a string but got {}.", value.type_name())
}

fn string_arg(value: &Value) -> std::result::Result<&str, String> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(expected_string(other)),
    }
}

fn array_of(values: impl IntoIterator<Item = Value>) -> Value {
    Value::Array(Rc::new(LoxArray::from_values(values)))
}

// ───────────────────────────── arrays ───────────────────────────────────────

/// An array of `n` nils.
fn array(args: &[Value]) -> NativeResult {
    match &args[0] {
        Value::Int(n) => Ok(Value::Array(Rc::new(LoxArray::with_size((*n).max(0) as usize)))),
        other => Err(format!("Expected an integer size but got {}.", other.type_name())),
    }
}

/// One single-character string per character.
fn string_array(args: &[Value]) -> NativeResult {
    let s = string_arg(&args[0])?;

    Ok(array_of(s.chars().map(|c| Value::Str(c.to_string()))))
}

// ───────────────────────────── numbers ──────────────────────────────────────

/// Floor quotient and remainder, as a two-element array.
fn divmod(args: &[Value]) -> NativeResult {
    let (a, b) = (&args[0], &args[1]);

    let pair = match (a, b) {
        (Value::Int(x), Value::Int(y)) if *y != 0 => match floor_divmod(*x, *y) {
            Some((q, r)) => [Value::Int(q), Value::Int(r)],
            None => float_divmod(*x as f64, *y as f64),
        },
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => float_divmod(x, y),
            (None, _) => return Err(expected_number(a)),
            (_, None) => return Err(expected_number(b)),
        },
    };

    Ok(array_of(pair))
}

fn floor_divmod(a: i64, b: i64) -> Option<(i64, i64)> {
    let q = a.checked_div(b)?;
    let r = a.checked_rem(b)?;

    if r != 0 && ((r < 0) != (b < 0)) {
        Some((q - 1, r + b))
    } else {
        Some((q, r))
    }
}

/// Division by zero gives `nan` for both parts, like `\` and `%` do.
fn float_divmod(a: f64, b: f64) -> [Value; 2] {
    if b == 0.0 {
        return [Value::Float(f64::NAN), Value::Float(f64::NAN)];
    }

    let q = (a / b).floor();
    [Value::Float(q), Value::Float(a - q * b)]
}

/// The numbers held by an array argument.
fn numbers(value: &Value) -> std::result::Result<Vec<Value>, String> {
    let Value::Array(array) = value else {
        return Err(format!("Expected an array but got {}.", value.type_name()));
    };

    let values = array.values();
    match values.iter().find(|v| !v.is_number()) {
        Some(bad) => Err(expected_number(bad)),
        None => Ok(values),
    }
}

fn sum_as_f64(values: &[Value]) -> f64 {
    values.iter().filter_map(Value::as_f64).sum()
}

/// Arithmetic mean.  An all-integer array with a whole mean gives an integer.
fn mean(args: &[Value]) -> NativeResult {
    let values = numbers(&args[0])?;
    if values.is_empty() {
        return Err("mean requires at least one data point.".to_string());
    }

    let ints: Option<Vec<i64>> = values
        .iter()
        .map(|v| match v {
            Value::Int(n) => Some(*n),
            _ => None,
        })
        .collect();

    if let Some(ints) = ints {
        let total: Option<i64> = ints.iter().try_fold(0i64, |acc, n| acc.checked_add(*n));
        if let Some(total) = total {
            let count = ints.len() as i64;
            if total % count == 0 {
                return Ok(Value::Int(total / count));
            }
        }
    }

    Ok(Value::Float(sum_as_f64(&values) / values.len() as f64))
}

/// Middle value; an even count averages the two middle values.
fn median(args: &[Value]) -> NativeResult {
    let mut values = numbers(&args[0])?;
    if values.is_empty() {
        return Err("no median for empty data.".to_string());
    }

    values.sort_by(|a, b| {
        let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
        x.total_cmp(&y)
    });

    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        return Ok(values[mid].clone());
    }

    let pair = sum_as_f64(&values[mid - 1..=mid]);
    Ok(Value::Float(pair / 2.0))
}

/// Most common value; ties go to the one seen first.
fn mode(args: &[Value]) -> NativeResult {
    let Value::Array(array) = &args[0] else {
        return Err(format!("Expected an array but got {}.", args[0].type_name()));
    };

    let values = array.values();
    let mut counts: Vec<(&Value, usize)> = Vec::new();
    for value in &values {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(&Value, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, most)| count > most) {
            best = Some((value, count));
        }
    }

    best.map(|(value, _)| value.clone())
        .ok_or_else(|| "no mode for empty data.".to_string())
}

/// Sample standard deviation.
fn stdev(args: &[Value]) -> NativeResult {
    let values = numbers(&args[0])?;
    if values.len() < 2 {
        return Err("std requires at least two data points.".to_string());
    }

    let n = values.len() as f64;
    let mean = sum_as_f64(&values) / n;
    let squares: f64 = values
        .iter()
        .filter_map(Value::as_f64)
        .map(|x| (x - mean) * (x - mean))
        .sum();

    Ok(Value::Float((squares / (n - 1.0)).sqrt()))
}

// ───────────────────────────── strings ──────────────────────────────────────

/// An integer if the text is one, else a float.
fn str2num(args: &[Value]) -> NativeResult {
    let text = string_arg(&args[0])?;
    let trimmed = text.trim();

    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(Value::Int(n));
    }

    trimmed
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| format!("Cannot convert '{}' to an integer or float.", text))
}

/// Write the prompt, then read one line from stdin without its newline.
fn input(args: &[Value]) -> NativeResult {
    let prompt = string_arg(&args[0])?;

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(prompt.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|e| e.to_string())?;

    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| e.to_string())?;
    if read == 0 {
        return Err("EOF when reading a line.".to_string());
    }

    let trimmed_len = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed_len);

    Ok(Value::Str(line))
}

// ───────────────────────────── regular expressions ──────────────────────────

fn compile(pattern: &Value) -> std::result::Result<Regex, String> {
    let pattern = string_arg(pattern)?;

    Regex::new(pattern).map_err(|e| format!("Invalid regular expression: {}", e))
}

fn group_text(captures: &Captures<'_>, i: usize) -> Value {
    captures
        .get(i)
        .map_or(Value::Nil, |m| Value::Str(m.as_str().to_string()))
}

/// The whole match followed by each group, or an empty array.
fn match_array(captures: Option<Captures<'_>>) -> Value {
    match captures {
        Some(captures) => array_of((0..captures.len()).map(|i| group_text(&captures, i))),
        None => array_of([]),
    }
}

/// Every non-overlapping match.  With no groups each element is the whole
/// match, with one group it is that group, and with more it is an array of
/// the groups.
fn re_findall(args: &[Value]) -> NativeResult {
    let regex = compile(&args[0])?;
    let text = string_arg(&args[1])?;
    let groups = regex.captures_len() - 1;

    let empty_if_missing = |captures: &Captures<'_>, i: usize| match group_text(captures, i) {
        Value::Nil => Value::Str(String::new()),
        found => found,
    };

    let found = regex.captures_iter(text).map(|captures| match groups {
        0 => empty_if_missing(&captures, 0),
        1 => empty_if_missing(&captures, 1),
        _ => array_of((1..=groups).map(|i| empty_if_missing(&captures, i))),
    });

    Ok(array_of(found.collect::<Vec<_>>()))
}

/// A match that starts at the beginning of the text.
fn re_match(args: &[Value]) -> NativeResult {
    let regex = compile(&args[0])?;
    let text = string_arg(&args[1])?;

    let captures = regex
        .captures(text)
        .filter(|c| c.get(0).is_some_and(|m| m.start() == 0));

    Ok(match_array(captures))
}

/// The first match anywhere in the text.
fn re_search(args: &[Value]) -> NativeResult {
    let regex = compile(&args[0])?;
    let text = string_arg(&args[1])?;

    Ok(match_array(regex.captures(text)))
}

/// Replace every match.  Group references are written `\1`.
fn re_sub(args: &[Value]) -> NativeResult {
    let regex = compile(&args[0])?;
    let replacement = group_references(string_arg(&args[1])?);
    let text = string_arg(&args[2])?;

    Ok(Value::Str(regex.replace_all(text, replacement.as_str()).into_owned()))
}

/// Rewrite `\N` group references into `${N}` and escape literal `$`.
fn group_references(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' => out.push_str("$$"),
            '\\' if chars.peek().is_some_and(char::is_ascii_digit) => {
                out.push_str("${");
                while let Some(digit) = chars.next_if(char::is_ascii_digit) {
                    out.push(digit);
                }
                out.push('}');
            }
            '\\' if chars.peek() == Some(&'\\') => {
                chars.next();
                out.push('\\');
            }
            c => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ints(values: &[i64]) -> Value {
        array_of(values.iter().copied().map(Value::Int))
    }

    #[test]
    fn divmod_floors_toward_negative_infinity() {
        assert_eq!(floor_divmod(13, 7), Some((1, 6)));
        assert_eq!(floor_divmod(-13, 7), Some((-2, 1)));
        assert_eq!(floor_divmod(13, -7), Some((-2, -1)));
        assert_eq!(floor_divmod(i64::MIN, -1), None);
    }

    #[test]
    fn mean_stays_integral_only_when_whole() {
        assert_eq!(mean(&[ints(&[1, 2, 2, 3])]), Ok(Value::Int(2)));
        assert_eq!(mean(&[ints(&[1, 2])]), Ok(Value::Float(1.5)));
        assert!(mean(&[ints(&[])]).is_err());
    }

    #[test]
    fn median_of_odd_count_is_the_middle_element() {
        assert_eq!(median(&[ints(&[5, 1, 3])]), Ok(Value::Int(3)));
        assert_eq!(median(&[ints(&[4, 1, 3, 2])]), Ok(Value::Float(2.5)));
    }

    #[test]
    fn mode_prefers_the_first_of_equal_counts() {
        assert_eq!(mode(&[ints(&[3, 1, 1, 3])]), Ok(Value::Int(3)));
    }

    #[test]
    fn group_references_are_rewritten() {
        assert_eq!(group_references(r"<\1>"), "<${1}>");
        assert_eq!(group_references("$5"), "$$5");
        assert_eq!(group_references(r"a\\b"), r"a\b");
    }
}
