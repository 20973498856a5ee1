//! The `Date` builtin, backed by `chrono`.
//!
//! A date is an instant (epoch milliseconds; NaN for an invalid date) plus a
//! fixed display offset captured at construction. Setters mutate in place
//! and accept out-of-range components — `setDate(32)` rolls into the next
//! month — by rebuilding the instant through calendar-normalizing
//! arithmetic. `Date.now` reads the engine clock, which hosts can override.

use std::{cell::RefCell, rc::Rc};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Offset, Timelike};

use crate::{
    builtins::{arg, arg_f64, error},
    context::ScopeRef,
    terms,
    value::{JsDate, NativeImpl, Value},
};

const MILLIS_PER_MINUTE: i64 = 60_000;

fn local_offset_minutes() -> i32 {
    chrono::Local::now().offset().fix().local_minus_utc() / 60
}

/// Largest representable instant, ±100,000,000 days around the epoch.
const MAX_ABS_MILLIS: f64 = 8.64e15;

fn clamp_millis(millis: f64) -> f64 {
    if millis.is_finite() && millis.abs() <= MAX_ABS_MILLIS {
        millis.trunc()
    } else {
        f64::NAN
    }
}

pub(crate) fn construct(scope: &ScopeRef, args: &[Value], construct: bool) -> Value {
    let hooks = scope.borrow().hooks.clone();
    let offset_minutes = local_offset_minutes();
    let millis = match args.len() {
        0 => hooks.now_millis(),
        1 => match &args[0] {
            Value::String(s) => parse_date_string(s),
            Value::Date(d) => d.borrow().millis,
            other => clamp_millis(terms::to_number(other)),
        },
        _ => {
            // year, month, then optional day, hours, minutes, seconds, millis
            let mut year = arg_f64(args, 0);
            if (0.0..=99.0).contains(&year) && year.fract() == 0.0 {
                year += 1900.0;
            }
            let parts: Vec<f64> = (0..7)
                .map(|i| match i {
                    0 => year,
                    2 => match args.get(2) {
                        None | Some(Value::Undefined) => 1.0,
                        Some(v) => terms::to_number(v),
                    },
                    _ => match args.get(i) {
                        None | Some(Value::Undefined) => 0.0,
                        Some(v) => terms::to_number(v),
                    },
                })
                .collect();
            if parts.iter().any(|p| !p.is_finite()) {
                f64::NAN
            } else {
                civil_to_millis(
                    parts[0].trunc() as i64,
                    parts[1].trunc() as i64,
                    parts[2].trunc() as i64,
                    parts[3].trunc() as i64,
                    parts[4].trunc() as i64,
                    parts[5].trunc() as i64,
                    parts[6].trunc() as i64,
                    offset_minutes,
                )
            }
        }
    };
    let date = JsDate {
        millis: clamp_millis(millis),
        offset_minutes,
    };
    if construct {
        Value::Date(Rc::new(RefCell::new(date)))
    } else {
        // `Date(...)` without `new` returns the string form of now
        Value::str(to_date_string(&JsDate {
            millis: hooks.now_millis(),
            offset_minutes,
        }))
    }
}

pub(crate) fn static_member(name: &str) -> Option<Value> {
    let (name, func): (&'static str, NativeImpl) = match name {
        "now" => ("now", now),
        "parse" => ("parse", parse),
        _ => return None,
    };
    Some(Value::native_fn(name, func))
}

fn now(scope: &ScopeRef, _this: &Value, _args: &[Value]) -> Value {
    let hooks = scope.borrow().hooks.clone();
    Value::number(hooks.now_millis().trunc())
}

fn parse(_scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    Value::number(parse_date_string(&terms::to_display_string(&arg(args, 0))))
}

/// ISO 8601 parsing: full RFC 3339, a zone-less datetime (read as UTC), or a
/// bare date. Anything else is NaN.
fn parse_date_string(text: &str) -> f64 {
    let text = text.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return dt.timestamp_millis() as f64;
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return naive.and_utc().timestamp_millis() as f64;
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return midnight.and_utc().timestamp_millis() as f64;
        }
    }
    f64::NAN
}

/// Converts civil components in the display zone into epoch millis,
/// normalizing arbitrary out-of-range values.
fn civil_to_millis(
    year: i64,
    month0: i64,
    day: i64,
    hours: i64,
    minutes: i64,
    seconds: i64,
    millis: i64,
    offset_minutes: i32,
) -> f64 {
    let year = year + month0.div_euclid(12);
    let month = month0.rem_euclid(12);
    let Ok(year) = i32::try_from(year) else {
        return f64::NAN;
    };
    let Some(first) = NaiveDate::from_ymd_opt(year, month as u32 + 1, 1) else {
        return f64::NAN;
    };
    let Some(base) = first.and_hms_opt(0, 0, 0) else {
        return f64::NAN;
    };
    let shifted = base
        + Duration::days(day - 1)
        + Duration::hours(hours)
        + Duration::minutes(minutes)
        + Duration::seconds(seconds)
        + Duration::milliseconds(millis);
    let local_millis = shifted.and_utc().timestamp_millis();
    clamp_millis((local_millis - i64::from(offset_minutes) * MILLIS_PER_MINUTE) as f64)
}

/// The display-zone civil time of a valid date.
fn civil_of(date: &JsDate) -> Option<NaiveDateTime> {
    if date.millis.is_nan() {
        return None;
    }
    let shifted = date.millis as i64 + i64::from(date.offset_minutes) * MILLIS_PER_MINUTE;
    chrono::DateTime::from_timestamp_millis(shifted).map(|dt| dt.naive_utc())
}

fn utc_civil_of(date: &JsDate) -> Option<NaiveDateTime> {
    if date.millis.is_nan() {
        return None;
    }
    chrono::DateTime::from_timestamp_millis(date.millis as i64).map(|dt| dt.naive_utc())
}

pub(crate) fn to_date_string(date: &JsDate) -> String {
    let Some(civil) = civil_of(date) else {
        return "Invalid Date".to_owned();
    };
    let offset = date.offset_minutes;
    let sign = if offset < 0 { '-' } else { '+' };
    format!(
        "{} GMT{}{:02}{:02}",
        civil.format("%a %b %d %Y %H:%M:%S"),
        sign,
        offset.abs() / 60,
        offset.abs() % 60,
    )
}

pub(crate) fn to_iso_string(date: &JsDate) -> String {
    match utc_civil_of(date) {
        Some(civil) => civil.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        None => "Invalid Date".to_owned(),
    }
}

pub(crate) fn method(name: &str, receiver: &Value) -> Option<Value> {
    let (name, func): (&'static str, NativeImpl) = match name {
        "getTime" => ("getTime", get_time),
        "valueOf" => ("valueOf", get_time),
        "toString" => ("toString", date_to_string),
        "toISOString" => ("toISOString", to_iso),
        "toUTCString" => ("toUTCString", to_utc_string),
        "setTime" => ("setTime", set_time),
        "getFullYear" => ("getFullYear", |s, t, a| getter(s, t, a, Unit::FullYear)),
        "getMonth" => ("getMonth", |s, t, a| getter(s, t, a, Unit::Month)),
        "getDate" => ("getDate", |s, t, a| getter(s, t, a, Unit::Date)),
        "getDay" => ("getDay", |s, t, a| getter(s, t, a, Unit::Day)),
        "getHours" => ("getHours", |s, t, a| getter(s, t, a, Unit::Hours)),
        "getMinutes" => ("getMinutes", |s, t, a| getter(s, t, a, Unit::Minutes)),
        "getSeconds" => ("getSeconds", |s, t, a| getter(s, t, a, Unit::Seconds)),
        "getMilliseconds" => ("getMilliseconds", |s, t, a| getter(s, t, a, Unit::Milliseconds)),
        "setFullYear" => ("setFullYear", |s, t, a| setter(s, t, a, Unit::FullYear)),
        "setMonth" => ("setMonth", |s, t, a| setter(s, t, a, Unit::Month)),
        "setDate" => ("setDate", |s, t, a| setter(s, t, a, Unit::Date)),
        "setHours" => ("setHours", |s, t, a| setter(s, t, a, Unit::Hours)),
        "setMinutes" => ("setMinutes", |s, t, a| setter(s, t, a, Unit::Minutes)),
        "setSeconds" => ("setSeconds", |s, t, a| setter(s, t, a, Unit::Seconds)),
        "setMilliseconds" => ("setMilliseconds", |s, t, a| setter(s, t, a, Unit::Milliseconds)),
        _ => return None,
    };
    Some(Value::bound_native_fn(name, func, receiver.clone()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    FullYear,
    Month,
    Date,
    Day,
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
}

fn date_recv(scope: &ScopeRef, this: &Value) -> Option<Rc<RefCell<JsDate>>> {
    match this {
        Value::Date(d) => Some(d.clone()),
        other => {
            error::throw_type(
                scope,
                &format!("{} is not a Date", terms::to_display_string(other)),
            );
            None
        }
    }
}

fn get_time(scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    match date_recv(scope, this) {
        Some(d) => Value::number(d.borrow().millis),
        None => Value::Undefined,
    }
}

fn date_to_string(scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    match date_recv(scope, this) {
        Some(d) => Value::str(to_date_string(&d.borrow())),
        None => Value::Undefined,
    }
}

fn to_iso(scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    let Some(d) = date_recv(scope, this) else {
        return Value::Undefined;
    };
    if d.borrow().millis.is_nan() {
        error::throw_range(scope, "Invalid time value");
        return Value::Undefined;
    }
    Value::str(to_iso_string(&d.borrow()))
}

fn to_utc_string(scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    let Some(d) = date_recv(scope, this) else {
        return Value::Undefined;
    };
    match utc_civil_of(&d.borrow()) {
        Some(civil) => Value::str(civil.format("%a, %d %b %Y %H:%M:%S GMT").to_string()),
        None => Value::str("Invalid Date"),
    }
}

fn set_time(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(d) = date_recv(scope, this) else {
        return Value::Undefined;
    };
    let millis = clamp_millis(arg_f64(args, 0));
    d.borrow_mut().millis = millis;
    Value::number(millis)
}

fn getter(scope: &ScopeRef, this: &Value, _args: &[Value], unit: Unit) -> Value {
    let Some(d) = date_recv(scope, this) else {
        return Value::Undefined;
    };
    let Some(civil) = civil_of(&d.borrow()) else {
        return Value::number(f64::NAN);
    };
    let out = match unit {
        Unit::FullYear => i64::from(civil.year()),
        Unit::Month => i64::from(civil.month0()),
        Unit::Date => i64::from(civil.day()),
        Unit::Day => i64::from(civil.weekday().num_days_from_sunday()),
        Unit::Hours => i64::from(civil.hour()),
        Unit::Minutes => i64::from(civil.minute()),
        Unit::Seconds => i64::from(civil.second()),
        Unit::Milliseconds => i64::from(civil.and_utc().timestamp_subsec_millis()),
    };
    Value::int(out)
}

/// Setters rebuild the instant from the current display-zone components
/// with the given unit (and any trailing finer units) replaced. Overflowing
/// values normalize through the calendar.
fn setter(scope: &ScopeRef, this: &Value, args: &[Value], unit: Unit) -> Value {
    let Some(d) = date_recv(scope, this) else {
        return Value::Undefined;
    };
    let (offset_minutes, civil) = {
        let borrowed = d.borrow();
        (borrowed.offset_minutes, civil_of(&borrowed))
    };
    let Some(civil) = civil else {
        return Value::number(f64::NAN);
    };
    let mut parts = [
        i64::from(civil.year()),
        i64::from(civil.month0()),
        i64::from(civil.day()),
        i64::from(civil.hour()),
        i64::from(civil.minute()),
        i64::from(civil.second()),
        i64::from(civil.and_utc().timestamp_subsec_millis()),
    ];
    let first = match unit {
        Unit::FullYear => 0,
        Unit::Month => 1,
        Unit::Date => 2,
        Unit::Hours => 3,
        Unit::Minutes => 4,
        Unit::Seconds => 5,
        Unit::Milliseconds | Unit::Day => 6,
    };
    let mut valid = true;
    for (slot, value) in args.iter().take(parts.len() - first).enumerate() {
        let f = terms::to_number(value);
        if f.is_finite() {
            parts[first + slot] = f.trunc() as i64;
        } else {
            valid = false;
        }
    }
    let millis = if valid {
        civil_to_millis(
            parts[0], parts[1], parts[2], parts[3], parts[4], parts[5], parts[6], offset_minutes,
        )
    } else {
        f64::NAN
    };
    d.borrow_mut().millis = millis;
    Value::number(millis)
}
