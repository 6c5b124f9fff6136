//! Brazilian Portuguese relative time ("em 15 minutos", "há cerca de 2 horas").
//!
//! Buckets follow the usual distance-in-words rounding: minutes are rounded,
//! under one minute reads as "menos de um minuto", 45-89 minutes as "cerca de
//! 1 hora", and so on up to years.

use chrono::{DateTime, Utc};

const MINUTES_IN_DAY: i64 = 1_440;
const MINUTES_IN_ALMOST_TWO_DAYS: i64 = 2_520;
const MINUTES_IN_MONTH: i64 = 43_200;
const MINUTES_IN_TWO_MONTHS: i64 = 86_400;

/// Distance from `now` to `target` with a direction prefix.
#[must_use]
pub fn relative_to(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let millis = (target - now).num_milliseconds();
    let distance = distance_in_words(millis.unsigned_abs());

    if millis > 0 {
        format!("em {distance}")
    } else {
        format!("há {distance}")
    }
}

fn distance_in_words(millis: u64) -> String {
    let seconds = millis as f64 / 1_000.0;
    let minutes = (seconds / 60.0).round() as i64;

    if minutes < 1 {
        "menos de um minuto".to_string()
    } else if minutes < 45 {
        plural(minutes, "1 minuto", "minutos")
    } else if minutes < 90 {
        "cerca de 1 hora".to_string()
    } else if minutes < MINUTES_IN_DAY {
        let hours = (minutes as f64 / 60.0).round() as i64;
        if hours == 1 {
            "cerca de 1 hora".to_string()
        } else {
            format!("cerca de {hours} horas")
        }
    } else if minutes < MINUTES_IN_ALMOST_TWO_DAYS {
        "1 dia".to_string()
    } else if minutes < MINUTES_IN_MONTH {
        let days = (minutes as f64 / MINUTES_IN_DAY as f64).round() as i64;
        plural(days, "1 dia", "dias")
    } else if minutes < MINUTES_IN_TWO_MONTHS {
        let months = (minutes as f64 / MINUTES_IN_MONTH as f64).round() as i64;
        if months == 1 {
            "cerca de 1 mês".to_string()
        } else {
            format!("cerca de {months} meses")
        }
    } else {
        let months = (minutes as f64 / MINUTES_IN_MONTH as f64).round() as i64;
        if months < 12 {
            plural(months, "1 mês", "meses")
        } else {
            years_in_words(months)
        }
    }
}

fn years_in_words(months: i64) -> String {
    let years = months / 12;
    let remainder = months % 12;

    if remainder < 3 {
        if years == 1 {
            "cerca de 1 ano".to_string()
        } else {
            format!("cerca de {years} anos")
        }
    } else if remainder < 9 {
        if years == 1 {
            "mais de 1 ano".to_string()
        } else {
            format!("mais de {years} anos")
        }
    } else {
        format!("quase {} anos", years + 1)
    }
}

fn plural(count: i64, one: &str, unit: &str) -> String {
    if count == 1 {
        one.to_string()
    } else {
        format!("{count} {unit}")
    }
}
