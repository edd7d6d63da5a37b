//! Double-hour (時辰) classification and the display date.
//!
//! The day is split into twelve two-hour windows. 子時 wraps midnight
//! (23 → 1), so a window with `start > end` matches `hour >= start` or
//! `hour < end`.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike};

const HOURS_PER_DAY: u32 = 24;

/// Label used when no window matches the hour.
pub const UNKNOWN_PERIOD: &str = "未知時辰";

/// Rule deciding the 陰陽 tag from the minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DayNightRule {
    /// 陽早 for minutes 0–29, 陰晚 for 30–59.
    #[default]
    HalfHour,
    /// Legacy rule (`minute <= 60`): always 陽早.
    AlwaysDay,
}

impl DayNightRule {
    pub fn tag(self, minute: u32) -> DayNight {
        let early = match self {
            DayNightRule::HalfHour => minute < 30,
            DayNightRule::AlwaysDay => minute <= 60,
        };
        if early {
            DayNight::Early
        } else {
            DayNight::Late
        }
    }
}

impl FromStr for DayNightRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "half-hour" | "half_hour" | "halfhour" => Ok(DayNightRule::HalfHour),
            "always-day" | "always_day" | "alwaysday" => Ok(DayNightRule::AlwaysDay),
            other => Err(format!("expected `half-hour` or `always-day`, got `{}`", other)),
        }
    }
}

/// 陰陽 tag of a time period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayNight {
    /// 陽早 (day-early)
    Early,
    /// 陰晚 (night-late)
    Late,
}

impl DayNight {
    pub fn label(self) -> &'static str {
        match self {
            DayNight::Early => "陽早",
            DayNight::Late => "陰晚",
        }
    }
}

/// The twelve double-hours in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoubleHour {
    Zi,
    Chou,
    Yin,
    Mao,
    Chen,
    Si,
    Wu,
    Wei,
    Shen,
    You,
    Xu,
    Hai,
}

impl DoubleHour {
    pub const ALL: [DoubleHour; 12] = [
        DoubleHour::Zi,
        DoubleHour::Chou,
        DoubleHour::Yin,
        DoubleHour::Mao,
        DoubleHour::Chen,
        DoubleHour::Si,
        DoubleHour::Wu,
        DoubleHour::Wei,
        DoubleHour::Shen,
        DoubleHour::You,
        DoubleHour::Xu,
        DoubleHour::Hai,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DoubleHour::Zi => "子時",
            DoubleHour::Chou => "丑時",
            DoubleHour::Yin => "寅時",
            DoubleHour::Mao => "卯時",
            DoubleHour::Chen => "辰時",
            DoubleHour::Si => "巳時",
            DoubleHour::Wu => "午時",
            DoubleHour::Wei => "未時",
            DoubleHour::Shen => "申時",
            DoubleHour::You => "酉時",
            DoubleHour::Xu => "戌時",
            DoubleHour::Hai => "亥時",
        }
    }

    /// Half-open hour window `[start, end)`.
    pub fn window(self) -> (u32, u32) {
        match self {
            DoubleHour::Zi => (23, 1),
            other => {
                let start = 2 * (other as u32) - 1;
                (start, start + 2)
            }
        }
    }

    pub fn contains(self, hour: u32) -> bool {
        if hour >= HOURS_PER_DAY {
            return false;
        }
        let (start, end) = self.window();
        if start > end {
            hour >= start || hour < end
        } else {
            start <= hour && hour < end
        }
    }

    /// First window containing `hour`, in table order.
    pub fn for_hour(hour: u32) -> Option<DoubleHour> {
        DoubleHour::ALL.into_iter().find(|dh| dh.contains(hour))
    }
}

/// Classified time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePeriod {
    pub tag: DayNight,
    /// `None` when the hour is outside 0–23.
    pub double_hour: Option<DoubleHour>,
}

impl TimePeriod {
    pub fn is_known(&self) -> bool {
        self.double_hour.is_some()
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.double_hour {
            Some(dh) => write!(f, "{} {}", self.tag.label(), dh.name()),
            None => f.write_str(UNKNOWN_PERIOD),
        }
    }
}

/// Classify an hour/minute pair.
pub fn classify(hour: u32, minute: u32, rule: DayNightRule) -> TimePeriod {
    TimePeriod {
        tag: rule.tag(minute),
        double_hour: DoubleHour::for_hour(hour),
    }
}

/// Classify a wall-clock instant.
pub fn classify_at(at: &NaiveDateTime, rule: DayNightRule) -> TimePeriod {
    classify(at.hour(), at.minute(), rule)
}

/// Display date, `YYYY/MM/DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y/%m/%d").to_string()
}

/// Current local wall-clock time.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Month and day of `date`, the inputs of a 天合 reading.
pub fn month_day(date: NaiveDate) -> (u32, u32) {
    (date.month(), date.day())
}
