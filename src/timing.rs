use crate::config::{SectionRule, TimingConfig};
use anyhow::{Context, Result};
use regex::Regex;

/// Formats seconds as `"M minutes S.SS seconds"`.
pub fn format_duration(seconds: f64) -> String {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    };
    let centis = (seconds * 100.0).round() as u64;
    let minutes = centis / 6000;
    let rest = centis % 6000;
    format!("{} minutes {}.{:02} seconds", minutes, rest / 100, rest % 100)
}

/// Reads the section marker out of an audio file name.
#[derive(Debug, Clone)]
pub enum SectionMatcher {
    Disabled,
    CharAt(usize),
    Pattern(Regex),
}

impl SectionMatcher {
    pub fn from_rule(rule: &SectionRule) -> Result<Self> {
        Ok(match rule {
            SectionRule::None => Self::Disabled,
            SectionRule::CharAt { index } => Self::CharAt(*index),
            SectionRule::Pattern { regex } => Self::Pattern(
                Regex::new(regex).with_context(|| format!("invalid section regex {regex:?}"))?,
            ),
        })
    }

    /// The marker for `name`, or `None` when the name does not carry one.
    pub fn marker(&self, name: &str) -> Option<String> {
        match self {
            Self::Disabled => None,
            Self::CharAt(index) => name.chars().nth(*index).map(String::from),
            Self::Pattern(re) => {
                let caps = re.captures(name)?;
                caps.get(1)
                    .or_else(|| caps.get(0))
                    .map(|m| m.as_str().to_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipTiming {
    pub narration: f64,
    /// Silent hold after the narration, including any section pause.
    pub hold: f64,
    /// The next clip starts a new section.
    pub section_break: bool,
}

impl ClipTiming {
    pub fn duration(&self) -> f64 {
        self.narration + self.hold
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelinePlan {
    pub clips: Vec<ClipTiming>,
}

impl TimelinePlan {
    pub fn total(&self) -> f64 {
        self.clips.iter().map(ClipTiming::duration).sum()
    }

    pub fn section_changes(&self) -> usize {
        self.clips.iter().filter(|c| c.section_break).count()
    }
}

/// Plans the top-track timeline.
///
/// Every clip lasts its narration plus `pause`. When the section marker of
/// `names[i]` differs from `names[i - 1]`, clip `i - 1` is held for an extra
/// `section_pause`, so each change adds exactly one extra pause.
pub fn plan_timeline(
    names: &[String],
    narrations: &[f64],
    timing: &TimingConfig,
    matcher: &SectionMatcher,
) -> TimelinePlan {
    let markers: Vec<Option<String>> = names.iter().map(|n| matcher.marker(n)).collect();

    let clips = narrations
        .iter()
        .enumerate()
        .map(|(i, &narration)| {
            let section_break = match (markers.get(i), markers.get(i + 1)) {
                (Some(cur), Some(next)) => cur != next,
                _ => false,
            };
            let extra = if section_break {
                timing.section_pause
            } else {
                0.0
            };
            ClipTiming {
                narration,
                hold: timing.pause + extra,
                section_break,
            }
        })
        .collect();

    TimelinePlan { clips }
}
