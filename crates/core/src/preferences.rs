//! Delivery preference defaults, quiet-hours arithmetic and the per-recipient
//! delivery plan.
//!
//! Everything here is pure: the repository layer loads rows, converts them
//! into a [`ResolvedPreference`], and asks it for a [`DeliveryPlan`].

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Channel flags written when a (user, type) preference row is created lazily.
///
/// This is the only place default channel settings are defined; the
/// repository layer binds these values into its `ON CONFLICT DO NOTHING`
/// insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultPreferences {
    pub email_enabled: bool,
    pub push_enabled: bool,
    pub in_app_enabled: bool,
}

impl DefaultPreferences {
    pub const STANDARD: DefaultPreferences = DefaultPreferences {
        email_enabled: true,
        push_enabled: false,
        in_app_enabled: true,
    };
}

impl Default for DefaultPreferences {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Default quiet-hours window start (22:00 local time).
pub fn default_quiet_hours_start() -> NaiveTime {
    NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Default quiet-hours window end (07:00 local time).
pub fn default_quiet_hours_end() -> NaiveTime {
    NaiveTime::from_hms_opt(7, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Timezone assumed until the user picks one.
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Parse an IANA timezone name such as `"America/Chicago"`.
pub fn parse_timezone(name: &str) -> Result<Tz, CoreError> {
    name.parse::<Tz>()
        .map_err(|_| CoreError::InvalidTimezone(format!("'{name}' is not a valid IANA timezone")))
}

/// Parse a wall-clock time in `HH:MM` or `HH:MM:SS` form.
pub fn parse_local_time(value: &str) -> Result<NaiveTime, CoreError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| CoreError::Validation(format!("'{value}' is not a valid HH:MM time")))
}

// ---------------------------------------------------------------------------
// Quiet hours
// ---------------------------------------------------------------------------

/// A daily local-time window during which live push delivery is deferred.
///
/// `start > end` describes an overnight window (e.g. 22:00–07:00).
/// `start == end` describes an empty window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub timezone: Tz,
}

impl QuietHours {
    pub fn new(start: NaiveTime, end: NaiveTime, timezone: &str) -> Result<Self, CoreError> {
        Ok(Self {
            start,
            end,
            timezone: parse_timezone(timezone)?,
        })
    }

    /// Whether a local wall-clock time falls inside the window.
    pub fn contains_local(&self, t: NaiveTime) -> bool {
        if self.start > self.end {
            t >= self.start || t < self.end
        } else {
            self.start <= t && t < self.end
        }
    }

    /// Whether a UTC instant falls inside the window in the user's timezone.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.contains_local(at.with_timezone(&self.timezone).time())
    }

    /// If `at` is inside the window, the UTC instant at which it closes.
    pub fn window_end_after(&self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = at.with_timezone(&self.timezone);
        if !self.contains_local(local.time()) {
            return None;
        }

        let mut end_date = local.date_naive();
        if self.start > self.end && local.time() >= self.start {
            end_date = end_date.succ_opt()?;
        }
        let naive_end = end_date.and_time(self.end);

        // A window end that lands in a DST gap is pushed past the gap.
        let resolved = self
            .timezone
            .from_local_datetime(&naive_end)
            .earliest()
            .or_else(|| {
                self.timezone
                    .from_local_datetime(&(naive_end + Duration::hours(1)))
                    .earliest()
            })?;

        Some(resolved.with_timezone(&Utc))
    }
}

// ---------------------------------------------------------------------------
// Resolution result
// ---------------------------------------------------------------------------

/// Per-type channel switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelFlags {
    pub email_enabled: bool,
    pub push_enabled: bool,
    pub in_app_enabled: bool,
}

impl From<DefaultPreferences> for ChannelFlags {
    fn from(d: DefaultPreferences) -> Self {
        Self {
            email_enabled: d.email_enabled,
            push_enabled: d.push_enabled,
            in_app_enabled: d.in_app_enabled,
        }
    }
}

/// A user's effective settings for one notification type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPreference {
    pub channels: ChannelFlags,
    pub notifications_enabled: bool,
    /// `None` when quiet hours are disabled.
    pub quiet_hours: Option<QuietHours>,
}

/// Which channels a single recipient receives a notification on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPlan {
    pub in_app: bool,
    pub email: bool,
    pub push: bool,
    /// Earliest dispatch time for push entries; `None` means immediately.
    pub push_not_before: Option<DateTime<Utc>>,
}

impl DeliveryPlan {
    pub const NONE: DeliveryPlan = DeliveryPlan {
        in_app: false,
        email: false,
        push: false,
        push_not_before: None,
    };

    pub fn is_empty(&self) -> bool {
        !self.in_app && !self.email && !self.push
    }
}

impl ResolvedPreference {
    /// Decide channels for a notification generated at `now`.
    ///
    /// The global toggle suppresses everything. Quiet hours only defer push;
    /// in-app and email are unaffected.
    pub fn plan(&self, now: DateTime<Utc>) -> DeliveryPlan {
        if !self.notifications_enabled {
            return DeliveryPlan::NONE;
        }

        let push = self.channels.push_enabled;
        let push_not_before = if push {
            self.quiet_hours.and_then(|q| q.window_end_after(now))
        } else {
            None
        };

        DeliveryPlan {
            in_app: self.channels.in_app_enabled,
            email: self.channels.email_enabled,
            push,
            push_not_before,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
