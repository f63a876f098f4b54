use chrono::{DateTime, Duration, Local};

use crate::config::{Config, Rule};
use crate::models::{Action, Decision, TagMeta};

/// Decide what to do with one tag.
///
/// Exclusion is checked first, then an existing server-side expiration, then
/// the rules in declared order. The first rule matching at the start of the
/// tag name wins; with no match the default expiration applies.
pub fn classify(
    repository: &str,
    tag: &str,
    meta: &TagMeta,
    config: &Config,
    now: DateTime<Local>,
) -> Decision {
    let mut decision = Decision {
        tag: Some(tag.to_string()),
        ..Decision::blank(repository)
    };

    if config.is_excluded(repository) {
        decision.action = Action::Skip;
        return decision;
    }

    if let Some(existing) = &meta.expiration {
        decision.action = Action::Exist;
        decision.existing_expiration = Some(existing.clone());
        return decision;
    }

    let (action, seconds) = match first_match(&config.rules, tag) {
        Some(rule) => {
            decision.rule = Some(rule.name.clone());
            let action = if rule.expire_seconds == 0 {
                Action::Keep
            } else {
                Action::Expire
            };
            (action, rule.expire_seconds)
        }
        None => (Action::ExpireDefault, config.default_expiration),
    };

    decision.action = action;
    decision.expiration_seconds = seconds;
    decision.expires_at = expiration_date(now, seconds);
    decision
}

fn first_match<'a>(rules: &'a [Rule], tag: &str) -> Option<&'a Rule> {
    rules.iter().find(|rule| rule.matches(tag))
}

/// `now + seconds`, or nothing when there is no expiration to set
pub fn expiration_date(now: DateTime<Local>, seconds: u64) -> Option<DateTime<Local>> {
    if seconds == 0 {
        return None;
    }
    let seconds = i64::try_from(seconds).ok()?;
    Duration::try_seconds(seconds).and_then(|d| now.checked_add_signed(d))
}

/// RFC 1123 style, e.g. `Mon, 02 Jan 2006 15:04:05 -0700`
pub fn format_date(date: &DateTime<Local>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S %z").to_string()
}
