//! Conversions between the wire types and the provider-neutral event shape.

use calsync_core::remote::{RemoteEvent, RemoteTime};

use crate::types::{GoogleEvent, GoogleEventDateTime};

/// Lenient wire-to-neutral conversion. Field validation (missing start,
/// missing updated) is the mapper's job, so malformed records can be
/// counted per event instead of failing the listing.
pub fn remote_from_google(event: GoogleEvent) -> RemoteEvent {
    RemoteEvent {
        id: event.id,
        summary: event.summary,
        description: event.description.filter(|d| !d.is_empty()),
        start: event.start.and_then(time_from_google),
        end: event.end.and_then(time_from_google),
        updated: event.updated,
    }
}

pub fn google_from_remote(event: &RemoteEvent) -> GoogleEvent {
    GoogleEvent {
        id: event.id.clone(),
        summary: event.summary.clone(),
        description: event.description.clone(),
        start: event.start.as_ref().map(time_to_google),
        end: event.end.as_ref().map(time_to_google),
        updated: event.updated,
    }
}

fn time_from_google(time: GoogleEventDateTime) -> Option<RemoteTime> {
    if let Some(dt) = time.date_time {
        Some(RemoteTime::DateTime(dt))
    } else {
        time.date.map(RemoteTime::Date)
    }
}

fn time_to_google(time: &RemoteTime) -> GoogleEventDateTime {
    match time {
        RemoteTime::DateTime(dt) => GoogleEventDateTime {
            date: None,
            date_time: Some(*dt),
            time_zone: None,
        },
        RemoteTime::Date(d) => GoogleEventDateTime {
            date: Some(*d),
            date_time: None,
            time_zone: None,
        },
        RemoteTime::Zoned { datetime, tzid } => GoogleEventDateTime {
            date: None,
            date_time: Some(*datetime),
            time_zone: Some(tzid.clone()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn timed_event_converts_both_ways() {
        let start = Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap();
        let wire = GoogleEvent {
            id: "g1".to_string(),
            summary: "Filing deadline".to_string(),
            description: Some("Tribunale di Milano".to_string()),
            start: Some(GoogleEventDateTime {
                date_time: Some(start),
                ..Default::default()
            }),
            end: Some(GoogleEventDateTime {
                date_time: Some(start + chrono::Duration::hours(1)),
                ..Default::default()
            }),
            updated: Some(start),
        };

        let remote = remote_from_google(wire);
        assert_eq!(remote.id, "g1");
        assert_eq!(remote.start, Some(RemoteTime::DateTime(start)));

        let back = google_from_remote(&remote);
        assert_eq!(back.start.unwrap().date_time, Some(start));
        assert_eq!(back.summary, "Filing deadline");
    }

    #[test]
    fn all_day_event_keeps_its_date() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        let wire = GoogleEvent {
            id: "g2".to_string(),
            start: Some(GoogleEventDateTime {
                date: Some(day),
                ..Default::default()
            }),
            ..Default::default()
        };

        let remote = remote_from_google(wire);
        assert_eq!(remote.start, Some(RemoteTime::Date(day)));
        assert!(remote.end.is_none());
    }

    #[test]
    fn zoned_push_time_carries_the_label() {
        let instant = Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap();
        let remote = RemoteEvent {
            id: String::new(),
            summary: "Udienza".to_string(),
            start: Some(RemoteTime::Zoned {
                datetime: instant,
                tzid: "Europe/Rome".to_string(),
            }),
            ..Default::default()
        };

        let wire = google_from_remote(&remote);
        let start = wire.start.unwrap();
        assert_eq!(start.date_time, Some(instant));
        assert_eq!(start.time_zone.as_deref(), Some("Europe/Rome"));
    }

    #[test]
    fn empty_description_becomes_none() {
        let wire = GoogleEvent {
            id: "g3".to_string(),
            description: Some(String::new()),
            ..Default::default()
        };
        assert!(remote_from_google(wire).description.is_none());
    }
}
