//! Google Calendar provider for calsync.
//!
//! Implements the `CalendarProvider` contract over the Calendar v3 REST
//! API: OAuth code exchange and refresh, event listing with sync tokens,
//! event insert/update, and watch-channel create/stop.

mod api;
mod convert;
mod oauth;
mod types;

pub use api::GoogleCalendarProvider;
pub use oauth::OauthConfig;
