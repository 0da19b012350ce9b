//! Google OAuth and Calendar client.
//!
//! Tokens are per user: loaded from the database for each request,
//! refreshed when close to expiry and written back by the caller.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use dayflow_core::CalendarEventInput;

use crate::config::GoogleConfig;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";
const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

/// Refresh this many seconds before the provider's expiry.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("Google Calendar is not connected")]
    NotConnected,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Google rejected the request (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Stored token is unreadable: {0}")]
    InvalidToken(String),
}

/// OAuth token pair as persisted per user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl GoogleToken {
    pub fn from_json(raw: &str) -> Result<Self, GoogleError> {
        serde_json::from_str(raw).map_err(|e| GoogleError::InvalidToken(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, GoogleError> {
        serde_json::to_string(self).map_err(|e| GoogleError::InvalidToken(e.to_string()))
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) <= now
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_token(self, previous_refresh: Option<String>, now: DateTime<Utc>) -> GoogleToken {
        GoogleToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: now + Duration::seconds(self.expires_in),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    #[serde(default)]
    start: EventTime,
    #[serde(default)]
    end: EventTime,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: Option<String>,
    date: Option<String>,
}

impl EventTime {
    fn value(&self) -> Option<&str> {
        self.date_time.as_deref().or(self.date.as_deref())
    }
}

/// HTTP client for Google OAuth and the Calendar v3 API.
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    config: GoogleConfig,
    timezone: String,
}

impl GoogleCalendarClient {
    pub fn new(
        config: GoogleConfig,
        timezone: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, GoogleError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()?;

        Ok(Self {
            http,
            config,
            timezone: timezone.into(),
        })
    }

    /// Consent-screen URL. `state` carries the user id back to the callback.
    pub fn auth_url(&self, state: &str) -> Result<String, GoogleError> {
        let url = Url::parse_with_params(
            AUTH_ENDPOINT,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", CALENDAR_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .map_err(|e| GoogleError::InvalidUrl(e.to_string()))?;

        Ok(url.into())
    }

    /// Exchange an authorization code for a token pair
    pub async fn exchange_code(&self, code: &str) -> Result<GoogleToken, GoogleError> {
        let response: TokenResponse = self
            .post_token(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .await?;

        Ok(response.into_token(None, Utc::now()))
    }

    pub async fn refresh(&self, token: &GoogleToken) -> Result<GoogleToken, GoogleError> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or(GoogleError::NotConnected)?;

        let response: TokenResponse = self
            .post_token(&[
                ("refresh_token", refresh_token),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        tracing::info!("Refreshed Google access token");
        Ok(response.into_token(token.refresh_token.clone(), Utc::now()))
    }

    /// Return a usable token, refreshing it if it is about to expire.
    ///
    /// The flag is true when the token changed and must be persisted.
    pub async fn ensure_fresh(&self, token: GoogleToken) -> Result<(GoogleToken, bool), GoogleError> {
        if token.needs_refresh(Utc::now()) {
            let fresh = self.refresh(&token).await?;
            Ok((fresh, true))
        } else {
            Ok((token, false))
        }
    }

    /// Events starting on `date` in the configured time zone, in start order.
    pub async fn list_events(
        &self,
        token: &GoogleToken,
        calendar_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<CalendarEventInput>, GoogleError> {
        let mut url = Url::parse(CALENDAR_API).map_err(|e| GoogleError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| GoogleError::InvalidUrl(CALENDAR_API.to_string()))?
            .extend(["calendars", calendar_id, "events"]);

        // Widened by a day each side; the exact day is filtered locally in
        // the calendar's own time zone.
        let time_min = format!("{}T00:00:00Z", date - Duration::days(1));
        let time_max = format!("{}T00:00:00Z", date + Duration::days(2));

        let response = self
            .http
            .get(url)
            .bearer_auth(&token.access_token)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("timeZone", self.timezone.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GoogleError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let events: EventsResponse = response.json().await?;
        Ok(events_on_date(events.items, date))
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, GoogleError> {
        let response = self.http.post(TOKEN_ENDPOINT).form(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GoogleError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

fn events_on_date(items: Vec<ApiEvent>, date: NaiveDate) -> Vec<CalendarEventInput> {
    let prefix = date.format("%Y-%m-%d").to_string();

    items
        .into_iter()
        .filter(|item| item.start.value().is_some_and(|s| s.starts_with(&prefix)))
        .map(|item| CalendarEventInput {
            title: item
                .summary
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "(No title)".to_string()),
            description: item.description,
            start_time: item.start.value().unwrap_or_default().to_string(),
            end_time: item.end.value().map(str::to_string),
            location: item.location,
            all_day: item.start.date_time.is_none(),
            calendar_id: item.id,
            emoji: None,
        })
        .collect()
}

/// Calendar id from the user's saved calendar setting.
///
/// Accepts a bare calendar id (usually an e-mail address) or a Google
/// Calendar share/embed link with a `src` parameter. Anything else means
/// the primary calendar.
pub fn calendar_id_from_setting(setting: Option<&str>) -> String {
    let Some(raw) = setting.map(str::trim).filter(|s| !s.is_empty()) else {
        return "primary".to_string();
    };

    match Url::parse(raw) {
        Ok(url) => url
            .query_pairs()
            .find(|(key, _)| key == "src" || key == "cid")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_else(|| "primary".to_string()),
        Err(_) if !raw.contains(char::is_whitespace) => raw.to_string(),
        Err(_) => "primary".to_string(),
    }
}
