//! Query and statistics records for the bounce API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Page size used by [`BounceQuery::default`].
pub const DEFAULT_PAGE_SIZE: u32 = 30;

/// Bounce classification reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BounceType {
    HardBounce,
    SoftBounce,
    Transient,
    Unsubscribe,
    Subscribe,
    AutoResponder,
    AddressChange,
    DnsError,
    SpamNotification,
    OpenRelayTest,
    VirusNotification,
    ChallengeVerification,
    BadEmailAddress,
    SpamComplaint,
    ManuallyDeactivated,
    Unconfirmed,
    Blocked,
    SmtpApiError,
    InboundError,
    DmarcPolicy,
    TemplateRenderingFailed,
    Unknown,
    /// A type this crate does not know about yet.
    Other(String),
}

impl BounceType {
    /// Name as spelled by the service, e.g. `SMTPApiError`.
    pub fn as_str(&self) -> &str {
        match self {
            BounceType::HardBounce => "HardBounce",
            BounceType::SoftBounce => "SoftBounce",
            BounceType::Transient => "Transient",
            BounceType::Unsubscribe => "Unsubscribe",
            BounceType::Subscribe => "Subscribe",
            BounceType::AutoResponder => "AutoResponder",
            BounceType::AddressChange => "AddressChange",
            BounceType::DnsError => "DnsError",
            BounceType::SpamNotification => "SpamNotification",
            BounceType::OpenRelayTest => "OpenRelayTest",
            BounceType::VirusNotification => "VirusNotification",
            BounceType::ChallengeVerification => "ChallengeVerification",
            BounceType::BadEmailAddress => "BadEmailAddress",
            BounceType::SpamComplaint => "SpamComplaint",
            BounceType::ManuallyDeactivated => "ManuallyDeactivated",
            BounceType::Unconfirmed => "Unconfirmed",
            BounceType::Blocked => "Blocked",
            BounceType::SmtpApiError => "SMTPApiError",
            BounceType::InboundError => "InboundError",
            BounceType::DmarcPolicy => "DMARCPolicy",
            BounceType::TemplateRenderingFailed => "TemplateRenderingFailed",
            BounceType::Unknown => "Unknown",
            BounceType::Other(name) => name,
        }
    }
}

impl From<&str> for BounceType {
    fn from(value: &str) -> Self {
        match value {
            "HardBounce" => BounceType::HardBounce,
            "SoftBounce" => BounceType::SoftBounce,
            "Transient" => BounceType::Transient,
            "Unsubscribe" => BounceType::Unsubscribe,
            "Subscribe" => BounceType::Subscribe,
            "AutoResponder" => BounceType::AutoResponder,
            "AddressChange" => BounceType::AddressChange,
            "DnsError" => BounceType::DnsError,
            "SpamNotification" => BounceType::SpamNotification,
            "OpenRelayTest" => BounceType::OpenRelayTest,
            "VirusNotification" => BounceType::VirusNotification,
            "ChallengeVerification" => BounceType::ChallengeVerification,
            "BadEmailAddress" => BounceType::BadEmailAddress,
            "SpamComplaint" => BounceType::SpamComplaint,
            "ManuallyDeactivated" => BounceType::ManuallyDeactivated,
            "Unconfirmed" => BounceType::Unconfirmed,
            "Blocked" => BounceType::Blocked,
            "SMTPApiError" => BounceType::SmtpApiError,
            "InboundError" => BounceType::InboundError,
            "DMARCPolicy" => BounceType::DmarcPolicy,
            "TemplateRenderingFailed" => BounceType::TemplateRenderingFailed,
            "Unknown" => BounceType::Unknown,
            other => BounceType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for BounceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filters for listing bounces.
///
/// The service pages results; `count` and `offset` are always sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BounceQuery {
    pub count: u32,
    pub offset: u32,
    pub bounce_type: Option<BounceType>,
    pub inactive: Option<bool>,
    /// Substring match on the recipient address.
    pub email_filter: Option<String>,
    pub tag: Option<String>,
    pub message_id: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub message_stream: Option<String>,
}

impl Default for BounceQuery {
    fn default() -> Self {
        Self {
            count: DEFAULT_PAGE_SIZE,
            offset: 0,
            bounce_type: None,
            inactive: None,
            email_filter: None,
            tag: None,
            message_id: None,
            from_date: None,
            to_date: None,
            message_stream: None,
        }
    }
}

impl BounceQuery {
    /// First page of [`DEFAULT_PAGE_SIZE`] bounces, no filters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Page size.
    pub fn count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Number of bounces to skip.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Only bounces of this type.
    pub fn bounce_type(mut self, bounce_type: BounceType) -> Self {
        self.bounce_type = Some(bounce_type);
        self
    }

    /// Only bounces whose recipient is (or is not) deactivated.
    pub fn inactive(mut self, inactive: bool) -> Self {
        self.inactive = Some(inactive);
        self
    }

    /// Only recipients whose address contains `filter`.
    pub fn email_filter(mut self, filter: impl Into<String>) -> Self {
        self.email_filter = Some(filter.into());
        self
    }

    /// Only messages with this tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Only bounces of this message.
    pub fn message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Only bounces on or after this date.
    pub fn from_date(mut self, date: NaiveDate) -> Self {
        self.from_date = Some(date);
        self
    }

    /// Only bounces up to and including this date.
    pub fn to_date(mut self, date: NaiveDate) -> Self {
        self.to_date = Some(date);
        self
    }

    /// Only bounces from this message stream.
    pub fn message_stream(mut self, stream: impl Into<String>) -> Self {
        self.message_stream = Some(stream.into());
        self
    }

    /// Query-string pairs in the service's parameter spelling.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("count", self.count.to_string()),
            ("offset", self.offset.to_string()),
        ];
        if let Some(bounce_type) = &self.bounce_type {
            params.push(("type", bounce_type.to_string()));
        }
        if let Some(inactive) = self.inactive {
            params.push(("inactive", inactive.to_string()));
        }
        if let Some(filter) = &self.email_filter {
            params.push(("emailFilter", filter.clone()));
        }
        if let Some(tag) = &self.tag {
            params.push(("tag", tag.clone()));
        }
        if let Some(message_id) = &self.message_id {
            params.push(("messageID", message_id.clone()));
        }
        if let Some(date) = self.from_date {
            params.push(("fromdate", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(date) = self.to_date {
            params.push(("todate", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(stream) = &self.message_stream {
            params.push(("messagestream", stream.clone()));
        }
        params
    }
}

/// Bounce totals for the server, as returned by the delivery stats endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStats {
    #[serde(default)]
    pub inactive_mails: u64,
    #[serde(default)]
    pub bounces: Vec<BounceCount>,
}

/// One line of [`DeliveryStats`]. The "All" line carries no type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BounceCount {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub name: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_query_pages_from_start() {
        assert_eq!(
            BounceQuery::default().to_query(),
            vec![("count", "30".to_string()), ("offset", "0".to_string())]
        );
    }

    #[test]
    fn query_includes_filters() {
        let query = BounceQuery::new()
            .count(10)
            .offset(20)
            .bounce_type(BounceType::HardBounce)
            .inactive(true)
            .email_filter("@example.com")
            .tag("welcome")
            .from_date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .message_stream("outbound");

        let params = query.to_query();
        assert!(params.contains(&("type", "HardBounce".to_string())));
        assert!(params.contains(&("inactive", "true".to_string())));
        assert!(params.contains(&("emailFilter", "@example.com".to_string())));
        assert!(params.contains(&("fromdate", "2024-01-02".to_string())));
        assert!(params.contains(&("messagestream", "outbound".to_string())));
        assert!(!params.iter().any(|(key, _)| *key == "todate"));
    }

    #[test]
    fn bounce_type_names_round_trip() {
        for name in ["HardBounce", "SMTPApiError", "DMARCPolicy", "Unknown"] {
            assert_eq!(BounceType::from(name).as_str(), name);
        }
        assert_eq!(
            BounceType::from("SomethingNew"),
            BounceType::Other("SomethingNew".to_string())
        );
    }
}
