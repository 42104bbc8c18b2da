//! The bounce resource.
//!
//! A [`Bounce`] is a read-only snapshot of one bounce record. Operations that
//! touch the service go through the [`ApiClient`] the bounce was built with,
//! or through the shared client from [`crate::registry`] when it was built
//! without one. Nothing mutates a bounce in place: [`Bounce::activate`]
//! returns a fresh snapshot.

use crate::client::LocalRecord;
use crate::models::{BounceQuery, BounceType};
use crate::{ApiClient, Error, KeyTranslator, Result, registry};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;

/// Timestamp layout used by the service in bounce records.
const BOUNCED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Snapshot {
    id: u64,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    type_code: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    server_id: Option<u64>,
    #[serde(default)]
    message_stream: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default, deserialize_with = "deserialize_bounced_at")]
    bounced_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    dump_available: bool,
    #[serde(default)]
    inactive: bool,
    #[serde(default)]
    can_activate: bool,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// A bounce record at a point in time.
///
/// # Examples
/// ```
/// use postmark_client::Bounce;
/// use serde_json::json;
///
/// let bounce = Bounce::from_record(json!({
///     "ID": 42,
///     "Type": "HardBounce",
///     "MessageID": "d12c2f1c-60f3-4258-b163-d17052546ae4",
///     "Inactive": false,
///     "CanActivate": true,
///     "DumpAvailable": true
/// }))?;
///
/// assert_eq!(bounce.id(), 42);
/// assert!(bounce.can_activate());
/// # Ok::<(), postmark_client::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Bounce {
    snapshot: Snapshot,
    client: Option<Arc<ApiClient>>,
}

/// Two bounces are equal when their snapshots are; the bound client is
/// ignored.
impl PartialEq for Bounce {
    fn eq(&self, other: &Self) -> bool {
        self.snapshot == other.snapshot
    }
}

impl Bounce {
    /// Build a bounce from a record in either local or wire casing.
    ///
    /// Operations on the result use the shared client.
    pub fn from_record(record: Value) -> Result<Self> {
        let record = KeyTranslator::default().to_local(&record);
        Self::from_local(record, None)
    }

    /// Build a bounce from a record, binding it to `client`.
    pub fn from_record_with(record: Value, client: Arc<ApiClient>) -> Result<Self> {
        let record = client.key_translator().to_local(&record);
        Self::from_local(record, Some(client))
    }

    fn from_local(record: Value, client: Option<Arc<ApiClient>>) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_value(record)
            .map_err(|e| Error::Deserialization(format!("invalid bounce record: {e}")))?;
        Ok(Self { snapshot, client })
    }

    fn from_response(record: LocalRecord, client: &Arc<ApiClient>) -> Result<Self> {
        Self::from_local(Value::Object(record), Some(client.clone()))
    }

    /// Fetch one bounce by ID using the shared client.
    pub async fn find(id: u64) -> Result<Self> {
        Self::find_with(&registry::api_client()?, id).await
    }

    /// Fetch one bounce by ID.
    ///
    /// IDs are positive; `0` fails with [`Error::NotFound`] without a request.
    pub async fn find_with(client: &Arc<ApiClient>, id: u64) -> Result<Self> {
        if id == 0 {
            return Err(Error::NotFound {
                message: "bounce IDs are positive integers".to_string(),
            });
        }
        let record = client.get_bounce(id).await?;
        Self::from_response(record, client)
    }

    /// List bounces matching `query` using the shared client.
    pub async fn all(query: &BounceQuery) -> Result<Vec<Self>> {
        Self::all_with(&registry::api_client()?, query).await
    }

    /// List bounces matching `query`, in the order the service returns them.
    pub async fn all_with(client: &Arc<ApiClient>, query: &BounceQuery) -> Result<Vec<Self>> {
        client
            .get_bounces(query)
            .await?
            .into_iter()
            .map(|record| Self::from_response(record, client))
            .collect()
    }

    /// Tags with bounced messages, using the shared client.
    pub async fn tags() -> Result<Vec<String>> {
        Self::tags_with(&registry::api_client()?).await
    }

    /// Tags with bounced messages.
    ///
    /// # Examples
    /// ```no_run
    /// # use postmark_client::{ApiClient, Bounce};
    /// # use std::sync::Arc;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), postmark_client::Error> {
    /// let client = Arc::new(ApiClient::new("server-token")?);
    /// for tag in Bounce::tags_with(&client).await? {
    ///     println!("{tag}");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn tags_with(client: &Arc<ApiClient>) -> Result<Vec<String>> {
        client.get_bounced_tags().await
    }

    /// Fetch the raw SMTP dump of this bounce.
    pub async fn dump(&self) -> Result<String> {
        self.api_client()?.dump_bounce(self.snapshot.id).await
    }

    /// Reactivate the recipient and return the updated bounce.
    ///
    /// `self` keeps describing the bounce as it was before the call.
    pub async fn activate(&self) -> Result<Self> {
        let client = self.api_client()?;
        let record = client.activate_bounce(self.snapshot.id).await?;
        Self::from_response(record, &client)
    }

    /// The client bound at construction, or the shared one.
    fn api_client(&self) -> Result<Arc<ApiClient>> {
        match &self.client {
            Some(client) => Ok(client.clone()),
            None => registry::api_client(),
        }
    }

    /// Service-assigned bounce ID.
    pub fn id(&self) -> u64 {
        self.snapshot.id
    }

    /// Raw type name, e.g. `HardBounce`.
    pub fn kind(&self) -> &str {
        &self.snapshot.kind
    }

    /// Type name parsed into a [`BounceType`].
    pub fn bounce_type(&self) -> BounceType {
        BounceType::from(self.snapshot.kind.as_str())
    }

    /// Numeric type code, `0` when absent.
    pub fn type_code(&self) -> i64 {
        self.snapshot.type_code
    }

    /// Human-readable type name, e.g. `Hard bounce`.
    pub fn name(&self) -> Option<&str> {
        self.snapshot.name.as_deref()
    }

    /// ID of the message that bounced.
    pub fn message_id(&self) -> Option<&str> {
        self.snapshot.message_id.as_deref()
    }

    /// ID of the server that sent the message.
    pub fn server_id(&self) -> Option<u64> {
        self.snapshot.server_id
    }

    /// Message stream the message was sent through, e.g. `outbound`.
    pub fn message_stream(&self) -> Option<&str> {
        self.snapshot.message_stream.as_deref()
    }

    /// Explanation of the bounce type.
    pub fn description(&self) -> Option<&str> {
        self.snapshot.description.as_deref()
    }

    /// Diagnostic text from the receiving server.
    pub fn details(&self) -> Option<&str> {
        self.snapshot.details.as_deref()
    }

    /// Recipient address that bounced.
    pub fn email(&self) -> Option<&str> {
        self.snapshot.email.as_deref()
    }

    /// When the bounce was recorded, with the offset the service reported.
    pub fn bounced_at(&self) -> Option<DateTime<FixedOffset>> {
        self.snapshot.bounced_at
    }

    /// Tag of the message that bounced.
    pub fn tag(&self) -> Option<&str> {
        self.snapshot.tag.as_deref()
    }

    /// Subject of the message that bounced.
    pub fn subject(&self) -> Option<&str> {
        self.snapshot.subject.as_deref()
    }

    /// Full message content, present only when the service includes it.
    pub fn content(&self) -> Option<&str> {
        self.snapshot.content.as_deref()
    }

    /// Whether the recipient is deactivated and will not receive mail.
    pub fn is_inactive(&self) -> bool {
        self.snapshot.inactive
    }

    /// Whether [`Bounce::activate`] is allowed for this bounce.
    pub fn can_activate(&self) -> bool {
        self.snapshot.can_activate
    }

    /// Whether [`Bounce::dump`] can still return the SMTP dump.
    pub fn has_dump_available(&self) -> bool {
        self.snapshot.dump_available
    }
}

fn parse_bounced_at(value: &str) -> std::result::Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_str(value, BOUNCED_AT_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
}

fn deserialize_bounced_at<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|value| {
        parse_bounced_at(&value).map_err(|e| {
            serde::de::Error::custom(format!("invalid bounce timestamp {value:?}: {e}"))
        })
    })
    .transpose()
}
