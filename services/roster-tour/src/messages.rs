use std::sync::Arc;

use futures::{Stream, TryStreamExt};
use scylla::frame::response::result::{CqlValue, Row};
use tracing::debug;
use uuid::Uuid;

use rosterkit::database::{scan_as, scan_pages_as, PageSource, ScyllaConnection};
use rosterkit::types::{Page, PageSize, QueryDescriptor};
use rosterkit::RosterError;

const INSERT: &str = "INSERT INTO messages (channel, username, msg_id, content) VALUES (?, ?, ?, ?)";
const SELECT_USERNAME_CONTENT: &str = "SELECT username, content FROM messages WHERE channel = ?";
const SELECT_ID_CONTENT: &str = "SELECT msg_id, content FROM messages WHERE channel = ?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub channel: Uuid,
    pub msg_id: i32,
    pub username: String,
    pub content: Option<String>,
}

impl Message {
    pub fn new(channel: Uuid, msg_id: i32, username: &str, content: Option<&str>) -> Self {
        Self {
            channel,
            msg_id,
            username: username.to_string(),
            content: content.map(str::to_string),
        }
    }

    /// Bind values in `INSERT` column order; absent content binds null.
    pub fn bind_values(&self) -> (Uuid, &str, i32, Option<&str>) {
        (
            self.channel,
            self.username.as_str(),
            self.msg_id,
            self.content.as_deref(),
        )
    }
}

/// The five messages the tour writes before paginating.
pub fn sample_messages(channel: Uuid) -> Vec<Message> {
    [
        (1, "ming", "one"),
        (2, "ming", "two"),
        (3, "ming", "three"),
        (4, "sam", "four"),
        (5, "sam", "five"),
    ]
    .into_iter()
    .map(|(msg_id, username, content)| Message::new(channel, msg_id, username, Some(content)))
    .collect()
}

pub fn by_channel_query(channel: Uuid, page_size: PageSize) -> QueryDescriptor {
    QueryDescriptor::new(SELECT_USERNAME_CONTENT)
        .bind(CqlValue::Uuid(channel))
        .with_page_size(page_size)
}

pub fn contents_query(channel: Uuid, page_size: PageSize) -> QueryDescriptor {
    QueryDescriptor::new(SELECT_ID_CONTENT)
        .bind(CqlValue::Uuid(channel))
        .with_page_size(page_size)
}

/// `(username, content)` for every message in `channel`, one page of `page_size` rows at a time.
///
/// Each page is decoded before the next one is requested.
pub fn pages_by_channel<'a, S>(
    source: &'a S,
    channel: Uuid,
    page_size: PageSize,
) -> impl Stream<Item = Result<Page<(String, Option<String>)>, RosterError>> + 'a
where
    S: PageSource<Row = Row> + ?Sized,
{
    scan_pages_as::<_, (String, Option<String>)>(source, by_channel_query(channel, page_size))
}

/// `(msg_id, content)` for every message in `channel`; null content stays `None`.
pub async fn contents<S>(
    source: &S,
    channel: Uuid,
    page_size: PageSize,
) -> Result<Vec<(i32, Option<String>)>, RosterError>
where
    S: PageSource<Row = Row> + ?Sized,
{
    scan_as::<_, (i32, Option<String>)>(source, contents_query(channel, page_size))
        .try_collect()
        .await
}

pub struct MessageRepository {
    conn: Arc<ScyllaConnection>,
}

impl MessageRepository {
    pub fn new(conn: Arc<ScyllaConnection>) -> Self {
        Self { conn }
    }

    pub async fn insert(&self, message: &Message) -> Result<(), RosterError> {
        debug!(
            "Inserting message {} in channel {}",
            message.msg_id, message.channel
        );
        self.conn
            .execute_with_values(INSERT, message.bind_values())
            .await?;
        Ok(())
    }

    pub async fn insert_all(&self, messages: &[Message]) -> Result<(), RosterError> {
        for message in messages {
            self.insert(message).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::StreamExt;
    use rosterkit::types::ContinuationToken;

    /// Serves stored messages for one channel the way the cluster pages a partition.
    struct ChannelSource {
        messages: Vec<Message>,
    }

    #[async_trait]
    impl PageSource for ChannelSource {
        type Row = Row;

        async fn fetch_page(
            &self,
            query: &QueryDescriptor,
            token: Option<ContinuationToken>,
        ) -> Result<Page<Row>, RosterError> {
            let start = token.map(|t| t.as_bytes()[0] as usize).unwrap_or(0);
            let end = (start + query.page_size.get() as usize).min(self.messages.len());
            let rows = self.messages[start..end]
                .iter()
                .map(|m| {
                    let first = if query.statement == SELECT_ID_CONTENT {
                        CqlValue::Int(m.msg_id)
                    } else {
                        CqlValue::Text(m.username.clone())
                    };
                    Row {
                        columns: vec![Some(first), m.content.clone().map(CqlValue::Text)],
                    }
                })
                .collect();
            let next = if end < self.messages.len() {
                ContinuationToken::from_bytes(vec![end as u8])
            } else {
                None
            };
            Ok(Page { rows, next })
        }
    }

    #[test]
    fn test_sample_messages_share_a_channel() {
        let channel = Uuid::new_v4();
        let messages = sample_messages(channel);
        assert_eq!(messages.len(), 5);
        assert!(messages.iter().all(|m| m.channel == channel));
        assert_eq!(
            messages.iter().map(|m| m.msg_id).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn test_absent_content_binds_null() {
        let message = Message::new(Uuid::nil(), 6, "ming", None);
        let (_, username, msg_id, content) = message.bind_values();
        assert_eq!((username, msg_id, content), ("ming", 6, None));
    }

    #[tokio::test]
    async fn test_pages_of_two_split_five_messages() {
        let channel = Uuid::new_v4();
        let source = ChannelSource {
            messages: sample_messages(channel),
        };

        let pages: Vec<Page<(String, Option<String>)>> =
            pages_by_channel(&source, channel, PageSize::new(2).unwrap())
                .try_collect()
                .await
                .unwrap();
        let contents: Vec<Vec<&str>> = pages
            .iter()
            .map(|page| page.rows.iter().map(|(_, c)| c.as_deref().unwrap()).collect())
            .collect();
        assert_eq!(
            contents,
            vec![vec!["one", "two"], vec!["three", "four"], vec!["five"]]
        );
        assert_eq!(
            pages.iter().map(Page::is_last).collect::<Vec<_>>(),
            vec![false, false, true]
        );
    }

    #[tokio::test]
    async fn test_first_page_arrives_before_the_rest_are_read() {
        let channel = Uuid::new_v4();
        let source = ChannelSource {
            messages: sample_messages(channel),
        };

        let mut pages = Box::pin(pages_by_channel(&source, channel, PageSize::new(2).unwrap()));
        let first = pages.next().await.unwrap().unwrap();
        assert_eq!(
            first.rows,
            vec![
                ("ming".to_string(), Some("one".to_string())),
                ("ming".to_string(), Some("two".to_string())),
            ]
        );
        assert!(!first.is_last());
    }

    #[tokio::test]
    async fn test_null_content_is_reported_as_none() {
        let channel = Uuid::new_v4();
        let mut messages = sample_messages(channel);
        messages.push(Message::new(channel, 6, "ming", None));
        messages.push(Message::new(channel, 7, "sam", Some("")));
        let source = ChannelSource { messages };

        let rows = contents(&source, channel, PageSize::new(3).unwrap())
            .await
            .unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[5], (6, None));
        assert_eq!(rows[6], (7, Some(String::new())));
    }
}
