use async_trait::async_trait;

/// Outbound sink for reconciliation results. Replies are anchored to the
/// message that started the request.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, conversation_id: i64, anchor_message_id: i64, text: &str) -> Result<(), String>;
}

/// Writes notifications to the log. Used when no bot token is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, conversation_id: i64, anchor_message_id: i64, text: &str) -> Result<(), String> {
        log::info!(
            "[NOTIFY] chat={} reply_to={}: {}",
            conversation_id,
            anchor_message_id,
            text.replace('\n', " | ")
        );
        Ok(())
    }
}
