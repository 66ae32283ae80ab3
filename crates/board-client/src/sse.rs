//! Incremental `text/event-stream` decoding and typed realtime subscriptions.

use domains::ChangeEvent;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::ClientError;

/// One dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    /// Decodes the payload and checks it against the `event:` name.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<ChangeEvent<T>, ClientError> {
        let change: ChangeEvent<T> = serde_json::from_str(&self.data)?;
        match self.event.as_deref() {
            Some(name) if name != change.kind() => Err(ClientError::EventMismatch {
                event: name.to_string(),
                payload: change.kind(),
            }),
            _ => Ok(change),
        }
    }
}

/// Turns arbitrary body chunks into frames. Lines may be split across
/// chunks; comment lines (keep-alives) are skipped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(frame) = self.line(line) {
                frames.push(frame);
            }
        }
        frames
    }

    fn line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            let event = self.event.take();
            if self.data.is_empty() {
                return None;
            }
            let data = std::mem::take(&mut self.data).join("\n");
            return Some(SseFrame { event, data });
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }
}

/// A live realtime channel. Dropping it tears down the connection.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::Receiver<ChangeEvent<T>>,
    task: Option<JoinHandle<()>>,
}

impl<T> Subscription<T> {
    /// A subscription fed by someone else, e.g. a test or an in-process feed.
    pub fn from_receiver(rx: mpsc::Receiver<ChangeEvent<T>>) -> Self {
        Self { rx, task: None }
    }

    pub(crate) fn with_task(rx: mpsc::Receiver<ChangeEvent<T>>, task: JoinHandle<()>) -> Self {
        Self {
            rx,
            task: Some(task),
        }
    }

    /// Next change, or `None` once the channel has closed.
    pub async fn next(&mut self) -> Option<ChangeEvent<T>> {
        self.rx.recv().await
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{Category, Idea, IdeaId};
    use tokio_test::{assert_pending, assert_ready_eq, task};

    fn idea_json() -> String {
        let idea = Idea {
            id: IdeaId::new(),
            title: "Widget".into(),
            description: None,
            category: Category::Closed,
            created_at: chrono::Utc::now(),
            message_count: 0,
        };
        serde_json::to_string(&ChangeEvent::Insert { new: idea }).unwrap()
    }

    #[test]
    fn frames_survive_arbitrary_chunking() {
        let payload = format!(": keep-alive\n\nevent: insert\r\ndata: {}\n\n", idea_json());
        let mut decoder = SseDecoder::new();
        let mut frames = Vec::new();
        for chunk in payload.as_bytes().chunks(7) {
            frames.extend(decoder.push(chunk));
        }

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("insert"));
        let change: ChangeEvent<Idea> = frames[0].decode().unwrap();
        assert_eq!(change.record().category, Category::Closed);
    }

    #[test]
    fn event_name_must_match_the_payload() {
        let frame = SseFrame {
            event: Some("delete".into()),
            data: idea_json(),
        };
        assert!(matches!(
            frame.decode::<Idea>(),
            Err(ClientError::EventMismatch { .. })
        ));
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let frame = SseFrame {
            event: None,
            data: "{\"type\":\"insert\",\"new\":{}}".into(),
        };
        assert!(matches!(frame.decode::<Idea>(), Err(ClientError::Decode(_))));
    }

    #[test]
    fn blank_title_is_refused_at_the_boundary() {
        let data = idea_json().replace("\"Widget\"", "\"  \"");
        let frame = SseFrame {
            event: Some("insert".into()),
            data,
        };
        assert!(matches!(frame.decode::<Idea>(), Err(ClientError::Decode(_))));
    }

    #[tokio::test]
    async fn subscription_waits_for_the_next_change() {
        let (tx, rx) = mpsc::channel(4);
        let mut sub = Subscription::<Idea>::from_receiver(rx);
        {
            let mut next = task::spawn(sub.next());
            assert_pending!(next.poll());
        }

        let change: ChangeEvent<Idea> = serde_json::from_str(&idea_json()).unwrap();
        tx.send(change.clone()).await.unwrap();
        let mut next = task::spawn(sub.next());
        assert_ready_eq!(next.poll(), Some(change));
    }

    #[tokio::test]
    async fn dropping_the_subscription_aborts_its_reader() {
        let (_tx, rx) = mpsc::channel::<ChangeEvent<Idea>>(1);
        let (alive_tx, alive_rx) = tokio::sync::oneshot::channel::<()>();
        let reader = tokio::spawn(async move {
            let _alive = alive_tx;
            std::future::pending::<()>().await;
        });

        drop(Subscription::with_task(rx, reader));
        assert!(alive_rx.await.is_err());
    }
}
