use tracing::debug;

use crate::models::{ChatMessage, Citation, MessageRole, MessageStatus};

/// Text shown in place of the answer when the transport fails.
pub const STREAM_FAILED_MESSAGE: &str = "Error: failed to stream.";

/// Ordered chat history. Append-only, except for in-place mutation of the one
/// open assistant message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    /// Index of the open assistant message, if any.
    open: Option<usize>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn open_message(&self) -> Option<&ChatMessage> {
        self.open.map(|i| &self.messages[i])
    }

    pub fn open_message_id(&self) -> Option<&str> {
        self.open_message().map(|m| m.id.as_str())
    }

    pub fn is_streaming(&self) -> bool {
        self.open.is_some()
    }

    pub fn last_assistant(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.role == MessageRole::Assistant)
    }

    pub fn append_user_message(&mut self, text: impl Into<String>) -> String {
        let msg = ChatMessage::new(MessageRole::User, text.into(), MessageStatus::Complete);
        let id = msg.id.clone();
        self.messages.push(msg);
        id
    }

    /// Start an empty assistant message. A previously open one is closed first.
    pub fn open_assistant_message(&mut self) -> String {
        self.close_stream();
        let msg = ChatMessage::new(MessageRole::Assistant, String::new(), MessageStatus::Open);
        let id = msg.id.clone();
        self.messages.push(msg);
        self.open = Some(self.messages.len() - 1);
        id
    }

    /// Append streamed text to the open message. Returns `false` if nothing is open.
    pub fn apply_token(&mut self, text: &str) -> bool {
        match self.open_mut() {
            Some(msg) => {
                msg.content.push_str(text);
                true
            }
            None => false,
        }
    }

    /// Replace the open message's content with the authoritative answer and
    /// attach its citations.
    pub fn apply_final(&mut self, answer: impl Into<String>, citations: Vec<Citation>) -> bool {
        match self.open_mut() {
            Some(msg) => {
                msg.content = answer.into();
                msg.citations = citations;
                true
            }
            None => false,
        }
    }

    /// Close the open message. Returns `true` only for the call that closed it.
    pub fn close_stream(&mut self) -> bool {
        self.finish_open(MessageStatus::Complete, None)
    }

    /// Replace the open message's content with an error and close it.
    pub fn fail_stream(&mut self, message: impl Into<String>) -> bool {
        self.finish_open(MessageStatus::Failed, Some(message.into()))
    }

    fn open_mut(&mut self) -> Option<&mut ChatMessage> {
        self.open.map(|i| &mut self.messages[i])
    }

    fn finish_open(&mut self, status: MessageStatus, replacement: Option<String>) -> bool {
        let Some(i) = self.open.take() else {
            return false;
        };
        let msg = &mut self.messages[i];
        if let Some(text) = replacement {
            msg.content = text;
        }
        msg.status = status;
        debug!(message_id = %msg.id, ?status, "assistant message closed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_accumulate_on_the_open_message() {
        let mut t = Transcript::new();
        t.append_user_message("what is the torque?");
        let id = t.open_assistant_message();
        assert!(t.apply_token("Hel"));
        assert!(t.apply_token("lo"));
        assert_eq!(t.get(&id).unwrap().content, "Hello");
        assert_eq!(t.open_message_id(), Some(id.as_str()));
    }

    #[test]
    fn final_replaces_rather_than_appends() {
        let mut t = Transcript::new();
        let id = t.open_assistant_message();
        t.apply_token("Hel");
        t.apply_token("lo");
        t.apply_final("Goodbye", Vec::new());
        assert_eq!(t.get(&id).unwrap().content, "Goodbye");
    }

    #[test]
    fn closed_message_is_immutable() {
        let mut t = Transcript::new();
        let id = t.open_assistant_message();
        t.apply_token("done");
        assert!(t.close_stream());
        assert!(!t.close_stream());
        assert!(!t.apply_token(" more"));
        assert!(!t.apply_final("other", Vec::new()));
        assert!(!t.fail_stream("late error"));
        let msg = t.get(&id).unwrap();
        assert_eq!(msg.content, "done");
        assert_eq!(msg.status, MessageStatus::Complete);
    }

    #[test]
    fn opening_a_new_message_closes_the_previous() {
        let mut t = Transcript::new();
        let first = t.open_assistant_message();
        let second = t.open_assistant_message();
        assert_eq!(t.get(&first).unwrap().status, MessageStatus::Complete);
        assert!(t.get(&second).unwrap().is_open());
        assert_eq!(t.messages().iter().filter(|m| m.is_open()).count(), 1);
    }

    #[test]
    fn failure_replaces_content_with_error() {
        let mut t = Transcript::new();
        let id = t.open_assistant_message();
        t.apply_token("partial");
        assert!(t.fail_stream(STREAM_FAILED_MESSAGE));
        let msg = t.get(&id).unwrap();
        assert_eq!(msg.content, STREAM_FAILED_MESSAGE);
        assert_eq!(msg.status, MessageStatus::Failed);
        assert!(!t.is_streaming());
    }
}
