// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::config::UnitConfig;
use crate::errors::UnitError;
use crate::observability::messages::unit::MessageReceived;
use crate::observability::messages::StructuredLog;
use crate::traits::{callback, Handler, Message, MessageCallback};

pub const TYPE_NAME: &str = "message_logger";

/// Logs every message received on its `subjects` and counts them per subject.
pub struct MessageLogger {
    subjects: Vec<String>,
    received: Mutex<BTreeMap<String, u64>>,
}

impl MessageLogger {
    pub fn from_config(cfg: &UnitConfig) -> Result<Self, UnitError> {
        let mut subjects = cfg
            .get_str_list("subjects")?
            .ok_or_else(|| UnitError::MissingOption("subjects".to_string()))?;
        let mut seen = HashSet::new();
        subjects.retain(|subject| seen.insert(subject.clone()));
        if subjects.is_empty() {
            return Err(UnitError::invalid_option("subjects", "must not be empty"));
        }
        Ok(Self {
            subjects,
            received: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn received(&self, subject: &str) -> u64 {
        self.lock_received().get(subject).copied().unwrap_or(0)
    }

    pub fn total_received(&self) -> u64 {
        self.lock_received().values().sum()
    }

    fn record(&self, message: &Message) {
        let body = String::from_utf8_lossy(message.payload.as_bytes());
        MessageReceived {
            unit: TYPE_NAME,
            subject: &message.subject,
            body: &body,
        }
        .log();
        *self
            .lock_received()
            .entry(message.subject.clone())
            .or_insert(0) += 1;
    }

    fn lock_received(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, u64>> {
        self.received.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Handler for MessageLogger {
    fn name(&self) -> &'static str {
        TYPE_NAME
    }

    fn get_handlers(self: Arc<Self>) -> Vec<(String, MessageCallback)> {
        self.subjects
            .iter()
            .map(|subject| {
                let this = Arc::clone(&self);
                let on_message = callback(move |message: Message| {
                    this.record(&message);
                    async {}
                });
                (subject.clone(), on_message)
            })
            .collect()
    }

    fn details(&self) -> serde_json::Value {
        serde_json::json!({
            "subjects": self.subjects,
            "received": *self.lock_received(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Payload;

    #[test]
    fn test_requires_subjects() {
        let missing = MessageLogger::from_config(&UnitConfig::new());
        assert!(matches!(missing, Err(UnitError::MissingOption(o)) if o == "subjects"));

        let empty = MessageLogger::from_config(&UnitConfig::new().with("subjects", Vec::<String>::new()));
        assert!(matches!(empty, Err(UnitError::InvalidOption { .. })));

        let wrong = MessageLogger::from_config(&UnitConfig::new().with("subjects", "alerts"));
        assert!(matches!(wrong, Err(UnitError::InvalidOption { .. })));
    }

    #[tokio::test]
    async fn test_counts_per_subject() {
        let logger = Arc::new(
            MessageLogger::from_config(&UnitConfig::new().with("subjects", vec!["a", "b"])).unwrap(),
        );

        let handlers = Arc::clone(&logger).get_handlers();
        assert_eq!(handlers.len(), 2);

        for (subject, cb) in &handlers {
            cb(Message {
                subject: subject.clone(),
                payload: Payload::text("hi"),
            })
            .await;
        }
        let (subject, cb) = &handlers[0];
        cb(Message {
            subject: subject.clone(),
            payload: Payload::new(vec![0xff, 0xfe]),
        })
        .await;

        assert_eq!(logger.received("a"), 2);
        assert_eq!(logger.received("b"), 1);
        assert_eq!(logger.total_received(), 3);
        assert_eq!(logger.details()["received"]["a"], 2);
    }
}
