use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::models::NamingRecord;

pub struct ResultCache {
    ttl: Duration,
    entries: HashMap<String, NamingRecord>,
}

impl ResultCache {
    pub fn new(ttl: std::time::Duration) -> Self {
        let ttl = Duration::from_std(ttl).unwrap_or_else(|_| Duration::minutes(10));
        Self { ttl, entries: HashMap::new() }
    }

    pub fn get_fresh(&self, request_id: &str, now: DateTime<Utc>) -> Option<&NamingRecord> {
        self.entries
            .get(request_id)
            .filter(|record| now - record.created_at < self.ttl)
    }

    /// Stores a record and drops everything that has expired.
    pub fn insert(&mut self, record: NamingRecord, now: DateTime<Utc>) {
        self.purge_expired(now);
        self.entries.insert(record.request_id.clone(), record);
    }

    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, record| now - record.created_at < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
