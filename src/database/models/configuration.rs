use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Queue settings of one project, created with defaults alongside the project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Configuration {
    pub project_id: String,
    pub threshold: i32,
    pub session_time: i32,
    pub host: Option<String>,
    pub base_url: Option<String>,
    pub max_users_in_queue: i32,
    pub queue_start: Option<NaiveDateTime>,
    pub queue_end: Option<NaiveDateTime>,
    pub queue_page_style: String,
    pub queue_html_page: Option<String>,
    pub queue_page_base_color: Option<String>,
    pub queue_page_title: Option<String>,
    pub queue_page_logo: Option<String>,
    pub is_configure: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Configuration {
    pub fn default_for(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            threshold: 0,
            session_time: 0,
            host: None,
            base_url: None,
            max_users_in_queue: 0,
            queue_start: None,
            queue_end: None,
            queue_page_style: "base".to_string(),
            queue_html_page: None,
            queue_page_base_color: None,
            queue_page_title: None,
            queue_page_logo: None,
            is_configure: false,
            updated_at: None,
        }
    }

    /// Apply a validated update; the project counts as configured afterwards
    pub fn apply(&mut self, update: &ConfigurationUpdate, now: DateTime<Utc>) {
        self.threshold = update.threshold;
        self.session_time = update.session_time;
        self.host = Some(update.host.clone());
        self.base_url = Some(update.base_url.clone());
        self.max_users_in_queue = update.max_users_in_queue;
        self.queue_start = Some(update.queue_start);
        self.queue_end = Some(update.queue_end);
        self.is_configure = true;
        self.updated_at = Some(now);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationUpdate {
    pub project_id: String,
    pub threshold: i32,
    pub session_time: i32,
    pub host: String,
    pub base_url: String,
    pub max_users_in_queue: i32,
    pub queue_start: NaiveDateTime,
    pub queue_end: NaiveDateTime,
}
