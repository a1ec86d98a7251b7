// Scheduler plugin support. Two third-party plugins can time publish and
// unpublish actions on the CMS; they are mutually exclusive and expose
// different endpoints and request shapes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{Display, EnumString};

/// Which scheduling plugin is installed on the target CMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SchedulerPlugin {
    /// Plugin exposing `POST /scheduler/create`.
    Scheduler,
    /// Plugin exposing `POST /publisher/actions`.
    Publisher,
}

/// Request body for the `scheduler` plugin.
#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleCreate {
    pub content_id: i64,
    pub uid: String,
    pub scheduled_datetime: DateTime<Utc>,
    pub schedule_type: &'static str,
}

/// Inner payload for the `publisher` plugin.
#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublisherAction {
    pub entity_id: i64,
    pub entity_slug: String,
    pub execute_at: DateTime<Utc>,
    pub mode: &'static str,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct PublisherActionEnvelope {
    pub data: PublisherAction,
}

/// Body sent to whichever plugin is configured.
#[derive(Serialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum ScheduleRequest {
    Scheduler(ScheduleCreate),
    Publisher(PublisherActionEnvelope),
}

/// The content-type uid the CMS uses for single-collection APIs.
fn content_uid(content_type: &str) -> String {
    format!("api::{content_type}.{content_type}")
}

impl SchedulerPlugin {
    /// Admin path (relative to the CMS root) the plugin listens on.
    pub fn path(self) -> &'static str {
        match self {
            SchedulerPlugin::Scheduler => "scheduler/create",
            SchedulerPlugin::Publisher => "publisher/actions",
        }
    }

    pub fn request(
        self,
        content_type: &str,
        id: i64,
        date: DateTime<Utc>,
        publish: bool,
    ) -> ScheduleRequest {
        match self {
            SchedulerPlugin::Scheduler => ScheduleRequest::Scheduler(ScheduleCreate {
                content_id: id,
                uid: content_uid(content_type),
                scheduled_datetime: date,
                schedule_type: if publish { "schedule" } else { "depublish" },
            }),
            SchedulerPlugin::Publisher => ScheduleRequest::Publisher(PublisherActionEnvelope {
                data: PublisherAction {
                    entity_id: id,
                    entity_slug: content_uid(content_type),
                    execute_at: date,
                    mode: if publish { "publish" } else { "unpublish" },
                },
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn parses_plugin_names() {
        assert_eq!("scheduler".parse::<SchedulerPlugin>().unwrap(), SchedulerPlugin::Scheduler);
        assert_eq!("Publisher".parse::<SchedulerPlugin>().unwrap(), SchedulerPlugin::Publisher);
        assert!("cron".parse::<SchedulerPlugin>().is_err());
        assert_eq!(SchedulerPlugin::Publisher.to_string(), "publisher");
    }

    #[test]
    fn scheduler_body_for_unpublish() {
        let body = SchedulerPlugin::Scheduler.request("article", 7, date(), false);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "contentId": 7,
                "uid": "api::article.article",
                "scheduledDatetime": "2024-05-01T09:30:00Z",
                "scheduleType": "depublish"
            })
        );
    }

    #[test]
    fn publisher_body_for_publish() {
        let body = SchedulerPlugin::Publisher.request("page", 3, date(), true);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "data": {
                    "entityId": 3,
                    "entitySlug": "api::page.page",
                    "executeAt": "2024-05-01T09:30:00Z",
                    "mode": "publish"
                }
            })
        );
    }

    #[test]
    fn plugin_paths() {
        assert_eq!(SchedulerPlugin::Scheduler.path(), "scheduler/create");
        assert_eq!(SchedulerPlugin::Publisher.path(), "publisher/actions");
    }
}
