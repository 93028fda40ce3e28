use serde::{Deserialize, Serialize};

/// Count snapshot bound for one callback target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub target_url: String,
    pub unique_count: usize,
}

/// JSON body of a callback POST: `{"unique_count": n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub unique_count: usize,
}

impl From<&NotificationRequest> for NotificationPayload {
    fn from(req: &NotificationRequest) -> Self {
        Self {
            unique_count: req.unique_count,
        }
    }
}
