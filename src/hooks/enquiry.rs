use std::sync::Arc;

use crate::client::EntityClient;
use crate::error::AppResult;
use crate::models::{EnquiryModel, NewEnquiry};

use super::{run_detached, MutationStatus, MutationTracker};

/// Enquiries are never listed by the app, so there is no cache to refresh.
#[derive(Clone)]
pub struct CreateEnquiry {
    client: Arc<dyn EntityClient>,
    tracker: MutationTracker,
}

impl CreateEnquiry {
    pub fn new(client: Arc<dyn EntityClient>) -> Self {
        Self {
            client,
            tracker: MutationTracker::new(),
        }
    }

    pub fn status(&self) -> MutationStatus {
        self.tracker.status()
    }

    pub fn is_pending(&self) -> bool {
        self.tracker.is_pending()
    }

    pub async fn mutate(&self, enquiry: NewEnquiry) -> AppResult<EnquiryModel> {
        let client = self.client.clone();
        run_detached(&self.tracker, async move {
            tracing::info!(item_id = %enquiry.item_id, "Creating enquiry");
            match client.insert_enquiry(&enquiry).await {
                Ok(created) => {
                    tracing::info!(id = %created.id, "Enquiry created");
                    Ok(created)
                }
                Err(e) => {
                    tracing::error!("Error creating enquiry: {}", e);
                    Err(e)
                }
            }
        })
        .await
    }
}
