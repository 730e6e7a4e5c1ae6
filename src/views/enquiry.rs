use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::app::AppContext;
use crate::error::{AppError, AppResult};
use crate::hooks::CreateEnquiry;
use crate::models::{default_enquiry_message, EnquiryModel, NewEnquiry};

use super::create::SubmitState;
use super::toast::{Toast, Toaster};
use super::{is_blank, SubmitGuard};

/// "Enquire about <item>" dialog. Name and email are required; a blank
/// message is replaced by a sentence naming the item.
pub struct EnquiryForm {
    item_id: Uuid,
    item_name: String,
    pub name: String,
    pub email: String,
    pub message: String,
    open: bool,
    outcome: SubmitState,
    submitting: Arc<AtomicBool>,
    create: CreateEnquiry,
    toaster: Toaster,
}

impl EnquiryForm {
    pub fn open(ctx: &AppContext, item_id: Uuid, item_name: &str) -> Self {
        Self {
            item_id,
            item_name: item_name.to_string(),
            name: String::new(),
            email: String::new(),
            message: String::new(),
            open: true,
            outcome: SubmitState::Idle,
            submitting: Arc::new(AtomicBool::new(false)),
            create: CreateEnquiry::new(ctx.client.clone()),
            toaster: ctx.toaster.clone(),
        }
    }

    pub fn title(&self) -> String {
        format!("Enquire about {}", self.item_name)
    }

    pub fn message_placeholder(&self) -> String {
        format!("I'm interested in learning more about {}...", self.item_name)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst) || self.create.is_pending()
    }

    pub fn state(&self) -> SubmitState {
        if self.is_submitting() {
            SubmitState::Submitting
        } else {
            self.outcome
        }
    }

    pub async fn submit(&mut self) -> AppResult<EnquiryModel> {
        if self.is_submitting() {
            return Err(AppError::InProgress);
        }
        if is_blank(&self.name) || is_blank(&self.email) {
            self.toaster
                .push(Toast::error("Please fill in your name and email"));
            return Err(AppError::InvalidInput("name and email are required".into()));
        }

        let message = if is_blank(&self.message) {
            default_enquiry_message(&self.item_name)
        } else {
            self.message.clone()
        };
        let enquiry = NewEnquiry {
            item_id: self.item_id,
            user_name: self.name.clone(),
            user_email: self.email.clone(),
            message: Some(message),
        };

        let _guard = SubmitGuard::engage(&self.submitting);
        match self.create.mutate(enquiry).await {
            Ok(created) => {
                self.outcome = SubmitState::Succeeded;
                self.toaster.push(Toast::success(
                    "Enquiry Sent!",
                    "Thank you for your enquiry. We'll get back to you soon.",
                ));
                self.name.clear();
                self.email.clear();
                self.message.clear();
                self.open = false;
                Ok(created)
            }
            Err(e) => {
                self.outcome = SubmitState::Failed;
                self.toaster
                    .push(Toast::error("Failed to send enquiry. Please try again."));
                Err(e)
            }
        }
    }
}
