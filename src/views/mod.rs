//! View state machines. They call the data hooks, hold local form state and
//! report every outcome through the [`Toaster`]; they never propagate a
//! backend failure as anything but an error state.

pub mod create;
pub mod details;
pub mod enquiry;
pub mod image;
pub mod list;
pub mod toast;

pub use create::{CreateItemForm, SubmitState, ITEM_TYPES};
pub use details::{DetailsDialog, DialogMode, EditFields};
pub use enquiry::EnquiryForm;
pub use image::{image_src, PLACEHOLDER_IMAGE};
pub use list::{filter_items, ListState, ListView};
pub use toast::{Toast, ToastVariant, Toaster};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Raised while a submit is running; lowered when it finishes or is dropped.
struct SubmitGuard(Arc<AtomicBool>);

impl SubmitGuard {
    fn engage(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag.clone())
    }
}

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
