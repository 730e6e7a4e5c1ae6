use crate::upload::BlobStore;

/// Grey "Image" tile shown in place of a missing or dead reference.
pub const PLACEHOLDER_IMAGE: &str = "data:image/svg+xml,%3Csvg xmlns='http://www.w3.org/2000/svg' width='100' height='100' viewBox='0 0 100 100'%3E%3Crect width='100' height='100' fill='%23f1f5f9'/%3E%3Ctext x='50' y='50' text-anchor='middle' dy='.3em' fill='%2394a3b8'%3EImage%3C/text%3E%3C/svg%3E";

/// Source to render for a stored image reference.
pub fn image_src(reference: Option<&str>, blobs: &BlobStore) -> String {
    match reference {
        Some(reference) if blobs.is_live(reference) => reference.to_string(),
        _ => PLACEHOLDER_IMAGE.to_string(),
    }
}
