//! CLI output formatting.
//!
//! Every command prints through a pure `format_*` function that returns the
//! lines to show, with a thin `print_*` wrapper around it. Tests assert on
//! the returned lines.
//!
//! # Output Format
//!
//! ## Upload
//!
//! ```text
//! Batch 1/2 (3 files)
//!     cake.jpg → 0b7e2c1a-... (encoded)
//!     beach.png → 9d41f0aa-... (cached)
//!     FAILED notes.pdf: Unsupported file type 'application/pdf'. Please use JPEG, PNG, GIF, or WebP.
//! Batch 2/2 (1 file)
//!     garden.jpg → 5c2d9e47-... (encoded)
//! Uploaded 3 of 4 photos
//!     Failed: notes.pdf: Unsupported file type 'application/pdf'. Please use JPEG, PNG, GIF, or WebP.
//! ```
//!
//! ## List
//!
//! ```text
//! Photos (page 1 of 3, 125 total)
//! 001 cake.jpg
//!     Id: 0b7e2c1a-...
//!     Uploaded: 2024-03-01 12:00 by sam
//!     Description: Grandma's birthday cake
//! More: --page 2
//! ```

use crate::types::{Photo, PhotoPage};
use crate::upload::{BatchOutcome, UploadEvent};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max).collect::<String>())
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Upload
// ============================================================================

/// Format a single upload progress event as display lines.
pub fn format_upload_event(event: &UploadEvent) -> Vec<String> {
    match event {
        UploadEvent::BatchStarted {
            batch,
            batches,
            files,
        } => vec![format!(
            "Batch {}/{} ({})",
            batch,
            batches,
            plural(*files, "file", "files")
        )],
        UploadEvent::Uploaded {
            filename,
            id,
            cached,
        } => {
            let status = if *cached { "cached" } else { "encoded" };
            vec![format!("{}{} → {} ({})", indent(1), filename, id, status)]
        }
        UploadEvent::Failed { reason, .. } => {
            vec![format!("{}FAILED {}", indent(1), reason)]
        }
    }
}

/// Summarize a finished batch upload: "Uploaded 3 of 5 photos" plus failures.
pub fn format_batch_summary(outcome: &BatchOutcome) -> Vec<String> {
    let mut lines = vec![format!(
        "Uploaded {} of {}",
        outcome.photos.len(),
        plural(outcome.attempted, "photo", "photos")
    )];
    for failure in &outcome.failures {
        lines.push(format!("{}Failed: {}", indent(1), failure));
    }
    lines
}

pub fn print_batch_summary(outcome: &BatchOutcome) {
    for line in format_batch_summary(outcome) {
        println!("{}", line);
    }
}

// ============================================================================
// List
// ============================================================================

fn photo_lines(position: usize, photo: &Photo) -> Vec<String> {
    let mut lines = vec![
        format!("{} {}", format_index(position), photo.filename),
        format!("{}Id: {}", indent(1), photo.id),
        format!(
            "{}Uploaded: {} by {}",
            indent(1),
            photo.uploaded_at.format("%Y-%m-%d %H:%M"),
            photo.uploaded_by
        ),
    ];
    if !photo.description.is_empty() {
        lines.push(format!(
            "{}Description: {}",
            indent(1),
            truncate_desc(&photo.description, 60)
        ));
    }
    lines
}

/// Format one gallery page. Positions continue across pages.
pub fn format_photo_page(page: &PhotoPage) -> Vec<String> {
    let p = &page.pagination;
    if p.total == 0 {
        return vec!["No photos".to_string()];
    }

    let mut lines = vec![format!(
        "Photos (page {} of {}, {} total)",
        p.page, p.total_pages, p.total
    )];
    if page.photos.is_empty() {
        lines.push(format!("{}(no photos on this page)", indent(1)));
    }
    let first = (p.page - 1).saturating_mul(p.limit) + 1;
    for (i, photo) in page.photos.iter().enumerate() {
        lines.extend(photo_lines(first + i, photo));
    }
    if p.has_next {
        lines.push(format!("More: --page {}", p.page + 1));
    }
    lines
}

pub fn print_photo_page(page: &PhotoPage) {
    for line in format_photo_page(page) {
        println!("{}", line);
    }
}

// ============================================================================
// Delete
// ============================================================================

pub fn format_deleted(id: &str, removed: Option<usize>) -> Vec<String> {
    match removed {
        Some(0) => vec![format!("No photo with id {} (nothing deleted)", id)],
        Some(n) => vec![format!("Deleted {} ({})", id, plural(n, "record", "records"))],
        None => vec![format!("Deleted {}", id)],
    }
}

pub fn print_deleted(id: &str, removed: Option<usize>) {
    for line in format_deleted(id, removed) {
        println!("{}", line);
    }
}
