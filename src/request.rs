use std::path::Path;

use reqwest::{header, Client, RequestBuilder, StatusCode};
use tracing::{debug, warn};

use crate::error::DownloadError;
use crate::state::DownloadState;

/// Builds the GET for `state.source_url()`, asking for `bytes=<baseline>-`
/// when there is prior progress to resume from.
///
/// Sets the state's resume baseline and starting counter as a side effect.
pub fn build_request(client: &Client, state: &DownloadState, baseline: u64) -> RequestBuilder {
    let offset = if state.use_progress_file() { baseline } else { 0 };
    state.resume_from(offset);

    let request = client.get(state.source_url());
    if offset > 0 {
        debug!(offset, "requesting byte range to resume");
        request.header(header::RANGE, format!("bytes={}-", offset))
    } else {
        request
    }
}

/// Checks the response status against what was asked for.
///
/// A 200 in answer to a range request means the server ignored `Range`; writing
/// that body at `resume_offset` would corrupt the file, so this is fatal and the
/// sidecar is left for the user to remove.
pub fn validate_response(
    url: &str,
    status: StatusCode,
    resume_offset: u64,
    progress_path: &Path,
) -> Result<(), DownloadError> {
    if status != StatusCode::OK && status != StatusCode::PARTIAL_CONTENT {
        return Err(DownloadError::BadStatus {
            url: url.to_string(),
            status,
        });
    }

    if resume_offset > 0 && status != StatusCode::PARTIAL_CONTENT {
        return Err(DownloadError::ResumeRejected {
            progress_path: progress_path.to_path_buf(),
            offset: resume_offset,
        });
    }

    Ok(())
}

/// Full size of the resource: resume offset plus the remaining length the
/// server declared. 0 (unknown) when no length was sent or the sum overflows.
pub fn total_size(resume_offset: u64, content_length: Option<u64>) -> u64 {
    let Some(remaining) = content_length else {
        return 0;
    };
    match resume_offset.checked_add(remaining) {
        Some(total) => total,
        None => {
            warn!(resume_offset, remaining, "declared length overflows, treating size as unknown");
            0
        }
    }
}
