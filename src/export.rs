//! Bulk export of every feature in the configured region.

use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;
use crate::upstream::{GeodataClient, TokenManager};

/// Records requested per page
pub const PAGE_SIZE: u64 = 5000;

/// Page through the region query until the upstream stops reporting an
/// exceeded transfer limit.
///
/// A non-success status aborts the export. A page that cannot be fetched or
/// decoded ends the loop early and the features gathered so far are returned.
pub async fn export_region(client: &GeodataClient, tokens: &mut TokenManager) -> Result<Vec<Value>> {
    let settings = client.config().export_settings()?;

    let mut features = Vec::new();
    let mut offset = 0;

    loop {
        let token = tokens.ensure(client).await?;

        let page = match client.region_page(token, settings, offset, PAGE_SIZE).await {
            Ok(page) => page,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!("Service not working correctly. Failing with error : {}", err);
                break;
            }
        };

        let more = page.has_more();
        features.extend(page.features);
        info!(
            "Fetched page at offset {} ({} features so far, exceeded limit: {})",
            offset,
            features.len(),
            more
        );

        if !more {
            break;
        }
        offset += PAGE_SIZE;
        info!("Result offset is now {}", offset);
    }

    info!("Returning {} features...", features.len());
    Ok(features)
}
