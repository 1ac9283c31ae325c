//! Read-only listings
//!
//! Out-of-band queries that never touch the lifecycle: look up one generated
//! name by id, or list the authority's resource type catalogue.

use proactnaming_client::{RecordId, ResourceType};
use serde::Serialize;
use tracing::debug;

use crate::classify::{classify, Operation};
use crate::error::Result;
use crate::provider::ProviderContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedNameEntry {
    pub id: i64,
    pub resource_name: String,
    pub resource_type_name: String,
}

/// Result of the `generated_name` listing: zero or one entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedNameListing {
    pub id: i64,
    pub generated_names: Vec<GeneratedNameEntry>,
}

pub async fn generated_name(context: &ProviderContext, id: i64) -> Result<GeneratedNameListing> {
    let authority = context.require_authority()?;
    let record_id = RecordId(id);

    let generated_names = match authority.lookup(record_id).await {
        Ok(lookup) => vec![GeneratedNameEntry {
            id: lookup.record_id.value(),
            resource_type_name: lookup.resource_type_name().unwrap_or_default().to_string(),
            resource_name: lookup.resolved_name,
        }],
        Err(e) if e.is_not_found() => {
            debug!(record_id = %record_id, "no generated name with this id");
            Vec::new()
        }
        Err(e) => return Err(classify(Operation::ListGeneratedName, e, &record_id.to_string())),
    };

    Ok(GeneratedNameListing {
        id,
        generated_names,
    })
}

pub async fn resource_types(context: &ProviderContext) -> Result<Vec<ResourceType>> {
    let authority = context.require_authority()?;
    authority
        .resource_types()
        .await
        .map_err(|e| classify(Operation::ListResourceTypes, e, "resource types"))
}
