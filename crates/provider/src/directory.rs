//! The [`ProviderDirectory`] seam between the resolver and the Provider
//! service.

use async_trait::async_trait;

use provnet_core::address::AddressKey;
use provnet_core::coverage::CoverageRule;
use provnet_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::api::ProviderApiError;

/// A service provider as the Provider service describes it.
///
/// Deserialized leniently: the collaborator may grow fields we do not
/// care about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: DbId,
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_active() -> bool {
    true
}

/// Read access to the provider catalog and coverage rules.
///
/// Implemented by [`ProviderApi`](crate::api::ProviderApi) over HTTP and
/// by in-memory stubs in tests.
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    /// The full active-provider list (fallback tier and enrichment).
    async fn active_providers(&self) -> Result<Vec<Provider>, ProviderApiError>;

    /// Coverage rules that may apply to the given normalized address.
    ///
    /// Implementations filter at least by city; the caller re-applies
    /// the full street/house matching locally.
    async fn coverage_rules(&self, key: &AddressKey) -> Result<Vec<CoverageRule>, ProviderApiError>;
}
