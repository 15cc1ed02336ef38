use super::*;

/// Token held by a CIS-1 registry contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, SchemaType)]
pub struct AssetRef {
    /// Registry contract address.
    pub contract: ContractAddress,
    /// Token identifier inside the registry.
    pub id: ContractTokenId,
}

impl AssetRef {
    pub fn new(contract: ContractAddress, id: ContractTokenId) -> Self {
        Self { contract, id }
    }
}
