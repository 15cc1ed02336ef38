use super::*;

pub type ContractResult<A> = Result<A, CustomContractError>;

/// Contract token ID type.
pub type ContractTokenId = TokenIdVec;

/// Sequential identifier of an auction hosted by the auction contract.
pub type AuctionId = u64;
