use commons::{AssetRef, AuctionId};
use concordium_std::*;

#[derive(Debug, Clone, SchemaType, Serialize)]
pub struct InitParams {
    /// Longest duration an auction may be created with.
    pub max_duration: Duration,
}

#[derive(Debug, Clone, SchemaType, Serialize)]
pub struct CreateParams {
    /// Token to be sold.
    pub asset: AssetRef,
    /// Time the auction stays open once started.
    pub duration: Duration,
    /// Smallest amount the first bid has to exceed.
    pub reserve_price: Amount,
}

#[derive(Debug, Clone, SchemaType, Serialize)]
pub struct BalanceParams {
    pub auction: AuctionId,
    pub account: AccountAddress,
}

/// Read-only snapshot of an auction.
#[derive(Debug, Clone, PartialEq, Eq, SchemaType, Serialize)]
pub struct AuctionView {
    pub asset: AssetRef,
    pub seller: AccountAddress,
    pub duration: Duration,
    pub reserve_price: Amount,
    /// Set once the auction is started.
    pub start_time: Option<Timestamp>,
    pub highest_bid: Amount,
    pub highest_bidder: Option<AccountAddress>,
    pub started: bool,
    pub ended: bool,
}
