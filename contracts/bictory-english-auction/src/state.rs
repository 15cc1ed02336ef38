use commons::{
    AssetRef, AuctionId, ContractResult, CustomContractError, HasQueryInbox, QueryInbox,
};
use concordium_std::*;

use crate::external::{AuctionView, CreateParams};
use crate::ledger::{BidLedger, Withdrawal};

/// Auction lifecycle. Phases only ever move forward: `Created -> Started -> Ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Waiting for the seller to move the token into escrow.
    Created,
    /// Token is in escrow and bids are accepted. Holds the start time.
    Started(Timestamp),
    /// Settled. Only withdrawals remain. Holds the start time.
    Ended(Timestamp),
}

impl Phase {
    pub fn start_time(&self) -> Option<Timestamp> {
        match self {
            Phase::Created => None,
            Phase::Started(start_time) | Phase::Ended(start_time) => Some(*start_time),
        }
    }

    pub fn is_started(&self) -> bool {
        !matches!(self, Phase::Created)
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, Phase::Ended(_))
    }
}

#[derive(Serial, DeserialWithState)]
#[concordium(state_parameter = "S")]
pub struct Auction<S: HasStateApi> {
    /// Token being sold.
    asset: AssetRef,
    /// Seller account address. Receives the token back if nobody bids.
    seller: AccountAddress,
    /// Time the auction stays open once started.
    duration: Duration,
    phase: Phase,
    ledger: BidLedger<S>,
}

/// Outcome of ending an auction. The escrowed token has to be released to [`Settlement::recipient`].
#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub enum Settlement {
    /// Highest bid won. Its amount is already credited to the seller.
    Sold {
        asset: AssetRef,
        winner: AccountAddress,
        price: Amount,
    },
    /// No bids were placed, the token goes back to the seller.
    Unsold {
        asset: AssetRef,
        seller: AccountAddress,
    },
}

impl Settlement {
    pub fn asset(&self) -> &AssetRef {
        match self {
            Settlement::Sold { asset, .. } | Settlement::Unsold { asset, .. } => asset,
        }
    }

    pub fn recipient(&self) -> AccountAddress {
        match self {
            Settlement::Sold { winner, .. } => *winner,
            Settlement::Unsold { seller, .. } => *seller,
        }
    }

    pub fn winner(&self) -> Option<AccountAddress> {
        match self {
            Settlement::Sold { winner, .. } => Some(*winner),
            Settlement::Unsold { .. } => None,
        }
    }

    pub fn price(&self) -> Amount {
        match self {
            Settlement::Sold { price, .. } => *price,
            Settlement::Unsold { .. } => Amount::zero(),
        }
    }
}

/// The contract state.
#[derive(Serial, DeserialWithState)]
#[concordium(state_parameter = "S")]
pub struct State<S: HasStateApi> {
    /// Longest duration an auction may be created with.
    pub max_duration: Duration,
    /// Id assigned to the next created auction.
    pub next_id: AuctionId,
    pub auctions: StateMap<AuctionId, Auction<S>, S>,
    /// Auction whose token is being moved into escrow by the running `start` call.
    pub acquiring: Option<AuctionId>,
    /// Registry query answers delivered by the callback entrypoints.
    pub query_inbox: QueryInbox,
}

impl<S: HasStateApi> State<S> {
    /// Create a new state with no auctions.
    pub fn new(state_builder: &mut StateBuilder<S>, max_duration: Duration) -> Self {
        State {
            max_duration,
            next_id: 0,
            auctions: state_builder.new_map(),
            acquiring: None,
            query_inbox: QueryInbox::default(),
        }
    }

    /// Register a new auction in the `Created` phase and return its id.
    pub fn create(
        &mut self,
        state_builder: &mut StateBuilder<S>,
        seller: AccountAddress,
        params: &CreateParams,
    ) -> ContractResult<AuctionId> {
        ensure!(
            params.duration.millis() > 0 && params.duration <= self.max_duration,
            CustomContractError::InvalidDuration
        );

        let id = self.next_id;
        self.next_id = id.checked_add(1).ok_or(CustomContractError::Overflow)?;

        self.auctions.insert(
            id,
            Auction {
                asset: params.asset.clone(),
                seller,
                duration: params.duration,
                phase: Phase::Created,
                ledger: BidLedger::new(state_builder, params.reserve_price),
            },
        );

        Ok(id)
    }

    /// Check that `caller` may start the auction and mark its token as expected by the deposit hook. Returns the
    /// token to escrow together with its seller.
    pub fn begin_start(
        &mut self,
        id: AuctionId,
        caller: &Address,
    ) -> ContractResult<(AssetRef, AccountAddress)> {
        let auction = self
            .auctions
            .get(&id)
            .ok_or(CustomContractError::UnknownAuction)?;

        ensure!(
            auction.phase == Phase::Created,
            CustomContractError::AlreadyStarted
        );
        ensure!(
            caller.matches_account(&auction.seller),
            CustomContractError::NotAuthorized
        );

        let started = (auction.asset.clone(), auction.seller);
        self.acquiring = Some(id);

        Ok(started)
    }

    /// Open the auction for bids.
    ///
    /// Must only be called once the token is in escrow.
    pub fn start(&mut self, id: AuctionId, slot_time: Timestamp) -> ContractResult<()> {
        let mut auction = self
            .auctions
            .get_mut(&id)
            .ok_or(CustomContractError::UnknownAuction)?;
        let auction = auction.get_mut();

        ensure!(
            auction.phase == Phase::Created,
            CustomContractError::AlreadyStarted
        );
        auction.phase = Phase::Started(slot_time);
        self.acquiring = None;

        Ok(())
    }

    pub fn bid(
        &mut self,
        id: AuctionId,
        bidder: AccountAddress,
        amount: Amount,
    ) -> ContractResult<()> {
        let mut auction = self
            .auctions
            .get_mut(&id)
            .ok_or(CustomContractError::UnknownAuction)?;
        let auction = auction.get_mut();

        match auction.phase {
            Phase::Created => bail!(CustomContractError::NotStarted),
            Phase::Started(_) => (),
            Phase::Ended(_) => bail!(CustomContractError::AlreadyEnded),
        }

        auction.ledger.place_bid(bidder, amount)
    }

    /// Close the auction once its duration has passed and credit the seller with the highest bid.
    ///
    /// The returned [`Settlement`] names who the escrowed token has to be released to.
    pub fn end(&mut self, id: AuctionId, slot_time: Timestamp) -> ContractResult<Settlement> {
        let mut auction = self
            .auctions
            .get_mut(&id)
            .ok_or(CustomContractError::UnknownAuction)?;
        let auction = auction.get_mut();

        let start_time = match auction.phase {
            Phase::Created => bail!(CustomContractError::NotStarted),
            Phase::Started(start_time) => start_time,
            Phase::Ended(_) => bail!(CustomContractError::AlreadyEnded),
        };

        let deadline = start_time
            .checked_add(auction.duration)
            .ok_or(CustomContractError::Overflow)?;
        ensure!(
            slot_time >= deadline,
            CustomContractError::AuctionNotYetOver
        );

        let settlement = match auction.ledger.highest_bidder() {
            Some(winner) => {
                let price = auction.ledger.highest_bid();
                auction.ledger.credit(auction.seller, price)?;
                Settlement::Sold {
                    asset: auction.asset.clone(),
                    winner,
                    price,
                }
            }
            None => Settlement::Unsold {
                asset: auction.asset.clone(),
                seller: auction.seller,
            },
        };
        auction.phase = Phase::Ended(start_time);

        Ok(settlement)
    }

    /// Take the withdrawable balance of `account` out of the auction. Allowed in every phase.
    pub fn withdraw(
        &mut self,
        id: AuctionId,
        account: AccountAddress,
    ) -> ContractResult<Withdrawal> {
        let mut auction = self
            .auctions
            .get_mut(&id)
            .ok_or(CustomContractError::UnknownAuction)?;

        Ok(auction.get_mut().ledger.withdraw(account))
    }

    pub fn balance_of(&self, id: AuctionId, account: &AccountAddress) -> ContractResult<Amount> {
        self.auctions
            .get(&id)
            .map(|auction| auction.ledger.balance_of(account))
            .ok_or(CustomContractError::UnknownAuction)
    }

    /// Whether a deposit of `asset` by `from` is the one the running `start` of auction `id` expects.
    pub fn accepts_deposit(&self, id: AuctionId, asset: &AssetRef, from: &Address) -> bool {
        self.acquiring == Some(id)
            && self
                .auctions
                .get(&id)
                .map(|auction| {
                    auction.phase == Phase::Created
                        && auction.asset == *asset
                        && from.matches_account(&auction.seller)
                })
                .unwrap_or(false)
    }

    pub fn view(&self, id: AuctionId) -> ContractResult<AuctionView> {
        let auction = self
            .auctions
            .get(&id)
            .ok_or(CustomContractError::UnknownAuction)?;

        Ok(AuctionView {
            asset: auction.asset.clone(),
            seller: auction.seller,
            duration: auction.duration,
            reserve_price: auction.ledger.reserve_price(),
            start_time: auction.phase.start_time(),
            highest_bid: auction.ledger.highest_bid(),
            highest_bidder: auction.ledger.highest_bidder(),
            started: auction.phase.is_started(),
            ended: auction.phase.is_ended(),
        })
    }
}

impl<S: HasStateApi> HasQueryInbox for State<S> {
    fn query_inbox(&mut self) -> &mut QueryInbox {
        &mut self.query_inbox
    }
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use concordium_cis1::TokenIdVec;
    use concordium_std::test_infrastructure::*;

    const NFT_CONTRACT: ContractAddress = ContractAddress {
        index: 1,
        subindex: 0,
    };

    const SELLER: AccountAddress = AccountAddress([1; 32]);
    const ALICE: AccountAddress = AccountAddress([2; 32]);
    const BOB: AccountAddress = AccountAddress([3; 32]);

    const RESERVE: Amount = Amount::from_micro_ccd(5);
    const START: u64 = 1_000;
    const DURATION: u64 = 60_000;

    fn amount(micro_ccd: u64) -> Amount {
        Amount::from_micro_ccd(micro_ccd)
    }

    fn time(millis: u64) -> Timestamp {
        Timestamp::from_timestamp_millis(millis)
    }

    fn asset() -> AssetRef {
        AssetRef::new(NFT_CONTRACT, TokenIdVec(vec![0, 1]))
    }

    fn create_params(duration: u64) -> CreateParams {
        CreateParams {
            asset: asset(),
            duration: Duration::from_millis(duration),
            reserve_price: RESERVE,
        }
    }

    /// State with a single auction in the `Created` phase.
    fn default_state() -> (State<TestStateApi>, AuctionId) {
        let mut state_builder = TestStateBuilder::new();
        let mut state = State::new(&mut state_builder, Duration::from_millis(DURATION));
        let id = state
            .create(&mut state_builder, SELLER, &create_params(DURATION))
            .expect_report("Failed to create an auction");
        (state, id)
    }

    fn started_state() -> (State<TestStateApi>, AuctionId) {
        let (mut state, id) = default_state();
        claim_eq!(
            state.begin_start(id, &Address::Account(SELLER)),
            Ok((asset(), SELLER))
        );
        claim_eq!(state.start(id, time(START)), Ok(()));
        (state, id)
    }

    #[concordium_test]
    fn test_create_assigns_sequential_ids() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = State::new(&mut state_builder, Duration::from_millis(DURATION));

        let first = state.create(&mut state_builder, SELLER, &create_params(DURATION));
        let second = state.create(&mut state_builder, ALICE, &create_params(10));

        claim_eq!(first, Ok(0));
        claim_eq!(second, Ok(1));
        claim_eq!(state.next_id, 2);

        let view = state.view(1).expect_report("Auction should exist");
        claim_eq!(view.seller, ALICE);
        claim_eq!(view.duration, Duration::from_millis(10));
        claim_eq!(view.reserve_price, RESERVE);
        claim_eq!(view.highest_bid, RESERVE);
        claim_eq!(view.highest_bidder, None);
        claim_eq!(view.start_time, None);
        claim!(!view.started);
        claim!(!view.ended);
    }

    #[concordium_test]
    fn test_create_checks_duration() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = State::new(&mut state_builder, Duration::from_millis(DURATION));

        claim_eq!(
            state.create(&mut state_builder, SELLER, &create_params(0)),
            Err(CustomContractError::InvalidDuration)
        );
        claim_eq!(
            state.create(&mut state_builder, SELLER, &create_params(DURATION + 1)),
            Err(CustomContractError::InvalidDuration)
        );
        claim_eq!(state.next_id, 0);
    }

    #[concordium_test]
    fn test_begin_start_only_by_seller() {
        let (mut state, id) = default_state();

        claim_eq!(
            state.begin_start(id, &Address::Account(ALICE)),
            Err(CustomContractError::NotAuthorized)
        );
        claim_eq!(state.acquiring, None);
        claim_eq!(
            state.begin_start(id + 1, &Address::Account(SELLER)),
            Err(CustomContractError::UnknownAuction)
        );
        claim_eq!(
            state.begin_start(id, &Address::Account(SELLER)),
            Ok((asset(), SELLER))
        );
        claim_eq!(state.acquiring, Some(id));
    }

    #[concordium_test]
    fn test_start_only_once() {
        let (mut state, id) = started_state();

        claim_eq!(
            state.begin_start(id, &Address::Account(SELLER)),
            Err(CustomContractError::AlreadyStarted)
        );
        claim_eq!(
            state.start(id, time(START + 1)),
            Err(CustomContractError::AlreadyStarted)
        );

        let view = state.view(id).expect_report("Auction should exist");
        claim!(view.started);
        claim_eq!(view.start_time, Some(time(START)));
    }

    #[concordium_test]
    fn test_bid_requires_started_auction() {
        let (mut state, id) = default_state();

        claim_eq!(
            state.bid(id, ALICE, amount(10)),
            Err(CustomContractError::NotStarted)
        );
        claim_eq!(
            state.bid(id + 1, ALICE, amount(10)),
            Err(CustomContractError::UnknownAuction)
        );
    }

    #[concordium_test]
    fn test_bid_after_deadline_until_ended() {
        let (mut state, id) = started_state();

        // Bids are still accepted past the deadline as long as nobody ended the auction
        claim_eq!(state.bid(id, ALICE, amount(6)), Ok(()));
        claim_eq!(state.end(id, time(START + DURATION)).map(|s| s.winner()), Ok(Some(ALICE)));

        claim_eq!(
            state.bid(id, BOB, amount(100)),
            Err(CustomContractError::AlreadyEnded)
        );
    }

    #[concordium_test]
    fn test_end_waits_for_deadline() {
        let (mut state, id) = started_state();

        claim_eq!(
            state.end(id, time(START + DURATION - 1)),
            Err(CustomContractError::AuctionNotYetOver)
        );
        claim!(!state.view(id).expect_report("Auction should exist").ended);
    }

    #[concordium_test]
    fn test_end_requires_started_auction() {
        let (mut state, id) = default_state();

        claim_eq!(
            state.end(id, time(START + DURATION)),
            Err(CustomContractError::NotStarted)
        );
    }

    #[concordium_test]
    fn test_end_sold_credits_seller() {
        let (mut state, id) = started_state();
        claim_eq!(state.bid(id, ALICE, amount(6)), Ok(()));
        claim_eq!(state.bid(id, BOB, amount(7)), Ok(()));

        let settlement = state.end(id, time(START + DURATION));

        claim_eq!(
            settlement,
            Ok(Settlement::Sold {
                asset: asset(),
                winner: BOB,
                price: amount(7),
            })
        );
        claim_eq!(state.balance_of(id, &SELLER), Ok(amount(7)));
        claim_eq!(state.balance_of(id, &ALICE), Ok(amount(6)));
        // Winning bid is spent
        claim_eq!(state.balance_of(id, &BOB), Ok(Amount::zero()));

        let view = state.view(id).expect_report("Auction should exist");
        claim!(view.ended);
        claim_eq!(view.highest_bidder, Some(BOB));
        claim_eq!(view.start_time, Some(time(START)));

        claim_eq!(
            state.end(id, time(START + DURATION)),
            Err(CustomContractError::AlreadyEnded)
        );
        claim_eq!(state.balance_of(id, &SELLER), Ok(amount(7)));
    }

    #[concordium_test]
    fn test_end_unsold_returns_token_to_seller() {
        let (mut state, id) = started_state();

        let settlement = state
            .end(id, time(START + DURATION))
            .expect_report("Auction should end");

        claim_eq!(settlement.recipient(), SELLER);
        claim_eq!(settlement.winner(), None);
        claim_eq!(settlement.price(), Amount::zero());
        claim_eq!(settlement.asset(), &asset());
        claim_eq!(state.balance_of(id, &SELLER), Ok(Amount::zero()));
    }

    #[concordium_test]
    fn test_withdraw_in_every_phase() {
        let (mut state, id) = default_state();

        let withdrawal = state.withdraw(id, ALICE).expect_report("Auction should exist");
        claim_eq!(withdrawal.amount(), Amount::zero());

        claim_eq!(state.start(id, time(START)), Ok(()));
        claim_eq!(state.bid(id, ALICE, amount(6)), Ok(()));
        claim_eq!(state.bid(id, BOB, amount(7)), Ok(()));

        let withdrawal = state.withdraw(id, ALICE).expect_report("Auction should exist");
        claim_eq!(withdrawal.amount(), amount(6));
        claim_eq!(state.balance_of(id, &ALICE), Ok(Amount::zero()));

        claim_eq!(
            state.withdraw(id + 1, ALICE).map(|w| w.amount()),
            Err(CustomContractError::UnknownAuction)
        );
    }

    #[concordium_test]
    fn test_accepts_deposit() {
        let (mut state, id) = default_state();
        let other = AssetRef::new(NFT_CONTRACT, TokenIdVec(vec![9]));

        // Nothing is being acquired yet
        claim!(!state.accepts_deposit(id, &asset(), &Address::Account(SELLER)));

        claim_eq!(
            state.begin_start(id, &Address::Account(SELLER)),
            Ok((asset(), SELLER))
        );
        claim!(state.accepts_deposit(id, &asset(), &Address::Account(SELLER)));
        claim!(!state.accepts_deposit(id, &other, &Address::Account(SELLER)));
        claim!(!state.accepts_deposit(id, &asset(), &Address::Account(ALICE)));
        claim!(!state.accepts_deposit(id + 1, &asset(), &Address::Account(SELLER)));

        claim_eq!(state.start(id, time(START)), Ok(()));
        claim_eq!(state.acquiring, None);
        claim!(!state.accepts_deposit(id, &asset(), &Address::Account(SELLER)));
    }
}
