use commons::{
    AssetRef, AssetRegistry, AuctionId, Cis1Registry, CustomContractError, QueryCallbacks,
};
use concordium_cis1::{
    BalanceOfQueryResponse, OnReceivingCis1Params, OperatorOfQueryResponse, TokenIdVec,
};
use concordium_std::*;

use crate::escrow::EscrowGateway;
use crate::events::*;
use crate::external::*;
use crate::state::State;

/// Full names of the entrypoints CIS-1 registries send query results to.
pub const BALANCE_OF_CALLBACK: &str = "BictoryEnglishAuction.onBalanceOf";
pub const OPERATOR_OF_CALLBACK: &str = "BictoryEnglishAuction.onOperatorOf";

/// Initialize the auction contract with no auctions.
#[init(contract = "BictoryEnglishAuction", parameter = "InitParams")]
fn contract_init<S: HasStateApi>(
    ctx: &impl HasInitContext,
    state_builder: &mut StateBuilder<S>,
) -> InitResult<State<S>> {
    let params = InitParams::deserial(&mut ctx.parameter_cursor())?;
    Ok(State::new(state_builder, params.max_duration))
}

/// Register an auction for a token held by the sender. Returns the id of the new auction.
///
/// It rejects if:
/// - Fails to parse `CreateParams` parameters.
/// - Sender is a contract.
/// - Sender does not hold the token.
/// - Duration is zero or over the configured limit.
#[receive(
    mutable,
    contract = "BictoryEnglishAuction",
    name = "create",
    parameter = "CreateParams",
    return_value = "AuctionId",
    enable_logger
)]
fn contract_create<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ReceiveResult<AuctionId> {
    let params = CreateParams::deserial(&mut ctx.parameter_cursor())?;
    let seller = sender_account(ctx)?;

    ensure!(
        Cis1Registry::new(host, query_callbacks(ctx)).is_owner(&params.asset, &Address::Account(seller))?,
        CustomContractError::NotTokenOwner.into()
    );

    let (state, state_builder) = host.state_and_builder();
    let auction = state.create(state_builder, seller, &params)?;

    logger.log(&AuctionEvent::Created(CreatedEvent {
        auction,
        asset: params.asset,
        seller,
        duration: params.duration,
        reserve_price: params.reserve_price,
    }))?;

    Ok(auction)
}

/// Move the token into escrow and open the auction for bids. Only the seller is allowed to start an auction, and the
/// contract has to be an operator of the seller in the token registry.
#[receive(
    mutable,
    contract = "BictoryEnglishAuction",
    name = "start",
    parameter = "AuctionId",
    enable_logger
)]
fn contract_start<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ReceiveResult<()> {
    let auction = AuctionId::deserial(&mut ctx.parameter_cursor())?;

    let (asset, seller) = host.state_mut().begin_start(auction, &ctx.sender())?;

    // Token has to be in escrow before the auction opens
    EscrowGateway::new(
        Cis1Registry::new(host, query_callbacks(ctx)),
        ctx.self_address(),
    )
    .acquire(auction, &asset, seller)?;

    let start_time = ctx.metadata().slot_time();
    host.state_mut().start(auction, start_time)?;

    logger.log(&AuctionEvent::started(auction, start_time))?;

    Ok(())
}

/// Place a bid with the attached amount. The displaced highest bid becomes withdrawable by its bidder.
#[receive(
    mutable,
    payable,
    contract = "BictoryEnglishAuction",
    name = "bid",
    parameter = "AuctionId",
    enable_logger
)]
fn contract_bid<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    amount: Amount,
    logger: &mut impl HasLogger,
) -> ReceiveResult<()> {
    let auction = AuctionId::deserial(&mut ctx.parameter_cursor())?;
    let bidder = sender_account(ctx)?;

    host.state_mut().bid(auction, bidder, amount)?;

    logger.log(&AuctionEvent::bid(auction, bidder, amount))?;

    Ok(())
}

/// End the auction once its duration has passed. Anyone is allowed to end it.
///
/// The highest bid is credited to the seller and the token is released to the winner, or back to the seller if
/// nobody bid.
#[receive(
    mutable,
    contract = "BictoryEnglishAuction",
    name = "end",
    parameter = "AuctionId",
    enable_logger
)]
fn contract_end<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ReceiveResult<()> {
    let auction = AuctionId::deserial(&mut ctx.parameter_cursor())?;

    // Settle the auction before the token leaves escrow
    let settlement = host
        .state_mut()
        .end(auction, ctx.metadata().slot_time())?;

    EscrowGateway::new(
        Cis1Registry::new(host, query_callbacks(ctx)),
        ctx.self_address(),
    )
    .release(settlement.asset(), settlement.recipient())?;

    logger.log(&AuctionEvent::ended(
        auction,
        settlement.winner(),
        settlement.price(),
    ))?;

    Ok(())
}

/// Pay out the whole withdrawable balance of the sender and return the paid amount. Empty balances pay nothing.
#[receive(
    mutable,
    contract = "BictoryEnglishAuction",
    name = "withdraw",
    parameter = "AuctionId",
    return_value = "Amount"
)]
fn contract_withdraw<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<Amount> {
    let auction = AuctionId::deserial(&mut ctx.parameter_cursor())?;
    let account = sender_account(ctx)?;

    let withdrawal = host.state_mut().withdraw(auction, account)?;
    let paid = withdrawal
        .pay_with(&mut |to: AccountAddress, amount: Amount| host.invoke_transfer(&to, amount))
        .map_err(CustomContractError::from)?;

    Ok(paid)
}

#[receive(
    contract = "BictoryEnglishAuction",
    name = "view",
    parameter = "AuctionId",
    return_value = "AuctionView"
)]
fn contract_view<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<AuctionView> {
    let auction = AuctionId::deserial(&mut ctx.parameter_cursor())?;
    Ok(host.state().view(auction)?)
}

#[receive(
    contract = "BictoryEnglishAuction",
    name = "balanceOf",
    parameter = "BalanceParams",
    return_value = "Amount"
)]
fn contract_balance_of<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<Amount> {
    let params = BalanceParams::deserial(&mut ctx.parameter_cursor())?;
    Ok(host.state().balance_of(params.auction, &params.account)?)
}

/// Accept a token deposit requested by `start`.
///
/// Registry calls this hook while `start` of the auction is in flight, with the auction id as transfer data. Any
/// other deposit is rejected, so tokens can not end up in the contract without an auction to release them.
#[receive(
    contract = "BictoryEnglishAuction",
    name = "onReceivingCIS1",
    parameter = "OnReceivingCis1Params<TokenIdVec>"
)]
fn contract_on_receiving_cis1<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<()> {
    let params = OnReceivingCis1Params::<TokenIdVec>::deserial(&mut ctx.parameter_cursor())?;

    let contract = sender_contract(ctx)?;

    ensure!(
        params.amount == 1,
        CustomContractError::UnexpectedToken.into()
    );

    let auction: AuctionId = from_bytes(params.data.as_ref())?;
    ensure!(
        host.state().accepts_deposit(
            auction,
            &AssetRef::new(contract, params.token_id),
            &params.from
        ),
        CustomContractError::UnexpectedToken.into()
    );

    Ok(())
}

/// Result of a `balanceOf` query sent by this contract to a token registry.
///
/// It rejects if:
/// - Fails to parse the response.
/// - Sender is not a contract.
/// - Response does not answer the query in flight.
#[receive(
    mutable,
    contract = "BictoryEnglishAuction",
    name = "onBalanceOf",
    parameter = "BalanceOfQueryResponse<TokenIdVec>"
)]
fn contract_on_balance_of<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<()> {
    let response = BalanceOfQueryResponse::<TokenIdVec>::deserial(&mut ctx.parameter_cursor())?;
    let registry = sender_contract(ctx)?;

    host.state_mut()
        .query_inbox
        .deliver_balance(registry, response)?;

    Ok(())
}

/// Result of an `operatorOf` query sent by this contract to a token registry.
///
/// It rejects if:
/// - Fails to parse the response.
/// - Sender is not a contract.
/// - Response does not answer the query in flight.
#[receive(
    mutable,
    contract = "BictoryEnglishAuction",
    name = "onOperatorOf",
    parameter = "OperatorOfQueryResponse"
)]
fn contract_on_operator_of<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<()> {
    let response = OperatorOfQueryResponse::deserial(&mut ctx.parameter_cursor())?;
    let registry = sender_contract(ctx)?;

    host.state_mut()
        .query_inbox
        .deliver_operator(registry, response)?;

    Ok(())
}

fn query_callbacks(ctx: &impl HasReceiveContext) -> QueryCallbacks {
    QueryCallbacks {
        contract: ctx.self_address(),
        balance_of: BALANCE_OF_CALLBACK,
        operator_of: OPERATOR_OF_CALLBACK,
    }
}

fn sender_contract(ctx: &impl HasReceiveContext) -> Result<ContractAddress, CustomContractError> {
    match ctx.sender() {
        Address::Contract(contract) => Ok(contract),
        Address::Account(_) => Err(CustomContractError::ContractOnly),
    }
}

fn sender_account(ctx: &impl HasReceiveContext) -> Result<AccountAddress, CustomContractError> {
    match ctx.sender() {
        Address::Account(account) => Ok(account),
        Address::Contract(_) => Err(CustomContractError::OnlyAccountAddress),
    }
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use commons::test::*;
    use commons::RegistryQuery;
    use concordium_cis1::{
        AdditionalData, BalanceOfQuery, BalanceOfQueryParams, OperatorOfQuery,
        OperatorOfQueryParams, Receiver, TransferParams,
    };
    use concordium_std::test_infrastructure::*;

    const NFT_CONTRACT: ContractAddress = ContractAddress {
        index: 1,
        subindex: 0,
    };
    const AUCTION_CONTRACT: ContractAddress = ContractAddress {
        index: 2,
        subindex: 0,
    };

    const SELLER: AccountAddress = AccountAddress([1; 32]);
    const ALICE: AccountAddress = AccountAddress([2; 32]);
    const BOB: AccountAddress = AccountAddress([3; 32]);

    const RESERVE: Amount = Amount::from_micro_ccd(5);
    const START: u64 = 1_000;
    const DURATION: u64 = 60_000;
    const MAX_DURATION: u64 = 7 * 24 * 60 * 60 * 1_000;

    type Host = TestHost<State<TestStateApi>>;

    fn amount(micro_ccd: u64) -> Amount {
        Amount::from_micro_ccd(micro_ccd)
    }

    fn token() -> TokenIdVec {
        TokenIdVec(vec![0, 1])
    }

    fn asset() -> AssetRef {
        AssetRef::new(NFT_CONTRACT, token())
    }

    fn receive_ctx<'a>(sender: Address, parameter: &'a [u8], slot_time: u64) -> TestReceiveContext<'a> {
        let mut ctx = TestReceiveContext::empty();
        ctx.set_sender(sender)
            .set_self_address(AUCTION_CONTRACT)
            .set_parameter(parameter)
            .set_metadata_slot_time(Timestamp::from_timestamp_millis(slot_time));
        ctx
    }

    fn default_host() -> Host {
        let params = InitParams {
            max_duration: Duration::from_millis(MAX_DURATION),
        };
        let bytes = to_bytes(&params);
        let mut ctx = TestInitContext::empty();
        ctx.set_parameter(&bytes);
        let mut state_builder = TestStateBuilder::new();
        let state = contract_init(&ctx, &mut state_builder)
            .expect_report("Failed during init_BictoryEnglishAuction");
        TestHost::new(state, state_builder)
    }

    /// Registry where `owner` holds the token and the auction contract operator status is `authorized`. Queries are
    /// answered through the callback entrypoints. Transfers are accepted only if they move the token from the seller
    /// into escrow or out of escrow to `release_to`.
    fn mock_registry(host: &mut Host, owner: AccountAddress, authorized: bool, release_to: AccountAddress) {
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked(String::from("balanceOf")),
            parse_and_callback_mock(
                move |params: &BalanceOfQueryParams<TokenIdVec>, state: &mut State<TestStateApi>| {
                    let query = match params.queries.first() {
                        Some(query) if params.queries.len() == 1 => query,
                        _ => return false,
                    };
                    let response = BalanceOfQueryResponse::from(vec![(
                        BalanceOfQuery {
                            token_id: query.token_id.clone(),
                            address: query.address,
                        },
                        u64::from(query.address == Address::Account(owner)),
                    )]);

                    params.result_contract == AUCTION_CONTRACT
                        && params.result_function
                            == OwnedReceiveName::new_unchecked(String::from(BALANCE_OF_CALLBACK))
                        && state
                            .query_inbox
                            .deliver_balance(NFT_CONTRACT, response)
                            .is_ok()
                },
            ),
        );
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked(String::from("operatorOf")),
            parse_and_callback_mock(
                move |params: &OperatorOfQueryParams, state: &mut State<TestStateApi>| {
                    let query = match params.queries.first() {
                        Some(query) if params.queries.len() == 1 => query,
                        _ => return false,
                    };
                    let response = OperatorOfQueryResponse::from(vec![(
                        OperatorOfQuery {
                            owner: query.owner,
                            address: query.address,
                        },
                        authorized && query.address == Address::Contract(AUCTION_CONTRACT),
                    )]);

                    params.result_contract == AUCTION_CONTRACT
                        && params.result_function
                            == OwnedReceiveName::new_unchecked(String::from(OPERATOR_OF_CALLBACK))
                        && state
                            .query_inbox
                            .deliver_operator(NFT_CONTRACT, response)
                            .is_ok()
                },
            ),
        );
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked(String::from("transfer")),
            parse_and_check_mock(
                move |params: &TransferParams<TokenIdVec>| {
                    let transfer = match params.0.first() {
                        Some(transfer) if params.0.len() == 1 => transfer,
                        _ => return false,
                    };
                    let moved = match transfer.to {
                        Receiver::Contract(contract, _) => {
                            contract == AUCTION_CONTRACT && transfer.from == Address::Account(owner)
                        }
                        Receiver::Account(account) => {
                            account == release_to
                                && transfer.from == Address::Contract(AUCTION_CONTRACT)
                        }
                    };
                    moved && transfer.token_id == token() && transfer.amount == 1
                },
                (),
            ),
        );
    }

    fn create(host: &mut Host) -> AuctionId {
        let params = CreateParams {
            asset: asset(),
            duration: Duration::from_millis(DURATION),
            reserve_price: RESERVE,
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(Address::Account(SELLER), &bytes, 0);
        let mut logger = TestLogger::init();
        contract_create(&ctx, host, &mut logger).expect_report("Failed to create an auction")
    }

    fn start(host: &mut Host, auction: AuctionId, sender: AccountAddress) -> ReceiveResult<()> {
        let bytes = to_bytes(&auction);
        let ctx = receive_ctx(Address::Account(sender), &bytes, START);
        let mut logger = TestLogger::init();
        contract_start(&ctx, host, &mut logger)
    }

    fn bid(
        host: &mut Host,
        auction: AuctionId,
        bidder: AccountAddress,
        micro_ccd: u64,
    ) -> ReceiveResult<()> {
        let bytes = to_bytes(&auction);
        let ctx = receive_ctx(Address::Account(bidder), &bytes, START + 10);
        let mut logger = TestLogger::init();
        contract_bid(&ctx, host, amount(micro_ccd), &mut logger)
    }

    fn end(host: &mut Host, auction: AuctionId, slot_time: u64) -> ReceiveResult<()> {
        let bytes = to_bytes(&auction);
        let ctx = receive_ctx(Address::Account(ALICE), &bytes, slot_time);
        let mut logger = TestLogger::init();
        contract_end(&ctx, host, &mut logger)
    }

    fn withdraw(host: &mut Host, auction: AuctionId, account: AccountAddress) -> ReceiveResult<Amount> {
        let bytes = to_bytes(&auction);
        let ctx = receive_ctx(Address::Account(account), &bytes, START + DURATION);
        contract_withdraw(&ctx, host)
    }

    fn view(host: &Host, auction: AuctionId) -> ReceiveResult<AuctionView> {
        let bytes = to_bytes(&auction);
        let ctx = receive_ctx(Address::Account(ALICE), &bytes, 0);
        contract_view(&ctx, host)
    }

    fn balance_of(host: &Host, auction: AuctionId, account: AccountAddress) -> ReceiveResult<Amount> {
        let bytes = to_bytes(&BalanceParams { auction, account });
        let ctx = receive_ctx(Address::Account(ALICE), &bytes, 0);
        contract_balance_of(&ctx, host)
    }

    #[concordium_test]
    fn test_init() {
        let host = default_host();

        claim_eq!(host.state().max_duration, Duration::from_millis(MAX_DURATION));
        claim_eq!(host.state().next_id, 0);
        claim_eq!(view(&host, 0), Err(CustomContractError::UnknownAuction.into()));
    }

    #[concordium_test]
    fn test_create() {
        let mut host = default_host();
        mock_registry(&mut host, SELLER, true, SELLER);

        let params = CreateParams {
            asset: asset(),
            duration: Duration::from_millis(DURATION),
            reserve_price: RESERVE,
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(Address::Account(SELLER), &bytes, 0);
        let mut logger = TestLogger::init();

        let result = contract_create(&ctx, &mut host, &mut logger);

        claim_eq!(result, Ok(0));
        claim_eq!(
            logger.logs,
            vec![to_bytes(&AuctionEvent::Created(CreatedEvent {
                auction: 0,
                asset: asset(),
                seller: SELLER,
                duration: Duration::from_millis(DURATION),
                reserve_price: RESERVE,
            }))]
        );

        let view = view(&host, 0).expect_report("Auction should exist");
        claim_eq!(view.seller, SELLER);
        claim_eq!(view.highest_bid, RESERVE);
        claim!(!view.started);
    }

    #[concordium_test]
    fn test_create_by_non_owner() {
        let mut host = default_host();
        mock_registry(&mut host, BOB, true, SELLER);

        let params = CreateParams {
            asset: asset(),
            duration: Duration::from_millis(DURATION),
            reserve_price: RESERVE,
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(Address::Account(SELLER), &bytes, 0);
        let mut logger = TestLogger::init();

        let result = contract_create(&ctx, &mut host, &mut logger);

        claim_eq!(result, Err(CustomContractError::NotTokenOwner.into()));
        claim_eq!(host.state().next_id, 0);
        claim!(logger.logs.is_empty());
    }

    #[concordium_test]
    fn test_create_over_max_duration() {
        let mut host = default_host();
        mock_registry(&mut host, SELLER, true, SELLER);

        let params = CreateParams {
            asset: asset(),
            duration: Duration::from_millis(MAX_DURATION + 1),
            reserve_price: RESERVE,
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(Address::Account(SELLER), &bytes, 0);
        let mut logger = TestLogger::init();

        let result = contract_create(&ctx, &mut host, &mut logger);

        claim_eq!(result, Err(CustomContractError::InvalidDuration.into()));
    }

    #[concordium_test]
    fn test_start() {
        let mut host = default_host();
        mock_registry(&mut host, SELLER, true, SELLER);
        let auction = create(&mut host);

        let bytes = to_bytes(&auction);
        let ctx = receive_ctx(Address::Account(SELLER), &bytes, START);
        let mut logger = TestLogger::init();

        let result = contract_start(&ctx, &mut host, &mut logger);

        claim_eq!(result, Ok(()));
        claim_eq!(
            logger.logs,
            vec![to_bytes(&AuctionEvent::started(
                auction,
                Timestamp::from_timestamp_millis(START)
            ))]
        );

        let view = view(&host, auction).expect_report("Auction should exist");
        claim!(view.started);
        claim_eq!(view.start_time, Some(Timestamp::from_timestamp_millis(START)));

        claim_eq!(
            start(&mut host, auction, SELLER),
            Err(CustomContractError::AlreadyStarted.into())
        );
    }

    #[concordium_test]
    fn test_start_by_non_seller() {
        let mut host = default_host();
        mock_registry(&mut host, SELLER, true, SELLER);
        let auction = create(&mut host);

        claim_eq!(
            start(&mut host, auction, ALICE),
            Err(CustomContractError::NotAuthorized.into())
        );
        claim!(!view(&host, auction).expect_report("Auction should exist").started);
    }

    #[concordium_test]
    fn test_start_without_operator_rights() {
        let mut host = default_host();
        mock_registry(&mut host, SELLER, false, SELLER);
        let auction = create(&mut host);

        claim_eq!(
            start(&mut host, auction, SELLER),
            Err(CustomContractError::NotAuthorized.into())
        );
        claim!(!view(&host, auction).expect_report("Auction should exist").started);
    }

    #[concordium_test]
    fn test_start_rejected_by_registry() {
        let mut host = default_host();
        mock_registry(&mut host, SELLER, true, SELLER);
        let auction = create(&mut host);
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked(String::from("transfer")),
            trap_mock(),
        );

        claim_eq!(
            start(&mut host, auction, SELLER),
            Err(CustomContractError::InvokeContractError.into())
        );
        claim!(!view(&host, auction).expect_report("Auction should exist").started);
    }

    #[concordium_test]
    fn test_start_without_registry_answer() {
        let mut host = default_host();
        mock_registry(&mut host, SELLER, true, SELLER);
        let auction = create(&mut host);

        // Registry accepts the query but never reports back
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked(String::from("operatorOf")),
            parse_and_ok_mock::<OperatorOfQueryParams, _>(()),
        );

        claim_eq!(
            start(&mut host, auction, SELLER),
            Err(CustomContractError::Incompatible.into())
        );
    }

    #[concordium_test]
    fn test_bid_before_start() {
        let mut host = default_host();
        mock_registry(&mut host, SELLER, true, SELLER);
        let auction = create(&mut host);

        claim_eq!(
            bid(&mut host, auction, ALICE, 10),
            Err(CustomContractError::NotStarted.into())
        );
    }

    #[concordium_test]
    fn test_bid_from_contract() {
        let mut host = default_host();
        mock_registry(&mut host, SELLER, true, SELLER);
        let auction = create(&mut host);
        claim_eq!(start(&mut host, auction, SELLER), Ok(()));

        let bytes = to_bytes(&auction);
        let ctx = receive_ctx(Address::Contract(NFT_CONTRACT), &bytes, START);
        let mut logger = TestLogger::init();

        let result = contract_bid(&ctx, &mut host, amount(10), &mut logger);

        claim_eq!(result, Err(CustomContractError::OnlyAccountAddress.into()));
    }

    #[concordium_test]
    fn test_bid_logs_event() {
        let mut host = default_host();
        mock_registry(&mut host, SELLER, true, SELLER);
        let auction = create(&mut host);
        claim_eq!(start(&mut host, auction, SELLER), Ok(()));

        let bytes = to_bytes(&auction);
        let ctx = receive_ctx(Address::Account(ALICE), &bytes, START);
        let mut logger = TestLogger::init();

        let result = contract_bid(&ctx, &mut host, amount(6), &mut logger);

        claim_eq!(result, Ok(()));
        claim_eq!(
            logger.logs,
            vec![to_bytes(&AuctionEvent::bid(auction, ALICE, amount(6)))]
        );
    }

    #[concordium_test]
    fn test_auction_sold() {
        let mut host = default_host();
        mock_registry(&mut host, SELLER, true, BOB);
        let auction = create(&mut host);
        claim_eq!(start(&mut host, auction, SELLER), Ok(()));

        // Below the reserve, then outbid
        claim_eq!(
            bid(&mut host, auction, ALICE, 4),
            Err(CustomContractError::BidTooLow.into())
        );
        claim_eq!(bid(&mut host, auction, ALICE, 6), Ok(()));
        claim_eq!(
            bid(&mut host, auction, BOB, 6),
            Err(CustomContractError::BidTooLow.into())
        );
        claim_eq!(bid(&mut host, auction, BOB, 7), Ok(()));

        let view_before_end = view(&host, auction).expect_report("Auction should exist");
        claim_eq!(view_before_end.highest_bid, amount(7));
        claim_eq!(view_before_end.highest_bidder, Some(BOB));
        claim_eq!(balance_of(&host, auction, ALICE), Ok(amount(6)));

        // Outbid funds are withdrawable while the auction runs
        host.set_self_balance(amount(13));
        claim_eq!(withdraw(&mut host, auction, ALICE), Ok(amount(6)));
        claim!(host.transfer_occurred(&ALICE, amount(6)));
        claim_eq!(balance_of(&host, auction, ALICE), Ok(Amount::zero()));
        claim_eq!(withdraw(&mut host, auction, ALICE), Ok(Amount::zero()));

        claim_eq!(
            end(&mut host, auction, START + DURATION - 1),
            Err(CustomContractError::AuctionNotYetOver.into())
        );

        let bytes = to_bytes(&auction);
        let ctx = receive_ctx(Address::Account(ALICE), &bytes, START + DURATION);
        let mut logger = TestLogger::init();
        claim_eq!(contract_end(&ctx, &mut host, &mut logger), Ok(()));
        claim_eq!(
            logger.logs,
            vec![to_bytes(&AuctionEvent::ended(auction, Some(BOB), amount(7)))]
        );

        let view_after_end = view(&host, auction).expect_report("Auction should exist");
        claim!(view_after_end.ended);
        claim_eq!(balance_of(&host, auction, SELLER), Ok(amount(7)));
        claim_eq!(balance_of(&host, auction, BOB), Ok(Amount::zero()));

        host.set_self_balance(amount(7));
        claim_eq!(withdraw(&mut host, auction, SELLER), Ok(amount(7)));
        claim!(host.transfer_occurred(&SELLER, amount(7)));
        claim_eq!(balance_of(&host, auction, SELLER), Ok(Amount::zero()));

        claim_eq!(
            end(&mut host, auction, START + DURATION),
            Err(CustomContractError::AlreadyEnded.into())
        );
        claim_eq!(
            bid(&mut host, auction, ALICE, 100),
            Err(CustomContractError::AlreadyEnded.into())
        );
    }

    #[concordium_test]
    fn test_auction_unsold() {
        let mut host = default_host();
        mock_registry(&mut host, SELLER, true, SELLER);
        let auction = create(&mut host);
        claim_eq!(start(&mut host, auction, SELLER), Ok(()));

        let bytes = to_bytes(&auction);
        let ctx = receive_ctx(Address::Account(BOB), &bytes, START + DURATION);
        let mut logger = TestLogger::init();

        let result = contract_end(&ctx, &mut host, &mut logger);

        claim_eq!(result, Ok(()));
        claim_eq!(
            logger.logs,
            vec![to_bytes(&AuctionEvent::ended(auction, None, Amount::zero()))]
        );
        claim_eq!(balance_of(&host, auction, SELLER), Ok(Amount::zero()));
        claim_eq!(withdraw(&mut host, auction, SELLER), Ok(Amount::zero()));
    }

    #[concordium_test]
    fn test_end_rejected_by_registry() {
        let mut host = default_host();
        mock_registry(&mut host, SELLER, true, SELLER);
        let auction = create(&mut host);
        claim_eq!(start(&mut host, auction, SELLER), Ok(()));
        claim_eq!(bid(&mut host, auction, ALICE, 6), Ok(()));

        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked(String::from("transfer")),
            trap_mock(),
        );

        let bytes = to_bytes(&auction);
        let ctx = receive_ctx(Address::Account(BOB), &bytes, START + DURATION);
        let mut logger = TestLogger::init();

        let result = contract_end(&ctx, &mut host, &mut logger);

        claim_eq!(result, Err(CustomContractError::InvokeContractError.into()));
        claim!(logger.logs.is_empty());
    }

    #[concordium_test]
    fn test_end_before_start() {
        let mut host = default_host();
        mock_registry(&mut host, SELLER, true, SELLER);
        let auction = create(&mut host);

        claim_eq!(
            end(&mut host, auction, START + DURATION),
            Err(CustomContractError::NotStarted.into())
        );
    }

    #[concordium_test]
    fn test_unknown_auction() {
        let mut host = default_host();

        claim_eq!(
            start(&mut host, 3, SELLER),
            Err(CustomContractError::UnknownAuction.into())
        );
        claim_eq!(
            bid(&mut host, 3, ALICE, 10),
            Err(CustomContractError::UnknownAuction.into())
        );
        claim_eq!(
            withdraw(&mut host, 3, ALICE),
            Err(CustomContractError::UnknownAuction.into())
        );
        claim_eq!(
            balance_of(&host, 3, ALICE),
            Err(CustomContractError::UnknownAuction.into())
        );
    }

    fn deposit_params(auction: AuctionId, from: AccountAddress, token_id: TokenIdVec) -> Vec<u8> {
        to_bytes(&OnReceivingCis1Params {
            token_id,
            amount: 1,
            from: Address::Account(from),
            contract_name: OwnedContractName::new_unchecked(String::from("init_BictoryNFT")),
            data: AdditionalData::from(to_bytes(&auction)),
        })
    }

    #[concordium_test]
    fn test_on_receiving_expected_deposit() {
        let mut host = default_host();
        mock_registry(&mut host, SELLER, true, SELLER);
        let auction = create(&mut host);

        // Deposit arrives while `start` of the auction is acquiring the token
        claim_eq!(
            host.state_mut().begin_start(auction, &Address::Account(SELLER)),
            Ok((asset(), SELLER))
        );

        let bytes = deposit_params(auction, SELLER, token());
        let ctx = receive_ctx(Address::Contract(NFT_CONTRACT), &bytes, START);

        claim_eq!(contract_on_receiving_cis1(&ctx, &host), Ok(()));
    }

    #[concordium_test]
    fn test_on_receiving_without_pending_start() {
        let mut host = default_host();
        mock_registry(&mut host, SELLER, true, SELLER);
        let auction = create(&mut host);

        // Seller sends the token directly to a created auction
        let bytes = deposit_params(auction, SELLER, token());
        let ctx = receive_ctx(Address::Contract(NFT_CONTRACT), &bytes, START);

        claim_eq!(
            contract_on_receiving_cis1(&ctx, &host),
            Err(CustomContractError::UnexpectedToken.into())
        );
        claim_eq!(host.state().acquiring, None);
    }

    #[concordium_test]
    fn test_on_receiving_unexpected_deposit() {
        let mut host = default_host();
        mock_registry(&mut host, SELLER, true, SELLER);
        let auction = create(&mut host);

        claim_eq!(
            host.state_mut().begin_start(auction, &Address::Account(SELLER)),
            Ok((asset(), SELLER))
        );

        // Wrong token
        let bytes = deposit_params(auction, SELLER, TokenIdVec(vec![9]));
        let ctx = receive_ctx(Address::Contract(NFT_CONTRACT), &bytes, START);
        claim_eq!(
            contract_on_receiving_cis1(&ctx, &host),
            Err(CustomContractError::UnexpectedToken.into())
        );

        // Not from the seller
        let bytes = deposit_params(auction, ALICE, token());
        let ctx = receive_ctx(Address::Contract(NFT_CONTRACT), &bytes, START);
        claim_eq!(
            contract_on_receiving_cis1(&ctx, &host),
            Err(CustomContractError::UnexpectedToken.into())
        );

        // Not from a contract
        let bytes = deposit_params(auction, SELLER, token());
        let ctx = receive_ctx(Address::Account(SELLER), &bytes, START);
        claim_eq!(
            contract_on_receiving_cis1(&ctx, &host),
            Err(CustomContractError::ContractOnly.into())
        );

        // Auction already holds its token
        claim_eq!(start(&mut host, auction, SELLER), Ok(()));
        let bytes = deposit_params(auction, SELLER, token());
        let ctx = receive_ctx(Address::Contract(NFT_CONTRACT), &bytes, START);
        claim_eq!(
            contract_on_receiving_cis1(&ctx, &host),
            Err(CustomContractError::UnexpectedToken.into())
        );
    }

    fn operator_response(owner: AccountAddress, is_operator: bool) -> Vec<u8> {
        to_bytes(&OperatorOfQueryResponse::from(vec![(
            OperatorOfQuery {
                owner: Address::Account(owner),
                address: Address::Contract(AUCTION_CONTRACT),
            },
            is_operator,
        )]))
    }

    #[concordium_test]
    fn test_on_operator_of_delivers_answer() {
        let mut host = default_host();
        host.state_mut().query_inbox.expect(
            NFT_CONTRACT,
            RegistryQuery::Operator(
                Address::Account(SELLER),
                Address::Contract(AUCTION_CONTRACT),
            ),
        );

        let bytes = operator_response(SELLER, true);
        let ctx = receive_ctx(Address::Contract(NFT_CONTRACT), &bytes, START);

        claim_eq!(contract_on_operator_of(&ctx, &mut host), Ok(()));
        claim_eq!(host.state_mut().query_inbox.take_answer(), Some(true));
    }

    #[concordium_test]
    fn test_on_balance_of_delivers_answer() {
        let mut host = default_host();
        host.state_mut().query_inbox.expect(
            NFT_CONTRACT,
            RegistryQuery::Balance(token(), Address::Account(SELLER)),
        );

        let bytes = to_bytes(&BalanceOfQueryResponse::from(vec![(
            BalanceOfQuery {
                token_id: token(),
                address: Address::Account(SELLER),
            },
            1u64,
        )]));
        let ctx = receive_ctx(Address::Contract(NFT_CONTRACT), &bytes, START);

        claim_eq!(contract_on_balance_of(&ctx, &mut host), Ok(()));
        claim_eq!(host.state_mut().query_inbox.take_answer(), Some(true));
    }

    #[concordium_test]
    fn test_on_operator_of_rejects_unexpected_answers() {
        let mut host = default_host();
        let bytes = operator_response(SELLER, true);

        // Nothing asked
        let ctx = receive_ctx(Address::Contract(NFT_CONTRACT), &bytes, START);
        claim_eq!(
            contract_on_operator_of(&ctx, &mut host),
            Err(CustomContractError::UnexpectedCallback.into())
        );

        host.state_mut().query_inbox.expect(
            NFT_CONTRACT,
            RegistryQuery::Operator(
                Address::Account(SELLER),
                Address::Contract(AUCTION_CONTRACT),
            ),
        );

        // Sent by an account
        let ctx = receive_ctx(Address::Account(SELLER), &bytes, START);
        claim_eq!(
            contract_on_operator_of(&ctx, &mut host),
            Err(CustomContractError::ContractOnly.into())
        );

        // Sent by another contract
        let other = ContractAddress {
            index: 9,
            subindex: 0,
        };
        let ctx = receive_ctx(Address::Contract(other), &bytes, START);
        claim_eq!(
            contract_on_operator_of(&ctx, &mut host),
            Err(CustomContractError::UnexpectedCallback.into())
        );
        claim_eq!(host.state_mut().query_inbox.take_answer(), None);
    }
}
