use core::marker::PhantomData;

use super::*;

/// Capability the auction contract needs from the registry holding the auctioned token.
///
/// The contract never assumes a particular approval model: it only asks whether it may move a token on
/// behalf of an owner and asks the registry to move it.
pub trait AssetRegistry {
    /// Whether `owner` currently holds `asset`.
    fn is_owner(&mut self, asset: &AssetRef, owner: &Address) -> ContractResult<bool>;

    /// Whether `spender` is allowed to transfer `asset` away from `owner`.
    fn is_authorized(
        &mut self,
        asset: &AssetRef,
        owner: &Address,
        spender: &Address,
    ) -> ContractResult<bool>;

    /// Move `asset` from `from` to `to`. Fails if `from` is not the owner or the sender is not allowed to move it.
    fn transfer(
        &mut self,
        asset: &AssetRef,
        from: Address,
        to: Receiver,
        data: AdditionalData,
    ) -> ContractResult<()>;
}

/// [`AssetRegistry`] backed by a CIS-1 token contract, called through the contract host.
///
/// Query results come back through `callbacks` into the [`QueryInbox`] of the host state.
pub struct Cis1Registry<'a, T, H> {
    host: &'a mut H,
    callbacks: QueryCallbacks,
    _state: PhantomData<T>,
}

impl<'a, T: HasQueryInbox, H: HasHost<T>> Cis1Registry<'a, T, H> {
    pub fn new(host: &'a mut H, callbacks: QueryCallbacks) -> Self {
        Self {
            host,
            callbacks,
            _state: PhantomData,
        }
    }

    /// Send `parameter` to the registry and collect the answer its callback left in the inbox.
    fn query<P: Serial>(
        &mut self,
        registry: &ContractAddress,
        entrypoint: &'static str,
        parameter: &P,
        query: RegistryQuery,
    ) -> ContractResult<bool> {
        self.host.state_mut().query_inbox().expect(*registry, query);

        self.host.invoke_contract(
            registry,
            parameter,
            EntrypointName::new_unchecked(entrypoint),
            Amount::zero(),
        )?;

        self.host
            .state_mut()
            .query_inbox()
            .take_answer()
            .ok_or(CustomContractError::Incompatible)
    }
}

impl<'a, T: HasQueryInbox, H: HasHost<T>> AssetRegistry for Cis1Registry<'a, T, H> {
    fn is_owner(&mut self, asset: &AssetRef, owner: &Address) -> ContractResult<bool> {
        let params = BalanceOfQueryParams {
            result_contract: self.callbacks.contract,
            result_function: self.callbacks.balance_of_function(),
            queries: vec![BalanceOfQuery {
                token_id: asset.id.clone(),
                address: *owner,
            }],
        };

        self.query(
            &asset.contract,
            "balanceOf",
            &params,
            RegistryQuery::Balance(asset.id.clone(), *owner),
        )
    }

    fn is_authorized(
        &mut self,
        asset: &AssetRef,
        owner: &Address,
        spender: &Address,
    ) -> ContractResult<bool> {
        // CIS-1 operators are allowed to move every token of the owner
        let params = OperatorOfQueryParams {
            result_contract: self.callbacks.contract,
            result_function: self.callbacks.operator_of_function(),
            queries: vec![OperatorOfQuery {
                owner: *owner,
                address: *spender,
            }],
        };

        self.query(
            &asset.contract,
            "operatorOf",
            &params,
            RegistryQuery::Operator(*owner, *spender),
        )
    }

    fn transfer(
        &mut self,
        asset: &AssetRef,
        from: Address,
        to: Receiver,
        data: AdditionalData,
    ) -> ContractResult<()> {
        self.host.invoke_contract(
            &asset.contract,
            &(
                1u16,
                Transfer {
                    token_id: asset.id.clone(),
                    amount: 1,
                    from,
                    to,
                    data,
                },
            ),
            EntrypointName::new_unchecked("transfer"),
            Amount::zero(),
        )?;

        Ok(())
    }
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use crate::test::*;
    use concordium_std::test_infrastructure::*;

    const NFT_CONTRACT: ContractAddress = ContractAddress {
        index: 1,
        subindex: 0,
    };
    const AUCTION_CONTRACT: ContractAddress = ContractAddress {
        index: 2,
        subindex: 0,
    };

    const CALLBACKS: QueryCallbacks = QueryCallbacks {
        contract: AUCTION_CONTRACT,
        balance_of: "BictoryEnglishAuction.onBalanceOf",
        operator_of: "BictoryEnglishAuction.onOperatorOf",
    };

    const USER_1: AccountAddress = AccountAddress([1; 32]);
    const USER_2: AccountAddress = AccountAddress([2; 32]);

    #[derive(Serialize, Default)]
    struct TestState {
        inbox: QueryInbox,
    }

    impl HasQueryInbox for TestState {
        fn query_inbox(&mut self) -> &mut QueryInbox {
            &mut self.inbox
        }
    }

    fn default_host() -> TestHost<TestState> {
        TestHost::new(TestState::default(), TestStateBuilder::default())
    }

    fn asset() -> AssetRef {
        AssetRef::new(NFT_CONTRACT, TokenIdVec(vec![1, 2, 3]))
    }

    #[concordium_test]
    fn test_is_owner() {
        let mut host = default_host();

        // Registry reports USER_1 as the only holder
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("balanceOf".into()),
            parse_and_callback_mock(
                |params: &BalanceOfQueryParams<TokenIdVec>, state: &mut TestState| {
                    let response: Vec<_> = params
                        .queries
                        .iter()
                        .map(|query| {
                            (
                                BalanceOfQuery {
                                    token_id: query.token_id.clone(),
                                    address: query.address,
                                },
                                u64::from(query.address == Address::Account(USER_1)),
                            )
                        })
                        .collect();

                    params.result_contract == AUCTION_CONTRACT
                        && params.result_function == CALLBACKS.balance_of_function()
                        && state
                            .inbox
                            .deliver_balance(NFT_CONTRACT, BalanceOfQueryResponse::from(response))
                            .is_ok()
                },
            ),
        );

        let mut registry = Cis1Registry::new(&mut host, CALLBACKS);
        claim_eq!(registry.is_owner(&asset(), &Address::Account(USER_1)), Ok(true));
        claim_eq!(registry.is_owner(&asset(), &Address::Account(USER_2)), Ok(false));
    }

    #[concordium_test]
    fn test_is_authorized() {
        let mut host = default_host();

        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("operatorOf".into()),
            parse_and_callback_mock(|params: &OperatorOfQueryParams, state: &mut TestState| {
                let query = match params.queries.first() {
                    Some(query) if params.queries.len() == 1 => query,
                    _ => return false,
                };
                let response = OperatorOfQueryResponse::from(vec![(
                    OperatorOfQuery {
                        owner: query.owner,
                        address: query.address,
                    },
                    query.owner == Address::Account(USER_1),
                )]);

                params.result_contract == AUCTION_CONTRACT
                    && params.result_function == CALLBACKS.operator_of_function()
                    && query.address == Address::Contract(AUCTION_CONTRACT)
                    && state.inbox.deliver_operator(NFT_CONTRACT, response).is_ok()
            }),
        );

        let mut registry = Cis1Registry::new(&mut host, CALLBACKS);
        claim_eq!(
            registry.is_authorized(
                &asset(),
                &Address::Account(USER_1),
                &Address::Contract(AUCTION_CONTRACT)
            ),
            Ok(true)
        );
        claim_eq!(
            registry.is_authorized(
                &asset(),
                &Address::Account(USER_2),
                &Address::Contract(AUCTION_CONTRACT)
            ),
            Ok(false)
        );
    }

    #[concordium_test]
    fn test_missing_callback_is_incompatible() {
        let mut host = default_host();

        // Accepts the query but never calls back
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("operatorOf".into()),
            parse_and_ok_mock::<OperatorOfQueryParams, _>(()),
        );

        let mut registry = Cis1Registry::new(&mut host, CALLBACKS);
        claim_eq!(
            registry.is_authorized(
                &asset(),
                &Address::Account(USER_1),
                &Address::Contract(AUCTION_CONTRACT)
            ),
            Err(CustomContractError::Incompatible)
        );
        claim_eq!(host.state_mut().inbox.take_answer(), None);
    }

    #[concordium_test]
    fn test_rejected_query() {
        let mut host = default_host();

        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("balanceOf".into()),
            trap_mock(),
        );

        let mut registry = Cis1Registry::new(&mut host, CALLBACKS);
        claim_eq!(
            registry.is_owner(&asset(), &Address::Account(USER_1)),
            Err(CustomContractError::InvokeContractError)
        );
    }

    #[concordium_test]
    fn test_transfer() {
        let mut host = default_host();

        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            parse_and_check_mock(
                |params: &TransferParams<TokenIdVec>| {
                    params.0.len() == 1
                        && params.0[0].amount == 1
                        && params.0[0].from == Address::Contract(AUCTION_CONTRACT)
                        && matches!(params.0[0].to, Receiver::Account(to) if to == USER_2)
                },
                (),
            ),
        );

        let mut registry = Cis1Registry::new(&mut host, CALLBACKS);
        let result = registry.transfer(
            &asset(),
            Address::Contract(AUCTION_CONTRACT),
            Receiver::Account(USER_2),
            AdditionalData::empty(),
        );

        claim_eq!(result, Ok(()));
    }

    #[concordium_test]
    fn test_transfer_rejected() {
        let mut host = default_host();

        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            trap_mock(),
        );

        let mut registry = Cis1Registry::new(&mut host, CALLBACKS);
        let result = registry.transfer(
            &asset(),
            Address::Account(USER_1),
            Receiver::Account(USER_2),
            AdditionalData::empty(),
        );

        claim_eq!(result, Err(CustomContractError::InvokeContractError));
    }
}
