//! Querying side of the CIS-1 `balanceOf` and `operatorOf` entrypoints.
//!
//! A CIS-1 registry does not return query results. It invokes the receive function named in the query parameter
//! with the response, inside the same transaction. The querying contract keeps the query it sent in a
//! [`QueryInbox`] in its state, and its callback entrypoint delivers the answer there.
use super::*;

/// Receive functions of the querying contract that registries report results to.
#[derive(Debug, Clone, Copy)]
pub struct QueryCallbacks {
    /// Contract the results are sent to.
    pub contract: ContractAddress,
    /// Full receive name taking a `BalanceOfQueryResponse`.
    pub balance_of: &'static str,
    /// Full receive name taking an `OperatorOfQueryResponse`.
    pub operator_of: &'static str,
}

impl QueryCallbacks {
    pub fn balance_of_function(&self) -> OwnedReceiveName {
        OwnedReceiveName::new_unchecked(String::from(self.balance_of))
    }

    pub fn operator_of_function(&self) -> OwnedReceiveName {
        OwnedReceiveName::new_unchecked(String::from(self.operator_of))
    }
}

/// Single query sent to a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RegistryQuery {
    /// Balance of a token id held by an address.
    Balance(ContractTokenId, Address),
    /// Whether the second address is an operator of the first.
    Operator(Address, Address),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct PendingQuery {
    registry: ContractAddress,
    query: RegistryQuery,
    answer: Option<bool>,
}

/// Slot in the contract state for the one registry query in flight.
#[derive(Debug, Default, Serialize)]
pub struct QueryInbox {
    pending: Option<PendingQuery>,
}

impl QueryInbox {
    /// Wait for the answer to `query` from `registry`. Replaces any earlier query.
    pub fn expect(&mut self, registry: ContractAddress, query: RegistryQuery) {
        self.pending = Some(PendingQuery {
            registry,
            query,
            answer: None,
        });
    }

    /// Record a `balanceOf` response sent by `from`. The token counts as held if its balance is not zero.
    pub fn deliver_balance(
        &mut self,
        from: ContractAddress,
        response: BalanceOfQueryResponse<ContractTokenId>,
    ) -> ContractResult<()> {
        let (query, amount) = single(response.0)?;
        self.deliver(
            from,
            RegistryQuery::Balance(query.token_id, query.address),
            amount > 0,
        )
    }

    /// Record an `operatorOf` response sent by `from`.
    pub fn deliver_operator(
        &mut self,
        from: ContractAddress,
        response: OperatorOfQueryResponse,
    ) -> ContractResult<()> {
        let (query, is_operator) = single(response.0)?;
        self.deliver(
            from,
            RegistryQuery::Operator(query.owner, query.address),
            is_operator,
        )
    }

    /// Take the delivered answer and clear the slot. `None` if the registry never called back.
    pub fn take_answer(&mut self) -> Option<bool> {
        self.pending.take().and_then(|pending| pending.answer)
    }

    fn deliver(
        &mut self,
        from: ContractAddress,
        query: RegistryQuery,
        answer: bool,
    ) -> ContractResult<()> {
        let pending = self
            .pending
            .as_mut()
            .ok_or(CustomContractError::UnexpectedCallback)?;

        ensure!(
            pending.registry == from && pending.query == query && pending.answer.is_none(),
            CustomContractError::UnexpectedCallback
        );
        pending.answer = Some(answer);

        Ok(())
    }
}

/// Contract state holding a [`QueryInbox`].
pub trait HasQueryInbox {
    fn query_inbox(&mut self) -> &mut QueryInbox;
}

fn single<A>(mut entries: Vec<A>) -> ContractResult<A> {
    ensure!(entries.len() == 1, CustomContractError::UnexpectedCallback);
    entries.pop().ok_or(CustomContractError::UnexpectedCallback)
}

#[concordium_cfg_test]
mod tests {
    use super::*;

    const REGISTRY: ContractAddress = ContractAddress {
        index: 1,
        subindex: 0,
    };
    const OTHER_REGISTRY: ContractAddress = ContractAddress {
        index: 3,
        subindex: 0,
    };
    const AUCTION_CONTRACT: ContractAddress = ContractAddress {
        index: 2,
        subindex: 0,
    };

    const USER_1: AccountAddress = AccountAddress([1; 32]);
    const USER_2: AccountAddress = AccountAddress([2; 32]);

    fn operator_response(owner: AccountAddress, is_operator: bool) -> OperatorOfQueryResponse {
        OperatorOfQueryResponse::from(vec![(
            OperatorOfQuery {
                owner: Address::Account(owner),
                address: Address::Contract(AUCTION_CONTRACT),
            },
            is_operator,
        )])
    }

    fn operator_query(owner: AccountAddress) -> RegistryQuery {
        RegistryQuery::Operator(
            Address::Account(owner),
            Address::Contract(AUCTION_CONTRACT),
        )
    }

    #[concordium_test]
    fn test_deliver_operator() {
        let mut inbox = QueryInbox::default();
        inbox.expect(REGISTRY, operator_query(USER_1));

        claim_eq!(
            inbox.deliver_operator(REGISTRY, operator_response(USER_1, true)),
            Ok(())
        );
        claim_eq!(inbox.take_answer(), Some(true));
        claim_eq!(inbox.take_answer(), None);
    }

    #[concordium_test]
    fn test_deliver_balance() {
        let token_id = TokenIdVec(vec![1, 2, 3]);
        let mut inbox = QueryInbox::default();
        inbox.expect(
            REGISTRY,
            RegistryQuery::Balance(token_id.clone(), Address::Account(USER_1)),
        );

        let response = BalanceOfQueryResponse::from(vec![(
            BalanceOfQuery {
                token_id,
                address: Address::Account(USER_1),
            },
            0,
        )]);

        claim_eq!(inbox.deliver_balance(REGISTRY, response), Ok(()));
        claim_eq!(inbox.take_answer(), Some(false));
    }

    #[concordium_test]
    fn test_unsolicited_answer_rejected() {
        let mut inbox = QueryInbox::default();

        claim_eq!(
            inbox.deliver_operator(REGISTRY, operator_response(USER_1, true)),
            Err(CustomContractError::UnexpectedCallback)
        );
    }

    #[concordium_test]
    fn test_answer_must_match_query() {
        let mut inbox = QueryInbox::default();
        inbox.expect(REGISTRY, operator_query(USER_1));

        // Another registry, another owner, then a second answer to the same query
        claim_eq!(
            inbox.deliver_operator(OTHER_REGISTRY, operator_response(USER_1, true)),
            Err(CustomContractError::UnexpectedCallback)
        );
        claim_eq!(
            inbox.deliver_operator(REGISTRY, operator_response(USER_2, true)),
            Err(CustomContractError::UnexpectedCallback)
        );
        claim_eq!(
            inbox.deliver_operator(REGISTRY, operator_response(USER_1, false)),
            Ok(())
        );
        claim_eq!(
            inbox.deliver_operator(REGISTRY, operator_response(USER_1, true)),
            Err(CustomContractError::UnexpectedCallback)
        );
        claim_eq!(inbox.take_answer(), Some(false));
    }

    #[concordium_test]
    fn test_answer_must_be_single() {
        let mut inbox = QueryInbox::default();
        inbox.expect(REGISTRY, operator_query(USER_1));

        claim_eq!(
            inbox.deliver_operator(REGISTRY, OperatorOfQueryResponse::from(Vec::new())),
            Err(CustomContractError::UnexpectedCallback)
        );
        claim_eq!(inbox.take_answer(), None);
    }
}
