use commons::{AssetRef, AssetRegistry, AuctionId, ContractResult, CustomContractError};
use concordium_cis1::{AdditionalData, Receiver};
use concordium_std::*;

/// Full name of the hook the registry calls when a token is moved into escrow.
pub const RECEIVE_HOOK: &str = "BictoryEnglishAuction.onReceivingCIS1";

/// Moves auctioned tokens in and out of the custody of the auction contract.
///
/// Each auction acquires its token once, on start, and releases it once, on end. The auction lifecycle is
/// responsible for never calling either twice.
pub struct EscrowGateway<R> {
    registry: R,
    /// Address of the auction contract holding escrowed tokens.
    escrow: ContractAddress,
}

impl<R: AssetRegistry> EscrowGateway<R> {
    pub fn new(registry: R, escrow: ContractAddress) -> Self {
        Self { registry, escrow }
    }

    /// Take custody of `asset` from its owner.
    ///
    /// Auction id travels as transfer data, so the receive hook is able to match the deposit with its auction.
    pub fn acquire(
        &mut self,
        auction: AuctionId,
        asset: &AssetRef,
        from: AccountAddress,
    ) -> ContractResult<()> {
        let owner = Address::Account(from);

        ensure!(
            self.registry
                .is_authorized(asset, &owner, &Address::Contract(self.escrow))?,
            CustomContractError::NotAuthorized
        );

        self.registry.transfer(
            asset,
            owner,
            Receiver::Contract(
                self.escrow,
                OwnedReceiveName::new_unchecked(RECEIVE_HOOK.into()),
            ),
            AdditionalData::from(to_bytes(&auction)),
        )
    }

    /// Hand the escrowed `asset` over to `to`.
    pub fn release(&mut self, asset: &AssetRef, to: AccountAddress) -> ContractResult<()> {
        self.registry.transfer(
            asset,
            Address::Contract(self.escrow),
            Receiver::Account(to),
            AdditionalData::empty(),
        )
    }
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use concordium_cis1::TokenIdVec;

    const NFT_CONTRACT: ContractAddress = ContractAddress {
        index: 1,
        subindex: 0,
    };
    const AUCTION_CONTRACT: ContractAddress = ContractAddress {
        index: 2,
        subindex: 0,
    };

    const SELLER: AccountAddress = AccountAddress([1; 32]);
    const WINNER: AccountAddress = AccountAddress([2; 32]);

    /// Registry holding a single token, enforcing the same ownership and operator rules as a CIS-1 contract.
    struct MemoryRegistry {
        owner: Address,
        operators: Vec<(Address, Address)>,
        /// Address calling the registry.
        caller: Address,
        transfers: Vec<(Address, Address, Vec<u8>)>,
    }

    impl MemoryRegistry {
        fn new(owner: AccountAddress) -> Self {
            Self {
                owner: Address::Account(owner),
                operators: Vec::new(),
                caller: Address::Contract(AUCTION_CONTRACT),
                transfers: Vec::new(),
            }
        }

        fn approve(mut self, owner: AccountAddress, operator: ContractAddress) -> Self {
            self.operators
                .push((Address::Account(owner), Address::Contract(operator)));
            self
        }
    }

    impl AssetRegistry for MemoryRegistry {
        fn is_owner(&mut self, _asset: &AssetRef, owner: &Address) -> ContractResult<bool> {
            Ok(self.owner == *owner)
        }

        fn is_authorized(
            &mut self,
            _asset: &AssetRef,
            owner: &Address,
            spender: &Address,
        ) -> ContractResult<bool> {
            Ok(self.operators.contains(&(*owner, *spender)))
        }

        fn transfer(
            &mut self,
            _asset: &AssetRef,
            from: Address,
            to: Receiver,
            data: AdditionalData,
        ) -> ContractResult<()> {
            ensure!(self.owner == from, CustomContractError::InvokeContractError);
            ensure!(
                from == self.caller || self.operators.contains(&(from, self.caller)),
                CustomContractError::InvokeContractError
            );

            let to = match to {
                Receiver::Account(account) => Address::Account(account),
                Receiver::Contract(contract, _) => Address::Contract(contract),
            };
            self.owner = to;
            self.transfers.push((from, to, data.as_ref().to_vec()));

            Ok(())
        }
    }

    fn asset() -> AssetRef {
        AssetRef::new(NFT_CONTRACT, TokenIdVec(vec![0, 1]))
    }

    #[concordium_test]
    fn test_acquire_requires_authorization() {
        let mut escrow = EscrowGateway::new(MemoryRegistry::new(SELLER), AUCTION_CONTRACT);

        let result = escrow.acquire(0, &asset(), SELLER);

        claim_eq!(result, Err(CustomContractError::NotAuthorized));
        claim_eq!(escrow.registry.owner, Address::Account(SELLER));
        claim!(escrow.registry.transfers.is_empty());
    }

    #[concordium_test]
    fn test_acquire_moves_token_into_escrow() {
        let registry = MemoryRegistry::new(SELLER).approve(SELLER, AUCTION_CONTRACT);
        let mut escrow = EscrowGateway::new(registry, AUCTION_CONTRACT);

        let result = escrow.acquire(7, &asset(), SELLER);

        claim_eq!(result, Ok(()));
        claim_eq!(escrow.registry.owner, Address::Contract(AUCTION_CONTRACT));
        claim_eq!(
            escrow.registry.transfers,
            vec![(
                Address::Account(SELLER),
                Address::Contract(AUCTION_CONTRACT),
                to_bytes(&7u64)
            )]
        );
    }

    #[concordium_test]
    fn test_acquire_fails_when_token_is_gone() {
        // Authorized, but the seller no longer holds the token
        let mut registry = MemoryRegistry::new(SELLER).approve(SELLER, AUCTION_CONTRACT);
        registry.owner = Address::Account(WINNER);
        let mut escrow = EscrowGateway::new(registry, AUCTION_CONTRACT);

        let result = escrow.acquire(0, &asset(), SELLER);

        claim_eq!(result, Err(CustomContractError::InvokeContractError));
        claim_eq!(escrow.registry.owner, Address::Account(WINNER));
    }

    #[concordium_test]
    fn test_release_hands_token_to_winner() {
        let registry = MemoryRegistry::new(SELLER).approve(SELLER, AUCTION_CONTRACT);
        let mut escrow = EscrowGateway::new(registry, AUCTION_CONTRACT);
        claim_eq!(escrow.acquire(0, &asset(), SELLER), Ok(()));

        let result = escrow.release(&asset(), WINNER);

        claim_eq!(result, Ok(()));
        claim_eq!(escrow.registry.owner, Address::Account(WINNER));
    }

    #[concordium_test]
    fn test_release_twice_fails() {
        let registry = MemoryRegistry::new(SELLER).approve(SELLER, AUCTION_CONTRACT);
        let mut escrow = EscrowGateway::new(registry, AUCTION_CONTRACT);
        claim_eq!(escrow.acquire(0, &asset(), SELLER), Ok(()));
        claim_eq!(escrow.release(&asset(), WINNER), Ok(()));

        claim_eq!(
            escrow.release(&asset(), SELLER),
            Err(CustomContractError::InvokeContractError)
        );
        claim_eq!(escrow.registry.owner, Address::Account(WINNER));
    }
}
