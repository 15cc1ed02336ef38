use commons::{ContractResult, CustomContractError};
use concordium_std::*;

/// Standing highest bid of an auction and the refundable balances of everyone else.
///
/// Funds are split in two disjoint pools: the standing bid, which stays at risk until it is outbid or the auction
/// ends, and `balances`, which is what the auction owes and only leaves the ledger through [`BidLedger::withdraw`].
#[derive(Serial, DeserialWithState)]
#[concordium(state_parameter = "S")]
pub struct BidLedger<S: HasStateApi> {
    /// Smallest amount the first bid has to exceed.
    reserve_price: Amount,
    /// Current highest bid. Equals the reserve price until the first bid.
    highest_bid: Amount,
    /// Current highest bidder.
    highest_bidder: Option<AccountAddress>,
    /// Withdrawable amounts.
    balances: StateMap<AccountAddress, Amount, S>,
}

impl<S: HasStateApi> BidLedger<S> {
    pub fn new(state_builder: &mut StateBuilder<S>, reserve_price: Amount) -> Self {
        Self {
            reserve_price,
            highest_bid: reserve_price,
            highest_bidder: None,
            balances: state_builder.new_map(),
        }
    }

    pub fn reserve_price(&self) -> Amount {
        self.reserve_price
    }

    pub fn highest_bid(&self) -> Amount {
        self.highest_bid
    }

    pub fn highest_bidder(&self) -> Option<AccountAddress> {
        self.highest_bidder
    }

    pub fn balance_of(&self, account: &AccountAddress) -> Amount {
        self.balances
            .get(account)
            .map(|balance| *balance)
            .unwrap_or_else(Amount::zero)
    }

    /// Make `amount` the new highest bid. The displaced bid becomes withdrawable by its bidder.
    pub fn place_bid(&mut self, bidder: AccountAddress, amount: Amount) -> ContractResult<()> {
        ensure!(amount > self.highest_bid, CustomContractError::BidTooLow);

        if let Some(previous_bidder) = self.highest_bidder {
            self.credit(previous_bidder, self.highest_bid)?;
        }

        self.highest_bid = amount;
        self.highest_bidder = Some(bidder);

        Ok(())
    }

    pub fn credit(&mut self, account: AccountAddress, amount: Amount) -> ContractResult<()> {
        if amount == Amount::zero() {
            return Ok(());
        }

        let balance = self
            .balance_of(&account)
            .micro_ccd
            .checked_add(amount.micro_ccd)
            .ok_or(CustomContractError::Overflow)?;
        self.balances
            .insert(account, Amount::from_micro_ccd(balance));

        Ok(())
    }

    /// Take the whole balance of `account` out of the ledger.
    ///
    /// The balance is cleared before the [`Withdrawal`] exists, so nothing that happens while it is being paid can
    /// withdraw the same funds again.
    pub fn withdraw(&mut self, account: AccountAddress) -> Withdrawal {
        let amount = self
            .balances
            .remove_and_get(&account)
            .unwrap_or_else(Amount::zero);

        Withdrawal { account, amount }
    }
}

/// Funds already removed from the ledger that still have to reach their owner.
#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub struct Withdrawal {
    account: AccountAddress,
    amount: Amount,
}

impl Withdrawal {
    pub fn account(&self) -> AccountAddress {
        self.account
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Hand the withdrawn funds to `payout` and return the paid amount. Empty withdrawals are not paid.
    pub fn pay_with<P: Payout>(self, payout: &mut P) -> Result<Amount, P::Err> {
        if self.amount > Amount::zero() {
            payout.pay(self.account, self.amount)?;
        }

        Ok(self.amount)
    }
}

/// Mechanism moving withdrawn funds to their owner.
pub trait Payout {
    type Err;

    fn pay(&mut self, to: AccountAddress, amount: Amount) -> Result<(), Self::Err>;
}

impl<E, F> Payout for F
where
    F: FnMut(AccountAddress, Amount) -> Result<(), E>,
{
    type Err = E;

    fn pay(&mut self, to: AccountAddress, amount: Amount) -> Result<(), E> {
        self(to, amount)
    }
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use concordium_std::test_infrastructure::*;

    const ALICE: AccountAddress = AccountAddress([1; 32]);
    const BOB: AccountAddress = AccountAddress([2; 32]);
    const CAROL: AccountAddress = AccountAddress([3; 32]);

    const RESERVE: Amount = Amount::from_micro_ccd(5);

    fn amount(micro_ccd: u64) -> Amount {
        Amount::from_micro_ccd(micro_ccd)
    }

    fn default_ledger() -> BidLedger<TestStateApi> {
        let mut state_builder = TestStateBuilder::new();
        BidLedger::new(&mut state_builder, RESERVE)
    }

    #[concordium_test]
    fn test_new_ledger_starts_at_reserve() {
        let ledger = default_ledger();

        claim_eq!(ledger.reserve_price(), RESERVE);
        claim_eq!(ledger.highest_bid(), RESERVE);
        claim_eq!(ledger.highest_bidder(), None);
        claim_eq!(ledger.balance_of(&ALICE), Amount::zero());
    }

    #[concordium_test]
    fn test_bid_must_exceed_highest_bid() {
        let mut ledger = default_ledger();

        // Below and equal to the reserve
        claim_eq!(
            ledger.place_bid(ALICE, amount(4)),
            Err(CustomContractError::BidTooLow)
        );
        claim_eq!(
            ledger.place_bid(ALICE, RESERVE),
            Err(CustomContractError::BidTooLow)
        );
        claim_eq!(ledger.highest_bidder(), None);

        claim_eq!(ledger.place_bid(ALICE, amount(6)), Ok(()));

        // Equal to the standing bid
        claim_eq!(
            ledger.place_bid(BOB, amount(6)),
            Err(CustomContractError::BidTooLow)
        );
        claim_eq!(ledger.highest_bid(), amount(6));
        claim_eq!(ledger.highest_bidder(), Some(ALICE));
        claim_eq!(ledger.balance_of(&ALICE), Amount::zero());
        claim_eq!(ledger.balance_of(&BOB), Amount::zero());
    }

    #[concordium_test]
    fn test_outbid_credits_previous_bidder() {
        let mut ledger = default_ledger();

        claim_eq!(ledger.place_bid(ALICE, amount(6)), Ok(()));
        claim_eq!(ledger.place_bid(BOB, amount(7)), Ok(()));
        claim_eq!(ledger.place_bid(CAROL, amount(10)), Ok(()));
        claim_eq!(ledger.place_bid(ALICE, amount(12)), Ok(()));

        claim_eq!(ledger.highest_bid(), amount(12));
        claim_eq!(ledger.highest_bidder(), Some(ALICE));
        claim_eq!(ledger.balance_of(&ALICE), amount(6));
        claim_eq!(ledger.balance_of(&BOB), amount(7));
        claim_eq!(ledger.balance_of(&CAROL), amount(10));
    }

    #[concordium_test]
    fn test_raising_own_bid_keeps_pools_disjoint() {
        let mut ledger = default_ledger();

        claim_eq!(ledger.place_bid(ALICE, amount(6)), Ok(()));
        claim_eq!(ledger.place_bid(ALICE, amount(8)), Ok(()));

        claim_eq!(ledger.highest_bid(), amount(8));
        claim_eq!(ledger.highest_bidder(), Some(ALICE));
        claim_eq!(ledger.balance_of(&ALICE), amount(6));
    }

    #[concordium_test]
    fn test_withdraw_clears_balance_before_payout() {
        let mut ledger = default_ledger();
        claim_eq!(ledger.place_bid(ALICE, amount(6)), Ok(()));
        claim_eq!(ledger.place_bid(BOB, amount(7)), Ok(()));

        let mut payouts = Vec::new();
        let withdrawal = ledger.withdraw(ALICE);
        let paid = withdrawal.pay_with(&mut |to: AccountAddress, amount: Amount| {
            // Re-entering the ledger while the payout is in flight finds nothing to take
            claim_eq!(ledger.balance_of(&to), Amount::zero());
            let reentrant = ledger.withdraw(to);
            claim_eq!(reentrant.amount(), Amount::zero());
            payouts.push((to, amount));
            Ok::<(), ()>(())
        });

        claim_eq!(paid, Ok(amount(6)));
        claim_eq!(payouts, vec![(ALICE, amount(6))]);
        claim_eq!(ledger.balance_of(&ALICE), Amount::zero());
    }

    #[concordium_test]
    fn test_withdraw_empty_balance_is_noop() {
        let mut ledger = default_ledger();

        let mut calls = 0;
        let paid = ledger
            .withdraw(ALICE)
            .pay_with(&mut |_: AccountAddress, _: Amount| {
                calls += 1;
                Ok::<(), ()>(())
            });

        claim_eq!(paid, Ok(Amount::zero()));
        claim_eq!(calls, 0);
    }

    #[concordium_test]
    fn test_second_withdraw_pays_nothing() {
        let mut ledger = default_ledger();
        claim_eq!(ledger.place_bid(ALICE, amount(6)), Ok(()));
        claim_eq!(ledger.place_bid(BOB, amount(7)), Ok(()));

        let first = ledger.withdraw(ALICE);
        let second = ledger.withdraw(ALICE);

        claim_eq!(first.amount(), amount(6));
        claim_eq!(second.amount(), Amount::zero());
        claim_eq!(second.account(), ALICE);
    }

    #[concordium_test]
    fn test_failed_payout_is_reported() {
        let mut ledger = default_ledger();
        claim_eq!(ledger.place_bid(ALICE, amount(6)), Ok(()));
        claim_eq!(ledger.place_bid(BOB, amount(7)), Ok(()));

        let paid = ledger
            .withdraw(ALICE)
            .pay_with(&mut |_: AccountAddress, _: Amount| Err("account missing"));

        claim_eq!(paid, Err("account missing"));
    }

    #[concordium_test]
    fn test_credit_accumulates_and_checks_overflow() {
        let mut ledger = default_ledger();

        claim_eq!(ledger.credit(CAROL, amount(3)), Ok(()));
        claim_eq!(ledger.credit(CAROL, amount(4)), Ok(()));
        claim_eq!(ledger.balance_of(&CAROL), amount(7));

        claim_eq!(
            ledger.credit(CAROL, amount(u64::MAX)),
            Err(CustomContractError::Overflow)
        );
        claim_eq!(ledger.balance_of(&CAROL), amount(7));
    }
}
