use commons::{AssetRef, AuctionId, BIDING_TAG, CREATED_TAG, ENDED_TAG, STARTED_TAG};
use concordium_std::*;

/// Auction creation event data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, SchemaType)]
pub struct CreatedEvent {
    pub auction: AuctionId,
    /// Token being sold.
    pub asset: AssetRef,
    /// Seller account address.
    pub seller: AccountAddress,
    pub duration: Duration,
    pub reserve_price: Amount,
}

/// Auction start event data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, SchemaType)]
pub struct StartedEvent {
    pub auction: AuctionId,
    /// Time the token went into escrow.
    pub start_time: Timestamp,
}

/// Bid event data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, SchemaType)]
pub struct BidEvent {
    pub auction: AuctionId,
    /// Bidder account address.
    pub bidder: AccountAddress,
    /// Bid amount.
    pub amount: Amount,
}

/// Auction settlement event data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, SchemaType)]
pub struct EndedEvent {
    pub auction: AuctionId,
    /// Auction winner. `None` if nobody bid and the token went back to the seller.
    pub winner: Option<AccountAddress>,
    /// Amount credited to the seller.
    pub price: Amount,
}

/// Tagged Custom event to be serialized for the event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuctionEvent {
    Created(CreatedEvent),
    Started(StartedEvent),
    Bid(BidEvent),
    Ended(EndedEvent),
}

impl AuctionEvent {
    pub fn started(auction: AuctionId, start_time: Timestamp) -> Self {
        Self::Started(StartedEvent {
            auction,
            start_time,
        })
    }

    pub fn bid(auction: AuctionId, bidder: AccountAddress, amount: Amount) -> Self {
        Self::Bid(BidEvent {
            auction,
            bidder,
            amount,
        })
    }

    pub fn ended(auction: AuctionId, winner: Option<AccountAddress>, price: Amount) -> Self {
        Self::Ended(EndedEvent {
            auction,
            winner,
            price,
        })
    }
}

impl Serial for AuctionEvent {
    fn serial<W: Write>(&self, out: &mut W) -> Result<(), W::Err> {
        match self {
            AuctionEvent::Created(event) => {
                out.write_u8(CREATED_TAG)?;
                event.serial(out)
            }
            AuctionEvent::Started(event) => {
                out.write_u8(STARTED_TAG)?;
                event.serial(out)
            }
            AuctionEvent::Bid(event) => {
                out.write_u8(BIDING_TAG)?;
                event.serial(out)
            }
            AuctionEvent::Ended(event) => {
                out.write_u8(ENDED_TAG)?;
                event.serial(out)
            }
        }
    }
}

impl Deserial for AuctionEvent {
    fn deserial<R: Read>(source: &mut R) -> ParseResult<Self> {
        let tag = source.read_u8()?;
        match tag {
            CREATED_TAG => CreatedEvent::deserial(source).map(AuctionEvent::Created),
            STARTED_TAG => StartedEvent::deserial(source).map(AuctionEvent::Started),
            BIDING_TAG => BidEvent::deserial(source).map(AuctionEvent::Bid),
            ENDED_TAG => EndedEvent::deserial(source).map(AuctionEvent::Ended),
            _ => Err(ParseError::default()),
        }
    }
}
