use super::*;

/// The custom errors the auction contract can produce.
#[derive(Serialize, Debug, PartialEq, Eq, Reject, SchemaType)]
pub enum CustomContractError {
    /// Failed parsing the parameter (Error code: -1).
    #[from(ParseError)]
    ParseParams,
    /// Failed logging: Log is full (Error code: -2).
    LogFull,
    /// Failed logging: Log is malformed (Error code: -3).
    LogMalformed,
    /// No auction is registered under the given id (Error code: -4).
    UnknownAuction,
    /// Only account addresses can take part in auctions (Error code: -5).
    OnlyAccountAddress,
    /// This function must only be called by a contract (Error code: -6)
    ContractOnly,
    /// Caller or auction contract is not allowed to move the token (Error code: -7).
    NotAuthorized,
    /// Auction creator does not hold the token (Error code: -8).
    NotTokenOwner,
    /// Auction was already started (Error code: -9).
    AlreadyStarted,
    /// Auction was not started yet (Error code: -10).
    NotStarted,
    /// Auction was already ended (Error code: -11).
    AlreadyEnded,
    /// Auction duration has not passed yet (Error code: -12).
    AuctionNotYetOver,
    // Raised if bid is not higher than the highest bid (Error code: -13)
    BidTooLow,
    /// Duration is either zero or over the configured limit (Error code: -14)
    InvalidDuration,
    /// Amount arithmetic overflowed (Error code: -15)
    Overflow,
    /// Token transfer into the contract was not requested by an auction (Error code: -16)
    UnexpectedToken,
    /// Incompatible contract (Error code: -17)
    Incompatible,
    /// Failed to invoke a contract (Error code: -18).
    InvokeContractError,
    /// Failed to invoke a transfer (Error code: -19).
    InvokeTransferError,
    /// Registry query answer was not requested or does not match the query (Error code: -20).
    UnexpectedCallback,
}

/// Mapping the logging errors to CustomContractError.
impl From<LogError> for CustomContractError {
    fn from(le: LogError) -> Self {
        match le {
            LogError::Full => Self::LogFull,
            LogError::Malformed => Self::LogMalformed,
        }
    }
}

/// Mapping errors related to contract invocations to CustomContractError.
impl<T> From<CallContractError<T>> for CustomContractError {
    fn from(cce: CallContractError<T>) -> Self {
        match cce {
            CallContractError::MissingEntrypoint | CallContractError::MessageFailed => {
                Self::Incompatible
            }
            _ => Self::InvokeContractError,
        }
    }
}

/// Mapping errors related to transfer invocations to CustomContractError.
impl From<TransferError> for CustomContractError {
    fn from(_te: TransferError) -> Self {
        Self::InvokeTransferError
    }
}
