use solana_program::{
    decode_error::DecodeError, msg, program_error::PrintProgramError,
    program_error::ProgramError,
};
use thiserror::Error;

/// Errors that may be returned by the raffle program
#[derive(Error, Debug, Copy, Clone, PartialEq)]
pub enum RaffleError {
    /// The raffle account has already been initialized
    #[error("Raffle already initialized")]
    AlreadyInitialized,

    /// Entry payment is below the entrance fee
    #[error("Payment is below the entrance fee")]
    NotEnoughFunds,

    /// Entry attempted while the raffle is not open
    #[error("Raffle is not open for entries")]
    RaffleNotOpen,

    /// The player table for this round is full
    #[error("Raffle round is full")]
    RaffleFull,

    /// Upkeep conditions are not met
    #[error("Upkeep is not needed")]
    UpkeepNotNeeded,

    /// Fulfillment was not signed by the configured oracle identity
    #[error("Caller is not the configured oracle")]
    UnauthorizedOracle,

    /// Fulfillment arrived while no randomness request is outstanding
    #[error("No randomness request is pending")]
    NoPendingRequest,

    /// Fulfillment carries a stale or foreign request id
    #[error("Request id does not match the pending request")]
    RequestIdMismatch,

    /// The oracle did not acknowledge a request with a valid request id,
    /// or delivered an empty fulfillment
    #[error("Invalid oracle response")]
    InvalidOracleResponse,

    /// The supplied winner account is not the participant the random
    /// words select
    #[error("Winner account does not match the drawn participant")]
    WinnerMismatch,

    /// Arithmetic overflow during bookkeeping or payout
    #[error("Arithmetic overflow")]
    Overflow,
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}

impl PrintProgramError for RaffleError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
