use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{log::sol_log_data, msg, pubkey::Pubkey};

/// Events the raffle publishes for off-chain indexers, Borsh-encoded on
/// the structured log channel (`sol_log_data`, surfaced in transaction
/// logs as `Program data:` lines).
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum RaffleEvent {
    /// A player joined the current round
    Entered { player: Pubkey, amount: u64 },
    /// The round locked and a randomness request went out
    RequestedWinner { request_id: u64 },
    /// The round settled and the pool was paid out
    WinnerPicked { winner: Pubkey, payout: u64 },
}

impl RaffleEvent {
    /// Publish the event. Encoding a plain enum into a Vec cannot fail;
    /// the fallback log line is there so a failure would at least be
    /// visible rather than silently dropped.
    pub fn emit(&self) {
        match self.try_to_vec() {
            Ok(bytes) => sol_log_data(&[&bytes]),
            Err(_) => msg!("Failed to encode raffle event"),
        }
    }
}
