use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program::{
    clock::UnixTimestamp,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::Pubkey,
};
use std::convert::TryFrom;

/// Seed of the singleton raffle PDA
pub const RAFFLE_SEED: &[u8] = b"raffle";

/// Capacity of the per-round player table. Accounts are sized at creation,
/// so a round can hold at most this many entries.
pub const MAX_PLAYERS: usize = 64;

/// Phase of the current round
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RaffleState {
    /// Accepting entries
    Open,
    /// Randomness request outstanding, entries blocked
    Calculating,
}

impl TryFrom<u8> for RaffleState {
    type Error = &'static str;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(RaffleState::Open),
            1 => Ok(RaffleState::Calculating),
            _ => Err("Invalid raffle state"),
        }
    }
}

impl From<RaffleState> for u8 {
    fn from(state: RaffleState) -> Self {
        match state {
            RaffleState::Open => 0,
            RaffleState::Calculating => 1,
        }
    }
}

/// Raffle account data: immutable configuration plus the live round.
/// A single instance lives at the `RAFFLE_SEED` PDA and recycles forever.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Raffle {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Phase of the current round
    pub state: RaffleState,
    /// Bump of the raffle PDA, kept so the program can sign oracle requests
    pub bump: u8,
    /// Minimum entry payment in lamports
    pub entrance_fee: u64,
    /// Minimum seconds between a settlement and the next upkeep
    pub interval: i64,
    /// Randomness oracle program the upkeep requests from
    pub oracle_program: Pubkey,
    /// Oracle queue the requests are routed to
    pub oracle_queue: Pubkey,
    /// Key that must sign fulfillment callbacks
    pub oracle_identity: Pubkey,
    /// Oracle billing subscription passed with every request
    pub subscription_id: u64,
    /// Compute budget the oracle should reserve for the callback
    pub callback_compute_units: u32,
    /// Time of initialization or of the most recent winner payout
    pub last_settlement_time: UnixTimestamp,
    /// Outstanding request id; meaningful only while Calculating
    pub pending_request_id: u64,
    /// Winner of the most recent settled round (zero before the first)
    pub recent_winner: Pubkey,
    /// Sum of entry payments in the current round, excludes the
    /// account's rent-exempt reserve
    pub pool_lamports: u64,
    /// Number of occupied slots in `players`
    pub player_count: u64,
    /// Entries in insertion order; one slot per entry, duplicates allowed
    pub players: [Pubkey; MAX_PLAYERS],
}

impl Raffle {
    /// The players of the current round, in entry order
    pub fn players(&self) -> &[Pubkey] {
        let count = (self.player_count as usize).min(MAX_PLAYERS);
        &self.players[..count]
    }

    /// The upkeep predicate: true iff the interval has elapsed since the
    /// last settlement, the round is open, and it has players and a pool.
    /// Side-effect free so it can be polled arbitrarily often.
    pub fn is_upkeep_needed(&self, now: UnixTimestamp) -> bool {
        now.saturating_sub(self.last_settlement_time) >= self.interval
            && self.state == RaffleState::Open
            && self.player_count > 0
            && self.pool_lamports > 0
    }
}

impl Sealed for Raffle {}

impl IsInitialized for Raffle {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for Raffle {
    const LEN: usize = 1 + 1 + 1 + 8 + 8 + 32 + 32 + 32 + 8 + 4 + 8 + 8 + 32 + 8 + 8
        + 32 * MAX_PLAYERS;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, Raffle::LEN];
        let (
            is_initialized,
            state,
            bump,
            entrance_fee,
            interval,
            oracle_program,
            oracle_queue,
            oracle_identity,
            subscription_id,
            callback_compute_units,
            last_settlement_time,
            pending_request_id,
            recent_winner,
            pool_lamports,
            player_count,
            players_flat,
        ) = array_refs![src, 1, 1, 1, 8, 8, 32, 32, 32, 8, 4, 8, 8, 32, 8, 8, 32 * MAX_PLAYERS];

        let state = match RaffleState::try_from(state[0]) {
            Ok(state) => state,
            Err(_) => return Err(ProgramError::InvalidAccountData),
        };

        let mut players = [Pubkey::default(); MAX_PLAYERS];
        for (i, slot) in players.iter_mut().enumerate() {
            *slot = Pubkey::new_from_array(*array_ref![players_flat, i * 32, 32]);
        }

        Ok(Raffle {
            is_initialized: is_initialized[0] != 0,
            state,
            bump: bump[0],
            entrance_fee: u64::from_le_bytes(*entrance_fee),
            interval: i64::from_le_bytes(*interval),
            oracle_program: Pubkey::new_from_array(*oracle_program),
            oracle_queue: Pubkey::new_from_array(*oracle_queue),
            oracle_identity: Pubkey::new_from_array(*oracle_identity),
            subscription_id: u64::from_le_bytes(*subscription_id),
            callback_compute_units: u32::from_le_bytes(*callback_compute_units),
            last_settlement_time: UnixTimestamp::from_le_bytes(*last_settlement_time),
            pending_request_id: u64::from_le_bytes(*pending_request_id),
            recent_winner: Pubkey::new_from_array(*recent_winner),
            pool_lamports: u64::from_le_bytes(*pool_lamports),
            player_count: u64::from_le_bytes(*player_count),
            players,
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, Raffle::LEN];
        let (
            is_initialized_dst,
            state_dst,
            bump_dst,
            entrance_fee_dst,
            interval_dst,
            oracle_program_dst,
            oracle_queue_dst,
            oracle_identity_dst,
            subscription_id_dst,
            callback_compute_units_dst,
            last_settlement_time_dst,
            pending_request_id_dst,
            recent_winner_dst,
            pool_lamports_dst,
            player_count_dst,
            players_dst,
        ) = mut_array_refs![dst, 1, 1, 1, 8, 8, 32, 32, 32, 8, 4, 8, 8, 32, 8, 8, 32 * MAX_PLAYERS];

        is_initialized_dst[0] = self.is_initialized as u8;
        state_dst[0] = self.state.into();
        bump_dst[0] = self.bump;
        *entrance_fee_dst = self.entrance_fee.to_le_bytes();
        *interval_dst = self.interval.to_le_bytes();
        oracle_program_dst.copy_from_slice(self.oracle_program.as_ref());
        oracle_queue_dst.copy_from_slice(self.oracle_queue.as_ref());
        oracle_identity_dst.copy_from_slice(self.oracle_identity.as_ref());
        *subscription_id_dst = self.subscription_id.to_le_bytes();
        *callback_compute_units_dst = self.callback_compute_units.to_le_bytes();
        *last_settlement_time_dst = self.last_settlement_time.to_le_bytes();
        *pending_request_id_dst = self.pending_request_id.to_le_bytes();
        recent_winner_dst.copy_from_slice(self.recent_winner.as_ref());
        *pool_lamports_dst = self.pool_lamports.to_le_bytes();
        *player_count_dst = self.player_count.to_le_bytes();
        for (i, player) in self.players.iter().enumerate() {
            players_dst[i * 32..(i + 1) * 32].copy_from_slice(player.as_ref());
        }
    }
}
