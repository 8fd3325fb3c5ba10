use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};
use std::convert::TryInto;
use std::mem::size_of;

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Create and configure the raffle account. Callable once; the
    /// configuration is immutable afterwards.
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The payer funding the raffle account
    /// 1. `[writable]` The raffle account (PDA, seed `b"raffle"`)
    /// 2. `[]` The randomness oracle program (must be executable)
    /// 3. `[]` The oracle queue requests are routed to
    /// 4. `[]` The oracle identity key that will sign fulfillments
    /// 5. `[]` The system program
    Initialize {
        /// Minimum entry payment in lamports
        entrance_fee: u64,
        /// Minimum seconds between a settlement and the next upkeep
        interval: i64,
        /// Oracle billing subscription passed with every request
        subscription_id: u64,
        /// Compute budget the oracle should reserve for the callback
        callback_compute_units: u32,
    },

    /// Enter the current round by paying the entrance fee
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player entering the raffle
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The system program
    Enter {
        /// Lamports attached to the entry, at least the entrance fee
        amount: u64,
    },

    /// Report whether upkeep is due. Read-only; the verdict is published
    /// as one byte of return data so a crank can read it from a
    /// transaction simulation. Trailing instruction bytes are ignored.
    ///
    /// Accounts expected:
    /// 0. `[]` The raffle account
    CheckUpkeep {},

    /// Lock the round and request randomness from the oracle. Anyone may
    /// call this; the eligibility predicate is re-validated internally.
    /// Trailing instruction bytes are ignored.
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The caller, pays the oracle request
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The randomness oracle program
    /// 3. `[writable]` The oracle queue
    /// 4. `[]` The system program
    PerformUpkeep {},

    /// Deliver the random words for the pending request and settle the
    /// round. Only the configured oracle identity may call this.
    ///
    /// Accounts expected:
    /// 0. `[signer]` The oracle identity
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The winner the random words select
    FulfillRandomness {
        /// Identifier of the request being answered
        request_id: u64,
        /// Random words delivered by the oracle, at least one
        random_words: Vec<u64>,
    },
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input.split_first().ok_or(ProgramError::InvalidInstructionData)?;

        Ok(match tag {
            0 => {
                let (entrance_fee, rest) = Self::unpack_u64(rest)?;
                let (interval, rest) = Self::unpack_i64(rest)?;
                let (subscription_id, rest) = Self::unpack_u64(rest)?;
                let (callback_compute_units, _) = Self::unpack_u32(rest)?;
                Self::Initialize {
                    entrance_fee,
                    interval,
                    subscription_id,
                    callback_compute_units,
                }
            }
            1 => {
                let (amount, _) = Self::unpack_u64(rest)?;
                Self::Enter { amount }
            }
            2 => Self::CheckUpkeep {},
            3 => Self::PerformUpkeep {},
            4 => {
                let (request_id, rest) = Self::unpack_u64(rest)?;
                let (word_count, mut rest) = Self::unpack_u32(rest)?;
                let mut random_words = Vec::new();
                for _ in 0..word_count {
                    let (word, remainder) = Self::unpack_u64(rest)?;
                    random_words.push(word);
                    rest = remainder;
                }
                Self::FulfillRandomness {
                    request_id,
                    random_words,
                }
            }
            _ => return Err(ProgramError::InvalidInstructionData),
        })
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(size_of::<Self>());
        match *self {
            Self::Initialize {
                entrance_fee,
                interval,
                subscription_id,
                callback_compute_units,
            } => {
                buf.push(0);
                buf.extend_from_slice(&entrance_fee.to_le_bytes());
                buf.extend_from_slice(&interval.to_le_bytes());
                buf.extend_from_slice(&subscription_id.to_le_bytes());
                buf.extend_from_slice(&callback_compute_units.to_le_bytes());
            }
            Self::Enter { amount } => {
                buf.push(1);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::CheckUpkeep {} => buf.push(2),
            Self::PerformUpkeep {} => buf.push(3),
            Self::FulfillRandomness {
                request_id,
                ref random_words,
            } => {
                buf.push(4);
                buf.extend_from_slice(&request_id.to_le_bytes());
                buf.extend_from_slice(&(random_words.len() as u32).to_le_bytes());
                for word in random_words {
                    buf.extend_from_slice(&word.to_le_bytes());
                }
            }
        }
        buf
    }

    fn unpack_u32(input: &[u8]) -> Result<(u32, &[u8]), ProgramError> {
        if input.len() < 4 {
            return Err(ProgramError::InvalidInstructionData);
        }
        let (bytes, rest) = input.split_at(4);
        let value = bytes
            .try_into()
            .map(u32::from_le_bytes)
            .map_err(|_| ProgramError::InvalidInstructionData)?;
        Ok((value, rest))
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        if input.len() < 8 {
            return Err(ProgramError::InvalidInstructionData);
        }
        let (bytes, rest) = input.split_at(8);
        let value = bytes
            .try_into()
            .map(u64::from_le_bytes)
            .map_err(|_| ProgramError::InvalidInstructionData)?;
        Ok((value, rest))
    }

    fn unpack_i64(input: &[u8]) -> Result<(i64, &[u8]), ProgramError> {
        if input.len() < 8 {
            return Err(ProgramError::InvalidInstructionData);
        }
        let (bytes, rest) = input.split_at(8);
        let value = bytes
            .try_into()
            .map(i64::from_le_bytes)
            .map_err(|_| ProgramError::InvalidInstructionData)?;
        Ok((value, rest))
    }
}

/// Create an initialize instruction
#[allow(clippy::too_many_arguments)]
pub fn initialize(
    program_id: &Pubkey,
    payer: &Pubkey,
    raffle_account: &Pubkey,
    oracle_program: &Pubkey,
    oracle_queue: &Pubkey,
    oracle_identity: &Pubkey,
    entrance_fee: u64,
    interval: i64,
    subscription_id: u64,
    callback_compute_units: u32,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::Initialize {
        entrance_fee,
        interval,
        subscription_id,
        callback_compute_units,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(*oracle_program, false),
        AccountMeta::new_readonly(*oracle_queue, false),
        AccountMeta::new_readonly(*oracle_identity, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create an enter instruction
pub fn enter(
    program_id: &Pubkey,
    player: &Pubkey,
    raffle_account: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::Enter { amount }.pack();

    let accounts = vec![
        AccountMeta::new(*player, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create a check_upkeep instruction
pub fn check_upkeep(
    program_id: &Pubkey,
    raffle_account: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::CheckUpkeep {}.pack();

    let accounts = vec![AccountMeta::new_readonly(*raffle_account, false)];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create a perform_upkeep instruction
pub fn perform_upkeep(
    program_id: &Pubkey,
    caller: &Pubkey,
    raffle_account: &Pubkey,
    oracle_program: &Pubkey,
    oracle_queue: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::PerformUpkeep {}.pack();

    let accounts = vec![
        AccountMeta::new(*caller, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(*oracle_program, false),
        AccountMeta::new(*oracle_queue, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create a fulfill_randomness instruction
pub fn fulfill_randomness(
    program_id: &Pubkey,
    oracle_identity: &Pubkey,
    raffle_account: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    random_words: Vec<u64>,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::FulfillRandomness {
        request_id,
        random_words,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new_readonly(*oracle_identity, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new(*winner, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}
