//! Account state definitions

use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program::{
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::Pubkey,
};

/// Escrow record for one in-flight swap.
///
/// Lives in a keypair-addressed account allocated by the initializer right
/// before `InitEscrow`. A zeroed record reads as uninitialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Escrow {
    /// Whether the record holds a live escrow
    pub is_initialized: bool,
    /// Party who locked token A
    pub initializer_pubkey: Pubkey,
    /// Token account holding the deposit, owned by the escrow authority while open
    pub temp_token_account_pubkey: Pubkey,
    /// Initializer's token B account that receives the taker's payment
    pub initializer_token_to_receive_account_pubkey: Pubkey,
    /// Quantity of token B the initializer demands
    pub expected_amount: u64,
}

impl Escrow {
    pub fn new(
        initializer_pubkey: Pubkey,
        temp_token_account_pubkey: Pubkey,
        initializer_token_to_receive_account_pubkey: Pubkey,
        expected_amount: u64,
    ) -> Self {
        Self {
            is_initialized: true,
            initializer_pubkey,
            temp_token_account_pubkey,
            initializer_token_to_receive_account_pubkey,
            expected_amount,
        }
    }
}

impl Sealed for Escrow {}

impl IsInitialized for Escrow {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for Escrow {
    const LEN: usize = 1 + 32 + 32 + 32 + 8; // 105 bytes

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, Escrow::LEN];
        let (
            is_initialized_dst,
            initializer_pubkey_dst,
            temp_token_account_pubkey_dst,
            initializer_token_to_receive_account_pubkey_dst,
            expected_amount_dst,
        ) = mut_array_refs![dst, 1, 32, 32, 32, 8];

        is_initialized_dst[0] = self.is_initialized as u8;
        initializer_pubkey_dst.copy_from_slice(self.initializer_pubkey.as_ref());
        temp_token_account_pubkey_dst.copy_from_slice(self.temp_token_account_pubkey.as_ref());
        initializer_token_to_receive_account_pubkey_dst
            .copy_from_slice(self.initializer_token_to_receive_account_pubkey.as_ref());
        *expected_amount_dst = self.expected_amount.to_le_bytes();
    }

    // Length is checked by Pack::unpack / unpack_unchecked before this runs
    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, Escrow::LEN];
        let (
            is_initialized,
            initializer_pubkey,
            temp_token_account_pubkey,
            initializer_token_to_receive_account_pubkey,
            expected_amount,
        ) = array_refs![src, 1, 32, 32, 32, 8];

        Ok(Escrow {
            is_initialized: is_initialized[0] != 0,
            initializer_pubkey: Pubkey::new_from_array(*initializer_pubkey),
            temp_token_account_pubkey: Pubkey::new_from_array(*temp_token_account_pubkey),
            initializer_token_to_receive_account_pubkey: Pubkey::new_from_array(
                *initializer_token_to_receive_account_pubkey,
            ),
            expected_amount: u64::from_le_bytes(*expected_amount),
        })
    }
}
