#![deny(unsafe_code)]

//! Percolator codec: client-side binary layer for the Percolator program.
//!
//! Decodes the slab (header, config, engine, risk params, account table)
//! from a raw account snapshot and encodes instruction data together with
//! the positional account list the program expects.

/// Instruction tag constants.
#[path = "tags.rs"]
pub mod tags;

// 1. mod constants
pub mod constants {
    pub const MAGIC: u64 = 0x504552434f4c4154; // "PERCOLAT"
    pub const VERSION: u32 = 1;

    pub const HEADER_LEN: usize = 72;
    pub const CONFIG_LEN: usize = 320;
    // SBF aligns u128 to 8, so the engine starts right after the config.
    pub const ENGINE_ALIGN: usize = 8;
    pub const ENGINE_OFF: usize = align_up(HEADER_LEN + CONFIG_LEN, ENGINE_ALIGN);
    pub const PARAMS_LEN: usize = 144;
    pub const ACCOUNT_SIZE: usize = 248;
    pub const MAX_ACCOUNTS: usize = 4096;

    pub const FLAG_RESOLVED: u8 = 1 << 0;
    pub const FLAG_PAUSED: u8 = 1 << 1;

    pub const MATCHER_MAGIC: u64 = 0x5045_5243_4d41_5443; // "PERCMATC"
    pub const MATCHER_CONTEXT_LEN: usize = 320;
    pub const MATCHER_CONTEXT_PREFIX_LEN: usize = 64;
    pub const MATCHER_CTX_LEN: usize = 256;

    /// Sentinel caller index for a permissionless crank.
    pub const CRANK_NO_CALLER: u16 = u16::MAX;
    /// Confirmation code RenounceAdmin must carry ("RENOUNCE").
    pub const RENOUNCE_ADMIN_CONFIRMATION: u64 = 0x52454E4F554E4345;

    pub const fn align_up(x: usize, a: usize) -> usize {
        (x + (a - 1)) & !(a - 1)
    }
}

// 2. mod error
pub mod error {
    use crate::ix::InstructionKind;
    use crate::layout::FieldKind;
    use crate::metas::AccountRole;
    use thiserror::Error;

    #[derive(Clone, Debug, Eq, PartialEq, Error)]
    pub enum CodecError {
        #[error("truncated buffer: {width} bytes at offset {offset} exceed length {len}")]
        TruncatedBuffer { offset: usize, width: usize, len: usize },
        #[error("layout mismatch: expected at least {expected} bytes, got {actual}")]
        LayoutMismatch { expected: usize, actual: usize },
        #[error("fixture check `{check}` failed: expected {expected}, found {found}")]
        FixtureMismatch { check: &'static str, expected: u64, found: u64 },
        #[error("unknown instruction tag {0}")]
        UnknownTag(u8),
        #[error("value does not fit in {width} bytes")]
        ValueOutOfRange { width: usize },
        #[error("{kind:?}.{field}: value out of range for {ty:?}")]
        FieldRange { kind: InstructionKind, field: &'static str, ty: FieldKind },
        #[error("{kind:?}.{field}: value has the wrong shape for {ty:?}")]
        FieldType { kind: InstructionKind, field: &'static str, ty: FieldKind },
        #[error("{kind:?}: expected {expected} arguments, got {actual}")]
        ArgumentCount { kind: InstructionKind, expected: usize, actual: usize },
        #[error("magic mismatch: expected {expected:#018x}, found {found:#018x}")]
        MagicMismatch { expected: u64, found: u64 },
        #[error("{kind:?}: no address supplied for role `{role}`")]
        MissingRole { kind: InstructionKind, role: AccountRole },
        #[error("{kind:?}: role `{role}` is not part of this instruction")]
        UnexpectedRole { kind: InstructionKind, role: AccountRole },
        #[error("{kind:?}: role `{role}` supplied more than once")]
        DuplicateRole { kind: InstructionKind, role: AccountRole },
        #[error("unknown account role `{0}`")]
        UnknownRoleName(String),
    }

    pub type CodecResult<T> = Result<T, CodecError>;
}

// 3. mod codec (fixed-width little-endian primitives)
pub mod codec {
    use crate::error::{CodecError, CodecResult};
    use arrayref::array_ref;
    use solana_program::pubkey::Pubkey;

    /// Fails unless `off..off + width` lies inside a buffer of `len` bytes.
    #[inline]
    pub fn check(len: usize, off: usize, width: usize) -> CodecResult<()> {
        match off.checked_add(width) {
            Some(end) if end <= len => Ok(()),
            _ => Err(CodecError::TruncatedBuffer { offset: off, width, len }),
        }
    }

    pub fn read_u8(buf: &[u8], off: usize) -> CodecResult<u8> {
        check(buf.len(), off, 1)?;
        Ok(buf[off])
    }

    pub fn read_bool(buf: &[u8], off: usize) -> CodecResult<bool> {
        Ok(read_u8(buf, off)? != 0)
    }

    pub fn read_u16(buf: &[u8], off: usize) -> CodecResult<u16> {
        check(buf.len(), off, 2)?;
        Ok(u16::from_le_bytes(*array_ref![buf, off, 2]))
    }

    pub fn read_u32(buf: &[u8], off: usize) -> CodecResult<u32> {
        check(buf.len(), off, 4)?;
        Ok(u32::from_le_bytes(*array_ref![buf, off, 4]))
    }

    pub fn read_u64(buf: &[u8], off: usize) -> CodecResult<u64> {
        check(buf.len(), off, 8)?;
        Ok(u64::from_le_bytes(*array_ref![buf, off, 8]))
    }

    pub fn read_i64(buf: &[u8], off: usize) -> CodecResult<i64> {
        check(buf.len(), off, 8)?;
        Ok(i64::from_le_bytes(*array_ref![buf, off, 8]))
    }

    /// Two unsigned words, low word first.
    pub fn read_u128(buf: &[u8], off: usize) -> CodecResult<u128> {
        check(buf.len(), off, 16)?;
        let lo = read_u64(buf, off)?;
        let hi = read_u64(buf, off + 8)?;
        Ok(((hi as u128) << 64) | lo as u128)
    }

    /// Low word unsigned, high word signed. The sign lives only in the high word.
    pub fn read_i128(buf: &[u8], off: usize) -> CodecResult<i128> {
        check(buf.len(), off, 16)?;
        let lo = read_u64(buf, off)?;
        let hi = read_i64(buf, off + 8)?;
        Ok(((hi as i128) << 64) | lo as i128)
    }

    pub fn read_bytes32(buf: &[u8], off: usize) -> CodecResult<[u8; 32]> {
        check(buf.len(), off, 32)?;
        Ok(*array_ref![buf, off, 32])
    }

    pub fn read_pubkey(buf: &[u8], off: usize) -> CodecResult<Pubkey> {
        Ok(Pubkey::new_from_array(read_bytes32(buf, off)?))
    }

    /// Writes the low `width` bytes of `v`; fails if `v` needs more.
    pub fn write_uint(buf: &mut [u8], off: usize, width: usize, v: u128) -> CodecResult<()> {
        if width == 0 || width > 16 {
            return Err(CodecError::ValueOutOfRange { width });
        }
        check(buf.len(), off, width)?;
        if width < 16 && v >> (width * 8) != 0 {
            return Err(CodecError::ValueOutOfRange { width });
        }
        buf[off..off + width].copy_from_slice(&v.to_le_bytes()[..width]);
        Ok(())
    }

    /// Two's-complement counterpart of [`write_uint`].
    pub fn write_int(buf: &mut [u8], off: usize, width: usize, v: i128) -> CodecResult<()> {
        if width == 0 || width > 16 {
            return Err(CodecError::ValueOutOfRange { width });
        }
        check(buf.len(), off, width)?;
        if width < 16 {
            let bits = width * 8;
            let min = -(1i128 << (bits - 1));
            let max = (1i128 << (bits - 1)) - 1;
            if v < min || v > max {
                return Err(CodecError::ValueOutOfRange { width });
            }
        }
        buf[off..off + width].copy_from_slice(&v.to_le_bytes()[..width]);
        Ok(())
    }

    pub fn write_u8(buf: &mut [u8], off: usize, v: u8) -> CodecResult<()> {
        write_uint(buf, off, 1, v as u128)
    }

    pub fn write_bool(buf: &mut [u8], off: usize, v: bool) -> CodecResult<()> {
        write_u8(buf, off, v as u8)
    }

    pub fn write_u16(buf: &mut [u8], off: usize, v: u16) -> CodecResult<()> {
        write_uint(buf, off, 2, v as u128)
    }

    pub fn write_u32(buf: &mut [u8], off: usize, v: u32) -> CodecResult<()> {
        write_uint(buf, off, 4, v as u128)
    }

    pub fn write_u64(buf: &mut [u8], off: usize, v: u64) -> CodecResult<()> {
        write_uint(buf, off, 8, v as u128)
    }

    pub fn write_i64(buf: &mut [u8], off: usize, v: i64) -> CodecResult<()> {
        write_int(buf, off, 8, v as i128)
    }

    pub fn write_u128(buf: &mut [u8], off: usize, v: u128) -> CodecResult<()> {
        check(buf.len(), off, 16)?;
        write_u64(buf, off, v as u64)?;
        write_u64(buf, off + 8, (v >> 64) as u64)
    }

    pub fn write_i128(buf: &mut [u8], off: usize, v: i128) -> CodecResult<()> {
        check(buf.len(), off, 16)?;
        write_u64(buf, off, v as u64)?;
        write_i64(buf, off + 8, (v >> 64) as i64)
    }

    pub fn write_bytes32(buf: &mut [u8], off: usize, v: &[u8; 32]) -> CodecResult<()> {
        check(buf.len(), off, 32)?;
        buf[off..off + 32].copy_from_slice(v);
        Ok(())
    }

    pub fn write_pubkey(buf: &mut [u8], off: usize, key: &Pubkey) -> CodecResult<()> {
        write_bytes32(buf, off, &key.to_bytes())
    }
}

// 4. mod layout
pub mod layout {
    //! Byte layout of the slab and the matcher context.
    //!
    //! Offsets are written down once here. Region-relative field tables are
    //! consumed by the slab and matcher decoders; instruction field tables in
    //! `ix` use the same [`Field`] type with offsets derived by [`seq`].

    use crate::codec;
    use crate::constants::*;
    use crate::error::CodecResult;
    use bytemuck::{Pod, Zeroable};
    use solana_program::{msg, pubkey::Pubkey};

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum FieldKind {
        U8,
        Bool,
        U16,
        U32,
        U64,
        I64,
        U128,
        I128,
        Pubkey,
        Bytes32,
    }

    impl FieldKind {
        pub const fn width(self) -> usize {
            match self {
                FieldKind::U8 | FieldKind::Bool => 1,
                FieldKind::U16 => 2,
                FieldKind::U32 => 4,
                FieldKind::U64 | FieldKind::I64 => 8,
                FieldKind::U128 | FieldKind::I128 => 16,
                FieldKind::Pubkey | FieldKind::Bytes32 => 32,
            }
        }

        pub const fn is_signed(self) -> bool {
            matches!(self, FieldKind::I64 | FieldKind::I128)
        }

        pub const fn is_integer(self) -> bool {
            !matches!(self, FieldKind::Bool | FieldKind::Pubkey | FieldKind::Bytes32)
        }
    }

    /// A named, typed field at a byte offset relative to its region.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Field {
        pub name: &'static str,
        pub offset: usize,
        pub kind: FieldKind,
    }

    impl Field {
        pub const fn new(name: &'static str, offset: usize, kind: FieldKind) -> Self {
            Self { name, offset, kind }
        }

        pub const fn width(&self) -> usize {
            self.kind.width()
        }

        pub const fn end(&self) -> usize {
            self.offset + self.kind.width()
        }

        /// Absolute offset of this field inside a region starting at `base`.
        pub const fn at(&self, base: usize) -> usize {
            base + self.offset
        }

        pub fn u8_at(&self, buf: &[u8], base: usize) -> CodecResult<u8> {
            debug_assert!(matches!(self.kind, FieldKind::U8), "{}", self.name);
            codec::read_u8(buf, self.at(base))
        }

        pub fn bool_at(&self, buf: &[u8], base: usize) -> CodecResult<bool> {
            debug_assert!(matches!(self.kind, FieldKind::Bool | FieldKind::U8), "{}", self.name);
            codec::read_bool(buf, self.at(base))
        }

        pub fn u16_at(&self, buf: &[u8], base: usize) -> CodecResult<u16> {
            debug_assert!(matches!(self.kind, FieldKind::U16), "{}", self.name);
            codec::read_u16(buf, self.at(base))
        }

        pub fn u32_at(&self, buf: &[u8], base: usize) -> CodecResult<u32> {
            debug_assert!(matches!(self.kind, FieldKind::U32), "{}", self.name);
            codec::read_u32(buf, self.at(base))
        }

        pub fn u64_at(&self, buf: &[u8], base: usize) -> CodecResult<u64> {
            debug_assert!(matches!(self.kind, FieldKind::U64), "{}", self.name);
            codec::read_u64(buf, self.at(base))
        }

        pub fn i64_at(&self, buf: &[u8], base: usize) -> CodecResult<i64> {
            debug_assert!(matches!(self.kind, FieldKind::I64), "{}", self.name);
            codec::read_i64(buf, self.at(base))
        }

        pub fn u128_at(&self, buf: &[u8], base: usize) -> CodecResult<u128> {
            debug_assert!(matches!(self.kind, FieldKind::U128), "{}", self.name);
            codec::read_u128(buf, self.at(base))
        }

        pub fn i128_at(&self, buf: &[u8], base: usize) -> CodecResult<i128> {
            debug_assert!(matches!(self.kind, FieldKind::I128), "{}", self.name);
            codec::read_i128(buf, self.at(base))
        }

        pub fn pubkey_at(&self, buf: &[u8], base: usize) -> CodecResult<Pubkey> {
            debug_assert!(matches!(self.kind, FieldKind::Pubkey), "{}", self.name);
            codec::read_pubkey(buf, self.at(base))
        }

        pub fn bytes32_at(&self, buf: &[u8], base: usize) -> CodecResult<[u8; 32]> {
            debug_assert!(matches!(self.kind, FieldKind::Bytes32), "{}", self.name);
            codec::read_bytes32(buf, self.at(base))
        }
    }

    /// Lays `specs` out back to back starting at `start`.
    pub const fn seq<const N: usize>(start: usize, specs: [(&'static str, FieldKind); N]) -> [Field; N] {
        let mut out = [Field::new("", 0, FieldKind::U8); N];
        let mut off = start;
        let mut i = 0;
        while i < N {
            let (name, kind) = specs[i];
            out[i] = Field::new(name, off, kind);
            off += kind.width();
            i += 1;
        }
        out
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Region {
        pub name: &'static str,
        pub offset: usize,
        pub len: usize,
    }

    impl Region {
        pub const fn end(&self) -> usize {
            self.offset + self.len
        }
    }

    /// On-chain `SlabHeader`. No u128 fields, so native and SBF layouts agree
    /// and it can be read as plain old data.
    #[repr(C)]
    #[derive(Clone, Copy, Pod, Zeroable)]
    pub struct RawSlabHeader {
        pub magic: u64,
        pub version: u32,
        pub bump: u8,
        pub flags: u8,
        pub _padding: [u8; 2],
        pub admin: [u8; 32],
        pub _reserved: [u8; 24], // [0..8]=nonce, [8..16]=last_thr_update_slot
    }

    const _: [(); HEADER_LEN] = [(); core::mem::size_of::<RawSlabHeader>()];

    pub mod config {
        use super::{Field, FieldKind as K};

        pub const COLLATERAL_MINT: Field = Field::new("collateral_mint", 0, K::Pubkey);
        pub const VAULT: Field = Field::new("vault", 32, K::Pubkey);
        pub const INDEX_FEED_ID: Field = Field::new("index_feed_id", 64, K::Bytes32);
        pub const MAX_STALENESS_SECS: Field = Field::new("max_staleness_secs", 96, K::U64);
        pub const CONF_FILTER_BPS: Field = Field::new("conf_filter_bps", 104, K::U16);
        pub const VAULT_AUTHORITY_BUMP: Field = Field::new("vault_authority_bump", 106, K::U8);
        pub const INVERT: Field = Field::new("invert", 107, K::U8);
        pub const UNIT_SCALE: Field = Field::new("unit_scale", 108, K::U32);
        pub const FUNDING_HORIZON_SLOTS: Field = Field::new("funding_horizon_slots", 112, K::U64);
        pub const FUNDING_K_BPS: Field = Field::new("funding_k_bps", 120, K::U64);
        pub const FUNDING_INV_SCALE_NOTIONAL_E6: Field =
            Field::new("funding_inv_scale_notional_e6", 128, K::U128);
        pub const FUNDING_MAX_PREMIUM_BPS: Field = Field::new("funding_max_premium_bps", 144, K::I64);
        pub const FUNDING_MAX_BPS_PER_SLOT: Field = Field::new("funding_max_bps_per_slot", 152, K::I64);
        pub const THRESH_FLOOR: Field = Field::new("thresh_floor", 160, K::U128);
        pub const THRESH_RISK_BPS: Field = Field::new("thresh_risk_bps", 176, K::U64);
        pub const THRESH_UPDATE_INTERVAL_SLOTS: Field =
            Field::new("thresh_update_interval_slots", 184, K::U64);
        pub const THRESH_STEP_BPS: Field = Field::new("thresh_step_bps", 192, K::U64);
        pub const THRESH_ALPHA_BPS: Field = Field::new("thresh_alpha_bps", 200, K::U64);
        pub const THRESH_MIN: Field = Field::new("thresh_min", 208, K::U128);
        pub const THRESH_MAX: Field = Field::new("thresh_max", 224, K::U128);
        pub const THRESH_MIN_STEP: Field = Field::new("thresh_min_step", 240, K::U128);
        pub const ORACLE_AUTHORITY: Field = Field::new("oracle_authority", 256, K::Pubkey);
        pub const AUTHORITY_PRICE_E6: Field = Field::new("authority_price_e6", 288, K::U64);
        pub const AUTHORITY_TIMESTAMP: Field = Field::new("authority_timestamp", 296, K::I64);
        pub const ORACLE_PRICE_CAP_E2BPS: Field = Field::new("oracle_price_cap_e2bps", 304, K::U64);
        pub const LAST_EFFECTIVE_PRICE_E6: Field = Field::new("last_effective_price_e6", 312, K::U64);

        pub const ALL: &[Field] = &[
            COLLATERAL_MINT,
            VAULT,
            INDEX_FEED_ID,
            MAX_STALENESS_SECS,
            CONF_FILTER_BPS,
            VAULT_AUTHORITY_BUMP,
            INVERT,
            UNIT_SCALE,
            FUNDING_HORIZON_SLOTS,
            FUNDING_K_BPS,
            FUNDING_INV_SCALE_NOTIONAL_E6,
            FUNDING_MAX_PREMIUM_BPS,
            FUNDING_MAX_BPS_PER_SLOT,
            THRESH_FLOOR,
            THRESH_RISK_BPS,
            THRESH_UPDATE_INTERVAL_SLOTS,
            THRESH_STEP_BPS,
            THRESH_ALPHA_BPS,
            THRESH_MIN,
            THRESH_MAX,
            THRESH_MIN_STEP,
            ORACLE_AUTHORITY,
            AUTHORITY_PRICE_E6,
            AUTHORITY_TIMESTAMP,
            ORACLE_PRICE_CAP_E2BPS,
            LAST_EFFECTIVE_PRICE_E6,
        ];
    }

    pub mod engine {
        //! Fixed-position engine fields, relative to the engine region. Fields
        //! after the bitmap move with capacity; see [`super::SlabLayout`].
        use super::{Field, FieldKind as K};

        pub const VAULT: Field = Field::new("vault", 0, K::U128);
        pub const INSURANCE_BALANCE: Field = Field::new("insurance_fund.balance", 16, K::U128);
        pub const INSURANCE_FEE_REVENUE: Field = Field::new("insurance_fund.fee_revenue", 32, K::U128);
        pub const PARAMS_OFF: usize = 48;
        pub const CURRENT_SLOT: Field = Field::new("current_slot", 192, K::U64);
        pub const FUNDING_INDEX: Field = Field::new("funding_index_qpb_e6", 200, K::I128);
        pub const LAST_FUNDING_SLOT: Field = Field::new("last_funding_slot", 216, K::U64);
        pub const FUNDING_RATE_LAST: Field = Field::new("funding_rate_bps_per_slot_last", 224, K::I64);
        pub const LAST_CRANK_SLOT: Field = Field::new("last_crank_slot", 232, K::U64);
        pub const MAX_CRANK_STALENESS: Field = Field::new("max_crank_staleness_slots", 240, K::U64);
        pub const TOTAL_OPEN_INTEREST: Field = Field::new("total_open_interest", 248, K::U128);
        pub const C_TOT: Field = Field::new("c_tot", 264, K::U128);
        pub const PNL_POS_TOT: Field = Field::new("pnl_pos_tot", 280, K::U128);
        pub const LIQ_CURSOR: Field = Field::new("liq_cursor", 296, K::U16);
        pub const GC_CURSOR: Field = Field::new("gc_cursor", 298, K::U16);
        pub const LAST_SWEEP_START: Field = Field::new("last_full_sweep_start_slot", 304, K::U64);
        pub const LAST_SWEEP_COMPLETE: Field = Field::new("last_full_sweep_completed_slot", 312, K::U64);
        pub const CRANK_CURSOR: Field = Field::new("crank_cursor", 320, K::U16);
        pub const SWEEP_START_IDX: Field = Field::new("sweep_start_idx", 322, K::U16);
        pub const LIFETIME_LIQUIDATIONS: Field = Field::new("lifetime_liquidations", 328, K::U64);
        pub const LIFETIME_FORCE_CLOSES: Field = Field::new("lifetime_force_realize_closes", 336, K::U64);
        pub const NET_LP_POS: Field = Field::new("net_lp_pos", 344, K::I128);
        pub const LP_SUM_ABS: Field = Field::new("lp_sum_abs", 360, K::U128);
        pub const LP_MAX_ABS: Field = Field::new("lp_max_abs", 376, K::U128);
        pub const LP_MAX_ABS_SWEEP: Field = Field::new("lp_max_abs_sweep", 392, K::U128);
        pub const BITMAP_OFF: usize = 408;
    }

    pub mod params {
        use super::{seq, Field, FieldKind as K};

        pub const FIELDS: [Field; 13] = seq(
            0,
            [
                ("warmup_period_slots", K::U64),
                ("maintenance_margin_bps", K::U64),
                ("initial_margin_bps", K::U64),
                ("trading_fee_bps", K::U64),
                ("max_accounts", K::U64),
                ("new_account_fee", K::U128),
                ("risk_reduction_threshold", K::U128),
                ("maintenance_fee_per_slot", K::U128),
                ("max_crank_staleness_slots", K::U64),
                ("liquidation_fee_bps", K::U64),
                ("liquidation_fee_cap", K::U128),
                ("liquidation_buffer_bps", K::U64),
                ("min_liquidation_abs", K::U128),
            ],
        );

        pub const WARMUP_PERIOD_SLOTS: Field = FIELDS[0];
        pub const MAINTENANCE_MARGIN_BPS: Field = FIELDS[1];
        pub const INITIAL_MARGIN_BPS: Field = FIELDS[2];
        pub const TRADING_FEE_BPS: Field = FIELDS[3];
        pub const MAX_ACCOUNTS: Field = FIELDS[4];
        pub const NEW_ACCOUNT_FEE: Field = FIELDS[5];
        pub const RISK_REDUCTION_THRESHOLD: Field = FIELDS[6];
        pub const MAINTENANCE_FEE_PER_SLOT: Field = FIELDS[7];
        pub const MAX_CRANK_STALENESS_SLOTS: Field = FIELDS[8];
        pub const LIQUIDATION_FEE_BPS: Field = FIELDS[9];
        pub const LIQUIDATION_FEE_CAP: Field = FIELDS[10];
        pub const LIQUIDATION_BUFFER_BPS: Field = FIELDS[11];
        pub const MIN_LIQUIDATION_ABS: Field = FIELDS[12];
    }

    pub mod account {
        use super::{Field, FieldKind as K};

        pub const ACCOUNT_ID: Field = Field::new("account_id", 0, K::U64);
        pub const CAPITAL: Field = Field::new("capital", 8, K::U128);
        pub const KIND: Field = Field::new("kind", 24, K::U8);
        pub const PNL: Field = Field::new("pnl", 32, K::I128);
        pub const RESERVED_PNL: Field = Field::new("reserved_pnl", 48, K::U64);
        pub const WARMUP_STARTED_AT_SLOT: Field = Field::new("warmup_started_at_slot", 56, K::U64);
        pub const WARMUP_SLOPE_PER_STEP: Field = Field::new("warmup_slope_per_step", 64, K::U128);
        pub const POSITION_SIZE: Field = Field::new("position_size", 80, K::I128);
        pub const ENTRY_PRICE: Field = Field::new("entry_price", 96, K::U64);
        pub const FUNDING_INDEX: Field = Field::new("funding_index", 104, K::I128);
        pub const MATCHER_PROGRAM: Field = Field::new("matcher_program", 120, K::Pubkey);
        pub const MATCHER_CONTEXT: Field = Field::new("matcher_context", 152, K::Pubkey);
        pub const OWNER: Field = Field::new("owner", 184, K::Pubkey);
        pub const FEE_CREDITS: Field = Field::new("fee_credits", 216, K::I128);
        pub const LAST_FEE_SLOT: Field = Field::new("last_fee_slot", 232, K::U64);

        pub const ALL: &[Field] = &[
            ACCOUNT_ID,
            CAPITAL,
            KIND,
            PNL,
            RESERVED_PNL,
            WARMUP_STARTED_AT_SLOT,
            WARMUP_SLOPE_PER_STEP,
            POSITION_SIZE,
            ENTRY_PRICE,
            FUNDING_INDEX,
            MATCHER_PROGRAM,
            MATCHER_CONTEXT,
            OWNER,
            FEE_CREDITS,
            LAST_FEE_SLOT,
        ];
    }

    pub mod matcher {
        //! Matcher context fields, relative to the 64-byte return prefix.
        use super::{Field, FieldKind as K};

        pub const MAGIC: Field = Field::new("magic", 0, K::U64);
        pub const VERSION: Field = Field::new("version", 8, K::U32);
        pub const KIND: Field = Field::new("kind", 12, K::U8);
        pub const LP_PDA: Field = Field::new("lp_pda", 16, K::Pubkey);
        pub const TRADING_FEE_BPS: Field = Field::new("trading_fee_bps", 48, K::U32);
        pub const BASE_SPREAD_BPS: Field = Field::new("base_spread_bps", 52, K::U32);
        pub const MAX_TOTAL_BPS: Field = Field::new("max_total_bps", 56, K::U32);
        pub const IMPACT_K_BPS: Field = Field::new("impact_k_bps", 60, K::U32);
        pub const LIQUIDITY_NOTIONAL_E6: Field = Field::new("liquidity_notional_e6", 64, K::U128);
        pub const MAX_FILL_ABS: Field = Field::new("max_fill_abs", 80, K::U128);
        pub const INVENTORY_BASE: Field = Field::new("inventory_base", 96, K::I128);
        pub const LAST_ORACLE_PRICE_E6: Field = Field::new("last_oracle_price_e6", 112, K::U64);
        pub const LAST_EXEC_PRICE_E6: Field = Field::new("last_exec_price_e6", 120, K::U64);
        pub const MAX_INVENTORY_ABS: Field = Field::new("max_inventory_abs", 128, K::U128);
    }

    /// Capacity-dependent slab layout.
    ///
    /// The program is built for a fixed `MAX_ACCOUNTS`; everything after the
    /// occupancy bitmap shifts with it. All `*_off` fields are relative to the
    /// engine region.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SlabLayout {
        pub max_accounts: usize,
        pub bitmap_words: usize,
        pub num_used_off: usize,
        pub next_account_id_off: usize,
        pub free_head_off: usize,
        pub next_free_off: usize,
        pub accounts_off: usize,
    }

    impl SlabLayout {
        pub const MAINNET: SlabLayout = SlabLayout::new(MAX_ACCOUNTS);

        /// Capacities the program is built with.
        pub const KNOWN: [SlabLayout; 4] = [
            SlabLayout::new(64),
            SlabLayout::new(256),
            SlabLayout::new(1024),
            SlabLayout::new(MAX_ACCOUNTS),
        ];

        pub const fn new(max_accounts: usize) -> Self {
            let bitmap_words = (max_accounts + 63) / 64;
            let num_used_off = engine::BITMAP_OFF + bitmap_words * 8;
            let next_account_id_off = align_up(num_used_off + 2, 8);
            let free_head_off = next_account_id_off + 8;
            let next_free_off = free_head_off + 2;
            let accounts_off = align_up(next_free_off + 2 * max_accounts, ENGINE_ALIGN);
            Self {
                max_accounts,
                bitmap_words,
                num_used_off,
                next_account_id_off,
                free_head_off,
                next_free_off,
                accounts_off,
            }
        }

        /// Picks the known layout whose slab size is exactly `len`.
        pub fn for_slab_len(len: usize) -> Option<Self> {
            let found = Self::KNOWN.iter().copied().find(|l| l.slab_len() == len);
            if found.is_none() {
                msg!("no known slab layout is {} bytes", len);
            }
            found
        }

        pub const fn header(&self) -> Region {
            Region { name: "header", offset: 0, len: HEADER_LEN }
        }

        pub const fn config(&self) -> Region {
            Region { name: "config", offset: HEADER_LEN, len: CONFIG_LEN }
        }

        pub const fn engine(&self) -> Region {
            Region { name: "engine", offset: ENGINE_OFF, len: self.engine_len() }
        }

        pub const fn params(&self) -> Region {
            Region { name: "params", offset: ENGINE_OFF + engine::PARAMS_OFF, len: PARAMS_LEN }
        }

        pub const fn bitmap(&self) -> Region {
            Region { name: "bitmap", offset: ENGINE_OFF + engine::BITMAP_OFF, len: self.bitmap_words * 8 }
        }

        pub const fn accounts(&self) -> Region {
            Region {
                name: "accounts",
                offset: ENGINE_OFF + self.accounts_off,
                len: self.max_accounts * ACCOUNT_SIZE,
            }
        }

        pub const fn regions(&self) -> [Region; 6] {
            [self.header(), self.config(), self.engine(), self.params(), self.bitmap(), self.accounts()]
        }

        pub const fn engine_len(&self) -> usize {
            self.accounts_off + self.max_accounts * ACCOUNT_SIZE
        }

        pub const fn slab_len(&self) -> usize {
            ENGINE_OFF + self.engine_len()
        }

        pub const fn num_used_field(&self) -> Field {
            Field::new("num_used_accounts", self.num_used_off, FieldKind::U16)
        }

        pub const fn next_account_id_field(&self) -> Field {
            Field::new("next_account_id", self.next_account_id_off, FieldKind::U64)
        }

        pub const fn free_head_field(&self) -> Field {
            Field::new("free_head", self.free_head_off, FieldKind::U16)
        }

        /// Absolute offset of slot `idx`. Does not bound-check `idx`.
        pub const fn account_offset(&self, idx: usize) -> usize {
            self.accounts().offset + idx * ACCOUNT_SIZE
        }
    }
}

// 5. mod slab
pub mod slab {
    //! Slab decoding.
    //!
    //! Every read is taken from a single snapshot buffer. Slot indices are
    //! reused after an account closes, so callers compare `account_id`, not
    //! the index, across snapshots.

    use crate::codec;
    use crate::constants::*;
    use crate::error::{CodecError, CodecResult};
    use crate::layout::{self, RawSlabHeader, SlabLayout};
    use crate::tier::{self, TierInfo};
    use bytemuck::Zeroable;
    use solana_program::{msg, pubkey::Pubkey};

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SlabHeader {
        pub magic: u64,
        pub version: u32,
        pub bump: u8,
        pub flags: u8,
        pub admin: Pubkey,
        pub nonce: u64,
        pub last_threshold_update_slot: u64,
    }

    impl SlabHeader {
        pub fn is_initialized(&self) -> bool {
            self.magic == MAGIC
        }

        pub fn is_resolved(&self) -> bool {
            self.flags & FLAG_RESOLVED != 0
        }

        pub fn is_paused(&self) -> bool {
            self.flags & FLAG_PAUSED != 0
        }

        /// Admin was renounced; the key is all zeros.
        pub fn is_admin_burned(&self) -> bool {
            self.admin == Pubkey::default()
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MarketConfig {
        pub collateral_mint: Pubkey,
        pub vault: Pubkey,
        pub index_feed_id: [u8; 32],
        pub max_staleness_secs: u64,
        pub conf_filter_bps: u16,
        pub vault_authority_bump: u8,
        pub invert: bool,
        pub unit_scale: u32,
        pub funding: FundingConfig,
        pub threshold: ThresholdConfig,
        pub oracle_authority: Pubkey,
        pub authority_price_e6: u64,
        pub authority_timestamp: i64,
        pub oracle_price_cap_e2bps: u64,
        pub last_effective_price_e6: u64,
    }

    impl MarketConfig {
        pub fn has_oracle_authority(&self) -> bool {
            self.oracle_authority != Pubkey::default()
        }
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct FundingConfig {
        pub horizon_slots: u64,
        pub k_bps: u64,
        pub inv_scale_notional_e6: u128,
        pub max_premium_bps: i64,
        pub max_bps_per_slot: i64,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ThresholdConfig {
        pub floor: u128,
        pub risk_bps: u64,
        pub update_interval_slots: u64,
        pub step_bps: u64,
        pub alpha_bps: u64,
        pub min: u128,
        pub max: u128,
        pub min_step: u128,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct InsuranceFund {
        pub balance: u128,
        pub fee_revenue: u128,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct EngineState {
        pub vault: u128,
        pub insurance_fund: InsuranceFund,
        pub current_slot: u64,
        pub funding_index_qpb_e6: i128,
        pub last_funding_slot: u64,
        pub funding_rate_bps_per_slot_last: i64,
        pub last_crank_slot: u64,
        pub max_crank_staleness_slots: u64,
        pub total_open_interest: u128,
        pub c_tot: u128,
        pub pnl_pos_tot: u128,
        pub liq_cursor: u16,
        pub gc_cursor: u16,
        pub last_full_sweep_start_slot: u64,
        pub last_full_sweep_completed_slot: u64,
        pub crank_cursor: u16,
        pub sweep_start_idx: u16,
        pub lifetime_liquidations: u64,
        pub lifetime_force_realize_closes: u64,
        pub net_lp_pos: i128,
        pub lp_sum_abs: u128,
        pub lp_max_abs: u128,
        pub lp_max_abs_sweep: u128,
        pub num_used_accounts: u16,
        pub next_account_id: u64,
        pub free_head: u16,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct RiskParams {
        pub warmup_period_slots: u64,
        pub maintenance_margin_bps: u64,
        pub initial_margin_bps: u64,
        pub trading_fee_bps: u64,
        pub max_accounts: u64,
        pub new_account_fee: u128,
        pub risk_reduction_threshold: u128,
        pub maintenance_fee_per_slot: u128,
        pub max_crank_staleness_slots: u64,
        pub liquidation_fee_bps: u64,
        pub liquidation_fee_cap: u128,
        pub liquidation_buffer_bps: u64,
        pub min_liquidation_abs: u128,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SlabSnapshot {
        pub header: SlabHeader,
        pub config: MarketConfig,
        pub engine: EngineState,
        pub params: RiskParams,
    }

    impl SlabSnapshot {
        /// The engine only allows risk-reducing trades once the insurance
        /// fund has fallen to the configured threshold. Not stored in this
        /// layout version, so it is derived here.
        pub fn risk_reduction_mode(&self) -> bool {
            self.params.risk_reduction_threshold != 0
                && self.engine.insurance_fund.balance <= self.params.risk_reduction_threshold
        }

        /// Pricing tier implied by insurance coverage of open interest.
        pub fn tier(&self) -> TierInfo {
            tier::tier(self.engine.insurance_fund.balance, self.engine.total_open_interest)
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum AccountKind {
        User,
        Lp,
        /// A kind byte this codec does not know yet.
        Unknown(u8),
    }

    impl AccountKind {
        pub const fn from_tag(tag: u8) -> Self {
            match tag {
                0 => AccountKind::User,
                1 => AccountKind::Lp,
                other => AccountKind::Unknown(other),
            }
        }

        pub const fn tag(self) -> u8 {
            match self {
                AccountKind::User => 0,
                AccountKind::Lp => 1,
                AccountKind::Unknown(t) => t,
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Account {
        pub account_id: u64,
        pub capital: u128,
        pub kind: AccountKind,
        pub pnl: i128,
        pub reserved_pnl: u64,
        pub warmup_started_at_slot: u64,
        pub warmup_slope_per_step: u128,
        pub position_size: i128,
        pub entry_price: u64,
        pub funding_index: i128,
        pub matcher_program: Pubkey,
        pub matcher_context: Pubkey,
        pub owner: Pubkey,
        pub fee_credits: i128,
        pub last_fee_slot: u64,
    }

    impl Account {
        pub fn is_lp(&self) -> bool {
            matches!(self.kind, AccountKind::Lp)
        }

        /// `(matcher_program, matcher_context)` for an LP bound to a matcher.
        /// The all-zero program key means no matcher.
        pub fn matcher(&self) -> Option<(Pubkey, Pubkey)> {
            if self.is_lp() && self.matcher_program.to_bytes() != [0u8; 32] {
                Some((self.matcher_program, self.matcher_context))
            } else {
                None
            }
        }

        pub fn is_flat(&self) -> bool {
            self.position_size == 0
        }
    }

    pub fn read_header(buf: &[u8]) -> CodecResult<SlabHeader> {
        codec::check(buf.len(), 0, HEADER_LEN)?;
        let mut h = RawSlabHeader::zeroed();
        bytemuck::bytes_of_mut(&mut h).copy_from_slice(&buf[..HEADER_LEN]);
        Ok(SlabHeader {
            magic: h.magic,
            version: h.version,
            bump: h.bump,
            flags: h.flags,
            admin: Pubkey::new_from_array(h.admin),
            nonce: codec::read_u64(&h._reserved, 0)?,
            last_threshold_update_slot: codec::read_u64(&h._reserved, 8)?,
        })
    }

    pub fn read_config(buf: &[u8], base: usize) -> CodecResult<MarketConfig> {
        use layout::config::*;
        Ok(MarketConfig {
            collateral_mint: COLLATERAL_MINT.pubkey_at(buf, base)?,
            vault: VAULT.pubkey_at(buf, base)?,
            index_feed_id: INDEX_FEED_ID.bytes32_at(buf, base)?,
            max_staleness_secs: MAX_STALENESS_SECS.u64_at(buf, base)?,
            conf_filter_bps: CONF_FILTER_BPS.u16_at(buf, base)?,
            vault_authority_bump: VAULT_AUTHORITY_BUMP.u8_at(buf, base)?,
            invert: INVERT.bool_at(buf, base)?,
            unit_scale: UNIT_SCALE.u32_at(buf, base)?,
            funding: FundingConfig {
                horizon_slots: FUNDING_HORIZON_SLOTS.u64_at(buf, base)?,
                k_bps: FUNDING_K_BPS.u64_at(buf, base)?,
                inv_scale_notional_e6: FUNDING_INV_SCALE_NOTIONAL_E6.u128_at(buf, base)?,
                max_premium_bps: FUNDING_MAX_PREMIUM_BPS.i64_at(buf, base)?,
                max_bps_per_slot: FUNDING_MAX_BPS_PER_SLOT.i64_at(buf, base)?,
            },
            threshold: ThresholdConfig {
                floor: THRESH_FLOOR.u128_at(buf, base)?,
                risk_bps: THRESH_RISK_BPS.u64_at(buf, base)?,
                update_interval_slots: THRESH_UPDATE_INTERVAL_SLOTS.u64_at(buf, base)?,
                step_bps: THRESH_STEP_BPS.u64_at(buf, base)?,
                alpha_bps: THRESH_ALPHA_BPS.u64_at(buf, base)?,
                min: THRESH_MIN.u128_at(buf, base)?,
                max: THRESH_MAX.u128_at(buf, base)?,
                min_step: THRESH_MIN_STEP.u128_at(buf, base)?,
            },
            oracle_authority: ORACLE_AUTHORITY.pubkey_at(buf, base)?,
            authority_price_e6: AUTHORITY_PRICE_E6.u64_at(buf, base)?,
            authority_timestamp: AUTHORITY_TIMESTAMP.i64_at(buf, base)?,
            oracle_price_cap_e2bps: ORACLE_PRICE_CAP_E2BPS.u64_at(buf, base)?,
            last_effective_price_e6: LAST_EFFECTIVE_PRICE_E6.u64_at(buf, base)?,
        })
    }

    pub fn read_params(buf: &[u8], base: usize) -> CodecResult<RiskParams> {
        use layout::params as p;
        Ok(RiskParams {
            warmup_period_slots: p::WARMUP_PERIOD_SLOTS.u64_at(buf, base)?,
            maintenance_margin_bps: p::MAINTENANCE_MARGIN_BPS.u64_at(buf, base)?,
            initial_margin_bps: p::INITIAL_MARGIN_BPS.u64_at(buf, base)?,
            trading_fee_bps: p::TRADING_FEE_BPS.u64_at(buf, base)?,
            max_accounts: p::MAX_ACCOUNTS.u64_at(buf, base)?,
            new_account_fee: p::NEW_ACCOUNT_FEE.u128_at(buf, base)?,
            risk_reduction_threshold: p::RISK_REDUCTION_THRESHOLD.u128_at(buf, base)?,
            maintenance_fee_per_slot: p::MAINTENANCE_FEE_PER_SLOT.u128_at(buf, base)?,
            max_crank_staleness_slots: p::MAX_CRANK_STALENESS_SLOTS.u64_at(buf, base)?,
            liquidation_fee_bps: p::LIQUIDATION_FEE_BPS.u64_at(buf, base)?,
            liquidation_fee_cap: p::LIQUIDATION_FEE_CAP.u128_at(buf, base)?,
            liquidation_buffer_bps: p::LIQUIDATION_BUFFER_BPS.u64_at(buf, base)?,
            min_liquidation_abs: p::MIN_LIQUIDATION_ABS.u128_at(buf, base)?,
        })
    }

    pub fn read_account(buf: &[u8], base: usize) -> CodecResult<Account> {
        use layout::account::*;
        codec::check(buf.len(), base, ACCOUNT_SIZE)?;
        Ok(Account {
            account_id: ACCOUNT_ID.u64_at(buf, base)?,
            capital: CAPITAL.u128_at(buf, base)?,
            kind: AccountKind::from_tag(KIND.u8_at(buf, base)?),
            pnl: PNL.i128_at(buf, base)?,
            reserved_pnl: RESERVED_PNL.u64_at(buf, base)?,
            warmup_started_at_slot: WARMUP_STARTED_AT_SLOT.u64_at(buf, base)?,
            warmup_slope_per_step: WARMUP_SLOPE_PER_STEP.u128_at(buf, base)?,
            position_size: POSITION_SIZE.i128_at(buf, base)?,
            entry_price: ENTRY_PRICE.u64_at(buf, base)?,
            funding_index: FUNDING_INDEX.i128_at(buf, base)?,
            matcher_program: MATCHER_PROGRAM.pubkey_at(buf, base)?,
            matcher_context: MATCHER_CONTEXT.pubkey_at(buf, base)?,
            owner: OWNER.pubkey_at(buf, base)?,
            fee_credits: FEE_CREDITS.i128_at(buf, base)?,
            last_fee_slot: LAST_FEE_SLOT.u64_at(buf, base)?,
        })
    }

    impl SlabLayout {
        /// Fails with `LayoutMismatch` if `buf` is shorter than this layout.
        pub fn check_len(&self, buf: &[u8]) -> CodecResult<()> {
            let expected = self.slab_len();
            if buf.len() < expected {
                return Err(CodecError::LayoutMismatch { expected, actual: buf.len() });
            }
            Ok(())
        }

        pub fn decode(&self, buf: &[u8]) -> CodecResult<SlabSnapshot> {
            self.check_len(buf)?;
            Ok(SlabSnapshot {
                header: read_header(buf)?,
                config: read_config(buf, self.config().offset)?,
                engine: self.read_engine(buf)?,
                params: read_params(buf, self.params().offset)?,
            })
        }

        pub fn read_engine(&self, buf: &[u8]) -> CodecResult<EngineState> {
            use layout::engine::*;
            let base = ENGINE_OFF;
            Ok(EngineState {
                vault: VAULT.u128_at(buf, base)?,
                insurance_fund: InsuranceFund {
                    balance: INSURANCE_BALANCE.u128_at(buf, base)?,
                    fee_revenue: INSURANCE_FEE_REVENUE.u128_at(buf, base)?,
                },
                current_slot: CURRENT_SLOT.u64_at(buf, base)?,
                funding_index_qpb_e6: FUNDING_INDEX.i128_at(buf, base)?,
                last_funding_slot: LAST_FUNDING_SLOT.u64_at(buf, base)?,
                funding_rate_bps_per_slot_last: FUNDING_RATE_LAST.i64_at(buf, base)?,
                last_crank_slot: LAST_CRANK_SLOT.u64_at(buf, base)?,
                max_crank_staleness_slots: MAX_CRANK_STALENESS.u64_at(buf, base)?,
                total_open_interest: TOTAL_OPEN_INTEREST.u128_at(buf, base)?,
                c_tot: C_TOT.u128_at(buf, base)?,
                pnl_pos_tot: PNL_POS_TOT.u128_at(buf, base)?,
                liq_cursor: LIQ_CURSOR.u16_at(buf, base)?,
                gc_cursor: GC_CURSOR.u16_at(buf, base)?,
                last_full_sweep_start_slot: LAST_SWEEP_START.u64_at(buf, base)?,
                last_full_sweep_completed_slot: LAST_SWEEP_COMPLETE.u64_at(buf, base)?,
                crank_cursor: CRANK_CURSOR.u16_at(buf, base)?,
                sweep_start_idx: SWEEP_START_IDX.u16_at(buf, base)?,
                lifetime_liquidations: LIFETIME_LIQUIDATIONS.u64_at(buf, base)?,
                lifetime_force_realize_closes: LIFETIME_FORCE_CLOSES.u64_at(buf, base)?,
                net_lp_pos: NET_LP_POS.i128_at(buf, base)?,
                lp_sum_abs: LP_SUM_ABS.u128_at(buf, base)?,
                lp_max_abs: LP_MAX_ABS.u128_at(buf, base)?,
                lp_max_abs_sweep: LP_MAX_ABS_SWEEP.u128_at(buf, base)?,
                num_used_accounts: self.num_used_field().u16_at(buf, base)?,
                next_account_id: self.next_account_id_field().u64_at(buf, base)?,
                free_head: self.free_head_field().u16_at(buf, base)?,
            })
        }

        /// Decodes slot `idx` without consulting the bitmap. `None` when the
        /// slot lies outside this layout or past the end of `buf`.
        pub fn decode_account(&self, buf: &[u8], idx: u32) -> Option<Account> {
            let idx = idx as usize;
            if idx >= self.max_accounts {
                return None;
            }
            let off = self.account_offset(idx);
            if off + ACCOUNT_SIZE > buf.len() {
                return None;
            }
            read_account(buf, off).ok()
        }

        /// Indices of live slots, ascending.
        pub fn scan_used_indices(&self, buf: &[u8]) -> CodecResult<Vec<u32>> {
            let bitmap = self.bitmap();
            codec::check(buf.len(), bitmap.offset, bitmap.len)?;
            let mut used = Vec::new();
            for word_idx in 0..self.bitmap_words {
                let mut word = codec::read_u64(buf, bitmap.offset + word_idx * 8)?;
                while word != 0 {
                    let bit = word.trailing_zeros() as usize;
                    let idx = word_idx * 64 + bit;
                    // Bits past capacity in the last word cannot name a slot.
                    if idx < self.max_accounts {
                        used.push(idx as u32);
                    }
                    word &= word - 1;
                }
            }
            Ok(used)
        }

        /// Scan-then-decode: every live slot with its index. Free slots are
        /// never returned.
        pub fn used_accounts(&self, buf: &[u8]) -> CodecResult<Vec<(u32, Account)>> {
            let used = self.scan_used_indices(buf)?;
            let mut out = Vec::with_capacity(used.len());
            for idx in used {
                let account = self.decode_account(buf, idx).ok_or(CodecError::TruncatedBuffer {
                    offset: self.account_offset(idx as usize),
                    width: ACCOUNT_SIZE,
                    len: buf.len(),
                })?;
                out.push((idx, account));
            }
            Ok(out)
        }

        pub fn find_by_owner(&self, buf: &[u8], owner: &Pubkey) -> CodecResult<Option<(u32, Account)>> {
            Ok(self.used_accounts(buf)?.into_iter().find(|(_, a)| a.owner == *owner))
        }

        pub fn find_by_account_id(&self, buf: &[u8], account_id: u64) -> CodecResult<Option<(u32, Account)>> {
            Ok(self
                .used_accounts(buf)?
                .into_iter()
                .find(|(_, a)| a.account_id == account_id))
        }

        /// Checks a captured snapshot against this layout version. A slab that
        /// decodes but fails here means the offsets have drifted from the
        /// deployed program.
        pub fn validate(&self, buf: &[u8]) -> CodecResult<()> {
            let snapshot = self.decode(buf)?;
            if snapshot.header.magic != MAGIC {
                msg!("slab magic {:#x} does not match", snapshot.header.magic);
                return Err(CodecError::MagicMismatch { expected: MAGIC, found: snapshot.header.magic });
            }
            if snapshot.header.version != VERSION {
                return Err(fixture("version", VERSION as u64, snapshot.header.version as u64));
            }
            if snapshot.params.max_accounts > self.max_accounts as u64 {
                return Err(fixture("max_accounts", self.max_accounts as u64, snapshot.params.max_accounts));
            }
            let used = self.scan_used_indices(buf)?;
            if used.len() as u64 != snapshot.engine.num_used_accounts as u64 {
                return Err(fixture(
                    "num_used_accounts",
                    snapshot.engine.num_used_accounts as u64,
                    used.len() as u64,
                ));
            }
            for (_, account) in self.used_accounts(buf)? {
                if account.account_id >= snapshot.engine.next_account_id {
                    return Err(fixture("account_id", snapshot.engine.next_account_id, account.account_id));
                }
            }
            Ok(())
        }
    }

    fn fixture(check: &'static str, expected: u64, found: u64) -> CodecError {
        msg!("slab fixture check {} failed: expected {} found {}", check, expected, found);
        CodecError::FixtureMismatch { check, expected, found }
    }

    /// Decodes header, config, engine and params with the mainnet layout.
    pub fn decode(buf: &[u8]) -> CodecResult<SlabSnapshot> {
        SlabLayout::MAINNET.decode(buf)
    }

    pub fn decode_account(buf: &[u8], idx: u32) -> Option<Account> {
        SlabLayout::MAINNET.decode_account(buf, idx)
    }

    pub fn scan_used_indices(buf: &[u8]) -> CodecResult<Vec<u32>> {
        SlabLayout::MAINNET.scan_used_indices(buf)
    }
}

// 6. mod ix
pub mod ix {
    //! Instruction layouts and the encoder.
    //!
    //! Wire format: one tag byte, then the kind's fields back to back, no
    //! padding and no length prefixes. A field written with the wrong width
    //! shifts every field after it, so widths come only from the tables here.

    use crate::codec;
    use crate::error::{CodecError, CodecResult};
    use crate::layout::{seq, Field, FieldKind as K};
    use crate::slab::{FundingConfig, MarketConfig, RiskParams, ThresholdConfig};
    use crate::tags::*;
    use num_derive::FromPrimitive;
    use num_traits::FromPrimitive;
    use solana_program::pubkey::Pubkey;

    #[repr(u8)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive)]
    pub enum InstructionKind {
        InitMarket = TAG_INIT_MARKET,
        InitUser = TAG_INIT_USER,
        InitLP = TAG_INIT_LP,
        DepositCollateral = TAG_DEPOSIT_COLLATERAL,
        WithdrawCollateral = TAG_WITHDRAW_COLLATERAL,
        KeeperCrank = TAG_KEEPER_CRANK,
        TradeNoCpi = TAG_TRADE_NO_CPI,
        LiquidateAtOracle = TAG_LIQUIDATE_AT_ORACLE,
        CloseAccount = TAG_CLOSE_ACCOUNT,
        TopUpInsurance = TAG_TOP_UP_INSURANCE,
        TradeCpi = TAG_TRADE_CPI,
        SetRiskThreshold = TAG_SET_RISK_THRESHOLD,
        UpdateAdmin = TAG_UPDATE_ADMIN,
        CloseSlab = TAG_CLOSE_SLAB,
        UpdateConfig = TAG_UPDATE_CONFIG,
        SetMaintenanceFee = TAG_SET_MAINTENANCE_FEE,
        SetOracleAuthority = TAG_SET_ORACLE_AUTHORITY,
        PushOraclePrice = TAG_PUSH_ORACLE_PRICE,
        SetOraclePriceCap = TAG_SET_ORACLE_PRICE_CAP,
        ResolveMarket = TAG_RESOLVE_MARKET,
        WithdrawInsurance = TAG_WITHDRAW_INSURANCE,
        AdminForceClose = TAG_ADMIN_FORCE_CLOSE,
        UpdateRiskParams = TAG_UPDATE_RISK_PARAMS,
        RenounceAdmin = TAG_RENOUNCE_ADMIN,
    }

    static INIT_MARKET: [Field; 21] = seq(
        1,
        [
            ("admin", K::Pubkey),
            ("collateral_mint", K::Pubkey),
            ("index_feed_id", K::Bytes32),
            ("max_staleness_secs", K::U64),
            ("conf_filter_bps", K::U16),
            ("invert", K::U8),
            ("unit_scale", K::U32),
            ("initial_mark_price_e6", K::U64),
            ("warmup_period_slots", K::U64),
            ("maintenance_margin_bps", K::U64),
            ("initial_margin_bps", K::U64),
            ("trading_fee_bps", K::U64),
            ("max_accounts", K::U64),
            ("new_account_fee", K::U128),
            ("risk_reduction_threshold", K::U128),
            ("maintenance_fee_per_slot", K::U128),
            ("max_crank_staleness_slots", K::U64),
            ("liquidation_fee_bps", K::U64),
            ("liquidation_fee_cap", K::U128),
            ("liquidation_buffer_bps", K::U64),
            ("min_liquidation_abs", K::U128),
        ],
    );
    static INIT_USER: [Field; 1] = seq(1, [("fee_payment", K::U64)]);
    static INIT_LP: [Field; 3] = seq(
        1,
        [("matcher_program", K::Pubkey), ("matcher_context", K::Pubkey), ("fee_payment", K::U64)],
    );
    static USER_AMOUNT: [Field; 2] = seq(1, [("user_idx", K::U16), ("amount", K::U64)]);
    static KEEPER_CRANK: [Field; 2] = seq(1, [("caller_idx", K::U16), ("allow_panic", K::Bool)]);
    static TRADE: [Field; 3] = seq(1, [("lp_idx", K::U16), ("user_idx", K::U16), ("size", K::I128)]);
    static TARGET_IDX: [Field; 1] = seq(1, [("target_idx", K::U16)]);
    static USER_IDX: [Field; 1] = seq(1, [("user_idx", K::U16)]);
    static AMOUNT: [Field; 1] = seq(1, [("amount", K::U64)]);
    static NEW_THRESHOLD: [Field; 1] = seq(1, [("new_threshold", K::U128)]);
    static NEW_ADMIN: [Field; 1] = seq(1, [("new_admin", K::Pubkey)]);
    static UPDATE_CONFIG: [Field; 13] = seq(
        1,
        [
            ("funding_horizon_slots", K::U64),
            ("funding_k_bps", K::U64),
            ("funding_inv_scale_notional_e6", K::U128),
            ("funding_max_premium_bps", K::I64),
            ("funding_max_bps_per_slot", K::I64),
            ("thresh_floor", K::U128),
            ("thresh_risk_bps", K::U64),
            ("thresh_update_interval_slots", K::U64),
            ("thresh_step_bps", K::U64),
            ("thresh_alpha_bps", K::U64),
            ("thresh_min", K::U128),
            ("thresh_max", K::U128),
            ("thresh_min_step", K::U128),
        ],
    );
    static NEW_FEE: [Field; 1] = seq(1, [("new_fee", K::U128)]);
    static NEW_AUTHORITY: [Field; 1] = seq(1, [("new_authority", K::Pubkey)]);
    static PUSH_ORACLE_PRICE: [Field; 2] = seq(1, [("price_e6", K::U64), ("timestamp", K::I64)]);
    static ORACLE_PRICE_CAP: [Field; 1] = seq(1, [("max_change_e2bps", K::U64)]);
    static UPDATE_RISK_PARAMS: [Field; 3] = seq(
        1,
        [("initial_margin_bps", K::U64), ("maintenance_margin_bps", K::U64), ("trading_fee_bps", K::U64)],
    );
    static CONFIRMATION: [Field; 1] = seq(1, [("confirmation", K::U64)]);

    impl InstructionKind {
        pub const fn tag(self) -> u8 {
            self as u8
        }

        /// Unknown tags are an error on the encode side.
        pub fn from_tag(tag: u8) -> CodecResult<Self> {
            Self::from_u8(tag).ok_or(CodecError::UnknownTag(tag))
        }

        /// Fields after the tag byte, with offsets into the instruction data.
        pub fn fields(self) -> &'static [Field] {
            use InstructionKind::*;
            match self {
                InitMarket => &INIT_MARKET,
                InitUser => &INIT_USER,
                InitLP => &INIT_LP,
                DepositCollateral | WithdrawCollateral => &USER_AMOUNT,
                KeeperCrank => &KEEPER_CRANK,
                TradeNoCpi | TradeCpi => &TRADE,
                LiquidateAtOracle | AdminForceClose => &TARGET_IDX,
                CloseAccount => &USER_IDX,
                TopUpInsurance => &AMOUNT,
                SetRiskThreshold => &NEW_THRESHOLD,
                UpdateAdmin => &NEW_ADMIN,
                UpdateConfig => &UPDATE_CONFIG,
                SetMaintenanceFee => &NEW_FEE,
                SetOracleAuthority => &NEW_AUTHORITY,
                PushOraclePrice => &PUSH_ORACLE_PRICE,
                SetOraclePriceCap => &ORACLE_PRICE_CAP,
                UpdateRiskParams => &UPDATE_RISK_PARAMS,
                RenounceAdmin => &CONFIRMATION,
                CloseSlab | ResolveMarket | WithdrawInsurance => &[],
            }
        }

        /// Total encoded length including the tag byte.
        pub fn data_len(self) -> usize {
            self.fields().last().map_or(1, |f| f.end())
        }
    }

    /// One argument value. Integers carry the widest type so range checks
    /// happen against the target field, not at the call site.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Value {
        Unsigned(u128),
        Signed(i128),
        Bool(bool),
        Key(Pubkey),
        Bytes32([u8; 32]),
    }

    macro_rules! value_from {
        ($variant:ident, $wide:ty: $($t:ty),*) => {
            $(impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v as $wide)
                }
            })*
        };
    }

    value_from!(Unsigned, u128: u8, u16, u32, u64, u128, usize);
    value_from!(Signed, i128: i8, i16, i32, i64, i128, isize);

    impl From<bool> for Value {
        fn from(v: bool) -> Self {
            Value::Bool(v)
        }
    }

    impl From<Pubkey> for Value {
        fn from(v: Pubkey) -> Self {
            Value::Key(v)
        }
    }

    impl From<[u8; 32]> for Value {
        fn from(v: [u8; 32]) -> Self {
            Value::Bytes32(v)
        }
    }

    /// A logical instruction: kind plus ordered arguments.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct InstructionCall {
        pub kind: InstructionKind,
        pub args: Vec<Value>,
    }

    impl InstructionCall {
        pub fn new(kind: InstructionKind, args: Vec<Value>) -> Self {
            Self { kind, args }
        }
    }

    fn write_field(buf: &mut [u8], kind: InstructionKind, field: &Field, value: Value) -> CodecResult<()> {
        let range = || CodecError::FieldRange { kind, field: field.name, ty: field.kind };
        let shape = || CodecError::FieldType { kind, field: field.name, ty: field.kind };
        let off = field.offset;
        let width = field.width();
        let res = match (field.kind, value) {
            (K::Pubkey, Value::Key(key)) => codec::write_pubkey(buf, off, &key),
            (K::Bytes32, Value::Bytes32(bytes)) => codec::write_bytes32(buf, off, &bytes),
            (K::Bytes32, Value::Key(key)) => codec::write_bytes32(buf, off, &key.to_bytes()),
            (K::Bool, Value::Bool(b)) => codec::write_bool(buf, off, b),
            (K::Bool, Value::Unsigned(v)) => match v {
                0 | 1 => codec::write_u8(buf, off, v as u8),
                _ => return Err(range()),
            },
            (k, Value::Unsigned(v)) if k.is_integer() => {
                if k.is_signed() {
                    let v = i128::try_from(v).map_err(|_| range())?;
                    codec::write_int(buf, off, width, v)
                } else {
                    codec::write_uint(buf, off, width, v)
                }
            }
            (k, Value::Signed(v)) if k.is_integer() => {
                if k.is_signed() {
                    codec::write_int(buf, off, width, v)
                } else {
                    let v = u128::try_from(v).map_err(|_| range())?;
                    codec::write_uint(buf, off, width, v)
                }
            }
            _ => return Err(shape()),
        };
        res.map_err(|e| match e {
            CodecError::ValueOutOfRange { .. } => range(),
            other => other,
        })
    }

    /// Encodes `call` into exactly `kind.data_len()` bytes.
    pub fn encode(call: &InstructionCall) -> CodecResult<Vec<u8>> {
        let kind = call.kind;
        let fields = kind.fields();
        if call.args.len() != fields.len() {
            return Err(CodecError::ArgumentCount { kind, expected: fields.len(), actual: call.args.len() });
        }
        let mut data = vec![0u8; kind.data_len()];
        codec::write_u8(&mut data, 0, kind.tag())?;
        let mut off = 1;
        for (field, value) in fields.iter().zip(call.args.iter()) {
            debug_assert_eq!(field.offset, off, "{:?}.{} is not contiguous", kind, field.name);
            write_field(&mut data, kind, field, *value)?;
            off = field.end();
        }
        debug_assert_eq!(off, data.len());
        Ok(data)
    }

    /// Like [`encode`] but starting from a raw tag byte.
    pub fn encode_raw(tag: u8, args: &[Value]) -> CodecResult<Vec<u8>> {
        let kind = InstructionKind::from_tag(tag)?;
        encode(&InstructionCall::new(kind, args.to_vec()))
    }

    impl RiskParams {
        fn push_values(&self, args: &mut Vec<Value>) {
            args.extend_from_slice(&[
                self.warmup_period_slots.into(),
                self.maintenance_margin_bps.into(),
                self.initial_margin_bps.into(),
                self.trading_fee_bps.into(),
                self.max_accounts.into(),
                self.new_account_fee.into(),
                self.risk_reduction_threshold.into(),
                self.maintenance_fee_per_slot.into(),
                self.max_crank_staleness_slots.into(),
                self.liquidation_fee_bps.into(),
                self.liquidation_fee_cap.into(),
                self.liquidation_buffer_bps.into(),
                self.min_liquidation_abs.into(),
            ]);
        }
    }

    impl MarketConfig {
        /// Funding and threshold settings as an UpdateConfig instruction, so
        /// a caller can read, adjust and write back.
        pub fn update_config(&self) -> Instruction {
            Instruction::UpdateConfig { funding: self.funding, threshold: self.threshold }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Instruction {
        InitMarket {
            admin: Pubkey,
            collateral_mint: Pubkey,
            /// All zeros selects the internal mark price.
            index_feed_id: [u8; 32],
            max_staleness_secs: u64,
            conf_filter_bps: u16,
            invert: u8,
            unit_scale: u32,
            initial_mark_price_e6: u64,
            risk_params: RiskParams,
        },
        InitUser { fee_payment: u64 },
        InitLP { matcher_program: Pubkey, matcher_context: Pubkey, fee_payment: u64 },
        DepositCollateral { user_idx: u16, amount: u64 },
        WithdrawCollateral { user_idx: u16, amount: u64 },
        KeeperCrank { caller_idx: u16, allow_panic: bool },
        TradeNoCpi { lp_idx: u16, user_idx: u16, size: i128 },
        LiquidateAtOracle { target_idx: u16 },
        CloseAccount { user_idx: u16 },
        TopUpInsurance { amount: u64 },
        TradeCpi { lp_idx: u16, user_idx: u16, size: i128 },
        SetRiskThreshold { new_threshold: u128 },
        UpdateAdmin { new_admin: Pubkey },
        CloseSlab,
        UpdateConfig { funding: FundingConfig, threshold: ThresholdConfig },
        SetMaintenanceFee { new_fee: u128 },
        SetOracleAuthority { new_authority: Pubkey },
        PushOraclePrice { price_e6: u64, timestamp: i64 },
        SetOraclePriceCap { max_change_e2bps: u64 },
        ResolveMarket,
        WithdrawInsurance,
        AdminForceClose { target_idx: u16 },
        UpdateRiskParams { initial_margin_bps: u64, maintenance_margin_bps: u64, trading_fee_bps: u64 },
        RenounceAdmin { confirmation: u64 },
    }

    impl Instruction {
        pub fn kind(&self) -> InstructionKind {
            match self {
                Instruction::InitMarket { .. } => InstructionKind::InitMarket,
                Instruction::InitUser { .. } => InstructionKind::InitUser,
                Instruction::InitLP { .. } => InstructionKind::InitLP,
                Instruction::DepositCollateral { .. } => InstructionKind::DepositCollateral,
                Instruction::WithdrawCollateral { .. } => InstructionKind::WithdrawCollateral,
                Instruction::KeeperCrank { .. } => InstructionKind::KeeperCrank,
                Instruction::TradeNoCpi { .. } => InstructionKind::TradeNoCpi,
                Instruction::LiquidateAtOracle { .. } => InstructionKind::LiquidateAtOracle,
                Instruction::CloseAccount { .. } => InstructionKind::CloseAccount,
                Instruction::TopUpInsurance { .. } => InstructionKind::TopUpInsurance,
                Instruction::TradeCpi { .. } => InstructionKind::TradeCpi,
                Instruction::SetRiskThreshold { .. } => InstructionKind::SetRiskThreshold,
                Instruction::UpdateAdmin { .. } => InstructionKind::UpdateAdmin,
                Instruction::CloseSlab => InstructionKind::CloseSlab,
                Instruction::UpdateConfig { .. } => InstructionKind::UpdateConfig,
                Instruction::SetMaintenanceFee { .. } => InstructionKind::SetMaintenanceFee,
                Instruction::SetOracleAuthority { .. } => InstructionKind::SetOracleAuthority,
                Instruction::PushOraclePrice { .. } => InstructionKind::PushOraclePrice,
                Instruction::SetOraclePriceCap { .. } => InstructionKind::SetOraclePriceCap,
                Instruction::ResolveMarket => InstructionKind::ResolveMarket,
                Instruction::WithdrawInsurance => InstructionKind::WithdrawInsurance,
                Instruction::AdminForceClose { .. } => InstructionKind::AdminForceClose,
                Instruction::UpdateRiskParams { .. } => InstructionKind::UpdateRiskParams,
                Instruction::RenounceAdmin { .. } => InstructionKind::RenounceAdmin,
            }
        }

        pub fn call(&self) -> InstructionCall {
            let mut args: Vec<Value> = Vec::new();
            match self {
                Instruction::InitMarket {
                    admin,
                    collateral_mint,
                    index_feed_id,
                    max_staleness_secs,
                    conf_filter_bps,
                    invert,
                    unit_scale,
                    initial_mark_price_e6,
                    risk_params,
                } => {
                    args.extend_from_slice(&[
                        (*admin).into(),
                        (*collateral_mint).into(),
                        (*index_feed_id).into(),
                        (*max_staleness_secs).into(),
                        (*conf_filter_bps).into(),
                        (*invert).into(),
                        (*unit_scale).into(),
                        (*initial_mark_price_e6).into(),
                    ]);
                    risk_params.push_values(&mut args);
                }
                Instruction::InitUser { fee_payment } => args.push((*fee_payment).into()),
                Instruction::InitLP { matcher_program, matcher_context, fee_payment } => {
                    args.extend_from_slice(&[
                        (*matcher_program).into(),
                        (*matcher_context).into(),
                        (*fee_payment).into(),
                    ]);
                }
                Instruction::DepositCollateral { user_idx, amount }
                | Instruction::WithdrawCollateral { user_idx, amount } => {
                    args.extend_from_slice(&[(*user_idx).into(), (*amount).into()]);
                }
                Instruction::KeeperCrank { caller_idx, allow_panic } => {
                    args.extend_from_slice(&[(*caller_idx).into(), (*allow_panic).into()]);
                }
                Instruction::TradeNoCpi { lp_idx, user_idx, size }
                | Instruction::TradeCpi { lp_idx, user_idx, size } => {
                    args.extend_from_slice(&[(*lp_idx).into(), (*user_idx).into(), (*size).into()]);
                }
                Instruction::LiquidateAtOracle { target_idx }
                | Instruction::AdminForceClose { target_idx } => args.push((*target_idx).into()),
                Instruction::CloseAccount { user_idx } => args.push((*user_idx).into()),
                Instruction::TopUpInsurance { amount } => args.push((*amount).into()),
                Instruction::SetRiskThreshold { new_threshold } => args.push((*new_threshold).into()),
                Instruction::UpdateAdmin { new_admin } => args.push((*new_admin).into()),
                Instruction::UpdateConfig { funding, threshold } => {
                    args.extend_from_slice(&[
                        funding.horizon_slots.into(),
                        funding.k_bps.into(),
                        funding.inv_scale_notional_e6.into(),
                        funding.max_premium_bps.into(),
                        funding.max_bps_per_slot.into(),
                        threshold.floor.into(),
                        threshold.risk_bps.into(),
                        threshold.update_interval_slots.into(),
                        threshold.step_bps.into(),
                        threshold.alpha_bps.into(),
                        threshold.min.into(),
                        threshold.max.into(),
                        threshold.min_step.into(),
                    ]);
                }
                Instruction::SetMaintenanceFee { new_fee } => args.push((*new_fee).into()),
                Instruction::SetOracleAuthority { new_authority } => args.push((*new_authority).into()),
                Instruction::PushOraclePrice { price_e6, timestamp } => {
                    args.extend_from_slice(&[(*price_e6).into(), (*timestamp).into()]);
                }
                Instruction::SetOraclePriceCap { max_change_e2bps } => args.push((*max_change_e2bps).into()),
                Instruction::UpdateRiskParams { initial_margin_bps, maintenance_margin_bps, trading_fee_bps } => {
                    args.extend_from_slice(&[
                        (*initial_margin_bps).into(),
                        (*maintenance_margin_bps).into(),
                        (*trading_fee_bps).into(),
                    ]);
                }
                Instruction::RenounceAdmin { confirmation } => args.push((*confirmation).into()),
                Instruction::CloseSlab | Instruction::ResolveMarket | Instruction::WithdrawInsurance => {}
            }
            InstructionCall::new(self.kind(), args)
        }

        pub fn encode(&self) -> CodecResult<Vec<u8>> {
            encode(&self.call())
        }
    }
}

// 7. mod metas
pub mod metas {
    //! Per-instruction account role tables.
    //!
    //! The program resolves accounts by position. Each table below is the
    //! order the program's handler indexes `accounts[..]`; `build` only ever
    //! iterates the table, never the caller's input.

    use crate::error::{CodecError, CodecResult};
    use crate::ix::{encode, InstructionCall, InstructionKind};
    use solana_program::{
        instruction::{AccountMeta, Instruction},
        pubkey::Pubkey,
        system_program, sysvar,
    };
    use std::fmt;
    use std::str::FromStr;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub enum AccountRole {
        Admin,
        User,
        Lp,
        LpOwner,
        Caller,
        Liquidator,
        Authority,
        Destination,
        Slab,
        Mint,
        Vault,
        VaultPda,
        UserAta,
        AdminAta,
        DummyAta,
        TokenProgram,
        SystemProgram,
        Clock,
        Rent,
        Oracle,
        MatcherProgram,
        MatcherContext,
        LpPda,
    }

    impl AccountRole {
        pub const ALL: [AccountRole; 23] = [
            AccountRole::Admin,
            AccountRole::User,
            AccountRole::Lp,
            AccountRole::LpOwner,
            AccountRole::Caller,
            AccountRole::Liquidator,
            AccountRole::Authority,
            AccountRole::Destination,
            AccountRole::Slab,
            AccountRole::Mint,
            AccountRole::Vault,
            AccountRole::VaultPda,
            AccountRole::UserAta,
            AccountRole::AdminAta,
            AccountRole::DummyAta,
            AccountRole::TokenProgram,
            AccountRole::SystemProgram,
            AccountRole::Clock,
            AccountRole::Rent,
            AccountRole::Oracle,
            AccountRole::MatcherProgram,
            AccountRole::MatcherContext,
            AccountRole::LpPda,
        ];

        pub const fn name(self) -> &'static str {
            match self {
                AccountRole::Admin => "admin",
                AccountRole::User => "user",
                AccountRole::Lp => "lp",
                AccountRole::LpOwner => "lp_owner",
                AccountRole::Caller => "caller",
                AccountRole::Liquidator => "liquidator",
                AccountRole::Authority => "authority",
                AccountRole::Destination => "destination",
                AccountRole::Slab => "slab",
                AccountRole::Mint => "mint",
                AccountRole::Vault => "vault",
                AccountRole::VaultPda => "vault_pda",
                AccountRole::UserAta => "user_ata",
                AccountRole::AdminAta => "admin_ata",
                AccountRole::DummyAta => "dummy_ata",
                AccountRole::TokenProgram => "token_program",
                AccountRole::SystemProgram => "system_program",
                AccountRole::Clock => "clock",
                AccountRole::Rent => "rent",
                AccountRole::Oracle => "oracle",
                AccountRole::MatcherProgram => "matcher_program",
                AccountRole::MatcherContext => "matcher_context",
                AccountRole::LpPda => "lp_pda",
            }
        }

        /// Fixed address for program and sysvar roles.
        pub fn well_known(self) -> Option<Pubkey> {
            match self {
                AccountRole::TokenProgram => Some(spl_token::ID),
                AccountRole::SystemProgram => Some(system_program::ID),
                AccountRole::Clock => Some(sysvar::clock::ID),
                AccountRole::Rent => Some(sysvar::rent::ID),
                _ => None,
            }
        }
    }

    impl fmt::Display for AccountRole {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.name())
        }
    }

    impl FromStr for AccountRole {
        type Err = CodecError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            AccountRole::ALL
                .iter()
                .copied()
                .find(|r| r.name() == s)
                .ok_or_else(|| CodecError::UnknownRoleName(s.to_string()))
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RoleSpec {
        pub role: AccountRole,
        pub signer: bool,
        pub writable: bool,
    }

    const fn ro(role: AccountRole) -> RoleSpec {
        RoleSpec { role, signer: false, writable: false }
    }

    const fn w(role: AccountRole) -> RoleSpec {
        RoleSpec { role, signer: false, writable: true }
    }

    const fn s(role: AccountRole) -> RoleSpec {
        RoleSpec { role, signer: true, writable: false }
    }

    const fn sw(role: AccountRole) -> RoleSpec {
        RoleSpec { role, signer: true, writable: true }
    }

    use AccountRole as R;

    static INIT_MARKET: [RoleSpec; 9] = [
        sw(R::Admin),
        w(R::Slab),
        ro(R::Mint),
        w(R::Vault),
        ro(R::TokenProgram),
        ro(R::Clock),
        ro(R::Rent),
        ro(R::DummyAta),
        ro(R::SystemProgram),
    ];
    static INIT_ACCOUNT: [RoleSpec; 5] =
        [sw(R::User), w(R::Slab), w(R::UserAta), w(R::Vault), ro(R::TokenProgram)];
    static DEPOSIT: [RoleSpec; 6] =
        [sw(R::User), w(R::Slab), w(R::UserAta), w(R::Vault), ro(R::TokenProgram), ro(R::Clock)];
    static WITHDRAW: [RoleSpec; 8] = [
        sw(R::User),
        w(R::Slab),
        w(R::Vault),
        w(R::UserAta),
        ro(R::VaultPda),
        ro(R::TokenProgram),
        ro(R::Clock),
        ro(R::Oracle),
    ];
    static KEEPER_CRANK: [RoleSpec; 4] = [s(R::Caller), w(R::Slab), ro(R::Clock), ro(R::Oracle)];
    static TRADE_NO_CPI: [RoleSpec; 5] = [s(R::User), s(R::Lp), w(R::Slab), ro(R::Clock), ro(R::Oracle)];
    static LIQUIDATE: [RoleSpec; 4] = [s(R::Liquidator), w(R::Slab), ro(R::Clock), ro(R::Oracle)];
    static TOP_UP: [RoleSpec; 5] = [sw(R::User), w(R::Slab), w(R::UserAta), w(R::Vault), ro(R::TokenProgram)];
    static TRADE_CPI: [RoleSpec; 8] = [
        s(R::User),
        ro(R::LpOwner),
        w(R::Slab),
        ro(R::Clock),
        ro(R::Oracle),
        ro(R::MatcherProgram),
        w(R::MatcherContext),
        ro(R::LpPda),
    ];
    static ADMIN: [RoleSpec; 2] = [s(R::Admin), w(R::Slab)];
    static CLOSE_SLAB: [RoleSpec; 2] = [sw(R::Destination), w(R::Slab)];
    static PUSH_PRICE: [RoleSpec; 2] = [s(R::Authority), w(R::Slab)];
    static WITHDRAW_INSURANCE: [RoleSpec; 6] = [
        s(R::Admin),
        w(R::Slab),
        w(R::AdminAta),
        w(R::Vault),
        ro(R::TokenProgram),
        ro(R::VaultPda),
    ];
    static ADMIN_FORCE_CLOSE: [RoleSpec; 4] = [s(R::Admin), w(R::Slab), ro(R::Clock), ro(R::Oracle)];

    impl InstructionKind {
        /// Accounts in the order the program reads them.
        pub fn roles(self) -> &'static [RoleSpec] {
            use InstructionKind::*;
            match self {
                InitMarket => &INIT_MARKET,
                InitUser | InitLP => &INIT_ACCOUNT,
                DepositCollateral => &DEPOSIT,
                WithdrawCollateral | CloseAccount => &WITHDRAW,
                KeeperCrank => &KEEPER_CRANK,
                TradeNoCpi => &TRADE_NO_CPI,
                LiquidateAtOracle => &LIQUIDATE,
                TopUpInsurance => &TOP_UP,
                TradeCpi => &TRADE_CPI,
                SetRiskThreshold | UpdateAdmin | UpdateConfig | SetMaintenanceFee | SetOracleAuthority
                | SetOraclePriceCap | ResolveMarket | UpdateRiskParams | RenounceAdmin => &ADMIN,
                CloseSlab => &CLOSE_SLAB,
                PushOraclePrice => &PUSH_PRICE,
                WithdrawInsurance => &WITHDRAW_INSURANCE,
                AdminForceClose => &ADMIN_FORCE_CLOSE,
            }
        }
    }

    /// Role-to-address assignments. Setting a role twice keeps the last key.
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct RoleAddresses(Vec<(AccountRole, Pubkey)>);

    impl RoleAddresses {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set(mut self, role: AccountRole, key: Pubkey) -> Self {
            match self.0.iter().position(|(r, _)| *r == role) {
                Some(i) => self.0[i].1 = key,
                None => self.0.push((role, key)),
            }
            self
        }

        pub fn get(&self, role: AccountRole) -> Option<Pubkey> {
            self.0.iter().find(|(r, _)| *r == role).map(|(_, k)| *k)
        }

        /// Fills program and sysvar roles `kind` needs that were not set.
        pub fn with_well_known(mut self, kind: InstructionKind) -> Self {
            for spec in kind.roles() {
                if self.get(spec.role).is_none() {
                    if let Some(key) = spec.role.well_known() {
                        self.0.push((spec.role, key));
                    }
                }
            }
            self
        }
    }

    impl IntoIterator for RoleAddresses {
        type Item = (AccountRole, Pubkey);
        type IntoIter = std::vec::IntoIter<(AccountRole, Pubkey)>;

        fn into_iter(self) -> Self::IntoIter {
            self.0.into_iter()
        }
    }

    /// Orders `addresses` by `kind`'s role table.
    pub fn build<I>(kind: InstructionKind, addresses: I) -> CodecResult<Vec<AccountMeta>>
    where
        I: IntoIterator<Item = (AccountRole, Pubkey)>,
    {
        let table = kind.roles();
        let mut supplied: Vec<(AccountRole, Pubkey)> = Vec::with_capacity(table.len());
        for (role, key) in addresses {
            if !table.iter().any(|spec| spec.role == role) {
                return Err(CodecError::UnexpectedRole { kind, role });
            }
            if supplied.iter().any(|(r, _)| *r == role) {
                return Err(CodecError::DuplicateRole { kind, role });
            }
            supplied.push((role, key));
        }

        table
            .iter()
            .map(|spec| -> CodecResult<AccountMeta> {
                let pubkey = supplied
                    .iter()
                    .find(|(r, _)| *r == spec.role)
                    .map(|(_, k)| *k)
                    .ok_or(CodecError::MissingRole { kind, role: spec.role })?;
                Ok(AccountMeta { pubkey, is_signer: spec.signer, is_writable: spec.writable })
            })
            .collect()
    }

    /// Instruction data plus ordered metas, ready to put in a transaction.
    pub fn build_instruction<I>(program_id: &Pubkey, call: &InstructionCall, addresses: I) -> CodecResult<Instruction>
    where
        I: IntoIterator<Item = (AccountRole, Pubkey)>,
    {
        let accounts = build(call.kind, addresses)?;
        let data = encode(call)?;
        Ok(Instruction { program_id: *program_id, accounts, data })
    }
}

// 8. mod matcher
pub mod matcher {
    //! LP matcher context account. The first 64 bytes are the matcher's
    //! return-data prefix; the context proper starts after it and is only
    //! trusted once its magic matches.

    use crate::codec;
    use crate::constants::{MATCHER_CONTEXT_PREFIX_LEN, MATCHER_CTX_LEN, MATCHER_MAGIC};
    use crate::error::{CodecError, CodecResult};
    use crate::layout::matcher::*;
    use solana_program::{msg, pubkey::Pubkey};

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum MatcherKind {
        /// Fixed spread around the oracle price.
        Passive,
        /// Spread plus impact against a liquidity curve.
        Vamm,
        Unknown(u8),
    }

    impl MatcherKind {
        pub const fn from_tag(tag: u8) -> Self {
            match tag {
                0 => MatcherKind::Passive,
                1 => MatcherKind::Vamm,
                other => MatcherKind::Unknown(other),
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MatcherContext {
        pub version: u32,
        pub kind: MatcherKind,
        pub lp_pda: Pubkey,
        pub trading_fee_bps: u32,
        pub base_spread_bps: u32,
        pub max_total_bps: u32,
        pub impact_k_bps: u32,
        pub liquidity_notional_e6: u128,
        pub max_fill_abs: u128,
        pub inventory_base: i128,
        pub last_oracle_price_e6: u64,
        pub last_exec_price_e6: u64,
        pub max_inventory_abs: u128,
    }

    impl MatcherContext {
        pub fn is_initialized(data: &[u8]) -> bool {
            MAGIC.u64_at(data, MATCHER_CONTEXT_PREFIX_LEN) == Ok(MATCHER_MAGIC)
        }

        /// Strict decode: `MagicMismatch` or `TruncatedBuffer` on failure.
        pub fn try_decode(data: &[u8]) -> CodecResult<Self> {
            let base = MATCHER_CONTEXT_PREFIX_LEN;
            let found = MAGIC.u64_at(data, base)?;
            if found != MATCHER_MAGIC {
                return Err(CodecError::MagicMismatch { expected: MATCHER_MAGIC, found });
            }
            codec::check(data.len(), base, MATCHER_CTX_LEN)?;
            Ok(Self {
                version: VERSION.u32_at(data, base)?,
                kind: MatcherKind::from_tag(KIND.u8_at(data, base)?),
                lp_pda: LP_PDA.pubkey_at(data, base)?,
                trading_fee_bps: TRADING_FEE_BPS.u32_at(data, base)?,
                base_spread_bps: BASE_SPREAD_BPS.u32_at(data, base)?,
                max_total_bps: MAX_TOTAL_BPS.u32_at(data, base)?,
                impact_k_bps: IMPACT_K_BPS.u32_at(data, base)?,
                liquidity_notional_e6: LIQUIDITY_NOTIONAL_E6.u128_at(data, base)?,
                max_fill_abs: MAX_FILL_ABS.u128_at(data, base)?,
                inventory_base: INVENTORY_BASE.i128_at(data, base)?,
                last_oracle_price_e6: LAST_ORACLE_PRICE_E6.u64_at(data, base)?,
                last_exec_price_e6: LAST_EXEC_PRICE_E6.u64_at(data, base)?,
                max_inventory_abs: MAX_INVENTORY_ABS.u128_at(data, base)?,
            })
        }

        /// `None` means the context is unavailable; callers fall back.
        pub fn decode(data: &[u8]) -> Option<Self> {
            match Self::try_decode(data) {
                Ok(ctx) => Some(ctx),
                Err(e) => {
                    msg!("matcher context unavailable: {}", e);
                    None
                }
            }
        }
    }
}

// 9. mod tier
pub mod tier {
    //! Insurance coverage tiers.
    //!
    //! Mirrors the companion matcher's pricing rule so a client can display
    //! what the program will charge. Bands are closed at the lower bound.

    pub const BPS_DENOM: u128 = 10_000;
    pub const FRAGILE_MIN_BPS: u128 = 1_000;
    pub const NORMAL_MIN_BPS: u128 = 2_500;
    pub const STRONG_MIN_BPS: u128 = 10_000;
    pub const FORTIFIED_MIN_BPS: u128 = 20_000;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum Tier {
        Critical,
        Fragile,
        Normal,
        Strong,
        Fortified,
    }

    impl Tier {
        pub const fn from_coverage_bps(bps: u128) -> Self {
            if bps < FRAGILE_MIN_BPS {
                Tier::Critical
            } else if bps < NORMAL_MIN_BPS {
                Tier::Fragile
            } else if bps < STRONG_MIN_BPS {
                Tier::Normal
            } else if bps < FORTIFIED_MIN_BPS {
                Tier::Strong
            } else {
                Tier::Fortified
            }
        }

        pub const fn name(self) -> &'static str {
            match self {
                Tier::Critical => "CRITICAL",
                Tier::Fragile => "FRAGILE",
                Tier::Normal => "NORMAL",
                Tier::Strong => "STRONG",
                Tier::Fortified => "FORTIFIED",
            }
        }

        pub const fn fill_cap_pct(self) -> u32 {
            match self {
                Tier::Critical => 25,
                Tier::Fragile => 50,
                Tier::Normal | Tier::Strong => 100,
                Tier::Fortified => 150,
            }
        }

        /// Multiplier applied to the base spread, in bps (10_000 = 1.0x).
        pub const fn spread_multiplier_bps(self) -> u64 {
            match self {
                Tier::Critical => 30_000,
                Tier::Fragile => 20_000,
                Tier::Normal => 10_000,
                Tier::Strong => 7_500,
                Tier::Fortified => 5_000,
            }
        }

        pub const fn spread_description(self) -> &'static str {
            match self {
                Tier::Critical => "base spread x3.0",
                Tier::Fragile => "base spread x2.0",
                Tier::Normal => "base spread",
                Tier::Strong => "base spread x0.75",
                Tier::Fortified => "base spread x0.5",
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TierInfo {
        pub tier: Tier,
        pub coverage_bps: u128,
        pub name: &'static str,
        pub fill_cap_pct: u32,
        pub spread_multiplier_bps: u64,
        pub spread: &'static str,
    }

    /// `insurance / open_interest` in bps. With no open interest any
    /// insurance counts as unbounded coverage and none as zero.
    pub fn coverage_bps(insurance: u128, open_interest: u128) -> u128 {
        if open_interest == 0 {
            return if insurance > 0 { u128::MAX } else { 0 };
        }
        if let Some(scaled) = insurance.checked_mul(BPS_DENOM) {
            return scaled / open_interest;
        }
        let whole = insurance / open_interest;
        let frac = fraction_bps(insurance % open_interest, open_interest);
        whole.saturating_mul(BPS_DENOM).saturating_add(frac)
    }

    /// Exact `floor(rem * 10_000 / den)` for `rem < den`, one decimal digit at
    /// a time so nothing overflows.
    fn fraction_bps(rem: u128, den: u128) -> u128 {
        let mut r = rem;
        let mut out = 0u128;
        for _ in 0..4 {
            let (mut acc, mut digit) = (0u128, 0u128);
            for _ in 0..10 {
                // acc + r wraps past den
                if acc >= den - r {
                    acc -= den - r;
                    digit += 1;
                } else {
                    acc += r;
                }
            }
            out = out * 10 + digit;
            r = acc;
        }
        out
    }

    pub fn tier(insurance: u128, open_interest: u128) -> TierInfo {
        let coverage_bps = coverage_bps(insurance, open_interest);
        let tier = Tier::from_coverage_bps(coverage_bps);
        TierInfo {
            tier,
            coverage_bps,
            name: tier.name(),
            fill_cap_pct: tier.fill_cap_pct(),
            spread_multiplier_bps: tier.spread_multiplier_bps(),
            spread: tier.spread_description(),
        }
    }
}

pub use error::{CodecError, CodecResult};
pub use ix::{encode, encode_raw, Instruction, InstructionCall, InstructionKind, Value};
pub use layout::SlabLayout;
pub use metas::{build, build_instruction, AccountRole, RoleAddresses};
