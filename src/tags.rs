//! Instruction tag constants.
//!
//! The first byte of every instruction buffer. These values are fixed by the
//! deployed program; never reorder or reuse a tag number.

pub const TAG_INIT_MARKET: u8 = 0;
pub const TAG_INIT_USER: u8 = 1;
pub const TAG_INIT_LP: u8 = 2;
pub const TAG_DEPOSIT_COLLATERAL: u8 = 3;
pub const TAG_WITHDRAW_COLLATERAL: u8 = 4;
pub const TAG_KEEPER_CRANK: u8 = 5;
pub const TAG_TRADE_NO_CPI: u8 = 6;
pub const TAG_LIQUIDATE_AT_ORACLE: u8 = 7;
pub const TAG_CLOSE_ACCOUNT: u8 = 8;
pub const TAG_TOP_UP_INSURANCE: u8 = 9;
pub const TAG_TRADE_CPI: u8 = 10;
pub const TAG_SET_RISK_THRESHOLD: u8 = 11;
pub const TAG_UPDATE_ADMIN: u8 = 12;
pub const TAG_CLOSE_SLAB: u8 = 13;
pub const TAG_UPDATE_CONFIG: u8 = 14;
pub const TAG_SET_MAINTENANCE_FEE: u8 = 15;
pub const TAG_SET_ORACLE_AUTHORITY: u8 = 16;
pub const TAG_PUSH_ORACLE_PRICE: u8 = 17;
pub const TAG_SET_ORACLE_PRICE_CAP: u8 = 18;
pub const TAG_RESOLVE_MARKET: u8 = 19;
pub const TAG_WITHDRAW_INSURANCE: u8 = 20;
pub const TAG_ADMIN_FORCE_CLOSE: u8 = 21;
pub const TAG_UPDATE_RISK_PARAMS: u8 = 22;
pub const TAG_RENOUNCE_ADMIN: u8 = 23;

/// Every tag this codec can encode, in numeric order.
pub const ALL_TAGS: [u8; 24] = [
    TAG_INIT_MARKET,
    TAG_INIT_USER,
    TAG_INIT_LP,
    TAG_DEPOSIT_COLLATERAL,
    TAG_WITHDRAW_COLLATERAL,
    TAG_KEEPER_CRANK,
    TAG_TRADE_NO_CPI,
    TAG_LIQUIDATE_AT_ORACLE,
    TAG_CLOSE_ACCOUNT,
    TAG_TOP_UP_INSURANCE,
    TAG_TRADE_CPI,
    TAG_SET_RISK_THRESHOLD,
    TAG_UPDATE_ADMIN,
    TAG_CLOSE_SLAB,
    TAG_UPDATE_CONFIG,
    TAG_SET_MAINTENANCE_FEE,
    TAG_SET_ORACLE_AUTHORITY,
    TAG_PUSH_ORACLE_PRICE,
    TAG_SET_ORACLE_PRICE_CAP,
    TAG_RESOLVE_MARKET,
    TAG_WITHDRAW_INSURANCE,
    TAG_ADMIN_FORCE_CLOSE,
    TAG_UPDATE_RISK_PARAMS,
    TAG_RENOUNCE_ADMIN,
];
