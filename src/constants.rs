/// Decimal precision for return and contribution calculations
pub const DECIMAL_PRECISION: u32 = 6;

/// Decimal precision for display
pub const DISPLAY_DECIMAL_PRECISION: u32 = 2;

/// Default annualization factor for daily return series
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// Minimum number of daily observations for historical VaR
pub const VAR_SAMPLE_FLOOR: usize = 20;

/// Tolerance for the snapshot consistency check (positions + cash vs NAV)
pub const NAV_CONSISTENCY_TOLERANCE: &str = "0.01";

/// Tolerance for the attribution reconciliation cross-check
pub const CONTRIBUTION_CHECK_EPSILON: &str = "0.0001";
