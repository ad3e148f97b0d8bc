use anise::constants::SPEED_OF_LIGHT_KM_S as ANISE_SPEED_OF_LIGHT_KM_S;

/// Speed of light in vacuum, in km.s⁻¹
pub const SPEED_OF_LIGHT_KM_S: f64 = ANISE_SPEED_OF_LIGHT_KM_S;

/// S band transponder turnaround ratio (240/221)
pub const S_BAND_TURNAROUND_RATIO: f64 = 240.0 / 221.0;

/// X band transponder turnaround ratio (880/749)
pub const X_BAND_TURNAROUND_RATIO: f64 = 880.0 / 749.0;

/// Largest ionospheric path delay we accept without warning (km)
pub const IONO_CORRECTION_MAX_KM: f64 = 0.04;

/// Largest tropospheric path delay we accept without warning (km)
pub const TROPO_CORRECTION_MAX_KM: f64 = 0.12;

/// Feasibility value reported when no participant sets one (deg)
pub const DEFAULT_FEASIBILITY_VALUE_DEG: f64 = 90.0;

/// Two way range is reported as one way range
pub const TWO_WAY_RANGE_MULTIPLIER: f64 = 0.5;

/// Truncation tolerance of the path magnitude Taylor expansion (km)
pub const TAYLOR_TRUNCATION_TOLERANCE_KM: f64 = 1.0E-9;
