//! Strategy registry — name-keyed construction of the built-in predicates.

use super::climax_limitdown::ClimaxLimitDown;
use super::high_tight_flag::HighTightFlag;
use super::low_volatility::LowVolatilityGrowth;
use super::ma250_pullback::Ma250Pullback;
use super::ma_alignment::MaAlignment;
use super::parking_apron::ParkingApron;
use super::platform_breakout::PlatformBreakout;
use super::steady_growth::SteadyGrowth;
use super::turtle::TurtleBreakout;
use super::volume_surge::VolumeSurge;
use super::Strategy;

/// Errors that can occur during strategy construction.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown strategy: {0}")]
    Unknown(String),
}

/// Every built-in strategy with its default window.
pub fn all() -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(TurtleBreakout::default()),
        Box::new(VolumeSurge::default()),
        Box::new(PlatformBreakout::default()),
        Box::new(Ma250Pullback::default()),
        Box::new(MaAlignment::default()),
        Box::new(ParkingApron::default()),
        Box::new(HighTightFlag::default()),
        Box::new(LowVolatilityGrowth::default()),
        Box::new(SteadyGrowth::default()),
        Box::new(ClimaxLimitDown::default()),
    ]
}

/// Create a strategy by its registry name.
pub fn create(name: &str) -> Result<Box<dyn Strategy>, RegistryError> {
    match name {
        "turtle_breakout" => Ok(Box::new(TurtleBreakout::default())),
        "volume_surge" => Ok(Box::new(VolumeSurge::default())),
        "platform_breakout" => Ok(Box::new(PlatformBreakout::default())),
        "ma250_pullback" => Ok(Box::new(Ma250Pullback::default())),
        "ma_alignment" => Ok(Box::new(MaAlignment::default())),
        "parking_apron" => Ok(Box::new(ParkingApron::default())),
        "high_tight_flag" => Ok(Box::new(HighTightFlag::default())),
        "low_volatility_growth" => Ok(Box::new(LowVolatilityGrowth::default())),
        "steady_growth" => Ok(Box::new(SteadyGrowth::default())),
        "climax_limitdown" => Ok(Box::new(ClimaxLimitDown::default())),
        other => Err(RegistryError::Unknown(other.to_string())),
    }
}
