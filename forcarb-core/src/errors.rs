use thiserror::Error;

/// Error type for invalid operations.
///
/// Configuration errors are fatal: they indicate bad input data that would
/// otherwise produce physically meaningless carbon totals, so they are never
/// silently corrected.
#[derive(Error, Debug)]
pub enum ForcarbError {
    #[error("{0}")]
    Config(String),
    #[error("Pool ID must be greater than 0. The value provided is = {0}.")]
    InvalidPoolId(u32),
    #[error("A name must be provided for a transfer rule.")]
    EmptyRuleName,
    #[error("Proportion to {destination} must be in the range [0.0, 1.0]. Got {value}.")]
    FractionOutOfRange {
        destination: &'static str,
        value: f64,
    },
    #[error("Sum of all proportions must be no greater than 1.0. The total of the proportions is = {0}.")]
    FractionSumExceedsOne(f64),
    #[error("Pool ID {0} cannot be found. Has one of the Initialize* operations been called?")]
    PoolRuleNotFound(u32),
    #[error("Fire severity {0} is outside the supported range [0, {1}].")]
    FireSeverityOutOfRange(u8, u8),
    #[error("Proportion of stem biomass to stem snag is not between 0 and 1: got {value} for species {species} at age {age}. Check the merchantability curve parameters.")]
    MerchantableFractionOutOfRange {
        species: usize,
        age: u32,
        value: f64,
    },
}

/// Convenience type for `Result<T, ForcarbError>`.
pub type ForcarbResult<T> = Result<T, ForcarbError>;
